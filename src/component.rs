use std::collections::BTreeSet;

use nalgebra::Vector3;

/// Visibility of a component in the most recent observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Present in the current observation, pose fields are fresh.
    OnSight,
    /// Absent from the current observation, pose fields are the last known values.
    Unknown,
}

/// A partial observation of one component.
///
/// Every pose field is optional so that a sensor which only reports, say, a
/// position can still feed the tracker. [`Component::update`] writes only the
/// fields that are supplied here and leaves the rest untouched.
///
/// # Example
///
/// ```
/// use itemtrack_rs::ComponentUpdate;
///
/// let update = ComponentUpdate::position(1.0, 2.0, 3.0)
///     .with_orientation(0.0, 0.0, std::f64::consts::FRAC_PI_2)
///     .with_bary_weight(2.0);
/// assert_eq!(update.x, Some(1.0));
/// assert_eq!(update.rz, Some(std::f64::consts::FRAC_PI_2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentUpdate {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub rx: Option<f64>,
    pub ry: Option<f64>,
    pub rz: Option<f64>,
    pub dist_weight: Option<f64>,
    pub bary_weight: Option<f64>,
    pub speed_weight: Option<f64>,
    /// Names of other components in the same item this one hangs off.
    /// Structural information only, matching never reads it.
    pub parents: Vec<String>,
}

impl ComponentUpdate {
    /// Creates an empty update that writes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an update carrying a full position.
    pub fn position(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            ..Self::default()
        }
    }

    /// Sets all three orientation angles, in radians.
    pub fn with_orientation(mut self, rx: f64, ry: f64, rz: f64) -> Self {
        self.rx = Some(rx);
        self.ry = Some(ry);
        self.rz = Some(rz);
        self
    }

    /// Sets the weight used when this component enters a distance average.
    pub fn with_dist_weight(mut self, weight: f64) -> Self {
        self.dist_weight = Some(weight);
        self
    }

    /// Sets the weight used when this component enters the barycenter.
    pub fn with_bary_weight(mut self, weight: f64) -> Self {
        self.bary_weight = Some(weight);
        self
    }

    /// Sets the weight used when this component enters the aggregate speed.
    pub fn with_speed_weight(mut self, weight: f64) -> Self {
        self.speed_weight = Some(weight);
        self
    }

    /// Registers a parent component name on this component.
    pub fn with_parent(mut self, name: impl Into<String>) -> Self {
        self.parents.push(name.into());
        self
    }
}

/// A named part of a tracked item.
///
/// Components carry a per-axis optional pose: an axis that was never observed
/// stays `None` rather than defaulting to zero, and every pose consumer
/// ([`Component::distance_to`], the barycenter, the orientation mean) treats a
/// missing axis as "this component does not vote here".
///
/// Weights are separate per aggregation so one part can dominate the item's
/// position while another dominates its matching distance. All weights default
/// to `1.0` and must be nonnegative.
#[derive(Clone, PartialEq)]
pub struct Component {
    name: String,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    rx: Option<f64>,
    ry: Option<f64>,
    rz: Option<f64>,
    status: Visibility,
    dist_weight: f64,
    bary_weight: f64,
    speed_weight: f64,
    speed: Option<f64>,
    parents: BTreeSet<String>,
}

impl Component {
    /// Creates a component with no pose data, unit weights and
    /// [`Visibility::OnSight`] status.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            x: None,
            y: None,
            z: None,
            rx: None,
            ry: None,
            rz: None,
            status: Visibility::OnSight,
            dist_weight: 1.0,
            bary_weight: 1.0,
            speed_weight: 1.0,
            speed: None,
            parents: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn x(&self) -> Option<f64> {
        self.x
    }

    pub fn y(&self) -> Option<f64> {
        self.y
    }

    pub fn z(&self) -> Option<f64> {
        self.z
    }

    pub fn rx(&self) -> Option<f64> {
        self.rx
    }

    pub fn ry(&self) -> Option<f64> {
        self.ry
    }

    pub fn rz(&self) -> Option<f64> {
        self.rz
    }

    pub fn status(&self) -> Visibility {
        self.status
    }

    pub fn dist_weight(&self) -> f64 {
        self.dist_weight
    }

    pub fn bary_weight(&self) -> f64 {
        self.bary_weight
    }

    pub fn speed_weight(&self) -> f64 {
        self.speed_weight
    }

    /// Finite-difference speed computed by the last identity merge, if any.
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    /// Parent component names registered on this component.
    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    /// The full position as a vector, or `None` while any axis is missing.
    pub fn position(&self) -> Option<Vector3<f64>> {
        match (self.x, self.y, self.z) {
            (Some(x), Some(y), Some(z)) => Some(Vector3::new(x, y, z)),
            _ => None,
        }
    }

    /// Applies a partial update, writing only the supplied fields.
    ///
    /// Parent names are merged in, never removed. Calling this twice with the
    /// same update leaves the component unchanged after the first call.
    pub fn update(&mut self, update: &ComponentUpdate) {
        if let Some(x) = update.x {
            self.x = Some(x);
        }
        if let Some(y) = update.y {
            self.y = Some(y);
        }
        if let Some(z) = update.z {
            self.z = Some(z);
        }
        if let Some(rx) = update.rx {
            self.rx = Some(rx);
        }
        if let Some(ry) = update.ry {
            self.ry = Some(ry);
        }
        if let Some(rz) = update.rz {
            self.rz = Some(rz);
        }
        if let Some(weight) = update.dist_weight {
            debug_assert!(weight >= 0.0, "dist weight must be nonnegative, got {weight}");
            self.dist_weight = weight;
        }
        if let Some(weight) = update.bary_weight {
            debug_assert!(weight >= 0.0, "bary weight must be nonnegative, got {weight}");
            self.bary_weight = weight;
        }
        if let Some(weight) = update.speed_weight {
            debug_assert!(
                weight >= 0.0,
                "speed weight must be nonnegative, got {weight}"
            );
            self.speed_weight = weight;
        }
        self.parents.extend(update.parents.iter().cloned());
    }

    /// Euclidean distance between the two components' positions.
    ///
    /// # Returns
    ///
    /// `None` when either position is incomplete; such a pair contributes
    /// nothing, not a zero, to any distance average built on top of this.
    pub fn distance_to(&self, other: &Component) -> Option<f64> {
        let a = self.position()?;
        let b = other.position()?;
        Some((a - b).norm())
    }

    pub(crate) fn set_status(&mut self, status: Visibility) {
        self.status = status;
    }

    pub(crate) fn set_speed(&mut self, speed: Option<f64>) {
        self.speed = speed;
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Component {{ name: {:?}, position: ({:?}, {:?}, {:?}), status: {:?}, speed: {:?} }}",
            self.name, self.x, self.y, self.z, self.status, self.speed
        )
    }
}
