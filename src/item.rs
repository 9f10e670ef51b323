use std::collections::BTreeMap;
use std::fmt;

use nalgebra::Vector3;

use crate::component::{Component, ComponentUpdate, Visibility};
use crate::error::TrackError;

/// Lifecycle state of a tracked item.
///
/// Driven exclusively by [`Tracker::run_cycle`]: a `New` track is confirmed
/// after staying matched for the dwell time and removed on its first miss;
/// a `Confirmed` track that goes unmatched turns `Ghost`; a `Ghost` is
/// confirmed again on rematch or removed once the grace period runs out.
///
/// [`Tracker::run_cycle`]: crate::tracker::Tracker::run_cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Freshly created, not yet matched long enough to be trusted.
    New,
    /// Continuously re-observed for at least the confirmation dwell time.
    Confirmed,
    /// Confirmed item that went unobserved, kept alive for the grace period.
    Ghost,
}

/// How an item's geometry is described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// A mapping of named components. The only representation the
    /// aggregation operations support.
    Components,
    /// A raw point cloud. Recognized so callers can submit such items, but
    /// every aggregation returns [`TrackError::UnsupportedRepresentation`].
    PointCloud,
}

/// A multi-part entity assembled from named [`Component`]s.
///
/// An item is both an observation (as submitted to the tracker, without an
/// identity) and a track (as returned from a cycle, with an identity and a
/// lifecycle state). The aggregate pose fields (`position`, orientation,
/// `speed`) are plain caches over the component mapping and are only as fresh
/// as the last `compute_*` call.
#[derive(Clone, PartialEq)]
pub struct Item {
    id: Option<usize>,
    last_seen: f64,
    state: ItemState,
    representation: Representation,
    components: BTreeMap<String, Component>,
    position: Option<Vector3<f64>>,
    rx: Option<f64>,
    ry: Option<f64>,
    rz: Option<f64>,
    speed: Option<f64>,
    status: Visibility,
}

impl Item {
    /// Creates an empty component-built item with no identity.
    pub fn new() -> Self {
        Self {
            id: None,
            last_seen: 0.0,
            state: ItemState::New,
            representation: Representation::Components,
            components: BTreeMap::new(),
            position: None,
            rx: None,
            ry: None,
            rz: None,
            speed: None,
            status: Visibility::OnSight,
        }
    }

    /// Shortcut for an entity with only one part.
    pub fn single(name: &str, update: &ComponentUpdate) -> Self {
        let mut item = Self::new();
        item.set_component(name, update);
        item
    }

    /// Switches the representation. Point-cloud items can be tracked but
    /// never aggregated or matched.
    pub fn with_representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    /// Track identity, `None` until the tracker adopts the item.
    pub fn id(&self) -> Option<usize> {
        self.id
    }

    /// Tracker clock value of the last cycle that observed this item, `0.0`
    /// before the first cycle.
    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn state(&self) -> ItemState {
        self.state
    }

    pub fn representation(&self) -> Representation {
        self.representation
    }

    /// Whether the item as a whole was present in the last observation batch.
    pub fn status(&self) -> Visibility {
        self.status
    }

    /// Aggregate position from the last [`Item::compute_barycenter`] call.
    pub fn position(&self) -> Option<Vector3<f64>> {
        self.position
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

    /// Aggregate speed from the last [`Item::compute_speed`] call.
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    pub fn components(&self) -> &BTreeMap<String, Component> {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Number of components present in the current observation.
    pub fn visible_count(&self) -> usize {
        self.on_sight().count()
    }

    /// Creates or updates the named component with a partial observation.
    pub fn set_component(&mut self, name: &str, update: &ComponentUpdate) {
        self.components
            .entry(name.to_string())
            .or_insert_with(|| Component::new(name))
            .update(update);
    }

    /// Recomputes the aggregate position as the weighted barycenter of every
    /// visible component with a complete position.
    ///
    /// A component that is [`Visibility::Unknown`] or has a missing axis is
    /// skipped entirely, its weight included. When the qualifying weight sum
    /// is zero the aggregate degenerates to the coordinate origin.
    pub fn compute_barycenter(&mut self) -> Result<(), TrackError> {
        if self.representation == Representation::PointCloud {
            return Err(TrackError::UnsupportedRepresentation(
                "compute_barycenter".to_string(),
            ));
        }

        let mut accum = Vector3::zeros();
        let mut total = 0.0;
        for component in self.on_sight() {
            if let Some(position) = component.position() {
                accum += position * component.bary_weight();
                total += component.bary_weight();
            }
        }
        self.position = Some(if total > 0.0 { accum / total } else { accum });
        Ok(())
    }

    /// Recomputes the aggregate orientation as the per-axis circular mean of
    /// every visible component's angles.
    ///
    /// Each axis is averaged independently over the components that supply
    /// it, by summing unit vectors and taking `atan2`, so angles straddling
    /// the ±π seam average correctly. An axis no visible component supplies
    /// becomes `None`.
    pub fn compute_orientation(&mut self) -> Result<(), TrackError> {
        if self.representation == Representation::PointCloud {
            return Err(TrackError::UnsupportedRepresentation(
                "compute_orientation".to_string(),
            ));
        }
        debug_assert!(
            self.on_sight().next().is_some(),
            "orientation of an item with no visible component is undefined"
        );

        let rx = circular_mean(self.on_sight().filter_map(Component::rx));
        let ry = circular_mean(self.on_sight().filter_map(Component::ry));
        let rz = circular_mean(self.on_sight().filter_map(Component::rz));
        self.rx = rx;
        self.ry = ry;
        self.rz = rz;
        Ok(())
    }

    /// Recomputes the aggregate speed as the weighted mean of every visible
    /// component's finite-difference speed.
    ///
    /// Components without a speed are skipped with their weight. When the
    /// qualifying weight sum is zero the aggregate speed becomes `None`
    /// rather than zero, so "unknown" is distinguishable from "at rest".
    pub fn compute_speed(&mut self) -> Result<(), TrackError> {
        if self.representation == Representation::PointCloud {
            return Err(TrackError::UnsupportedRepresentation(
                "compute_speed".to_string(),
            ));
        }

        let mut accum = 0.0;
        let mut total = 0.0;
        for component in self.on_sight() {
            if let Some(speed) = component.speed() {
                accum += speed * component.speed_weight();
                total += component.speed_weight();
            }
        }
        self.speed = if total > 0.0 { Some(accum / total) } else { None };
        Ok(())
    }

    /// Mean distance to `other` over the component names visible in both
    /// items, weighted by `self`'s distance weights.
    ///
    /// Pairs where either position is incomplete are skipped together with
    /// their weight. When no pair qualifies the items are incomparable and
    /// the unmatchable sentinel `f64::INFINITY` is returned, which no finite
    /// match threshold accepts. Point-cloud items share no named components,
    /// so they are unmatchable the same way.
    ///
    /// Asymmetric in general: the weights are taken from the receiver.
    pub fn distance_to(&self, other: &Item) -> f64 {
        let mut accum = 0.0;
        let mut total = 0.0;
        for (name, mine) in &self.components {
            if mine.status() != Visibility::OnSight {
                continue;
            }
            let theirs = match other.components.get(name) {
                Some(component) if component.status() == Visibility::OnSight => component,
                _ => continue,
            };
            if let Some(distance) = mine.distance_to(theirs) {
                accum += distance * mine.dist_weight();
                total += mine.dist_weight();
            }
        }
        if total > 0.0 {
            accum / total
        } else {
            f64::INFINITY
        }
    }

    /// Adopts `predecessor`'s identity and derives per-component speeds from
    /// the displacement since it was last seen.
    ///
    /// For every predecessor component also present here, the speed becomes
    /// `distance / elapsed` when the predecessor copy was visible, both
    /// positions are complete and the elapsed time is positive; otherwise the
    /// speed is cleared rather than left stale. Predecessor components absent
    /// from this item are carried over as [`Visibility::Unknown`] so a later
    /// observation can still match on them.
    ///
    /// The caller is expected to have set this item's `last_seen` to the
    /// current cycle time beforehand.
    pub fn merge_from(&mut self, predecessor: &Item) {
        self.id = predecessor.id;
        let elapsed = self.last_seen - predecessor.last_seen;
        for (name, old) in &predecessor.components {
            match self.components.get_mut(name) {
                Some(current) => {
                    let speed = match (old.status(), current.distance_to(old)) {
                        (Visibility::OnSight, Some(distance)) if elapsed > 0.0 => {
                            Some(distance / elapsed)
                        }
                        _ => None,
                    };
                    current.set_speed(speed);
                }
                None => {
                    let mut carried = old.clone();
                    carried.set_status(Visibility::Unknown);
                    self.components.insert(name.clone(), carried);
                }
            }
        }
    }

    pub(crate) fn assign_id(&mut self, id: usize) {
        debug_assert!(self.id.is_none(), "track identity is assigned exactly once");
        self.id = Some(id);
    }

    pub(crate) fn set_last_seen(&mut self, timestamp: f64) {
        self.last_seen = timestamp;
    }

    pub(crate) fn set_state(&mut self, state: ItemState) {
        self.state = state;
    }

    pub(crate) fn set_status(&mut self, status: Visibility) {
        self.status = status;
    }

    fn on_sight(&self) -> impl Iterator<Item = &Component> {
        self.components
            .values()
            .filter(|component| component.status() == Visibility::OnSight)
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Item {{ id: {:?}, state: {:?}, last_seen: {}, components: {}, position: {:?} }}",
            self.id,
            self.state,
            self.last_seen,
            self.components.len(),
            self.position.map(|p| (p.x, p.y, p.z)),
        )
    }
}

/// Mean of angles on the circle: sum the unit vectors, take the angle of the
/// resultant. `None` when the iterator is empty.
fn circular_mean(angles: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sin = 0.0;
    let mut cos = 0.0;
    let mut count = 0usize;
    for angle in angles {
        sin += angle.sin();
        cos += angle.cos();
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(sin.atan2(cos))
    }
}
