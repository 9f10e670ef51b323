use std::fmt;
use std::mem;
use std::time::Instant;

use nalgebra::DMatrix;

use crate::component::Visibility;
use crate::item::{Item, ItemState};
use crate::matching::{distance_matrix, greedy_match};

/// Injected monotonic clock, in seconds.
///
/// The tracker samples it exactly once per cycle, so substituting a fake
/// clock makes every lifecycle decision deterministic under test.
pub type TimeSource = Box<dyn FnMut() -> f64>;

/// Multi-part item tracker.
///
/// Observations are [`submit`]ted between cycles; each [`run_cycle`] matches
/// the buffered batch against the current tracks with a greedy nearest-first
/// assignment, carries identities onto the matches and applies the lifecycle
/// rules (confirmation dwell for fresh tracks, ghost grace for missed ones).
/// Identities are `usize` values handed out from 1 upward and never reused.
///
/// [`submit`]: Tracker::submit
/// [`run_cycle`]: Tracker::run_cycle
///
/// # Example
///
/// ```
/// use itemtrack_rs::{ComponentUpdate, Item, Tracker};
///
/// let mut tracker = Tracker::new(1.0, 1.0, 1.0);
///
/// let mut observation = Item::new();
/// observation.set_component("body", &ComponentUpdate::position(0.0, 0.0, 0.0));
/// tracker.submit(observation);
///
/// let tracked = tracker.run_cycle();
/// assert_eq!(tracked.len(), 1);
/// assert_eq!(tracked[0].id(), Some(1));
/// ```
pub struct Tracker {
    match_threshold: f64,
    confirm_dwell: f64,
    ghost_grace: f64,
    clock: TimeSource,
    tracked: Vec<Item>,
    pending: Vec<Item>,
    distance: DMatrix<f64>,
    track_id_count: usize,
}

impl Tracker {
    /// Creates a tracker with the wall clock as time source.
    ///
    /// # Arguments
    ///
    /// * `match_threshold` - largest item distance that still matches
    /// * `confirm_dwell` - seconds a new track must persist before it is
    ///   confirmed
    /// * `ghost_grace` - seconds a missed confirmed track is kept as a ghost
    pub fn new(match_threshold: f64, confirm_dwell: f64, ghost_grace: f64) -> Self {
        debug_assert!(match_threshold > 0.0, "match threshold must be positive");
        debug_assert!(confirm_dwell >= 0.0, "confirmation dwell must be nonnegative");
        debug_assert!(ghost_grace >= 0.0, "ghost grace must be nonnegative");

        let epoch = Instant::now();
        Self {
            match_threshold,
            confirm_dwell,
            ghost_grace,
            clock: Box::new(move || epoch.elapsed().as_secs_f64()),
            tracked: Vec::new(),
            pending: Vec::new(),
            distance: DMatrix::from_element(0, 0, f64::INFINITY),
            track_id_count: 0,
        }
    }

    /// Replaces the clock. Useful for tests and offline replay.
    pub fn with_time_source(mut self, time_source: TimeSource) -> Self {
        self.clock = time_source;
        self
    }

    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    pub fn confirm_dwell(&self) -> f64 {
        self.confirm_dwell
    }

    pub fn ghost_grace(&self) -> f64 {
        self.ghost_grace
    }

    /// Items carried by the tracker after the last cycle, observations first
    /// in submission order, surviving ghosts after them.
    pub fn tracked_items(&self) -> &[Item] {
        &self.tracked
    }

    /// Distance matrix of the last cycle, one row per observation and one
    /// column per previously tracked item.
    pub fn last_distance_matrix(&self) -> &DMatrix<f64> {
        &self.distance
    }

    /// Buffers an observation for the next cycle.
    pub fn submit(&mut self, observation: Item) {
        self.pending.push(observation);
    }

    /// Runs one tracking cycle over the buffered observations and returns the
    /// resulting track list.
    ///
    /// The cycle never aborts on degraded input. Items whose aggregate cannot
    /// be computed are logged and carried through; they simply cannot match
    /// anything and fall out through the ordinary lifecycle rules.
    pub fn run_cycle(&mut self) -> &[Item] {
        let now = (self.clock)();

        for observation in &mut self.pending {
            if let Err(err) = observation.compute_barycenter() {
                log::warn!("observation enters cycle without aggregate position: {err}");
            }
        }

        let previous = mem::take(&mut self.tracked);
        let mut next = mem::take(&mut self.pending);

        self.distance = distance_matrix(&next, &previous);
        let assignment = greedy_match(&self.distance, self.match_threshold);

        // Unclaimed observations open fresh tracks.
        for &observation in &assignment.unmatched_observations {
            self.track_id_count += 1;
            let item = &mut next[observation];
            item.assign_id(self.track_id_count);
            item.set_last_seen(now);
            item.set_state(ItemState::New);
        }

        // Matched observations inherit the predecessor's identity and advance
        // its lifecycle.
        for &(observation, track) in &assignment.matches {
            let old = &previous[track];
            let fresh = &mut next[observation];
            match old.state() {
                ItemState::New => {
                    if now - old.last_seen() >= self.confirm_dwell {
                        fresh.set_state(ItemState::Confirmed);
                        fresh.set_last_seen(now);
                    } else {
                        // Still on probation. Keep the first-seen timestamp so
                        // the dwell clock keeps running.
                        fresh.set_last_seen(old.last_seen());
                    }
                }
                ItemState::Confirmed | ItemState::Ghost => {
                    fresh.set_state(ItemState::Confirmed);
                    fresh.set_last_seen(now);
                }
            }
            fresh.merge_from(old);
            if let Err(err) = fresh.compute_speed() {
                log::warn!("aggregate speed left unset for item {:?}: {err}", fresh.id());
            }
        }

        // Lifecycle for tracks nobody claimed.
        let mut missed = vec![false; previous.len()];
        for &track in &assignment.unmatched_tracked {
            missed[track] = true;
        }
        let mut ghosted = 0usize;
        let mut dropped = 0usize;
        for (track, mut old) in previous.into_iter().enumerate() {
            if !missed[track] {
                continue;
            }
            match old.state() {
                ItemState::New => {
                    // A single miss kills an unconfirmed track.
                    dropped += 1;
                }
                ItemState::Confirmed => {
                    old.set_state(ItemState::Ghost);
                    old.set_status(Visibility::Unknown);
                    next.push(old);
                    ghosted += 1;
                }
                ItemState::Ghost => {
                    if now - old.last_seen() < self.ghost_grace {
                        next.push(old);
                    } else {
                        dropped += 1;
                    }
                }
            }
        }

        log::debug!(
            "cycle at {now:.3}: {} matched, {} opened, {} ghosted, {} dropped, {} tracked",
            assignment.matches.len(),
            assignment.unmatched_observations.len(),
            ghosted,
            dropped,
            next.len(),
        );

        self.tracked = next;
        &self.tracked
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tracker {{ match_threshold: {}, confirm_dwell: {}, ghost_grace: {}, tracked: {}, pending: {}, next_id: {} }}",
            self.match_threshold,
            self.confirm_dwell,
            self.ghost_grace,
            self.tracked.len(),
            self.pending.len(),
            self.track_id_count + 1,
        )
    }
}
