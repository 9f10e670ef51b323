use std::cell::Cell;
use std::rc::Rc;

use itemtrack_rs::{
    ComponentUpdate, Item, ItemState, TimeSource, Tracker, Visibility,
};
use nearly_eq::assert_nearly_eq;

/// Clock the tests drive by hand. The tracker reads it once per cycle.
fn manual_clock() -> (Rc<Cell<f64>>, TimeSource) {
    let cell = Rc::new(Cell::new(0.0));
    let handle = Rc::clone(&cell);
    (cell, Box::new(move || handle.get()))
}

fn single(x: f64) -> Item {
    Item::single("body", &ComponentUpdate::position(x, 0.0, 0.0))
}

const OFFSETS: [(&str, [f64; 3]); 5] = [
    ("core", [0.0, 0.0, 0.0]),
    ("north", [0.0, 1.0, 0.0]),
    ("east", [1.0, 0.0, 0.0]),
    ("up", [0.0, 0.0, 1.0]),
    ("corner", [1.0, 1.0, 0.0]),
];

/// A rigid five-component body anchored at `base_x` on the x axis.
fn five_part(base_x: f64) -> Item {
    let mut item = Item::new();
    for (name, [dx, dy, dz]) in OFFSETS {
        item.set_component(name, &ComponentUpdate::position(base_x + dx, dy, dz));
    }
    item
}

fn find(items: &[Item], id: usize) -> Item {
    items
        .iter()
        .find(|item| item.id() == Some(id))
        .cloned()
        .unwrap_or_else(|| panic!("no tracked item with id {id}"))
}

// =============================================================================
// Two rigid bodies drifting in parallel
// =============================================================================

#[test]
fn test_two_items_keep_their_identities_while_drifting() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(2.0, 1.0, 1.0).with_time_source(source);

    for cycle in 0..3 {
        clock.set(cycle as f64);
        let shift = 0.5 * cycle as f64;
        tracker.submit(five_part(shift));
        tracker.submit(five_part(50.0 + shift));
        tracker.run_cycle();
    }
    let tracked = tracker.tracked_items();
    assert_eq!(tracked.len(), 2);

    let first = find(tracked, 1);
    let second = find(tracked, 2);
    assert_eq!(first.state(), ItemState::Confirmed);
    assert_eq!(second.state(), ItemState::Confirmed);

    // Identities follow the bodies, not the submission slots.
    assert!(first.position().unwrap().x < second.position().unwrap().x);
    assert_nearly_eq!(first.position().unwrap().x, 1.0 + 0.4);
    assert_nearly_eq!(first.position().unwrap().y, 0.4);
    assert_nearly_eq!(first.position().unwrap().z, 0.2);

    // Every component moved 0.5 over one second.
    assert_nearly_eq!(first.speed().unwrap(), 0.5);
    assert_nearly_eq!(second.speed().unwrap(), 0.5);
    for component in first.components().values() {
        assert_nearly_eq!(component.speed().unwrap(), 0.5);
    }
}

// =============================================================================
// Single component, exact-threshold displacement
// =============================================================================

#[test]
fn test_displacement_at_the_threshold_still_matches_and_yields_speed() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(1.0, 1.0, 1.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(single(2.0));
    let tracked = tracker.run_cycle();
    assert_eq!(tracked[0].id(), Some(1));
    assert_eq!(tracked[0].state(), ItemState::New);
    assert_eq!(tracked[0].speed(), None);

    // The item moves by exactly the match threshold.
    clock.set(1.0);
    tracker.submit(single(3.0));
    let tracked = tracker.run_cycle();

    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id(), Some(1));
    assert_eq!(tracked[0].state(), ItemState::Confirmed);
    assert_nearly_eq!(tracked[0].speed().unwrap(), 1.0);
    assert_nearly_eq!(tracked[0].component("body").unwrap().speed().unwrap(), 1.0);
}

// =============================================================================
// Occlusion and ghost recovery
// =============================================================================

#[test]
fn test_occluded_item_returns_with_the_same_identity() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(1.0, 1.0, 5.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(single(0.0));
    tracker.run_cycle();

    clock.set(1.0);
    tracker.submit(single(0.1));
    let tracked = tracker.run_cycle();
    assert_eq!(tracked[0].state(), ItemState::Confirmed);

    // Nothing observed: the confirmed track goes ghost but stays tracked.
    clock.set(2.0);
    let tracked = tracker.run_cycle();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id(), Some(1));
    assert_eq!(tracked[0].state(), ItemState::Ghost);
    assert_eq!(tracked[0].status(), Visibility::Unknown);

    // The item reappears close to where the ghost last stood.
    clock.set(3.0);
    tracker.submit(single(0.2));
    let tracked = tracker.run_cycle();

    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id(), Some(1));
    assert_eq!(tracked[0].state(), ItemState::Confirmed);
    assert_eq!(tracked[0].status(), Visibility::OnSight);
    // 0.1 of displacement over the two seconds since the ghost was last seen.
    assert_nearly_eq!(tracked[0].speed().unwrap(), 0.05);
}

#[test]
fn test_ghost_survives_until_the_grace_period_elapses() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(1.0, 1.0, 3.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(single(0.0));
    tracker.run_cycle();
    clock.set(1.0);
    tracker.submit(single(0.0));
    tracker.run_cycle();

    clock.set(2.0);
    assert_eq!(tracker.run_cycle()[0].state(), ItemState::Ghost);

    // 2.9 seconds since last seen, still within the 3 second grace.
    clock.set(3.9);
    assert_eq!(tracker.run_cycle().len(), 1);

    // Exactly at the grace period the ghost is dropped.
    clock.set(4.0);
    assert!(tracker.run_cycle().is_empty());
}

// =============================================================================
// Track creation and identity hygiene
// =============================================================================

#[test]
fn test_unconfirmed_track_dies_on_a_single_miss_and_its_id_is_retired() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(1.0, 10.0, 10.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(single(0.0));
    assert_eq!(tracker.run_cycle()[0].id(), Some(1));

    clock.set(1.0);
    assert!(tracker.run_cycle().is_empty());

    // The same position reappears, but identity 1 is gone for good.
    clock.set(2.0);
    tracker.submit(single(0.0));
    let tracked = tracker.run_cycle();
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id(), Some(2));
    assert_eq!(tracked[0].state(), ItemState::New);
}

#[test]
fn test_items_without_shared_components_never_match() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(1e9, 1.0, 1.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(Item::single("head", &ComponentUpdate::position(0.0, 0.0, 0.0)));
    tracker.run_cycle();

    // Same position, different component name: unmatchable even with an
    // enormous threshold.
    clock.set(1.0);
    tracker.submit(Item::single("tail", &ComponentUpdate::position(0.0, 0.0, 0.0)));
    let tracked = tracker.run_cycle();

    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked[0].id(), Some(2));
    assert!(tracked[0].component("tail").is_some());
}

#[test]
fn test_surviving_ghosts_are_listed_after_the_observations() {
    let (clock, source) = manual_clock();
    let mut tracker = Tracker::new(0.5, 1.0, 10.0).with_time_source(source);

    clock.set(0.0);
    tracker.submit(single(0.0));
    tracker.run_cycle();
    clock.set(1.0);
    tracker.submit(single(0.0));
    tracker.run_cycle();

    // A distant newcomer cannot claim the old track.
    clock.set(2.0);
    tracker.submit(single(100.0));
    let tracked = tracker.run_cycle();

    assert_eq!(tracked.len(), 2);
    assert_eq!(tracked[0].id(), Some(2));
    assert_eq!(tracked[0].state(), ItemState::New);
    assert_eq!(tracked[1].id(), Some(1));
    assert_eq!(tracked[1].state(), ItemState::Ghost);
}
