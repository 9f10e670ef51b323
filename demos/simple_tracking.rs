//! Two single-component items moving apart on the x axis.
//!
//! Both items are re-identified every cycle even though they start only one
//! unit apart. Run with `RUST_LOG=debug` to watch the cycle telemetry.

use itemtrack_rs::{ComponentUpdate, Item, ItemState, Tracker};

fn main() {
    env_logger::init();

    // Simulated sensor clock, one batch every 100 ms.
    let mut now = -0.1;
    let mut tracker = Tracker::new(1.0, 1.0, 1.0).with_time_source(Box::new(move || {
        now += 0.1;
        now
    }));

    for step in 0..100 {
        let t = step as f64 * 0.1;
        for x in [2.0 + t, 1.0 - t] {
            tracker.submit(Item::single(
                "body",
                &ComponentUpdate::position(x, 0.0, 0.0).with_orientation(0.0, 0.0, 0.0),
            ));
        }

        for item in tracker.run_cycle() {
            let state = match item.state() {
                ItemState::New => "new",
                ItemState::Confirmed => "confirmed",
                ItemState::Ghost => "ghost",
            };
            println!(
                "t={t:.1} id={} state={state} x={:.2} speed={:.2}",
                item.id().unwrap_or(0),
                item.position().map(|p| p.x).unwrap_or(f64::NAN),
                item.speed().unwrap_or(f64::NAN),
            );
        }
    }
}
