//! Tracking of multi-part items across observation batches.
//!
//! Items are assembled from named, partially observed components. Each
//! tracking cycle aggregates the submitted observations, matches them
//! against the current tracks with a greedy nearest-first assignment over a
//! component-wise distance, and applies lifecycle hysteresis: fresh tracks
//! must persist for a dwell time before they are trusted, and established
//! tracks survive occlusions as ghosts for a grace period.

pub mod component;
pub mod error;
pub mod item;
pub mod matching;
pub mod tracker;

pub use component::{Component, ComponentUpdate, Visibility};
pub use error::TrackError;
pub use item::{Item, ItemState, Representation};
pub use matching::{distance_matrix, greedy_match, Assignment};
pub use tracker::{TimeSource, Tracker};
