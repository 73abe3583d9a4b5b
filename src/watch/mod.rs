//! Change detection and reload scheduling.
//!
//! Architecture:
//! ```text
//! ResourceStore (mtime) → ChangeTracker (code units) → reload now
//!                       → AssetTracker  (assets)     → fire now / settle → fire later
//! ```
//!
//! Both trackers only compare modification times: a resource changed when
//! its current timestamp is strictly greater than the last one seen. Missing
//! resources are skipped until they come back.

mod assets;
mod tracker;


pub use assets::{AssetTracker, Callback, Firing};
pub use tracker::ChangeTracker;
