//! Build watcher.
//!
//! Runs in the supervising process only. Source changes under the
//! components tree are debounced into bursts; each burst runs the
//! configured build command once and reports the outcome.
//!
//! ```text
//! notify -> Debouncer -> run_build -> RebuildEvent::{Started, Finished}
//!                                             |
//!                                        Supervisor
//! ```

mod build;
mod debouncer;
mod error;

pub use build::{BuildCommand, BuildWatcher, BuildWatcherBuilder, RebuildEvent, run_build};
pub use debouncer::Debouncer;
pub use error::WatchError;
