//! Analysis modules.
//!
//! The simulated analysis run, its progress reporting, and statistics
//! over past analyses.

pub mod aggregator;
pub mod progress;
pub mod sequencer;

pub use aggregator::*;
#[allow(unused_imports)]
pub use progress::{BarReporter, NullReporter, ProgressReporter};
pub use sequencer::{Sequencer, SequencerConfig};
