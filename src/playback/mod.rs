pub mod graph;
pub mod output;
pub mod scheduler;
pub mod stretch;

pub use output::{AudioOutput, SharedScheduler};
pub use scheduler::{PlaybackOptions, PlaybackScheduler};
