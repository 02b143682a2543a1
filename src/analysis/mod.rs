pub mod pyin;
pub mod spectrogram;
pub mod worker;
pub mod yin;

pub use pyin::{PyinEngine, PyinParams, SearchMode};
pub use spectrogram::CancelFlag;
pub use worker::{AnalysisEvent, AnalysisWorker, JobKind};
