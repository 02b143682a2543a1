pub mod csv;
pub mod decode;
pub mod project;
pub mod svl;

pub use decode::{decode_bytes, decode_file, DecodedAudio};
pub use project::{AnalysisSettings, ProjectFile, ViewState, PROJECT_VERSION};
