//! Project-file persistence.
//!
//! A project is a JSON document carrying the full pitch trajectory (with
//! candidate lists), the note segments, view state, and analysis settings.
//! Optional fields are tolerated on import and emitted in canonical form on
//! export, so a parse/serialize round trip is byte-stable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::pyin;
use crate::core::types::{HistorySnapshot, Note, PitchTrack};
use crate::error::RetuneError;

/// Project format version written on export.
pub const PROJECT_VERSION: &str = "1.2";

/// Persisted viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    /// Zoom in pixels per second.
    pub zoom: f64,
    /// Left edge of the viewport in seconds.
    pub view_start: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 100.0,
            view_start: 0.0,
        }
    }
}

/// Persisted analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSettings {
    pub threshold: f64,
    pub rms_threshold: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            threshold: pyin::DEFAULT_THRESHOLD,
            rms_threshold: pyin::DEFAULT_RMS_THRESHOLD,
        }
    }
}

/// The serialized project document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: String,
    /// Name of the audio file this project was analyzed from.
    pub file_name: String,
    pub sample_rate: u32,
    pub pitch_data: PitchTrack,
    pub notes: Vec<Note>,
    #[serde(default)]
    pub view_state: ViewState,
    #[serde(default)]
    pub settings: AnalysisSettings,
}

impl ProjectFile {
    /// Builds a project document from the current snapshot.
    pub fn new(
        file_name: &str,
        sample_rate: u32,
        snapshot: &HistorySnapshot,
        view_state: ViewState,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            file_name: file_name.to_string(),
            sample_rate,
            pitch_data: snapshot.pitch_track.clone(),
            notes: snapshot.notes.clone(),
            view_state,
            settings,
        }
    }

    /// Serializes to canonical JSON.
    pub fn to_json(&self) -> Result<String, RetuneError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RetuneError::InvalidProjectFile(format!("serialize: {e}")))
    }

    /// Parses a project document, accepting any 1.x version.
    pub fn from_json(json: &str) -> Result<Self, RetuneError> {
        let project: ProjectFile = serde_json::from_str(json)
            .map_err(|e| RetuneError::InvalidProjectFile(format!("parse: {e}")))?;
        if !project.version.starts_with("1.") {
            return Err(RetuneError::InvalidProjectFile(format!(
                "unsupported version {}",
                project.version
            )));
        }
        Ok(project)
    }

    /// Writes the project to disk as JSON.
    pub fn write(&self, path: &Path) -> Result<(), RetuneError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Reads a project from disk.
    pub fn read(path: &Path) -> Result<Self, RetuneError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// True when `file_name` refers to the audio this project was built from.
    ///
    /// A mismatch means the caller should hold the project pending and ask
    /// the user to relocate the audio; no state is mutated until then.
    pub fn matches_audio(&self, file_name: &str) -> bool {
        self.file_name == file_name
    }

    /// Extracts the editing snapshot this project carries.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            pitch_track: self.pitch_data.clone(),
            notes: self.notes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PitchCandidate, PitchFrame};

    fn sample_project() -> ProjectFile {
        let frames = vec![
            PitchFrame {
                timestamp: 0.0,
                frequency: 220.0,
                probability: 0.95,
                has_pitch: true,
                candidates: vec![PitchCandidate {
                    frequency: 220.0,
                    probability: 0.95,
                    yin_dip: 0.05,
                }],
            },
            PitchFrame {
                timestamp: 512.0 / 44100.0,
                frequency: 0.0,
                probability: 0.9,
                has_pitch: false,
                candidates: vec![],
            },
        ];
        let snapshot = HistorySnapshot {
            pitch_track: PitchTrack { frames },
            notes: vec![Note {
                id: 1,
                start: 0.0,
                end: 0.5,
                pitch: 220.0,
                state: None,
            }],
        };
        ProjectFile::new(
            "take3.wav",
            44100,
            &snapshot,
            ViewState::default(),
            AnalysisSettings::default(),
        )
    }

    #[test]
    fn test_round_trip_is_byte_stable() {
        let project = sample_project();
        let json = project.to_json().unwrap();
        let parsed = ProjectFile::from_json(&json).unwrap();
        let json2 = parsed.to_json().unwrap();
        assert_eq!(json, json2);
    }

    #[test]
    fn test_version_written() {
        let project = sample_project();
        assert_eq!(project.version, "1.2");
        let json = project.to_json().unwrap();
        assert!(json.contains("\"version\": \"1.2\""));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut project = sample_project();
        project.version = "2.0".to_string();
        let json = project.to_json().unwrap();
        assert!(matches!(
            ProjectFile::from_json(&json),
            Err(RetuneError::InvalidProjectFile(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            ProjectFile::from_json("not json"),
            Err(RetuneError::InvalidProjectFile(_))
        ));
    }

    #[test]
    fn test_missing_optional_fields_tolerated() {
        // No viewState, no settings, no candidates on the frame, no note state
        let json = r#"{
            "version": "1.2",
            "fileName": "a.wav",
            "sampleRate": 44100,
            "pitchData": [
                {"timestamp": 0.0, "frequency": 220.0, "probability": 0.9, "hasPitch": true}
            ],
            "notes": [{"id": 1, "start": 0.0, "end": 0.5, "pitch": 220.0}]
        }"#;
        let project = ProjectFile::from_json(json).unwrap();
        assert_eq!(project.view_state, ViewState::default());
        assert_eq!(project.settings, AnalysisSettings::default());
        assert!(project.pitch_data.frames[0].candidates.is_empty());
        assert!(project.notes[0].state.is_none());
    }

    #[test]
    fn test_matches_audio() {
        let project = sample_project();
        assert!(project.matches_audio("take3.wav"));
        assert!(!project.matches_audio("other.wav"));
    }

    #[test]
    fn test_snapshot_extraction() {
        let project = sample_project();
        let snapshot = project.snapshot();
        assert_eq!(snapshot.pitch_track.len(), 2);
        assert_eq!(snapshot.notes.len(), 1);
    }
}
