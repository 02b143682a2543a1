//! CSV interchange for pitch trajectories and note tables.

use crate::core::types::{Note, PitchCandidate, PitchFrame, PitchTrack};
use crate::error::RetuneError;
use crate::notes::NoteIds;

const PITCH_HEADER: &str = "Time(s),Frequency(Hz),Probability";
const NOTES_HEADER: &str = "Onset(s),Duration(s),Pitch(Hz)";

/// Exports a pitch track as CSV.
pub fn pitch_to_csv(track: &PitchTrack) -> String {
    let mut out = String::with_capacity(32 * (track.len() + 1));
    out.push_str(PITCH_HEADER);
    out.push('\n');
    for frame in &track.frames {
        out.push_str(&format!(
            "{:.6},{:.3},{:.3}\n",
            frame.timestamp, frame.frequency, frame.probability
        ));
    }
    out
}

/// Imports a pitch track from CSV.
///
/// Frames arrive without candidate lists; a voiced row is given its chosen
/// pair as the single candidate so the selected-pair invariant holds.
pub fn pitch_from_csv(text: &str) -> Result<PitchTrack, RetuneError> {
    let mut frames: Vec<PitchFrame> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if index == 0 {
            if line != PITCH_HEADER {
                return Err(RetuneError::InvalidCsv {
                    line: 1,
                    reason: format!("expected header \"{}\"", PITCH_HEADER),
                });
            }
            continue;
        }

        let fields = split_fields(line, 3, index + 1)?;
        let timestamp = parse_field(fields[0], "time", index + 1)?;
        let frequency = parse_field(fields[1], "frequency", index + 1)?;
        let probability = parse_field(fields[2], "probability", index + 1)?;

        let has_pitch = frequency > 0.0;
        let candidates = if has_pitch {
            vec![PitchCandidate {
                frequency,
                probability,
                yin_dip: (1.0 - probability).max(0.0),
            }]
        } else {
            Vec::new()
        };
        frames.push(PitchFrame {
            timestamp,
            frequency,
            probability,
            has_pitch,
            candidates,
        });
    }
    frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    Ok(PitchTrack { frames })
}

/// Exports notes as CSV rows of onset, duration, and pitch.
pub fn notes_to_csv(notes: &[Note]) -> String {
    let mut out = String::with_capacity(32 * (notes.len() + 1));
    out.push_str(NOTES_HEADER);
    out.push('\n');
    for note in notes {
        out.push_str(&format!(
            "{:.6},{:.6},{:.3}\n",
            note.start,
            note.duration(),
            note.pitch
        ));
    }
    out
}

/// Imports notes from CSV, assigning fresh ids.
pub fn notes_from_csv(text: &str, ids: &mut NoteIds) -> Result<Vec<Note>, RetuneError> {
    let mut notes: Vec<Note> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if index == 0 {
            if line != NOTES_HEADER {
                return Err(RetuneError::InvalidCsv {
                    line: 1,
                    reason: format!("expected header \"{}\"", NOTES_HEADER),
                });
            }
            continue;
        }

        let fields = split_fields(line, 3, index + 1)?;
        let onset = parse_field(fields[0], "onset", index + 1)?;
        let duration = parse_field(fields[1], "duration", index + 1)?;
        let pitch = parse_field(fields[2], "pitch", index + 1)?;
        if duration <= 0.0 {
            return Err(RetuneError::InvalidCsv {
                line: index + 1,
                reason: "duration must be positive".to_string(),
            });
        }

        notes.push(Note {
            id: ids.fresh(),
            start: onset,
            end: onset + duration,
            pitch,
            state: None,
        });
    }
    notes.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(notes)
}

fn split_fields(line: &str, expected: usize, line_no: usize) -> Result<Vec<&str>, RetuneError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(RetuneError::InvalidCsv {
            line: line_no,
            reason: format!("expected {} fields, found {}", expected, fields.len()),
        });
    }
    Ok(fields)
}

fn parse_field(value: &str, name: &str, line_no: usize) -> Result<f64, RetuneError> {
    value.parse::<f64>().map_err(|_| RetuneError::InvalidCsv {
        line: line_no,
        reason: format!("bad {} value \"{}\"", name, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced_frame(t: f64, f: f64) -> PitchFrame {
        PitchFrame {
            timestamp: t,
            frequency: f,
            probability: 0.9,
            has_pitch: f > 0.0,
            candidates: vec![],
        }
    }

    #[test]
    fn test_pitch_export_format() {
        let track = PitchTrack {
            frames: vec![voiced_frame(0.011610, 220.5), voiced_frame(0.023220, 0.0)],
        };
        let csv = pitch_to_csv(&track);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "Time(s),Frequency(Hz),Probability");
        assert_eq!(lines.next().unwrap(), "0.011610,220.500,0.900");
        assert_eq!(lines.next().unwrap(), "0.023220,0.000,0.900");
    }

    #[test]
    fn test_pitch_round_trip() {
        let track = PitchTrack {
            frames: vec![voiced_frame(0.0, 220.0), voiced_frame(0.011610, 0.0)],
        };
        let parsed = pitch_from_csv(&pitch_to_csv(&track)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert!(parsed.frames[0].has_pitch);
        assert!(!parsed.frames[1].has_pitch);
        // Imported voiced frames carry their chosen pair as a candidate
        assert_eq!(parsed.frames[0].candidates.len(), 1);
        assert!(parsed.frames[1].candidates.is_empty());
    }

    #[test]
    fn test_pitch_bad_header() {
        let err = pitch_from_csv("Wrong,Header,Here\n1,2,3\n").unwrap_err();
        assert!(matches!(err, RetuneError::InvalidCsv { line: 1, .. }));
    }

    #[test]
    fn test_pitch_bad_row_reports_line() {
        let text = "Time(s),Frequency(Hz),Probability\n0.0,220.0,0.9\nnope,220.0,0.9\n";
        let err = pitch_from_csv(text).unwrap_err();
        assert!(matches!(err, RetuneError::InvalidCsv { line: 3, .. }));
    }

    #[test]
    fn test_pitch_tolerates_blank_lines() {
        let text = "Time(s),Frequency(Hz),Probability\n\n0.0,220.0,0.9\n\n";
        let parsed = pitch_from_csv(text).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_notes_export_format() {
        let notes = vec![Note {
            id: 1,
            start: 0.25,
            end: 0.75,
            pitch: 440.125,
            state: None,
        }];
        let csv = notes_to_csv(&notes);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "Onset(s),Duration(s),Pitch(Hz)");
        assert_eq!(lines.next().unwrap(), "0.250000,0.500000,440.125");
    }

    #[test]
    fn test_notes_round_trip_with_fresh_ids() {
        let notes = vec![
            Note {
                id: 10,
                start: 0.0,
                end: 0.5,
                pitch: 220.0,
                state: None,
            },
            Note {
                id: 11,
                start: 0.5,
                end: 1.0,
                pitch: 330.0,
                state: None,
            },
        ];
        let mut ids = NoteIds::new();
        let parsed = notes_from_csv(&notes_to_csv(&notes), &mut ids).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].id, 1);
        assert_eq!(parsed[1].id, 2);
        assert!((parsed[1].end - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_notes_rejects_nonpositive_duration() {
        let text = "Onset(s),Duration(s),Pitch(Hz)\n0.0,0.0,220.0\n";
        let err = notes_from_csv(text, &mut NoteIds::new()).unwrap_err();
        assert!(matches!(err, RetuneError::InvalidCsv { line: 2, .. }));
    }
}
