//! Sonic Visualiser layer (SVL) export.
//!
//! Voiced pitch frames become a sparse time-value layer of `<point>` elements;
//! notes become a region layer of `<segment>` elements with durations in
//! samples.

use crate::core::types::{Note, PitchTrack};

/// Exports voiced pitch frames as an SVL time-value layer.
pub fn pitch_to_svl(track: &PitchTrack, sample_rate: u32) -> String {
    let sr = sample_rate as f64;
    let mut body = String::new();
    for frame in track.frames.iter().filter(|f| f.has_pitch) {
        let sample_frame = (frame.timestamp * sr).round() as u64;
        body.push_str(&format!(
            "      <point frame=\"{}\" value=\"{:.3}\" label=\"p\"/>\n",
            sample_frame, frame.frequency
        ));
    }
    document(sample_rate, "sparse", 2, "timevalues", &body)
}

/// Exports notes as an SVL region layer.
pub fn notes_to_svl(notes: &[Note], sample_rate: u32) -> String {
    let sr = sample_rate as f64;
    let mut body = String::new();
    for note in notes {
        let start = (note.start * sr).round() as u64;
        let duration = (note.duration() * sr).round() as u64;
        body.push_str(&format!(
            "      <segment frame=\"{}\" duration=\"{}\" value=\"{:.3}\"/>\n",
            start, duration, note.pitch
        ));
    }
    document(sample_rate, "sparse", 3, "regions", &body)
}

fn document(
    sample_rate: u32,
    model_type: &str,
    dimensions: u32,
    subtype: &str,
    body: &str,
) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE sonic-visualiser>\n\
         <sv>\n\
         \x20 <data>\n\
         \x20   <model id=\"1\" name=\"\" sampleRate=\"{sample_rate}\" type=\"{model_type}\" \
         dimensions=\"{dimensions}\" resolution=\"1\" notifyOnAdd=\"true\" dataset=\"0\" \
         subtype=\"{subtype}\"/>\n\
         \x20   <dataset id=\"0\" dimensions=\"{dimensions}\">\n\
         {body}\
         \x20   </dataset>\n\
         \x20 </data>\n\
         </sv>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PitchFrame;

    #[test]
    fn test_pitch_layer_contains_voiced_points_only() {
        let track = PitchTrack {
            frames: vec![
                PitchFrame {
                    timestamp: 0.5,
                    frequency: 220.0,
                    probability: 0.9,
                    has_pitch: true,
                    candidates: vec![],
                },
                PitchFrame {
                    timestamp: 0.6,
                    frequency: 0.0,
                    probability: 0.9,
                    has_pitch: false,
                    candidates: vec![],
                },
            ],
        };
        let svl = pitch_to_svl(&track, 44100);
        // frame index = round(0.5 * 44100) = 22050
        assert!(svl.contains("<point frame=\"22050\" value=\"220.000\" label=\"p\"/>"));
        assert_eq!(svl.matches("<point").count(), 1);
        assert!(svl.contains("sampleRate=\"44100\""));
        assert!(svl.starts_with("<?xml version=\"1.0\""));
    }

    #[test]
    fn test_note_layer_segments_in_samples() {
        let notes = vec![Note {
            id: 1,
            start: 1.0,
            end: 1.5,
            pitch: 440.0,
            state: None,
        }];
        let svl = notes_to_svl(&notes, 44100);
        assert!(svl.contains("<segment frame=\"44100\" duration=\"22050\" value=\"440.000\"/>"));
        assert!(svl.contains("subtype=\"regions\""));
    }

    #[test]
    fn test_empty_inputs_produce_valid_documents() {
        let svl = pitch_to_svl(&PitchTrack::default(), 48000);
        assert!(svl.contains("<dataset id=\"0\""));
        let svl = notes_to_svl(&[], 48000);
        assert!(svl.contains("</sv>"));
    }
}
