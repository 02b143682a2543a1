//! Audio decoding via symphonia.
//!
//! The core analyzes one channel, so every input is downmixed to mono by
//! averaging channels per frame.

use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::core::types::AudioBuffer;
use crate::error::RetuneError;

/// Decoded mono audio.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono f32 samples.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl DecodedAudio {
    /// Converts into the analysis buffer type.
    pub fn into_buffer(self) -> AudioBuffer {
        AudioBuffer::new(self.samples, self.sample_rate)
    }
}

/// Decodes audio bytes to mono f32 samples.
///
/// `extension` is an optional format hint ("wav", "mp3", ...).
pub fn decode_bytes(bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio, RetuneError> {
    let mss = MediaSourceStream::new(
        Box::new(Cursor::new(bytes.to_vec())),
        Default::default(),
    );

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| RetuneError::DecodeFailed(format!("probe: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| RetuneError::DecodeFailed("no audio track".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| RetuneError::DecodeFailed("unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| RetuneError::DecodeFailed(format!("codec: {e}")))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(RetuneError::DecodeFailed(format!("read packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(RetuneError::DecodeFailed(format!("decode: {e}"))),
        };

        append_mono(&decoded, &mut samples);
    }

    let duration_secs = samples.len() as f64 / sample_rate as f64;
    Ok(DecodedAudio {
        samples,
        sample_rate,
        duration_secs,
    })
}

/// Decodes an audio file, hinting the container format from its extension.
pub fn decode_file(path: &Path) -> Result<DecodedAudio, RetuneError> {
    let bytes = std::fs::read(path)
        .map_err(|e| RetuneError::DecodeFailed(format!("open {}: {e}", path.display())))?;
    let ext = path.extension().and_then(|e| e.to_str());
    decode_bytes(&bytes, ext)
}

/// Downmixes one decoded packet to mono by averaging its channels.
fn append_mono(buf: &AudioBufferRef, out: &mut Vec<f32>) {
    match buf {
        AudioBufferRef::F32(b) => {
            let frames = b.frames();
            let chans = b.spec().channels.count();
            for f in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..chans {
                    sum += *b.chan(c).get(f).unwrap_or(&0.0);
                }
                out.push(sum / chans as f32);
            }
        }
        AudioBufferRef::S16(b) => {
            let frames = b.frames();
            let chans = b.spec().channels.count();
            for f in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..chans {
                    sum += *b.chan(c).get(f).unwrap_or(&0) as f32 / 32768.0;
                }
                out.push(sum / chans as f32);
            }
        }
        AudioBufferRef::S32(b) => {
            let frames = b.frames();
            let chans = b.spec().channels.count();
            for f in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..chans {
                    sum += *b.chan(c).get(f).unwrap_or(&0) as f32 / 2_147_483_648.0;
                }
                out.push(sum / chans as f32);
            }
        }
        AudioBufferRef::U8(b) => {
            let frames = b.frames();
            let chans = b.spec().channels.count();
            for f in 0..frames {
                let mut sum = 0.0f32;
                for c in 0..chans {
                    sum += (*b.chan(c).get(f).unwrap_or(&128) as f32 - 128.0) / 128.0;
                }
                out.push(sum / chans as f32);
            }
        }
        _ => {
            log::warn!("unsupported sample format, skipping packet");
        }
    }
}
