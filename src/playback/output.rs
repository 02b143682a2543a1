//! Audio-device coupling for the playback scheduler.
//!
//! A feeder thread renders scheduler blocks into a ring buffer; the cpal
//! output callback drains it. The device stream is the only place the audio
//! context is touched.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::error::RetuneError;
use crate::playback::scheduler::PlaybackScheduler;

/// Scheduler handle shared between the interactive domain and the feeder.
pub type SharedScheduler = Arc<Mutex<PlaybackScheduler>>;

/// Render block size in samples.
const CHUNK_SAMPLES: usize = 1024;
/// Ring buffer capacity: ~2 seconds of mono audio at 44100 Hz.
const RING_BUFFER_SIZE: usize = 44100 * 2;

/// A running output stream. Dropping it stops the feeder and closes the
/// stream.
pub struct AudioOutput {
    _stream: Stream,
    feeder_active: Arc<AtomicBool>,
    feeder: Option<thread::JoinHandle<()>>,
    /// Sample rate the device runs at; the scheduler must render at this rate.
    pub sample_rate: u32,
}

impl AudioOutput {
    /// Opens the default output device and starts feeding it from
    /// `scheduler`.
    ///
    /// A failed start leaves the scheduler stopped and surfaces
    /// [`RetuneError::PlaybackFailed`]. A stream that reports itself paused is
    /// resumed once before giving up.
    pub fn start(scheduler: SharedScheduler) -> Result<Self, RetuneError> {
        match Self::open(&scheduler) {
            Ok(output) => Ok(output),
            Err(err) => {
                scheduler
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .stop();
                Err(err)
            }
        }
    }

    fn open(scheduler: &SharedScheduler) -> Result<Self, RetuneError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| RetuneError::PlaybackFailed("no output device".to_string()))?;

        let default_config = device
            .default_output_config()
            .map_err(|e| RetuneError::PlaybackFailed(format!("output config: {e}")))?;
        let sample_rate = default_config.sample_rate().0;
        let config = StreamConfig {
            channels: 2,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let rb = HeapRb::<f32>::new(RING_BUFFER_SIZE);
        let (mut producer, mut consumer) = rb.split();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Mono render duplicated to both channels; underruns are
                    // silence.
                    for frame in data.chunks_mut(2) {
                        let s = consumer.try_pop().unwrap_or(0.0);
                        for slot in frame {
                            *slot = s;
                        }
                    }
                },
                move |err| {
                    log::error!("audio output error: {err}");
                },
                None,
            )
            .map_err(|e| RetuneError::PlaybackFailed(format!("build stream: {e}")))?;

        if let Err(first) = stream.play() {
            // The stream may have come up suspended; try to resume once.
            log::warn!("output stream suspended, retrying: {first}");
            stream
                .play()
                .map_err(|e| RetuneError::PlaybackFailed(format!("start stream: {e}")))?;
        }

        let feeder_active = Arc::new(AtomicBool::new(true));
        let active = Arc::clone(&feeder_active);
        let shared = Arc::clone(scheduler);
        let feeder = thread::spawn(move || {
            let mut block = vec![0.0f32; CHUNK_SAMPLES];
            while active.load(Ordering::Relaxed) {
                if producer.vacant_len() < CHUNK_SAMPLES {
                    thread::sleep(Duration::from_millis(2));
                    continue;
                }
                {
                    let mut sched = shared.lock().unwrap_or_else(|p| p.into_inner());
                    sched.render(&mut block);
                }
                let mut offset = 0;
                while offset < block.len() && active.load(Ordering::Relaxed) {
                    let pushed = producer.push_slice(&block[offset..]);
                    if pushed == 0 {
                        thread::sleep(Duration::from_millis(1));
                    }
                    offset += pushed;
                }
            }
        });

        Ok(Self {
            _stream: stream,
            feeder_active,
            feeder: Some(feeder),
            sample_rate,
        })
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.feeder_active.store(false, Ordering::Relaxed);
        if let Some(handle) = self.feeder.take() {
            let _ = handle.join();
        }
    }
}
