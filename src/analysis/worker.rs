//! Background execution of analysis jobs.
//!
//! PyinEngine and SpectrogramEngine each run on their own worker thread, one
//! job at a time per kind, posting progress and results back to the
//! interactive domain over a channel. Every job is stamped with a per-kind
//! generation; starting a newer job of the same kind makes in-flight results
//! of the older one stale, and stale events are dropped at the boundary so a
//! result is applied only if no newer analysis of that kind has started.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::analysis::pyin::{PyinEngine, PyinParams};
use crate::analysis::spectrogram::{self, CancelFlag};
use crate::core::grid;
use crate::core::types::{PitchTrack, SpectrogramData};
use crate::error::RetuneError;

/// Which analysis pipeline a job or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Pitch,
    Spectrogram,
}

/// Messages posted from worker threads to the interactive domain.
#[derive(Debug)]
pub enum AnalysisEvent {
    /// Progress in [0, 1] for a running job.
    Progress {
        kind: JobKind,
        generation: u64,
        value: f32,
    },
    /// A finished pitch analysis (full or partial re-analysis, already merged).
    PitchReady {
        generation: u64,
        track: PitchTrack,
    },
    /// A finished spectrogram.
    SpectrogramReady {
        generation: u64,
        data: SpectrogramData,
    },
    /// The job failed; no partial result exists.
    Failed {
        kind: JobKind,
        generation: u64,
        error: RetuneError,
    },
}

impl AnalysisEvent {
    /// The generation this event was produced under.
    pub fn generation(&self) -> u64 {
        match self {
            AnalysisEvent::Progress { generation, .. }
            | AnalysisEvent::PitchReady { generation, .. }
            | AnalysisEvent::SpectrogramReady { generation, .. }
            | AnalysisEvent::Failed { generation, .. } => *generation,
        }
    }

    /// The pipeline this event belongs to.
    pub fn kind(&self) -> JobKind {
        match self {
            AnalysisEvent::Progress { kind, .. } | AnalysisEvent::Failed { kind, .. } => *kind,
            AnalysisEvent::PitchReady { .. } => JobKind::Pitch,
            AnalysisEvent::SpectrogramReady { .. } => JobKind::Spectrogram,
        }
    }
}

/// Dispatches analysis jobs to background threads and filters stale results.
pub struct AnalysisWorker {
    events_tx: Sender<AnalysisEvent>,
    pitch_generation: Arc<AtomicU64>,
    spectrogram_generation: Arc<AtomicU64>,
    spectrogram_cancel: Mutex<CancelFlag>,
}

impl AnalysisWorker {
    /// Creates a worker and the event receiver the interactive domain drains.
    pub fn new() -> (Self, Receiver<AnalysisEvent>) {
        let (tx, rx) = unbounded();
        (
            Self {
                events_tx: tx,
                pitch_generation: Arc::new(AtomicU64::new(0)),
                spectrogram_generation: Arc::new(AtomicU64::new(0)),
                spectrogram_cancel: Mutex::new(CancelFlag::new()),
            },
            rx,
        )
    }

    /// Starts a full pitch analysis. Returns the job generation.
    pub fn start_pitch(
        &self,
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
        params: PyinParams,
    ) -> u64 {
        let generation = self.pitch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.events_tx.clone();
        let current = Arc::clone(&self.pitch_generation);

        thread::spawn(move || {
            let engine = PyinEngine::new(params);
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut progress = |value: f32| {
                    let _ = tx.send(AnalysisEvent::Progress {
                        kind: JobKind::Pitch,
                        generation,
                        value,
                    });
                };
                engine.analyze(&samples, sample_rate, &mut progress)
            }));
            finish_pitch(&tx, &current, generation, result);
        });

        generation
    }

    /// Starts a deep partial re-analysis of `[t0, t1]`, merged into `existing`.
    ///
    /// The region bounds are snapped to the frame grid before use.
    pub fn start_reanalysis(
        &self,
        existing: PitchTrack,
        samples: Arc<Vec<f32>>,
        sample_rate: u32,
        t0: f64,
        t1: f64,
        params: PyinParams,
    ) -> u64 {
        let generation = self.pitch_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.events_tx.clone();
        let current = Arc::clone(&self.pitch_generation);
        let t0 = grid::snap_time(t0, sample_rate);
        let t1 = grid::snap_time(t1, sample_rate);

        thread::spawn(move || {
            let engine = PyinEngine::new(params);
            let result = catch_unwind(AssertUnwindSafe(|| {
                let mut progress = |value: f32| {
                    let _ = tx.send(AnalysisEvent::Progress {
                        kind: JobKind::Pitch,
                        generation,
                        value,
                    });
                };
                engine.reanalyze_region(&existing, &samples, sample_rate, t0, t1, &mut progress)
            }));
            finish_pitch(&tx, &current, generation, result);
        });

        generation
    }

    /// Starts a spectrogram computation, cancelling any in-flight one.
    pub fn start_spectrogram(&self, samples: Arc<Vec<f32>>) -> u64 {
        let generation = self.spectrogram_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.events_tx.clone();
        let current = Arc::clone(&self.spectrogram_generation);

        let cancel = CancelFlag::new();
        {
            let mut slot = self
                .spectrogram_cancel
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            slot.cancel();
            *slot = cancel.clone();
        }

        thread::spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| spectrogram::compute(&samples, &cancel)));
            match result {
                Ok(Some(data)) => {
                    if current.load(Ordering::SeqCst) == generation {
                        let _ = tx.send(AnalysisEvent::SpectrogramReady { generation, data });
                    } else {
                        log::warn!("discarding stale spectrogram (generation {})", generation);
                    }
                }
                // Cancelled: drop silently.
                Ok(None) => {}
                Err(_) => {
                    log::error!("spectrogram worker panicked");
                    let _ = tx.send(AnalysisEvent::Failed {
                        kind: JobKind::Spectrogram,
                        generation,
                        error: RetuneError::SpectrogramFailed("worker panicked".to_string()),
                    });
                }
            }
        });

        generation
    }

    /// Cancels any in-flight spectrogram; its result is dropped silently.
    pub fn cancel_spectrogram(&self) {
        self.spectrogram_generation.fetch_add(1, Ordering::SeqCst);
        self.spectrogram_cancel
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .cancel();
    }

    /// True when `generation` is still the newest job of its kind, i.e. its
    /// result may be applied.
    pub fn is_current(&self, kind: JobKind, generation: u64) -> bool {
        let counter = match kind {
            JobKind::Pitch => &self.pitch_generation,
            JobKind::Spectrogram => &self.spectrogram_generation,
        };
        counter.load(Ordering::SeqCst) == generation
    }
}

/// Posts the outcome of a pitch job, dropping it when a newer job started.
fn finish_pitch(
    tx: &Sender<AnalysisEvent>,
    current: &AtomicU64,
    generation: u64,
    result: std::thread::Result<PitchTrack>,
) {
    match result {
        Ok(track) => {
            if current.load(Ordering::SeqCst) == generation {
                let _ = tx.send(AnalysisEvent::PitchReady { generation, track });
            } else {
                log::warn!("discarding stale pitch analysis (generation {})", generation);
            }
        }
        Err(_) => {
            log::error!("pitch worker panicked");
            let _ = tx.send(AnalysisEvent::Failed {
                kind: JobKind::Pitch,
                generation,
                error: RetuneError::AnalysisFailed("worker panicked".to_string()),
            });
        }
    }
}
