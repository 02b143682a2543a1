//! Three-voice playback scheduling against a time-stretched wall clock.
//!
//! The scheduler reads one `(PitchTrack, NoteList)` snapshot at `play()` time
//! and turns it into a render plan: a stretched copy of the original
//! recording, automation timelines for the pitch-curve oscillator, and one
//! pulse voice per note in the window. Within an arm the wall clock satisfies
//! `buffer_time(now) = start_offset + (now − anchor) · rate`; loop playback
//! re-arms at the selection end, resetting the anchor. Mid-play edits do not
//! touch the currently scheduled voices.

use std::sync::Arc;

use crate::core::types::{AudioBuffer, HistorySnapshot, MixerState, Note, PitchTrack};
use crate::playback::graph::{
    Adsr, OnePoleLowPass, ParamCursor, ParamTimeline, PulseOsc, SineLfo, TriangleOsc,
};
use crate::playback::stretch;

/// Pitch-voice gain while a frame is voiced.
const PITCH_VOICE_GAIN: f32 = 0.7;
/// Pitch-voice low-pass cutoff in Hz.
const PITCH_LP_CUTOFF: f64 = 500.0;
/// Note-voice low-pass cutoff in Hz.
const NOTE_LP_CUTOFF: f64 = 1800.0;
/// Vibrato rate in Hz.
const VIBRATO_RATE: f64 = 5.0;
/// Vibrato depth in cents.
const VIBRATO_DEPTH_CENTS: f64 = 9.0;
/// Note-voice output gain.
const NOTE_VOICE_GAIN: f32 = 0.5;
/// Mixer ramp time constant in seconds (~100 ms exponential target ramps).
const MIXER_RAMP_SECS: f64 = 0.1;
/// Pulse duty cycle for note voices.
const NOTE_PULSE_DUTY: f64 = 0.35;

/// How an arm of playback is bounded and whether it repeats.
#[derive(Debug, Clone, Copy)]
pub struct PlaybackOptions {
    /// Playback rate; wall clock advances at `rate ×` audio clock.
    pub rate: f64,
    /// Start position in buffer time, seconds.
    pub start_offset: f64,
    /// Optional bound on played buffer time, seconds.
    pub duration: Option<f64>,
    /// Loop selection `[start, end]` in buffer time; playback re-arms at the
    /// end by restarting every voice at the start.
    pub loop_region: Option<(f64, f64)>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            rate: 1.0,
            start_offset: 0.0,
            duration: None,
            loop_region: None,
        }
    }
}

impl PlaybackOptions {
    /// Options playing from `start_offset` at normal rate.
    pub fn from_offset(start_offset: f64) -> Self {
        Self {
            start_offset,
            ..Self::default()
        }
    }

    /// Sets the playback rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Sets the loop selection.
    pub fn with_loop(mut self, start: f64, end: f64) -> Self {
        self.loop_region = Some((start, end));
        self
    }
}

/// One scheduled note voice.
#[derive(Debug, Clone)]
struct NoteVoice {
    start_wall: f64,
    duration_wall: f64,
    frequency: f64,
    osc: PulseOsc,
    filter: OnePoleLowPass,
    envelope: Adsr,
}

/// Everything one arm of playback needs, captured at arm time.
struct RenderPlan {
    /// Stretched original-recording segment for this arm.
    original: Vec<f32>,
    pitch_freq: ParamTimeline,
    pitch_gain: ParamTimeline,
    freq_cursor: ParamCursor,
    gain_cursor: ParamCursor,
    pitch_osc: TriangleOsc,
    pitch_filter: OnePoleLowPass,
    vibrato: SineLfo,
    voices: Vec<NoteVoice>,
    /// Index of the first voice that may still sound.
    voice_head: usize,
    /// Wall-clock seconds since this arm started.
    clock: f64,
    /// Wall-clock length of this arm.
    wall_len: f64,
    /// Buffer time at the arm anchor.
    start_offset: f64,
    rate: f64,
}

/// Source material an arm is built from; kept so looping can re-arm without
/// re-reading the snapshot.
struct ArmSource {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    pitch_track: PitchTrack,
    notes: Vec<Note>,
    options: PlaybackOptions,
}

/// Smoothed mixer gain: exponential approach toward the target.
#[derive(Debug, Clone, Copy)]
struct SmoothedGain {
    current: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedGain {
    fn new(target: f32, sample_rate: f64) -> Self {
        Self {
            current: target,
            target,
            coeff: (1.0 - (-1.0 / (MIXER_RAMP_SECS * sample_rate)).exp()) as f32,
        }
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }
}

/// Synthesizes the original / pitch-curve / note voices for playback.
///
/// There is no process-wide instance; the application root constructs one and
/// passes it where needed.
pub struct PlaybackScheduler {
    sample_rate: u32,
    mixer: MixerState,
    original_gain: SmoothedGain,
    pitch_gain: SmoothedGain,
    note_gain: SmoothedGain,
    playing: bool,
    plan: Option<RenderPlan>,
    source: Option<ArmSource>,
}

impl PlaybackScheduler {
    /// Creates a scheduler rendering at `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        let mixer = MixerState::default();
        let sr = sample_rate as f64;
        Self {
            sample_rate,
            mixer,
            original_gain: SmoothedGain::new(mixer.original.effective_gain(), sr),
            pitch_gain: SmoothedGain::new(mixer.pitch_synth.effective_gain(), sr),
            note_gain: SmoothedGain::new(mixer.note_synth.effective_gain(), sr),
            playing: false,
            plan: None,
            source: None,
        }
    }

    /// True while an arm is being rendered.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current position in buffer time, while playing.
    pub fn position(&self) -> Option<f64> {
        let plan = self.plan.as_ref()?;
        self.playing
            .then_some(plan.start_offset + plan.clock * plan.rate)
    }

    /// Current mixer settings.
    pub fn mixer(&self) -> MixerState {
        self.mixer
    }

    /// Applies mixer settings with ~100 ms exponential ramps. Volume 0 is
    /// equivalent to disabled.
    pub fn update_mixer(&mut self, mixer: MixerState) {
        self.mixer = mixer;
        self.original_gain.target = mixer.original.effective_gain();
        self.pitch_gain.target = mixer.pitch_synth.effective_gain();
        self.note_gain.target = mixer.note_synth.effective_gain();
    }

    /// Starts playback from the given snapshot.
    ///
    /// The snapshot is read once, here; later edits do not affect the voices
    /// scheduled for this arm.
    pub fn play(
        &mut self,
        audio: &AudioBuffer,
        snapshot: &HistorySnapshot,
        options: PlaybackOptions,
    ) -> bool {
        let rate = if options.rate > 0.0 { options.rate } else { 1.0 };
        let options = PlaybackOptions { rate, ..options };

        let source = ArmSource {
            samples: Arc::new(audio.samples.clone()),
            sample_rate: audio.sample_rate,
            pitch_track: snapshot.pitch_track.clone(),
            notes: snapshot.notes.clone(),
            options,
        };
        let plan = build_plan(&source, options.start_offset, self.sample_rate);
        if plan.wall_len <= 0.0 {
            self.playing = false;
            return false;
        }
        // A fresh arm starts at the current mixer settings; ramps apply to
        // mid-play changes only.
        self.original_gain.current = self.original_gain.target;
        self.pitch_gain.current = self.pitch_gain.target;
        self.note_gain.current = self.note_gain.target;

        self.plan = Some(plan);
        self.source = Some(source);
        self.playing = true;
        true
    }

    /// Stops playback. Idempotent; completes immediately.
    pub fn stop(&mut self) {
        self.playing = false;
        self.plan = None;
        self.source = None;
    }

    /// Renders mono samples into `out`, advancing the wall clock.
    ///
    /// Fills silence when stopped. At the loop end all voices stop and the
    /// whole scheduler re-arms at the loop start; at the window end playback
    /// stops.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.playing {
            out.fill(0.0);
            return;
        }

        let sr = self.sample_rate as f64;
        let dt = 1.0 / sr;

        for slot in out.iter_mut() {
            let arm_ended = match self.plan.as_ref() {
                Some(plan) => plan.clock >= plan.wall_len,
                None => true,
            };
            if arm_ended && !self.rearm_loop() {
                self.stop();
            }
            let Some(plan) = self.plan.as_mut() else {
                *slot = 0.0;
                continue;
            };

            let t = plan.clock;
            let mut mix = 0.0f32;

            // Original voice: stretched buffer indexed by wall time.
            let idx = (t * sr) as usize;
            if idx < plan.original.len() {
                mix += plan.original[idx] * self.original_gain.tick();
            } else {
                self.original_gain.tick();
            }

            // Pitch voice: triangle oscillator following the pitch curve with
            // vibrato detune, through a low-pass.
            let freq = plan.freq_cursor.value_at(&plan.pitch_freq, t) as f64;
            let gain = plan.gain_cursor.value_at(&plan.pitch_gain, t);
            let cents = plan.vibrato.tick(VIBRATO_RATE, sr) * VIBRATO_DEPTH_CENTS;
            let modulated = freq * (cents / 1200.0).exp2();
            let tone = plan.pitch_osc.tick(modulated.max(0.0), sr);
            mix += plan.pitch_filter.tick(tone) * gain * self.pitch_gain.tick();

            // Note voices.
            let note_mix = tick_voices(&mut plan.voices, &mut plan.voice_head, t, sr);
            mix += note_mix * self.note_gain.tick();

            *slot = mix;
            plan.clock += dt;
        }
    }

    /// Rebuilds the plan at the loop start. Returns false when not looping.
    fn rearm_loop(&mut self) -> bool {
        let Some(source) = self.source.as_ref() else {
            return false;
        };
        let Some((loop_start, _)) = source.options.loop_region else {
            return false;
        };
        let plan = build_plan(source, loop_start, self.sample_rate);
        if plan.wall_len <= 0.0 {
            return false;
        }
        self.plan = Some(plan);
        true
    }
}

/// Builds the render plan for one arm starting at `arm_offset` buffer time.
fn build_plan(source: &ArmSource, arm_offset: f64, render_rate: u32) -> RenderPlan {
    let options = &source.options;
    let rate = options.rate;
    let buffer_duration = source.samples.len() as f64 / source.sample_rate as f64;

    let mut end = buffer_duration;
    if let Some((_, loop_end)) = options.loop_region {
        end = end.min(loop_end);
    }
    if let Some(duration) = options.duration {
        end = end.min(arm_offset + duration);
    }
    let wall_len = ((end - arm_offset) / rate).max(0.0);

    // Original voice: slice of the recording, stretched by 1/rate so pitch is
    // preserved while wall time advances at the requested rate. The stretcher
    // works in source samples; resampling to the render rate keeps the wall
    // clock exact when the device rate differs.
    let src_sr = source.sample_rate;
    let begin = ((arm_offset * src_sr as f64) as usize).min(source.samples.len());
    let stop = ((end * src_sr as f64) as usize).min(source.samples.len());
    let stretched = stretch::stretch(
        &source.samples[begin..stop],
        1.0 / rate,
        stretch::default_segment(src_sr),
        stretch::default_search_range(src_sr),
    );
    let original = resample_linear(&stretched, src_sr, render_rate);

    // Pitch voice automation: one ramp per analysis frame inside the window.
    let mut pitch_freq = ParamTimeline::new(0.0);
    let mut pitch_gain = ParamTimeline::new(0.0);
    for frame in source.pitch_track.frames_in(arm_offset, end) {
        let wall_t = (frame.timestamp - arm_offset) / rate;
        if frame.has_pitch {
            pitch_freq.linear_ramp_to(frame.frequency as f32, wall_t);
            pitch_gain.linear_ramp_to(PITCH_VOICE_GAIN, wall_t);
        } else {
            pitch_gain.linear_ramp_to(0.0, wall_t);
        }
    }

    // One pulse voice per note overlapping the window.
    let render_sr = render_rate as f64;
    let voices: Vec<NoteVoice> = source
        .notes
        .iter()
        .filter(|n| n.end > arm_offset && n.start < end)
        .map(|n| NoteVoice {
            start_wall: (n.start - arm_offset) / rate,
            duration_wall: (n.end - n.start) / rate,
            frequency: n.pitch,
            osc: PulseOsc::new(NOTE_PULSE_DUTY),
            filter: OnePoleLowPass::new(NOTE_LP_CUTOFF, render_sr),
            envelope: Adsr::default(),
        })
        .collect();

    let freq_cursor = pitch_freq.cursor();
    let gain_cursor = pitch_gain.cursor();
    RenderPlan {
        original,
        pitch_freq,
        pitch_gain,
        freq_cursor,
        gain_cursor,
        pitch_osc: TriangleOsc::default(),
        pitch_filter: OnePoleLowPass::new(PITCH_LP_CUTOFF, render_sr),
        vibrato: SineLfo::default(),
        voices,
        voice_head: 0,
        clock: 0.0,
        wall_len,
        start_offset: arm_offset,
        rate,
    }
}

/// Renders all note voices active at wall time `t`.
fn tick_voices(voices: &mut [NoteVoice], head: &mut usize, t: f64, sample_rate: f64) -> f32 {
    // Voices are sorted by start; drop finished ones from the front.
    while *head < voices.len() {
        let v = &voices[*head];
        if t > v.start_wall + v.envelope.tail(v.duration_wall) {
            *head += 1;
        } else {
            break;
        }
    }

    let mut mix = 0.0f32;
    for v in voices[*head..].iter_mut() {
        if t < v.start_wall {
            break;
        }
        let local = t - v.start_wall;
        let level = v.envelope.level(local, v.duration_wall);
        if level <= 0.0 {
            continue;
        }
        let tone = v.osc.tick(v.frequency, sample_rate);
        mix += v.filter.tick(tone) * level * NOTE_VOICE_GAIN;
    }
    mix
}

/// Linear resampler used when the render rate differs from the source rate.
fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }
    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (input.len() as f64 / ratio).floor() as usize;
    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(input.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}
