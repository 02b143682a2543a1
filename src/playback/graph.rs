//! DSP graph primitives for the playback voices.
//!
//! The scheduler owns its nodes directly (parent-to-child, no shared graph)
//! and drives parameters through [`ParamTimeline`], a scheduling table of
//! timestamped automation events sampled monotonically during rendering.

/// One automation record in a parameter's scheduling table.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParamEvent {
    /// Jump to `value` at the event time.
    SetValue { value: f32 },
    /// Ramp linearly from the previous value, arriving at `value` at the
    /// event time.
    LinearRampTo { value: f32 },
    /// Start an exponential approach toward `target` with the given time
    /// constant in seconds, lasting until the next event.
    ExponentialTarget { target: f32, time_constant: f64 },
}

/// A scheduled audio parameter: value-vs-time described by ordered events.
#[derive(Debug, Clone, Default)]
pub struct ParamTimeline {
    initial: f32,
    events: Vec<(f64, ParamEvent)>,
}

impl ParamTimeline {
    /// Creates a timeline holding `initial` until the first event.
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    /// Schedules an instantaneous jump.
    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.push(time, ParamEvent::SetValue { value });
    }

    /// Schedules a linear ramp ending at `time` with `value`.
    pub fn linear_ramp_to(&mut self, value: f32, time: f64) {
        self.push(time, ParamEvent::LinearRampTo { value });
    }

    /// Schedules an exponential approach toward `target` starting at `time`.
    pub fn exponential_target(&mut self, target: f32, time: f64, time_constant: f64) {
        self.push(
            time,
            ParamEvent::ExponentialTarget {
                target,
                time_constant,
            },
        );
    }

    fn push(&mut self, time: f64, event: ParamEvent) {
        // Events arrive mostly in order; keep the table sorted by time.
        let at = self.events.partition_point(|(t, _)| *t <= time);
        self.events.insert(at, (time, event));
    }

    /// Returns a monotonic cursor over this timeline.
    pub fn cursor(&self) -> ParamCursor {
        ParamCursor {
            next: 0,
            held_value: self.initial,
            held_time: 0.0,
            segment: Segment::Hold,
        }
    }
}

/// Active interpolation regime between the last consumed event and the next.
#[derive(Debug, Clone, Copy)]
enum Segment {
    Hold,
    Linear {
        from_value: f32,
        from_time: f64,
        to_value: f32,
        to_time: f64,
    },
    Exponential {
        from_value: f32,
        start_time: f64,
        target: f32,
        time_constant: f64,
    },
}

/// Samples a [`ParamTimeline`] at non-decreasing times in O(events) total.
///
/// Holds only cursor state, so a render plan can own both the timeline and
/// its cursor.
#[derive(Debug, Clone)]
pub struct ParamCursor {
    next: usize,
    held_value: f32,
    held_time: f64,
    segment: Segment,
}

impl ParamCursor {
    /// Value at time `t`. Callers must pass non-decreasing `t` and the same
    /// timeline the cursor was created from.
    pub fn value_at(&mut self, timeline: &ParamTimeline, t: f64) -> f32 {
        // Consume events that have completed by `t`; a pending linear ramp
        // shapes values before its end time, anchored at the previous event.
        while self.next < timeline.events.len() {
            let (event_time, event) = timeline.events[self.next];
            match event {
                ParamEvent::LinearRampTo { value } => {
                    if t < event_time {
                        self.segment = Segment::Linear {
                            from_value: self.held_value,
                            from_time: self.held_time,
                            to_value: value,
                            to_time: event_time,
                        };
                        break;
                    }
                    self.held_value = value;
                    self.held_time = event_time;
                    self.segment = Segment::Hold;
                }
                ParamEvent::SetValue { value } => {
                    if t < event_time {
                        break;
                    }
                    self.held_value = value;
                    self.held_time = event_time;
                    self.segment = Segment::Hold;
                }
                ParamEvent::ExponentialTarget {
                    target,
                    time_constant,
                } => {
                    if t < event_time {
                        break;
                    }
                    let from = self.current_value(event_time);
                    self.segment = Segment::Exponential {
                        from_value: from,
                        start_time: event_time,
                        target,
                        time_constant,
                    };
                    self.held_value = from;
                    self.held_time = event_time;
                }
            }
            self.next += 1;
        }

        self.current_value(t)
    }

    fn current_value(&self, t: f64) -> f32 {
        match self.segment {
            Segment::Hold => self.held_value,
            Segment::Linear {
                from_value,
                from_time,
                to_value,
                to_time,
            } => {
                if t >= to_time || to_time <= from_time {
                    to_value
                } else {
                    let frac = ((t - from_time) / (to_time - from_time)) as f32;
                    from_value + (to_value - from_value) * frac
                }
            }
            Segment::Exponential {
                from_value,
                start_time,
                target,
                time_constant,
            } => {
                if time_constant <= 0.0 {
                    return target;
                }
                let decay = (-(t - start_time) / time_constant).exp() as f32;
                target + (from_value - target) * decay
            }
        }
    }
}

/// Triangle-wave oscillator with per-sample frequency control.
#[derive(Debug, Clone, Default)]
pub struct TriangleOsc {
    phase: f64,
}

impl TriangleOsc {
    /// Advances one sample at `freq` Hz and returns the output in [-1, 1].
    #[inline]
    pub fn tick(&mut self, freq: f64, sample_rate: f64) -> f32 {
        let out = if self.phase < 0.5 {
            4.0 * self.phase - 1.0
        } else {
            3.0 - 4.0 * self.phase
        };
        self.phase += freq / sample_rate;
        self.phase -= self.phase.floor();
        out as f32
    }
}

/// Pulse-wave oscillator with fixed duty cycle.
#[derive(Debug, Clone)]
pub struct PulseOsc {
    phase: f64,
    duty: f64,
}

impl PulseOsc {
    /// Creates a pulse oscillator; `duty` is the high fraction of the cycle.
    pub fn new(duty: f64) -> Self {
        Self { phase: 0.0, duty }
    }

    /// Advances one sample at `freq` Hz.
    #[inline]
    pub fn tick(&mut self, freq: f64, sample_rate: f64) -> f32 {
        let out = if self.phase < self.duty { 1.0 } else { -1.0 };
        self.phase += freq / sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

/// Sine LFO used for vibrato.
#[derive(Debug, Clone, Default)]
pub struct SineLfo {
    phase: f64,
}

impl SineLfo {
    /// Advances one sample at `freq` Hz and returns sin in [-1, 1].
    #[inline]
    pub fn tick(&mut self, freq: f64, sample_rate: f64) -> f64 {
        let out = (2.0 * std::f64::consts::PI * self.phase).sin();
        self.phase += freq / sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

/// One-pole low-pass filter.
#[derive(Debug, Clone, Default)]
pub struct OnePoleLowPass {
    state: f32,
    coeff: f32,
}

impl OnePoleLowPass {
    /// Creates a filter with the given cutoff.
    pub fn new(cutoff_hz: f64, sample_rate: f64) -> Self {
        let coeff = 1.0 - (-2.0 * std::f64::consts::PI * cutoff_hz / sample_rate).exp();
        Self {
            state: 0.0,
            coeff: coeff as f32,
        }
    }

    /// Filters one sample.
    #[inline]
    pub fn tick(&mut self, input: f32) -> f32 {
        self.state += self.coeff * (input - self.state);
        self.state
    }
}

/// Linear-ramp ADSR envelope evaluated against a voice-local clock.
#[derive(Debug, Clone, Copy)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f32,
    pub release: f64,
}

impl Default for Adsr {
    fn default() -> Self {
        Self {
            attack: 0.015,
            decay: 0.06,
            sustain: 0.8,
            release: 0.08,
        }
    }
}

impl Adsr {
    /// Envelope level at `t` seconds into a voice lasting `duration` seconds
    /// (release begins at `duration`).
    pub fn level(&self, t: f64, duration: f64) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        if t < self.attack {
            return (t / self.attack) as f32;
        }
        let after_attack = t - self.attack;
        let level = if after_attack < self.decay {
            1.0 + (self.sustain - 1.0) * (after_attack / self.decay) as f32
        } else {
            self.sustain
        };
        if t < duration {
            level
        } else {
            let into_release = t - duration;
            if into_release >= self.release {
                0.0
            } else {
                level * (1.0 - into_release / self.release) as f32
            }
        }
    }

    /// Total audible length of a voice: duration plus the release tail.
    #[inline]
    pub fn tail(&self, duration: f64) -> f64 {
        duration + self.release
    }
}
