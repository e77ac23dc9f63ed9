use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::synth::{Automation, AutomationPoint, FilterSweep, Ramp, ScheduledVoice, Waveform};
use crate::GlitchError;

/// Envelope floor for exponential decays; exponential ramps cannot reach 0.
pub const DECAY_FLOOR: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundEvent {
    Hover,
    Click,
    Scramble,
    CardHover,
    CardLeave,
    NavClick,
    PageTransition,
    Back,
    Error,
    Success,
    Toggle,
}

impl SoundEvent {
    pub const ALL: [SoundEvent; 11] = [
        SoundEvent::Hover,
        SoundEvent::Click,
        SoundEvent::Scramble,
        SoundEvent::CardHover,
        SoundEvent::CardLeave,
        SoundEvent::NavClick,
        SoundEvent::PageTransition,
        SoundEvent::Back,
        SoundEvent::Error,
        SoundEvent::Success,
        SoundEvent::Toggle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SoundEvent::Hover => "hover",
            SoundEvent::Click => "click",
            SoundEvent::Scramble => "scramble",
            SoundEvent::CardHover => "card-hover",
            SoundEvent::CardLeave => "card-leave",
            SoundEvent::NavClick => "nav-click",
            SoundEvent::PageTransition => "page-transition",
            SoundEvent::Back => "back",
            SoundEvent::Error => "error",
            SoundEvent::Success => "success",
            SoundEvent::Toggle => "toggle",
        }
    }

    pub fn spec(self) -> &'static SoundEventSpec {
        match self {
            SoundEvent::Hover => &HOVER,
            SoundEvent::Click => &CLICK,
            SoundEvent::Scramble => &SCRAMBLE,
            SoundEvent::CardHover => &CARD_HOVER,
            SoundEvent::CardLeave => &CARD_LEAVE,
            SoundEvent::NavClick => &NAV_CLICK,
            SoundEvent::PageTransition => &PAGE_TRANSITION,
            SoundEvent::Back => &BACK,
            SoundEvent::Error => &ERROR,
            SoundEvent::Success => &SUCCESS,
            SoundEvent::Toggle => &TOGGLE,
        }
    }
}

impl std::fmt::Display for SoundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundEvent {
    type Err = GlitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundEvent::ALL
            .into_iter()
            .find(|event| event.name() == s)
            .ok_or_else(|| GlitchError::msg(format!("unknown sound event `{s}`")))
    }
}

/// Symbolic gain level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Level {
    Silent,
    /// `master_volume × event gain`.
    Peak,
    /// [`DECAY_FLOOR`].
    Floor,
}

impl Level {
    fn resolve(self, peak: f64) -> f64 {
        match self {
            Level::Silent => 0.0,
            Level::Peak => peak,
            Level::Floor => DECAY_FLOOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreqPoint(pub f64, pub f64, pub Ramp);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvPoint(pub f64, pub Level, pub Ramp);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub cutoff: &'static [FreqPoint],
    pub q: f64,
}

/// Repeats a voice `count` times, `spacing` seconds apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Repeat {
    pub count: u32,
    pub spacing: f64,
}

impl Repeat {
    pub const ONCE: Repeat = Repeat {
        count: 1,
        spacing: 0.0,
    };
}

/// Per-instance randomisation: a uniform pitch and a longer tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    pub min_hz: f64,
    pub max_hz: f64,
    pub extra_duration: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceSpec {
    pub waveform: Waveform,
    pub start_offset: f64,
    pub duration: f64,
    pub frequency: &'static [FreqPoint],
    pub envelope: &'static [EnvPoint],
    pub filter: Option<FilterSpec>,
    pub repeat: Repeat,
    pub jitter: Option<Jitter>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEventSpec {
    /// Scales the master volume at the envelope peak.
    pub gain: f64,
    pub voices: &'static [VoiceSpec],
}

impl SoundEventSpec {
    /// Number of voices a trigger allocates.
    pub fn voice_count(&self) -> usize {
        self.voices
            .iter()
            .map(|voice| voice.repeat.count as usize)
            .sum()
    }

    /// Latest end time across all voices, ignoring jitter.
    pub fn nominal_length(&self) -> f64 {
        self.voices
            .iter()
            .map(|voice| {
                let last_start = voice.start_offset
                    + voice.repeat.spacing * f64::from(voice.repeat.count.saturating_sub(1));
                last_start + voice.duration
            })
            .fold(0.0, f64::max)
    }

    /// Resolves every voice against `now` and the master volume.
    pub fn instantiate<R: Rng>(
        &self,
        now: f64,
        master_volume: f64,
        rng: &mut R,
    ) -> Vec<ScheduledVoice> {
        let peak = master_volume * self.gain;
        let mut voices = Vec::with_capacity(self.voice_count());

        for spec in self.voices {
            for repetition in 0..spec.repeat.count {
                let start = now + spec.start_offset + spec.repeat.spacing * f64::from(repetition);
                voices.push(spec.resolve(start, peak, rng));
            }
        }
        voices
    }
}

impl VoiceSpec {
    fn resolve<R: Rng>(&self, start: f64, peak: f64, rng: &mut R) -> ScheduledVoice {
        let (pitch, duration) = match self.jitter {
            Some(jitter) => (
                Some(rng.random_range(jitter.min_hz..jitter.max_hz)),
                self.duration + rng.random::<f64>() * jitter.extra_duration,
            ),
            None => (None, self.duration),
        };

        let frequency = Automation::new(
            self.frequency
                .iter()
                .map(|FreqPoint(time, hz, ramp)| AutomationPoint {
                    time: *time,
                    value: pitch.unwrap_or(*hz),
                    ramp: *ramp,
                })
                .collect(),
        );

        // The release point follows the (possibly jittered) voice length.
        let gain = Automation::new(
            self.envelope
                .iter()
                .map(|EnvPoint(time, level, ramp)| AutomationPoint {
                    time: if *time >= self.duration { duration } else { *time },
                    value: level.resolve(peak),
                    ramp: *ramp,
                })
                .collect(),
        );

        let filter = self.filter.map(|filter| FilterSweep {
            cutoff: Automation::new(
                filter
                    .cutoff
                    .iter()
                    .map(|FreqPoint(time, hz, ramp)| AutomationPoint {
                        time: *time,
                        value: *hz,
                        ramp: *ramp,
                    })
                    .collect(),
            ),
            q: filter.q,
        });

        ScheduledVoice {
            waveform: self.waveform,
            start,
            duration,
            frequency,
            gain,
            filter,
        }
    }
}

const fn tone(
    waveform: Waveform,
    start_offset: f64,
    duration: f64,
    frequency: &'static [FreqPoint],
    envelope: &'static [EnvPoint],
) -> VoiceSpec {
    VoiceSpec {
        waveform,
        start_offset,
        duration,
        frequency,
        envelope,
        filter: None,
        repeat: Repeat::ONCE,
        jitter: None,
    }
}

use Level::{Floor, Peak, Silent};
use Ramp::{Exponential as Exp, Linear, Set};

const DECAY_080: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.08, Floor, Exp)];
const DECAY_100: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.1, Floor, Exp)];
const DECAY_120: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.12, Floor, Exp)];
const DECAY_150: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.15, Floor, Exp)];
const DECAY_180: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.18, Floor, Exp)];
const DECAY_200: &[EnvPoint] = &[EnvPoint(0.0, Peak, Set), EnvPoint(0.2, Floor, Exp)];

static HOVER: SoundEventSpec = SoundEventSpec {
    gain: 0.15,
    voices: &[tone(
        Waveform::Square,
        0.0,
        0.08,
        &[FreqPoint(0.0, 800.0, Set), FreqPoint(0.05, 1200.0, Exp)],
        DECAY_080,
    )],
};

static CLICK: SoundEventSpec = SoundEventSpec {
    gain: 0.25,
    voices: &[tone(
        Waveform::Square,
        0.0,
        0.15,
        &[FreqPoint(0.0, 600.0, Set), FreqPoint(0.1, 200.0, Exp)],
        DECAY_150,
    )],
};

static SCRAMBLE: SoundEventSpec = SoundEventSpec {
    gain: 0.1,
    voices: &[VoiceSpec {
        waveform: Waveform::Square,
        start_offset: 0.0,
        duration: 0.02,
        frequency: &[FreqPoint(0.0, 200.0, Set)],
        envelope: &[
            EnvPoint(0.0, Silent, Set),
            EnvPoint(0.005, Peak, Linear),
            EnvPoint(0.02, Floor, Exp),
        ],
        filter: None,
        repeat: Repeat {
            count: 8,
            spacing: 0.3 / 8.0,
        },
        jitter: Some(Jitter {
            min_hz: 200.0,
            max_hz: 1700.0,
            extra_duration: 0.02,
        }),
    }],
};

const CARD_HOVER_SWEEP: FilterSpec = FilterSpec {
    cutoff: &[FreqPoint(0.0, 2000.0, Set), FreqPoint(0.15, 500.0, Exp)],
    q: 1.0,
};

static CARD_HOVER: SoundEventSpec = SoundEventSpec {
    gain: 0.12,
    voices: &[
        VoiceSpec {
            filter: Some(CARD_HOVER_SWEEP),
            ..tone(
                Waveform::Sawtooth,
                0.0,
                0.2,
                &[FreqPoint(0.0, 220.0, Set)],
                DECAY_200,
            )
        },
        VoiceSpec {
            filter: Some(CARD_HOVER_SWEEP),
            ..tone(
                Waveform::Square,
                0.0,
                0.2,
                &[FreqPoint(0.0, 223.0, Set)],
                DECAY_200,
            )
        },
    ],
};

static CARD_LEAVE: SoundEventSpec = SoundEventSpec {
    gain: 0.08,
    voices: &[tone(
        Waveform::Sine,
        0.0,
        0.12,
        &[FreqPoint(0.0, 400.0, Set), FreqPoint(0.1, 150.0, Exp)],
        DECAY_120,
    )],
};

static NAV_CLICK: SoundEventSpec = SoundEventSpec {
    gain: 0.2,
    voices: &[
        tone(
            Waveform::Square,
            0.0,
            0.1,
            &[FreqPoint(0.0, 988.0, Set)],
            DECAY_100,
        ),
        tone(
            Waveform::Square,
            0.08,
            0.12,
            &[FreqPoint(0.0, 1319.0, Set)],
            DECAY_120,
        ),
    ],
};

static PAGE_TRANSITION: SoundEventSpec = SoundEventSpec {
    gain: 0.15,
    voices: &[VoiceSpec {
        filter: Some(FilterSpec {
            cutoff: &[
                FreqPoint(0.0, 100.0, Set),
                FreqPoint(0.15, 3000.0, Exp),
                FreqPoint(0.4, 100.0, Exp),
            ],
            q: 1.0,
        }),
        ..tone(
            Waveform::Sawtooth,
            0.0,
            0.45,
            &[
                FreqPoint(0.0, 80.0, Set),
                FreqPoint(0.2, 300.0, Exp),
                FreqPoint(0.4, 60.0, Exp),
            ],
            &[
                EnvPoint(0.0, Peak, Set),
                EnvPoint(0.2, Peak, Set),
                EnvPoint(0.45, Floor, Exp),
            ],
        )
    }],
};

static BACK: SoundEventSpec = SoundEventSpec {
    gain: 0.2,
    voices: &[tone(
        Waveform::Square,
        0.0,
        0.18,
        &[FreqPoint(0.0, 523.0, Set), FreqPoint(0.08, 392.0, Set)],
        DECAY_180,
    )],
};

static ERROR: SoundEventSpec = SoundEventSpec {
    gain: 0.2,
    voices: &[VoiceSpec {
        repeat: Repeat {
            count: 2,
            spacing: 0.12,
        },
        ..tone(
            Waveform::Square,
            0.0,
            0.1,
            &[FreqPoint(0.0, 200.0, Set)],
            DECAY_100,
        )
    }],
};

static SUCCESS: SoundEventSpec = SoundEventSpec {
    gain: 0.15,
    voices: &[
        tone(Waveform::Square, 0.0, 0.15, &[FreqPoint(0.0, 523.0, Set)], DECAY_150),
        tone(Waveform::Square, 0.08, 0.15, &[FreqPoint(0.0, 659.0, Set)], DECAY_150),
        tone(Waveform::Square, 0.16, 0.15, &[FreqPoint(0.0, 784.0, Set)], DECAY_150),
        tone(Waveform::Square, 0.24, 0.15, &[FreqPoint(0.0, 1047.0, Set)], DECAY_150),
    ],
};

static TOGGLE: SoundEventSpec = SoundEventSpec {
    gain: 0.15,
    voices: &[tone(
        Waveform::Sine,
        0.0,
        0.12,
        &[FreqPoint(0.0, 880.0, Set), FreqPoint(0.05, 1100.0, Set)],
        DECAY_120,
    )],
};
