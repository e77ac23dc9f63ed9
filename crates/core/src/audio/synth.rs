use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::SynthesisGraph;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Sample at normalised phase `phase` in `[0, 1)`.
    pub fn sample(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        }
    }
}

/// `Set` holds until the next point; `Linear` and `Exponential` ramp from the
/// previous point to their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ramp {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub time: f64,
    pub value: f64,
    pub ramp: Ramp,
}

/// Piecewise parameter trajectory; times are seconds from voice start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    points: Vec<AutomationPoint>,
}

impl Automation {
    pub fn new(mut points: Vec<AutomationPoint>) -> Self {
        points.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { points }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![AutomationPoint {
            time: 0.0,
            value,
            ramp: Ramp::Set,
        }])
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    pub fn value_at(&self, time: f64) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        let passed = self.points.partition_point(|point| point.time <= time);
        if passed == 0 {
            return first.value;
        }

        let previous = self.points[passed - 1];
        let Some(next) = self.points.get(passed) else {
            return previous.value;
        };

        let span = next.time - previous.time;
        if span <= 0.0 {
            return previous.value;
        }
        let fraction = (time - previous.time) / span;

        match next.ramp {
            Ramp::Set => previous.value,
            Ramp::Linear => previous.value + (next.value - previous.value) * fraction,
            Ramp::Exponential => {
                let same_sign = previous.value * next.value > 0.0;
                if same_sign {
                    previous.value * (next.value / previous.value).powf(fraction)
                } else {
                    previous.value
                }
            }
        }
    }
}

/// Low-pass filter whose cutoff follows an automation curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSweep {
    pub cutoff: Automation,
    pub q: f64,
}

/// A fully resolved voice ready to be placed on a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledVoice {
    pub waveform: Waveform,
    /// Absolute graph time in seconds.
    pub start: f64,
    pub duration: f64,
    pub frequency: Automation,
    pub gain: Automation,
    pub filter: Option<FilterSweep>,
}

impl ScheduledVoice {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// RBJ biquad low-pass, direct form I.
#[derive(Debug, Clone, Default)]
struct LowPass {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl LowPass {
    fn process(&mut self, input: f64, cutoff: f64, q: f64, sample_rate: f64) -> f64 {
        let cutoff = cutoff.clamp(10.0, sample_rate * 0.45);
        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q.max(0.01));

        let a0 = 1.0 + alpha;
        let b0 = (1.0 - cos) / 2.0 / a0;
        let b1 = (1.0 - cos) / a0;
        let b2 = b0;
        let a1 = -2.0 * cos / a0;
        let a2 = (1.0 - alpha) / a0;

        let output = b0 * input + b1 * self.x1 + b2 * self.x2 - a1 * self.y1 - a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

#[derive(Debug, Clone)]
struct ActiveVoice {
    voice: ScheduledVoice,
    phase: f64,
    filter: LowPass,
}

impl ActiveVoice {
    fn next_sample(&mut self, time: f64, sample_rate: f64) -> f64 {
        let local = time - self.voice.start;
        let frequency = self.voice.frequency.value_at(local).max(0.0);
        let raw = self.voice.waveform.sample(self.phase);
        self.phase = (self.phase + frequency / sample_rate).fract();

        let shaped = match &self.voice.filter {
            Some(sweep) => {
                let cutoff = sweep.cutoff.value_at(local);
                self.filter.process(raw, cutoff, sweep.q, sample_rate)
            }
            None => raw,
        };
        shaped * self.voice.gain.value_at(local)
    }
}

/// Renders scheduled voices into mono `f32` samples.
///
/// Time only moves when [`OfflineGraph::render`] is called. Voices are
/// dropped as soon as the render cursor passes their end.
#[derive(Debug, Clone)]
pub struct OfflineGraph {
    sample_rate: u32,
    position: u64,
    voices: Vec<ActiveVoice>,
    scheduled_total: usize,
}

impl OfflineGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            position: 0,
            voices: Vec::new(),
            scheduled_total: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn scheduled_total(&self) -> usize {
        self.scheduled_total
    }

    /// Renders `frames` samples and disposes of finished voices.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let rate = f64::from(self.sample_rate);
        let mut out = Vec::with_capacity(frames);

        for offset in 0..frames as u64 {
            let time = (self.position + offset) as f64 / rate;
            let mut mix = 0.0_f64;
            for voice in &mut self.voices {
                if time >= voice.voice.start && time < voice.voice.end() {
                    mix += voice.next_sample(time, rate);
                }
            }
            out.push(mix.clamp(-1.0, 1.0) as f32);
        }

        self.position += frames as u64;
        let now = self.position as f64 / rate;
        self.voices.retain(|voice| voice.voice.end() > now);
        out
    }

    /// Renders until every scheduled voice has finished.
    pub fn render_until_idle(&mut self) -> Vec<f32> {
        let now = self.current_time();
        let Some(end) = self
            .voices
            .iter()
            .map(|voice| voice.voice.end())
            .max_by(f64::total_cmp)
        else {
            return Vec::new();
        };
        let frames = ((end - now).max(0.0) * f64::from(self.sample_rate)).ceil() as usize;
        self.render(frames + 1)
    }
}

impl SynthesisGraph for OfflineGraph {
    fn current_time(&self) -> f64 {
        self.position as f64 / f64::from(self.sample_rate)
    }

    fn schedule(&mut self, voice: ScheduledVoice) -> Result<()> {
        self.scheduled_total += 1;
        self.voices.push(ActiveVoice {
            voice,
            phase: 0.0,
            filter: LowPass::default(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: f64, value: f64, ramp: Ramp) -> AutomationPoint {
        AutomationPoint { time, value, ramp }
    }

    #[test]
    fn automation_follows_ramps() {
        let curve = Automation::new(vec![
            point(0.0, 800.0, Ramp::Set),
            point(0.1, 1200.0, Ramp::Linear),
            point(0.2, 100.0, Ramp::Exponential),
            point(0.3, 50.0, Ramp::Set),
        ]);

        assert_eq!(curve.value_at(-1.0), 800.0);
        assert!((curve.value_at(0.05) - 1000.0).abs() < 1e-9);
        assert!((curve.value_at(0.15) - (1200.0_f64 * 100.0).sqrt()).abs() < 1e-6);
        assert_eq!(curve.value_at(0.25), 100.0);
        assert_eq!(curve.value_at(0.3), 50.0);
        assert_eq!(curve.value_at(9.0), 50.0);
    }

    #[test]
    fn exponential_ramp_from_zero_holds() {
        let curve = Automation::new(vec![
            point(0.0, 0.0, Ramp::Set),
            point(0.1, 1.0, Ramp::Exponential),
        ]);
        assert_eq!(curve.value_at(0.05), 0.0);
        assert_eq!(curve.value_at(0.1), 1.0);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Triangle,
        ] {
            for step in 0..100 {
                let value = waveform.sample(step as f64 / 100.0);
                assert!((-1.0..=1.0).contains(&value));
            }
        }
        assert_eq!(Waveform::Square.sample(0.25), 1.0);
        assert_eq!(Waveform::Square.sample(0.75), -1.0);
    }

    #[test]
    fn voices_render_then_dispose() {
        let mut graph = OfflineGraph::new(8_192);
        graph
            .schedule(ScheduledVoice {
                waveform: Waveform::Square,
                start: 1.0 / 64.0,
                duration: 1.0 / 64.0,
                frequency: Automation::constant(400.0),
                gain: Automation::constant(0.5),
                filter: None,
            })
            .unwrap();

        let samples = graph.render(400);
        assert_eq!(graph.active_voices(), 0);
        assert!(samples[..128].iter().all(|s| *s == 0.0));
        assert!(samples[128..256].iter().all(|s| s.abs() == 0.5));
        assert!(samples[256..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn low_pass_attenuates_high_frequencies() {
        let voice = |filter: Option<FilterSweep>| ScheduledVoice {
            waveform: Waveform::Sine,
            start: 0.0,
            duration: 0.1,
            frequency: Automation::constant(6_000.0),
            gain: Automation::constant(1.0),
            filter,
        };
        let energy = |samples: &[f32]| samples.iter().map(|s| s * s).sum::<f32>();

        let mut dry = OfflineGraph::new(44_100);
        dry.schedule(voice(None)).unwrap();
        let dry = dry.render_until_idle();

        let mut wet = OfflineGraph::new(44_100);
        wet.schedule(voice(Some(FilterSweep {
            cutoff: Automation::constant(300.0),
            q: 0.707,
        })))
        .unwrap();
        let wet = wet.render_until_idle();

        assert!(energy(&wet) < energy(&dry) * 0.05);
    }
}
