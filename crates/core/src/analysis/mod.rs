use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{GlitchError, Result};

/// Samples per envelope frame.
pub const FRAME_SIZE: usize = 256;

/// Loudness and brightness of one short slice of a cue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueFrame {
    /// Centre of the slice in seconds.
    pub time: f32,
    pub rms: f32,
    /// Spectral centroid in Hz.
    pub centroid_hz: f32,
}

/// Summary of a rendered sound cue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CueAnalysis {
    pub sample_rate: u32,
    pub duration_seconds: f32,
    pub peak: f32,
    pub rms: f32,
    /// Spectral centroid of the whole cue in Hz.
    pub centroid_hz: f32,
    pub frames: Vec<CueFrame>,
}

impl CueAnalysis {
    /// Analyses `samples` in one shot.
    pub fn of(samples: &[f32], sample_rate: u32) -> Result<Self> {
        CueAnalyzer::new(sample_rate).analyze(samples)
    }

    pub fn is_silent(&self) -> bool {
        self.peak <= f32::EPSILON
    }

    /// The loudest envelope frame, if any.
    pub fn loudest_frame(&self) -> Option<&CueFrame> {
        self.frames.iter().max_by(|a, b| a.rms.total_cmp(&b.rms))
    }
}

/// Reusable analyser that keeps its FFT plans between calls.
pub struct CueAnalyzer {
    sample_rate: u32,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl CueAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn analyze(&mut self, samples: &[f32]) -> Result<CueAnalysis> {
        if samples.len() < 2 {
            return Err(GlitchError::InvalidInput(
                "cue analysis requires at least two samples",
            ));
        }

        let rate = self.sample_rate as f32;
        let peak = samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()));
        let centroid_hz = self.spectral_centroid(samples)?;

        let mut frames = Vec::with_capacity(samples.len() / FRAME_SIZE + 1);
        for (index, block) in samples.chunks(FRAME_SIZE).enumerate() {
            if block.len() < 2 {
                continue;
            }
            let start = (index * FRAME_SIZE) as f32 / rate;
            frames.push(CueFrame {
                time: start + block.len() as f32 / rate * 0.5,
                rms: compute_rms(block),
                centroid_hz: self.spectral_centroid(block)?,
            });
        }

        Ok(CueAnalysis {
            sample_rate: self.sample_rate,
            duration_seconds: samples.len() as f32 / rate,
            peak,
            rms: compute_rms(samples),
            centroid_hz,
            frames,
        })
    }

    fn spectral_centroid(&mut self, samples: &[f32]) -> Result<f32> {
        let len = samples.len();
        let bin_hz = self.sample_rate as f32 / len as f32;
        let fft = self.prepare_fft(len);

        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        let mut magnitude_sum = 0.0;
        let mut weighted_sum = 0.0;
        for (i, bin) in fft.spectrum.iter().enumerate() {
            let magnitude = bin.norm();
            magnitude_sum += magnitude;
            weighted_sum += magnitude * (i as f32 * bin_hz);
        }

        if magnitude_sum <= f32::EPSILON {
            Ok(0.0)
        } else {
            Ok(weighted_sum / magnitude_sum)
        }
    }

    fn prepare_fft(&mut self, size: usize) -> &mut FftResources {
        let planner = &mut self.fft_planner;
        let fft = self.fft.get_or_insert_with(|| FftResources::plan(planner, size));
        if fft.size != size {
            *fft = FftResources::plan(planner, size);
        }
        fft
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn plan(planner: &mut RealFftPlanner<f32>, size: usize) -> Self {
        let plan = planner.plan_fft_forward(size);
        Self {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for CueAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CueAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{audio, AudioSettings, SoundEvent};

    fn sine(hz: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * hz * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn silence_has_no_features() {
        let analysis = CueAnalysis::of(&[0.0; 1024], 48_000).unwrap();
        assert!(analysis.is_silent());
        assert_eq!(analysis.rms, 0.0);
        assert_eq!(analysis.centroid_hz, 0.0);
        assert_eq!(analysis.frames.len(), 4);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(
            CueAnalysis::of(&[0.5], 8_000),
            Err(GlitchError::InvalidInput(_))
        ));
    }

    #[test]
    fn pure_tone_centroid_sits_on_its_pitch() {
        let analysis = CueAnalysis::of(&sine(1_000.0, 8_000, 4_000), 8_000).unwrap();
        assert!((analysis.centroid_hz - 1_000.0).abs() < 60.0);
        assert!((analysis.peak - 1.0).abs() < 1e-3);
        assert!((analysis.rms - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!((analysis.duration_seconds - 0.5).abs() < 1e-6);
    }

    #[test]
    fn toggle_cue_is_pitched_and_decays() {
        let samples = audio::render_event(SoundEvent::Toggle, AudioSettings::default(), 16_000, Some(1));
        let analysis = CueAnalysis::of(&samples, 16_000).unwrap();

        assert!(!analysis.is_silent());
        assert!(analysis.centroid_hz > 700.0 && analysis.centroid_hz < 1_400.0);
        let first = analysis.frames.first().unwrap();
        let last = analysis.frames.last().unwrap();
        assert!(first.rms > last.rms);
    }

    #[test]
    fn analyzer_replans_for_new_sizes() {
        let mut analyzer = CueAnalyzer::new(8_000);
        analyzer.analyze(&sine(500.0, 8_000, 600)).unwrap();
        let analysis = analyzer.analyze(&sine(500.0, 8_000, 900)).unwrap();
        assert_eq!(analysis.frames.len(), 4);
        assert!((analysis.centroid_hz - 500.0).abs() < 80.0);
    }
}
