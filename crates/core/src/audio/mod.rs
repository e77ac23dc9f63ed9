pub mod recipes;
pub mod synth;

use std::{fmt, path::Path};

use rand::{rngs::StdRng, SeedableRng};

use crate::{AudioSettings, AudioState, Result};

pub use recipes::{SoundEvent, SoundEventSpec};
pub use synth::{OfflineGraph, ScheduledVoice, Waveform};

/// Output graph that voices are scheduled onto.
///
/// The live backend and the offline renderer both implement this; tests use
/// a counting stub.
pub trait SynthesisGraph {
    /// Graph time in seconds; voice start times are absolute on this clock.
    fn current_time(&self) -> f64;

    /// Places one self-disposing voice on the graph.
    fn schedule(&mut self, voice: ScheduledVoice) -> Result<()>;
}

/// Creates the shared graph on first use. An error means output is not
/// available yet (for example, not unlocked by a user gesture).
pub type GraphFactory<G> = Box<dyn FnMut() -> Result<G>>;

/// Plays named UI sound cues on a lazily created synthesis graph.
pub struct SoundEventEngine<G> {
    state: AudioState,
    factory: GraphFactory<G>,
    graph: Option<G>,
    rng: StdRng,
}

impl<G: SynthesisGraph> SoundEventEngine<G> {
    pub fn new(state: AudioState, factory: impl FnMut() -> Result<G> + 'static) -> Self {
        Self {
            state,
            factory: Box::new(factory),
            graph: None,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Fixes the randomised cue parameters, for reproducible renders.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> &AudioState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_enabled()
    }

    /// The graph, if it has been created.
    pub fn graph(&self) -> Option<&G> {
        self.graph.as_ref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut G> {
        self.graph.as_mut()
    }

    /// Plays `event` and returns the number of voices scheduled.
    ///
    /// Never fails: disabled audio, an unavailable graph or a rejected voice
    /// all degrade to silence.
    pub fn trigger(&mut self, event: SoundEvent) -> usize {
        if !self.state.is_enabled() {
            return 0;
        }
        let master_volume = f64::from(self.state.master_volume());
        if !self.ensure_graph() {
            return 0;
        }
        let Some(graph) = self.graph.as_mut() else {
            return 0;
        };

        let voices = event
            .spec()
            .instantiate(graph.current_time(), master_volume, &mut self.rng);
        let mut scheduled = 0;
        for voice in voices {
            match graph.schedule(voice) {
                Ok(()) => scheduled += 1,
                Err(err) => tracing::warn!(%event, %err, "voice rejected by synthesis graph"),
            }
        }
        tracing::trace!(%event, scheduled, "sound event triggered");
        scheduled
    }

    /// Plays an event by its kebab-case name. Unknown names are ignored.
    pub fn play(&mut self, name: &str) -> usize {
        match name.parse::<SoundEvent>() {
            Ok(event) => self.trigger(event),
            Err(err) => {
                tracing::debug!(%err, "ignoring sound request");
                0
            }
        }
    }

    /// Flips the enabled flag and returns the new value.
    ///
    /// The toggle cue is audible either way: it plays before muting and
    /// after unmuting.
    pub fn toggle_sound(&mut self) -> bool {
        if self.state.is_enabled() {
            self.trigger(SoundEvent::Toggle);
            self.state.set_enabled(false);
            false
        } else {
            self.state.set_enabled(true);
            self.trigger(SoundEvent::Toggle);
            true
        }
    }

    /// Sets the master volume, clamped into `[0, 1]`.
    pub fn set_volume(&self, volume: f32) {
        self.state.set_volume(volume);
    }

    fn ensure_graph(&mut self) -> bool {
        if self.graph.is_some() {
            return true;
        }
        match (self.factory)() {
            Ok(graph) => {
                tracing::debug!("synthesis graph created");
                self.graph = Some(graph);
                true
            }
            Err(err) => {
                tracing::debug!(%err, "synthesis graph unavailable; staying silent");
                false
            }
        }
    }
}

impl<G: fmt::Debug> fmt::Debug for SoundEventEngine<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundEventEngine")
            .field("state", &self.state)
            .field("graph", &self.graph)
            .finish_non_exhaustive()
    }
}

/// Renders one cue offline from time zero until its last voice ends.
///
/// Returns an empty buffer when `settings` has audio disabled.
pub fn render_event(
    event: SoundEvent,
    settings: AudioSettings,
    sample_rate: u32,
    seed: Option<u64>,
) -> Vec<f32> {
    let mut engine = SoundEventEngine::new(AudioState::new(settings), move || {
        Ok(OfflineGraph::new(sample_rate))
    });
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }

    engine.trigger(event);
    engine
        .graph_mut()
        .map(OfflineGraph::render_until_idle)
        .unwrap_or_default()
}

/// Writes mono 32-bit float samples to a WAV file.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Renders `event` and stores it at `path`. Returns the rendered samples.
pub fn render_event_to_wav(
    event: SoundEvent,
    settings: AudioSettings,
    sample_rate: u32,
    path: &Path,
) -> Result<Vec<f32>> {
    let samples = render_event(event, settings, sample_rate, None);
    write_wav(path, &samples, sample_rate)?;
    tracing::info!(%event, path = %path.display(), frames = samples.len(), "cue written");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::GlitchError;

    #[derive(Debug, Default)]
    struct CountingGraph {
        voices: Vec<ScheduledVoice>,
    }

    impl SynthesisGraph for CountingGraph {
        fn current_time(&self) -> f64 {
            1.5
        }

        fn schedule(&mut self, voice: ScheduledVoice) -> Result<()> {
            self.voices.push(voice);
            Ok(())
        }
    }

    fn counting_engine(settings: AudioSettings) -> (SoundEventEngine<CountingGraph>, Rc<Cell<u32>>) {
        let created = Rc::new(Cell::new(0));
        let counter = created.clone();
        let engine = SoundEventEngine::new(AudioState::new(settings), move || {
            counter.set(counter.get() + 1);
            Ok(CountingGraph::default())
        })
        .with_seed(7);
        (engine, created)
    }

    #[test]
    fn disabled_audio_creates_no_voices() {
        let settings = AudioSettings {
            enabled: false,
            ..AudioSettings::default()
        };
        let (mut engine, created) = counting_engine(settings);

        for event in SoundEvent::ALL {
            assert_eq!(engine.trigger(event), 0);
        }
        assert_eq!(created.get(), 0);
        assert!(engine.graph().is_none());
    }

    #[test]
    fn graph_is_created_once_and_shared() {
        let (mut engine, created) = counting_engine(AudioSettings::default());

        assert_eq!(engine.trigger(SoundEvent::Success), 4);
        assert_eq!(engine.trigger(SoundEvent::Scramble), 8);
        assert_eq!(engine.play("nav-click"), 2);
        assert_eq!(engine.play("unknown"), 0);

        assert_eq!(created.get(), 1);
        let graph = engine.graph().unwrap();
        assert_eq!(graph.voices.len(), 14);
        assert!(graph.voices.iter().all(|voice| voice.start >= 1.5));
    }

    #[test]
    fn unavailable_graph_is_a_silent_no_op() {
        let attempts = Rc::new(Cell::new(0));
        let counter = attempts.clone();
        let mut engine: SoundEventEngine<CountingGraph> =
            SoundEventEngine::new(AudioState::default(), move || {
                counter.set(counter.get() + 1);
                Err(GlitchError::msg("output locked"))
            });

        assert_eq!(engine.trigger(SoundEvent::Click), 0);
        assert_eq!(engine.trigger(SoundEvent::Hover), 0);
        assert!(engine.graph().is_none());
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn toggle_cue_plays_on_both_transitions() {
        let (mut engine, _) = counting_engine(AudioSettings::default());

        assert!(!engine.toggle_sound());
        assert!(!engine.is_enabled());
        assert_eq!(engine.graph().unwrap().voices.len(), 1);

        assert_eq!(engine.trigger(SoundEvent::Click), 0);

        assert!(engine.toggle_sound());
        assert_eq!(engine.graph().unwrap().voices.len(), 2);
    }

    #[test]
    fn master_volume_scales_envelope_peak() {
        let (mut engine, _) = counting_engine(AudioSettings::default());
        engine.set_volume(4.0);
        engine.trigger(SoundEvent::Click);

        let voice = &engine.graph().unwrap().voices[0];
        assert!((voice.gain.value_at(0.0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rendered_cue_is_audible_and_bounded() {
        let samples = render_event(SoundEvent::Hover, AudioSettings::default(), 8_000, Some(1));
        assert!(samples.len() >= 640);
        assert!(samples.iter().any(|s| s.abs() > 0.01));
        assert!(samples.iter().all(|s| s.abs() <= 0.3 * 0.15 + 1e-6));

        let muted = AudioSettings {
            enabled: false,
            ..AudioSettings::default()
        };
        assert!(render_event(SoundEvent::Hover, muted, 8_000, Some(1)).is_empty());
    }

    #[test]
    fn wav_round_trips_through_hound() {
        let path = std::env::temp_dir().join(format!("glitch-cue-{}.wav", std::process::id()));
        let samples = render_event_to_wav(SoundEvent::Back, AudioSettings::default(), 8_000, &path)
            .unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.len() as usize, samples.len());
        std::fs::remove_file(&path).ok();
    }
}
