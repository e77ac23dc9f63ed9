use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::timeline::{Animation, AnimationState, Tick, Ticker};

/// Fixed blur applied underneath every glitch frame.
pub const BASE_BLUR_PX: f32 = 5.0;
/// Fixed dimming applied underneath every glitch frame.
pub const BASE_BRIGHTNESS: f32 = 0.6;

/// Visual transform applied to the image surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub skew_deg: f32,
    pub scale: f32,
    pub blur_px: f32,
    /// Extra brightness multiplier on top of [`BASE_BRIGHTNESS`].
    pub brightness: f32,
    pub contrast: f32,
}

impl Transform {
    /// Fully visible, undistorted.
    pub const REST: Transform = Transform {
        opacity: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        skew_deg: 0.0,
        scale: 1.0,
        blur_px: BASE_BLUR_PX,
        brightness: 1.0,
        contrast: 1.0,
    };

    /// Hidden state the surface sits in before the first hover.
    pub const HIDDEN: Transform = Transform {
        opacity: 0.0,
        scale: 0.95,
        ..Transform::REST
    };

    pub fn css_transform(&self) -> String {
        format!(
            "translate({:.2}px, {:.2}px) skewX({:.2}deg) scale({:.3})",
            self.offset_x, self.offset_y, self.skew_deg, self.scale
        )
    }

    pub fn css_filter(&self) -> String {
        format!(
            "blur({}px) brightness({}) brightness({:.3}) contrast({:.3})",
            self.blur_px, BASE_BRIGHTNESS, self.brightness, self.contrast
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::HIDDEN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlitchProfile {
    /// Pointer enter: converge to [`Transform::REST`].
    In,
    /// Pointer leave: scatter towards [`Transform::HIDDEN`].
    Out,
}

impl GlitchProfile {
    pub fn steps(self) -> u32 {
        match self {
            GlitchProfile::In => 8,
            GlitchProfile::Out => 5,
        }
    }

    pub fn interval_ms(self) -> u64 {
        match self {
            GlitchProfile::In => 40,
            GlitchProfile::Out => 30,
        }
    }

    /// Progress after `step` ticks: rises 0→1 for `In`, falls 1→0 for `Out`.
    pub fn progress(self, step: u32) -> f32 {
        let ratio = step as f32 / self.steps() as f32;
        match self {
            GlitchProfile::In => ratio,
            GlitchProfile::Out => 1.0 - ratio,
        }
    }
}

/// One running glitch burst.
#[derive(Debug, Clone)]
pub struct GlitchEffect {
    profile: GlitchProfile,
    ticker: Ticker,
    rng: StdRng,
}

impl GlitchEffect {
    pub fn start(profile: GlitchProfile, now_ms: u64, seed: Option<u64>) -> Self {
        let mut ticker = Ticker::new(profile.interval_ms(), profile.steps());
        ticker.start(now_ms, 0);
        Self {
            profile,
            ticker,
            rng: StdRng::seed_from_u64(seed.unwrap_or_else(rand::random)),
        }
    }

    pub fn profile(&self) -> GlitchProfile {
        self.profile
    }

    fn jitter(&mut self, amplitude: f32) -> f32 {
        (self.rng.random::<f32>() - 0.5) * amplitude
    }
}

impl Animation for GlitchEffect {
    type Frame = Transform;

    fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }

    fn on_tick(&mut self, tick: Tick) -> Transform {
        let progress = self.profile.progress(tick.index);
        match (self.profile, tick.is_last) {
            (GlitchProfile::In, true) => Transform::REST,
            (GlitchProfile::Out, true) => Transform::HIDDEN,
            (GlitchProfile::In, false) => {
                let spread = 1.0 - progress;
                Transform {
                    opacity: progress,
                    offset_x: self.jitter(20.0) * spread,
                    offset_y: self.jitter(10.0) * spread,
                    skew_deg: self.jitter(5.0) * spread,
                    scale: 0.95 + progress * 0.05,
                    blur_px: BASE_BLUR_PX,
                    brightness: 1.0 + spread * 0.5,
                    contrast: 1.0 + spread * 0.3,
                }
            }
            (GlitchProfile::Out, false) => Transform {
                opacity: progress.max(0.0),
                offset_x: self.jitter(30.0),
                offset_y: self.jitter(15.0),
                skew_deg: 0.0,
                scale: 0.9 + progress * 0.1,
                blur_px: BASE_BLUR_PX,
                brightness: 1.0 + (1.0 - progress),
                contrast: 1.5 - progress * 0.5,
            },
        }
    }
}

/// The shared transform target of one image surface.
///
/// Only one effect drives the surface at a time; starting a new one cancels
/// the one in flight (last writer wins).
#[derive(Debug, Clone, Default)]
pub struct GlitchSurface {
    transform: Transform,
    active: Option<GlitchEffect>,
    seed: Option<u64>,
}

impl GlitchSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic jitter, for tests and offline previews.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn active_profile(&self) -> Option<GlitchProfile> {
        self.active.as_ref().map(GlitchEffect::profile)
    }

    pub fn enter(&mut self, now_ms: u64) {
        self.begin(GlitchProfile::In, now_ms);
    }

    pub fn leave(&mut self, now_ms: u64) {
        self.begin(GlitchProfile::Out, now_ms);
    }

    /// Cancels any running effect without touching the transform.
    pub fn hide(&mut self) {
        if let Some(mut effect) = self.active.take() {
            effect.cancel();
        }
    }

    fn begin(&mut self, profile: GlitchProfile, now_ms: u64) {
        if let Some(mut previous) = self.active.take() {
            if previous.cancel() {
                tracing::debug!(?profile, cancelled = ?previous.profile(), "glitch effect replaced");
            }
        }
        let seed = self.seed.map(|seed| seed.wrapping_add(now_ms));
        self.active = Some(GlitchEffect::start(profile, now_ms, seed));
    }

    /// Applies every due frame and returns the number of frames applied.
    pub fn advance(&mut self, now_ms: u64) -> usize {
        let Some(effect) = self.active.as_mut() else {
            return 0;
        };
        let frames = effect.advance(now_ms);
        if let Some(last) = frames.last() {
            self.transform = last.frame;
        }
        if effect.state() == AnimationState::Completed {
            self.active = None;
        }
        frames.len()
    }
}
