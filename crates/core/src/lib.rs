//! Core library for the Glitch Terminal interface effects.
//!
//! Each module owns one subsystem: the 5×7 bitmap font and its rasterizer,
//! the scramble and glitch animations driven by a shared ticker, the
//! procedural sound cues and their offline renderer, and the observable
//! theme/audio state the rest of the crate is wired through. Everything is
//! single-threaded and clock-agnostic so the app crate and the tests can
//! drive it with simulated time.

pub mod analysis;
pub mod audio;
pub mod collab;
pub mod color;
pub mod config;
pub mod error;
pub mod glitch;
pub mod glyph;
pub mod interaction;
pub mod loader;
pub mod render;
pub mod scramble;
pub mod state;
pub mod timeline;

pub use analysis::{CueAnalysis, CueAnalyzer, CueFrame};
pub use audio::{
    OfflineGraph, ScheduledVoice, SoundEvent, SoundEventEngine, SoundEventSpec, SynthesisGraph,
};
pub use collab::{MarketData, MemoryRecordStore, RecordStore};
pub use color::{ColorRequest, ColorResolver, ColorSlot, HighlightColor, Palette, Rgb, Theme};
pub use config::{AppConfig, AudioConfig, RenderConfig};
pub use error::{GlitchError, Result};
pub use glitch::{GlitchEffect, GlitchProfile, GlitchSurface, Transform};
pub use glyph::{Glyph, GlyphTable};
pub use interaction::{CardController, CardField, CueSink, LabelController};
pub use loader::LoaderSequence;
pub use render::{PixelText, Raster, Rasterizer, RenderRequest};
pub use scramble::{
    EndPolicy, ScrambleAnimator, ScrambleOptions, ScrambleSequence, ScrambleSession,
};
pub use state::{AudioSettings, AudioState, Observable, Subscription, ThemeState};
pub use timeline::{Animation, AnimationState, Scheduler, SimulatedClock, SystemClock, TickSource};
