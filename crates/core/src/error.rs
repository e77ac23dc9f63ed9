/// Result alias that carries the custom [`GlitchError`] type.
pub type Result<T> = std::result::Result<T, GlitchError>;

/// Common error type for the core crate.
///
/// Rendering and sound triggering never produce errors; these variants only
/// surface at the edges (configuration, persisted settings, file export and
/// external collaborators).
#[derive(Debug, thiserror::Error)]
pub enum GlitchError {
    /// Free-form message, mostly produced by external collaborators.
    #[error("{0}")]
    Message(String),
    /// Caller supplied data that cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration or settings file could not be (de)serialised.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Raster export failed.
    #[error("image: {0}")]
    Image(#[from] image::ImageError),
    /// WAV export failed.
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    /// Spectral analysis failed.
    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
}

impl GlitchError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for GlitchError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for GlitchError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
