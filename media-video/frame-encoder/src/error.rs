use crate::{
    encoder::EncoderState,
    options::{Profile, Tune},
};
use std::{error::Error, fmt, io};

/// Boxed error of a [`CompressionEngine`](crate::engine::CompressionEngine)
pub type EngineError = Box<dyn Error + Send + Sync + 'static>;

/// Invalid or unsupported encoder configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Frame rate must be larger than zero")]
    InvalidFrameRate,
    #[error("Unknown preset name {0:?}")]
    UnknownPreset(String),
    #[error("Unknown tune name {0:?}")]
    UnknownTune(String),
    #[error("Unknown profile name {0:?}")]
    UnknownProfile(String),
    #[error("Unknown log level {0:?}")]
    UnknownLogLevel(String),
    #[error("Tunes {0} and {1} cannot be combined")]
    ConflictingTunes(Tune, Tune),
    #[error("Profile {profile} does not support a bit depth of {bit_depth}")]
    UnsupportedBitDepth { profile: Profile, bit_depth: u8 },
    #[error("Profile {0} does not support interlacing")]
    UnsupportedInterlacing(Profile),
}

/// Source image cannot be converted into the planar buffers
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Image size {actual:?} does not match the configured size {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}

/// Output sink rejected or truncated a write
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Short write, expected to write {expected} bytes, sink accepted {actual}")]
    Short { expected: usize, actual: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EncoderError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("Compression engine refused to open: {0}")]
    EngineOpen(#[source] EngineError),
    #[error("Failed to encode stream headers: {0}")]
    HeaderEncode(#[source] EngineError),
    #[error("Failed to encode picture ({}): {source}", FlushOrPts(.pts))]
    Encode {
        /// `None` when the failure happened while flushing delayed pictures
        pts: Option<i64>,
        #[source]
        source: EngineError,
    },
    #[error("Failed to write to the output sink: {0}")]
    Write(#[from] WriteError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("Cannot {operation} an encoder in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: EncoderState,
    },
}

struct FlushOrPts<'a>(&'a Option<i64>);

impl fmt::Display for FlushOrPts<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            Some(pts) => write!(f, "pts={pts}"),
            None => f.write_str("flush"),
        }
    }
}

impl EncoderError {
    /// Returns the counts of a short write, `(expected, actual)`
    pub fn short_write(&self) -> Option<(usize, usize)> {
        match self {
            EncoderError::Write(WriteError::Short { expected, actual }) => {
                Some((*expected, *actual))
            }
            _ => None,
        }
    }
}
