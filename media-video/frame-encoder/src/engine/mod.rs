//! Compression engine capability set used by the [`Encoder`](crate::Encoder)

use crate::{
    error::ConfigurationError,
    options::{Preset, Profile, TuneSet},
    params::EngineParams,
};
use bytes::Bytes;
use std::error::Error;

#[cfg(feature = "openh264")]
pub mod openh264;

/// One planar 4:2:0 picture submitted to an engine
///
/// Borrows the encoder's planes for the duration of a single [`CompressionEngine::encode`] call.
/// Engines which keep pictures past that call must copy them, see [`Picture::to_owned_planes`].
#[derive(Debug, Clone, Copy)]
pub struct Picture<'a> {
    pub width: u32,
    pub height: u32,

    pub planes: [&'a [u8]; 3],
    pub strides: [usize; 3],

    /// Presentation timestamp, the input index of this picture
    pub pts: i64,
}

impl Picture<'_> {
    pub fn to_owned_planes(&self) -> OwnedPicture {
        OwnedPicture {
            width: self.width,
            height: self.height,
            planes: self.planes.map(<[u8]>::to_vec),
            strides: self.strides,
            pts: self.pts,
        }
    }
}

/// Copy of a [`Picture`] owning its planes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedPicture {
    pub width: u32,
    pub height: u32,
    pub planes: [Vec<u8>; 3],
    pub strides: [usize; 3],
    pub pts: i64,
}

/// Compressed output of a single picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessUnit {
    /// Annex-B byte stream, including parameter sets in front of keyframes
    pub data: Bytes,
    /// Presentation timestamp of the encoded picture
    pub pts: i64,
    pub keyframe: bool,
}

/// Opaque block based video compressor
///
/// The engine may hold pictures back for lookahead and reordering, [`CompressionEngine::delayed_frames`]
/// reports how many are pending. Output is produced in display order.
pub trait CompressionEngine: Sized {
    type Error: Error + Send + Sync + 'static;

    /// Reset `params` to the defaults of `preset` and apply `tune`
    fn apply_preset_tuning(
        params: &mut EngineParams,
        preset: Preset,
        tune: &TuneSet,
    ) -> Result<(), ConfigurationError> {
        params.apply_preset_tuning(preset, tune)
    }

    /// Restrict `params` to `profile`
    fn apply_profile(params: &mut EngineParams, profile: Profile) -> Result<(), ConfigurationError> {
        params.apply_profile(profile)
    }

    fn open(params: &EngineParams) -> Result<Self, Self::Error>;

    /// Parameter sets (SPS/PPS) of the stream as an Annex-B byte stream
    fn headers(&mut self) -> Result<Bytes, Self::Error>;

    /// Submit a picture, or `None` to drain a delayed picture
    ///
    /// Returns `Ok(None)` if no access unit was produced by this call.
    fn encode(&mut self, picture: Option<&Picture<'_>>) -> Result<Option<AccessUnit>, Self::Error>;

    /// Number of submitted pictures which have not produced output yet
    fn delayed_frames(&self) -> usize;

    fn close(self);
}
