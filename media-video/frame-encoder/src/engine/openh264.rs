//! [`CompressionEngine`] backed by Cisco's openh264

use super::{AccessUnit, CompressionEngine, Picture};
use crate::{
    nal,
    options::{LogLevel, Profile},
    params::{AqMode, EngineParams},
};
use bytes::Bytes;
use openh264::{
    OpenH264API, Timestamp,
    encoder::{Complexity, Encoder, EncoderConfig, FrameRate, FrameType, IntraFramePeriod},
    formats::YUVSlices,
};

#[derive(Debug, thiserror::Error)]
pub enum OpenH264EngineError {
    #[error("openh264 requires even frame dimensions, got {width}x{height}")]
    OddDimensions { width: u32, height: u32 },
    #[error("openh264 cannot encode profile {0}")]
    UnsupportedProfile(Profile),
    #[error("openh264 did not produce parameter sets")]
    MissingParameterSets,
    #[error("openh264: {0}")]
    Native(String),
}

impl From<openh264::Error> for OpenH264EngineError {
    fn from(e: openh264::Error) -> Self {
        OpenH264EngineError::Native(e.to_string())
    }
}

/// openh264 never holds pictures back and frame skipping is disabled, every submitted picture
/// produces exactly one access unit
///
/// Only `scenecut`, `aq_mode`, `subme`, `keyint_max`, the frame rate and the profile of the
/// [`EngineParams`] have an openh264 counterpart. [`LogLevel::Debug`] enables openh264's own
/// console tracing, any other level keeps it quiet. Messages openh264 prints while initializing
/// are not covered by that switch.
pub struct OpenH264Engine {
    encoder: Encoder,
    width: u32,
    height: u32,
    fps_num: u32,
    fps_den: u32,
    log_level: LogLevel,
    headers: Bytes,
}

impl OpenH264Engine {
    fn timestamp(&self, pts: i64) -> Timestamp {
        let millis = pts.max(0) as u64 * 1000 * u64::from(self.fps_den) / u64::from(self.fps_num);

        Timestamp::from_millis(millis)
    }
}

impl CompressionEngine for OpenH264Engine {
    type Error = OpenH264EngineError;

    fn open(params: &EngineParams) -> Result<Self, Self::Error> {
        if params.width % 2 != 0 || params.height % 2 != 0 {
            return Err(OpenH264EngineError::OddDimensions {
                width: params.width,
                height: params.height,
            });
        }

        if let Some(profile) = params.profile.filter(|p| map_profile(*p).is_none()) {
            return Err(OpenH264EngineError::UnsupportedProfile(profile));
        }

        if params.intra_refresh && params.log_level.allows(LogLevel::Debug) {
            log::debug!(
                "openh264 has no periodic intra refresh, using IDR frames every {} frames",
                params.keyint_max
            );
        }

        let encoder =
            Encoder::with_api_config(OpenH264API::from_source(), openh264_encoder_config(params))?;
        let headers = probe_parameter_sets(params)?;

        if params.log_level.allows(LogLevel::Info) {
            log::info!(
                "Opened openh264 encoder {}x{} @ {}/{} fps, profile={:?}",
                params.width,
                params.height,
                params.fps_num,
                params.fps_den,
                params.profile
            );
        }

        Ok(OpenH264Engine {
            encoder,
            width: params.width,
            height: params.height,
            fps_num: params.fps_num.max(1),
            fps_den: params.fps_den.max(1),
            log_level: params.log_level,
            headers,
        })
    }

    fn headers(&mut self) -> Result<Bytes, Self::Error> {
        Ok(self.headers.clone())
    }

    fn encode(&mut self, picture: Option<&Picture<'_>>) -> Result<Option<AccessUnit>, Self::Error> {
        // Nothing is ever delayed, so there is nothing to drain
        let Some(picture) = picture else {
            return Ok(None);
        };

        let timestamp = self.timestamp(picture.pts);

        let [y, u, v] = picture.planes;
        let [y_stride, u_stride, v_stride] = picture.strides;

        let input = YUVSlices::new(
            (y, u, v),
            (self.width as usize, self.height as usize),
            (y_stride, u_stride, v_stride),
        );

        let bitstream = self.encoder.encode_at(&input, timestamp)?;

        let keyframe = match bitstream.frame_type() {
            FrameType::Invalid | FrameType::Skip => {
                if self.log_level.allows(LogLevel::Warning) {
                    log::warn!(
                        "openh264 produced no picture for pts={}, frame type {:?}",
                        picture.pts,
                        bitstream.frame_type()
                    );
                }

                return Ok(None);
            }
            FrameType::IDR | FrameType::I => true,
            FrameType::P | FrameType::IPMixed => false,
        };

        Ok(Some(AccessUnit {
            data: Bytes::from(bitstream.to_vec()),
            pts: picture.pts,
            keyframe,
        }))
    }

    fn delayed_frames(&self) -> usize {
        0
    }

    fn close(self) {
        if self.log_level.allows(LogLevel::Debug) {
            log::debug!("Closing openh264 encoder");
        }
    }
}

/// Encode a neutral gray picture with a separate encoder and keep its SPS/PPS
///
/// Parameter sets only depend on the configuration, so they are identical to the ones the
/// real encoder puts in front of its keyframes.
fn probe_parameter_sets(params: &EngineParams) -> Result<Bytes, OpenH264EngineError> {
    let mut probe =
        Encoder::with_api_config(OpenH264API::from_source(), openh264_encoder_config(params))?;

    let width = params.width as usize;
    let height = params.height as usize;

    let y = vec![0x80; width * height];
    let uv = vec![0x80; (width / 2) * (height / 2)];

    let input = YUVSlices::new(
        (y.as_slice(), uv.as_slice(), uv.as_slice()),
        (width, height),
        (width, width / 2, width / 2),
    );

    let bitstream = probe.encode_at(&input, Timestamp::from_millis(0))?;
    let headers = nal::parameter_sets(Bytes::from(bitstream.to_vec()));

    if headers.is_empty() {
        return Err(OpenH264EngineError::MissingParameterSets);
    }

    Ok(headers)
}

/// openh264 only encodes 8 bit 4:2:0, it falls back to an unspecified profile for everything else
fn map_profile(profile: Profile) -> Option<openh264::encoder::Profile> {
    match profile {
        Profile::Baseline => Some(openh264::encoder::Profile::Baseline),
        Profile::Main => Some(openh264::encoder::Profile::Main),
        Profile::High => Some(openh264::encoder::Profile::High),
        Profile::High10 | Profile::High422 | Profile::High444 => None,
    }
}

fn map_complexity(subme: u8) -> Complexity {
    match subme {
        0..=2 => Complexity::Low,
        3..=7 => Complexity::Medium,
        _ => Complexity::High,
    }
}

/// Create a openh264 encoder config from the [`EngineParams`]
fn openh264_encoder_config(params: &EngineParams) -> EncoderConfig {
    let mut config = EncoderConfig::new()
        .max_frame_rate(FrameRate::from_hz(
            params.fps_num as f32 / params.fps_den.max(1) as f32,
        ))
        .intra_frame_period(IntraFramePeriod::from_num_frames(params.keyint_max))
        .complexity(map_complexity(params.subme))
        .skip_frames(false)
        .scene_change_detect(params.scenecut > 0)
        .adaptive_quantization(params.aq_mode != AqMode::Disabled)
        .debug(params.log_level == LogLevel::Debug);

    if let Some(profile) = params.profile.and_then(map_profile) {
        config = config.profile(profile);
    }

    config
}
