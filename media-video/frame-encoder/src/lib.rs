//! Streaming H.264 frame encoder
//!
//! Converts in-memory images to planar YCbCr 4:2:0, submits them to a [`CompressionEngine`]
//! and writes the compressed Annex-B stream to any [`std::io::Write`].
//!
//! ```no_run
//! # #[cfg(feature = "openh264")]
//! # fn main() -> Result<(), frame_encoder::EncoderError> {
//! use frame_encoder::{Encoder, EncodingOptions};
//! use image::{DynamicImage, Rgba, RgbaImage};
//!
//! let options = EncodingOptions {
//!     preset: "veryfast".into(),
//!     profile: "baseline".into(),
//!     ..EncodingOptions::new(640, 480, 30)
//! };
//!
//! let file = std::fs::File::create("out.h264").unwrap();
//! let mut encoder = Encoder::open(file, options)?;
//!
//! let frame = DynamicImage::ImageRgba8(RgbaImage::from_pixel(640, 480, Rgba([255, 0, 0, 255])));
//! for _ in 0..30 {
//!     encoder.encode(&frame)?;
//! }
//!
//! encoder.flush()?;
//! encoder.close()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "openh264"))]
//! # fn main() {}
//! ```

mod convert;
mod encoder;
mod error;
mod options;

pub mod engine;
pub mod nal;
pub mod params;

pub use convert::PlanarPicture;
pub use encoder::{Encoder, EncoderState};
pub use engine::{AccessUnit, CompressionEngine, OwnedPicture, Picture};
pub use error::{ConfigurationError, ConvertError, EncoderError, EngineError, WriteError};
pub use options::{EncodingOptions, LogLevel, Preset, Profile, Tune, TuneSet};
pub use params::EngineParams;

#[cfg(feature = "openh264")]
pub use engine::openh264::{OpenH264Engine, OpenH264EngineError};
