use crate::{
    convert::PlanarPicture,
    engine::{AccessUnit, CompressionEngine, Picture},
    error::{EncoderError, WriteError},
    options::EncodingOptions,
    params::{Csp, EngineParams},
};
use image::DynamicImage;
use std::io::Write;

#[cfg(feature = "openh264")]
use crate::engine::openh264::OpenH264Engine;

/// Lifecycle state of an [`Encoder`]
///
/// An encoder only exists after it was opened successfully, so there is no unopened state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Open,
    Closed,
}

/// Resources released by [`Encoder::close`]
struct OpenEncoder<E> {
    engine: E,
    picture: PlanarPicture,
}

/// Converts images to I420, feeds them to a [`CompressionEngine`] and writes the
/// resulting Annex-B stream to `W`
///
/// Output starts with the stream headers written by [`Encoder::open`]. Engines may
/// hold pictures back, call [`Encoder::flush`] before [`Encoder::close`] to receive them.
pub struct Encoder<W, E> {
    sink: W,
    inner: Option<OpenEncoder<E>>,
    options: EncodingOptions,

    /// Presentation timestamp of the next submitted picture
    pts: i64,
}

#[cfg(feature = "openh264")]
impl<W: Write> Encoder<W, OpenH264Engine> {
    /// Open an encoder using openh264 and write the stream headers to `sink`
    pub fn open(sink: W, options: EncodingOptions) -> Result<Self, EncoderError> {
        Self::with_engine(sink, options)
    }
}

impl<W: Write, E: CompressionEngine> Encoder<W, E> {
    /// Open an encoder using the engine `E` and write the stream headers to `sink`
    pub fn with_engine(mut sink: W, options: EncodingOptions) -> Result<Self, EncoderError> {
        let names = options.validate()?;

        let picture = PlanarPicture::new(options.width, options.height);

        let mut params = EngineParams::default();

        if let (Some(preset), Some(_)) = (names.preset, names.profile) {
            E::apply_preset_tuning(&mut params, preset, &names.tune)?;
        }

        params.width = options.width;
        params.height = options.height;
        params.csp = Csp::I420;
        params.log_level = options.log_level;
        params.bit_depth = 8;

        params.vfr_input = false;
        params.repeat_headers = true;
        params.annexb = true;

        params.intra_refresh = true;
        params.keyint_max = options.frame_rate;
        params.fps_num = options.frame_rate;
        params.fps_den = 1;

        if let Some(profile) = names.profile {
            E::apply_profile(&mut params, profile)?;
        }

        log::debug!(
            "Opening compression engine, up to {} delayed pictures, {params:?}",
            params.max_delayed_frames()
        );

        let mut engine = E::open(&params).map_err(|e| EncoderError::EngineOpen(Box::new(e)))?;

        let headers = match engine.headers() {
            Ok(headers) if !headers.is_empty() => headers,
            Ok(_) => {
                engine.close();
                return Err(EncoderError::HeaderEncode(
                    "engine returned empty stream headers".into(),
                ));
            }
            Err(e) => {
                engine.close();
                return Err(EncoderError::HeaderEncode(Box::new(e)));
            }
        };

        if let Err(e) = write_once(&mut sink, &headers) {
            engine.close();
            return Err(e.into());
        }

        log::debug!("Wrote {} bytes of stream headers", headers.len());

        Ok(Self {
            sink,
            inner: Some(OpenEncoder { engine, picture }),
            options,
            pts: 0,
        })
    }

    pub fn state(&self) -> EncoderState {
        if self.inner.is_some() {
            EncoderState::Open
        } else {
            EncoderState::Closed
        }
    }

    pub fn options(&self) -> &EncodingOptions {
        &self.options
    }

    /// Presentation timestamp the next encoded image will receive
    pub fn next_pts(&self) -> i64 {
        self.pts
    }

    /// Number of pictures the engine holds back, 0 once closed
    pub fn delayed_frames(&self) -> usize {
        self.inner
            .as_ref()
            .map(|open| open.engine.delayed_frames())
            .unwrap_or(0)
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Encode a single image, it must have the configured dimensions
    ///
    /// Returns the size of the access unit written to the sink, or `None` if the engine
    /// buffered the picture without producing output.
    pub fn encode(&mut self, image: &DynamicImage) -> Result<Option<usize>, EncoderError> {
        let Self {
            sink, inner, pts, ..
        } = self;

        let open = inner.as_mut().ok_or(EncoderError::InvalidState {
            operation: "encode",
            state: EncoderState::Closed,
        })?;

        open.picture.convert(image)?;

        let picture_pts = *pts;
        *pts += 1;

        let (y_stride, u_stride, v_stride) = open.picture.strides();

        let picture = Picture {
            width: open.picture.width(),
            height: open.picture.height(),
            planes: [open.picture.y(), open.picture.cb(), open.picture.cr()],
            strides: [y_stride, u_stride, v_stride],
            pts: picture_pts,
        };

        let unit = open
            .engine
            .encode(Some(&picture))
            .map_err(|e| EncoderError::Encode {
                pts: Some(picture_pts),
                source: Box::new(e),
            })?;

        log::trace!(
            "Submitted picture pts={picture_pts}, output={:?}",
            unit.as_ref().map(|unit| unit.pts)
        );

        write_access_unit(sink, unit)
    }

    /// Drain every picture the engine still holds back
    ///
    /// Returns the number of access units written.
    pub fn flush(&mut self) -> Result<usize, EncoderError> {
        let Self { sink, inner, .. } = self;

        let open = inner.as_mut().ok_or(EncoderError::InvalidState {
            operation: "flush",
            state: EncoderState::Closed,
        })?;

        let mut written = 0;

        while open.engine.delayed_frames() > 0 {
            let unit = open
                .engine
                .encode(None)
                .map_err(|e| EncoderError::Encode {
                    pts: None,
                    source: Box::new(e),
                })?;

            if write_access_unit(sink, unit)?.is_some() {
                written += 1;
            }
        }

        log::debug!("Flushed {written} delayed access units");

        Ok(written)
    }

    /// Release the picture buffers and the engine, does not flush
    pub fn close(&mut self) -> Result<(), EncoderError> {
        let open = self.inner.take().ok_or(EncoderError::InvalidState {
            operation: "close",
            state: EncoderState::Closed,
        })?;

        open.engine.close();

        log::debug!("Closed encoder after {} pictures", self.pts);

        Ok(())
    }

    /// Close the encoder if still open and return the sink
    pub fn into_inner(self) -> W {
        let Self { sink, inner, .. } = self;

        if let Some(open) = inner {
            open.engine.close();
        }

        sink
    }
}

fn write_access_unit<W: Write>(
    sink: &mut W,
    unit: Option<AccessUnit>,
) -> Result<Option<usize>, EncoderError> {
    match unit {
        Some(unit) if !unit.data.is_empty() => {
            write_once(sink, &unit.data)?;
            Ok(Some(unit.data.len()))
        }
        _ => Ok(None),
    }
}

/// Write `data` with a single call, the sink must accept all of it
fn write_once<W: Write>(sink: &mut W, data: &[u8]) -> Result<(), WriteError> {
    let written = sink.write(data)?;

    if written != data.len() {
        return Err(WriteError::Short {
            expected: data.len(),
            actual: written,
        });
    }

    Ok(())
}
