//! RGB to planar YCbCr 4:2:0 conversion

use crate::error::ConvertError;
use image::{DynamicImage, RgbaImage};

/// Bytes per pixel of the canonical packed RGBA layout
const RGBA_BPP: usize = 4;

/// Three plane YCbCr 4:2:0 picture
///
/// Plane sizes are fixed when created: luma `width * height`, both chroma planes
/// `(width / 2) * (height / 2)`. Every conversion overwrites the planes in place.
#[derive(Debug, Clone)]
pub struct PlanarPicture {
    width: u32,
    height: u32,

    y: Vec<u8>,
    cb: Vec<u8>,
    cr: Vec<u8>,
}

impl PlanarPicture {
    pub fn new(width: u32, height: u32) -> Self {
        let luma_len = width as usize * height as usize;
        let chroma_len = (width / 2) as usize * (height / 2) as usize;

        Self {
            width,
            height,
            y: vec![0; luma_len],
            cb: vec![128; chroma_len],
            cr: vec![128; chroma_len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn cb(&self) -> &[u8] {
        &self.cb
    }

    pub fn cr(&self) -> &[u8] {
        &self.cr
    }

    /// Strides of the Y, Cb and Cr planes
    pub fn strides(&self) -> (usize, usize, usize) {
        let width = self.width as usize;

        (width, width / 2, width / 2)
    }

    /// Refresh the planes from `image`
    ///
    /// Packed RGBA images are converted directly, every other pixel layout is drawn
    /// into an RGBA buffer first.
    pub fn convert(&mut self, image: &DynamicImage) -> Result<(), ConvertError> {
        self.check_dimensions(image.width(), image.height())?;

        match image {
            DynamicImage::ImageRgba8(rgba) => self.convert_rgba(rgba),
            other => {
                log::trace!("Drawing {:?} image into RGBA before conversion", other.color());

                self.convert_rgba(&other.to_rgba8())
            }
        }
    }

    /// Refresh the planes from a packed RGBA image without intermediate allocations
    pub fn convert_rgba(&mut self, image: &RgbaImage) -> Result<(), ConvertError> {
        self.check_dimensions(image.width(), image.height())?;

        let stride = self.width as usize * RGBA_BPP;
        self.convert_packed(image.as_raw(), stride);

        Ok(())
    }

    fn check_dimensions(&self, width: u32, height: u32) -> Result<(), ConvertError> {
        if (width, height) != (self.width, self.height) {
            return Err(ConvertError::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (width, height),
            });
        }

        Ok(())
    }

    fn convert_packed(&mut self, samples: &[u8], stride: usize) {
        let width = self.width as usize;
        let height = self.height as usize;

        if width == 0 || height == 0 {
            return;
        }

        for (line, y_row) in samples
            .chunks_exact(stride)
            .take(height)
            .zip(self.y.chunks_exact_mut(width))
        {
            for (px, y) in line.chunks_exact(RGBA_BPP).zip(y_row.iter_mut()) {
                *y = luma(px[0].into(), px[1].into(), px[2].into());
            }
        }

        let chroma_width = width / 2;
        if chroma_width == 0 {
            return;
        }

        let rows = samples.chunks_exact(stride).take(height);
        let row_pairs = rows.clone().step_by(2).zip(rows.skip(1).step_by(2));

        for ((top, bottom), (cb_row, cr_row)) in row_pairs.zip(
            self.cb
                .chunks_exact_mut(chroma_width)
                .zip(self.cr.chunks_exact_mut(chroma_width)),
        ) {
            for (x, (cb, cr)) in cb_row.iter_mut().zip(cr_row.iter_mut()).enumerate() {
                let i = x * 2 * RGBA_BPP;
                let j = i + RGBA_BPP;

                let average = |c: usize| {
                    let sum = u32::from(top[i + c])
                        + u32::from(top[j + c])
                        + u32::from(bottom[i + c])
                        + u32::from(bottom[j + c]);

                    ((sum + 2) / 4) as i32
                };

                let (r, g, b) = (average(0), average(1), average(2));

                *cb = chroma_blue(r, g, b);
                *cr = chroma_red(r, g, b);
            }
        }
    }

    /// Full range BT.601 RGB to YCbCr transform of a single color
    pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
        let (r, g, b) = (r.into(), g.into(), b.into());

        (luma(r, g, b), chroma_blue(r, g, b), chroma_red(r, g, b))
    }
}

// 16 bit fixed point coefficients, 257 << 15 adds the 128 offset plus rounding

fn luma(r: i32, g: i32, b: i32) -> u8 {
    ((19595 * r + 38470 * g + 7471 * b + (1 << 15)) >> 16) as u8
}

fn chroma_blue(r: i32, g: i32, b: i32) -> u8 {
    ((-11056 * r - 21712 * g + 32768 * b + (257 << 15)) >> 16).clamp(0, 255) as u8
}

fn chroma_red(r: i32, g: i32, b: i32) -> u8 {
    ((32768 * r - 27440 * g - 5328 * b + (257 << 15)) >> 16).clamp(0, 255) as u8
}
