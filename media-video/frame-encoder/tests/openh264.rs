#![cfg(feature = "openh264")]

mod common;

use common::*;
use frame_encoder::{Encoder, EncoderError, EncoderState, EncodingOptions, Profile, nal};
use image::{DynamicImage, Rgba, RgbaImage};

#[test]
fn encode_solid_red() {
    init_logger();

    let options = EncodingOptions {
        preset: "medium".into(),
        profile: "baseline".into(),
        ..EncodingOptions::new(64, 64, 30)
    };

    let mut encoder = Encoder::open(Vec::new(), options).unwrap();

    let header_len = encoder.sink().len();
    let headers = nal_units(encoder.sink());

    assert!(header_len > 0);
    assert!(encoder.sink().starts_with(&nal::ANNEXB_START_CODE));
    assert_eq!(nal::nal_unit_type(&headers[0]), nal::NAL_UNIT_SPS);
    assert_eq!(headers[0][1], Profile::Baseline.profile_idc());
    assert!(
        headers
            .iter()
            .any(|unit| nal::nal_unit_type(unit) == nal::NAL_UNIT_PPS)
    );

    let red = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255])));

    for pts in 0..5 {
        assert_eq!(encoder.next_pts(), pts);
        encoder.encode(&red).unwrap();
    }

    assert_eq!(encoder.delayed_frames(), 0);
    assert_eq!(encoder.flush().unwrap(), 0);

    encoder.close().unwrap();
    assert_eq!(encoder.state(), EncoderState::Closed);
    assert!(matches!(
        encoder.encode(&red),
        Err(EncoderError::InvalidState { .. })
    ));

    let output = encoder.into_inner();
    assert!(output.len() >= header_len);

    let slices = nal_units(&output[header_len..])
        .into_iter()
        .filter(|unit| nal::nal_unit_type(unit) == nal::NAL_UNIT_IDR)
        .count();
    assert!(slices > 0, "stream contains no IDR slice");
}

#[test]
fn odd_dimensions_are_rejected_by_openh264() {
    let result = Encoder::open(Vec::new(), EncodingOptions::new(63, 64, 30));

    assert!(matches!(result, Err(EncoderError::EngineOpen(_))));
}

/// Deterministic noise, hard enough to compress that rate control would like to drop pictures
fn noise_frame(seed: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9) | 1;

    let image = RgbaImage::from_fn(64, 64, |_, _| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;

        let [r, g, b, _] = state.to_le_bytes();
        Rgba([r, g, b, 255])
    });

    DynamicImage::ImageRgba8(image)
}

#[test]
fn every_picture_produces_an_access_unit() {
    init_logger();

    let mut encoder = Encoder::open(Vec::new(), EncodingOptions::new(64, 64, 30)).unwrap();

    let mut access_units = 0;

    for seed in 0..90 {
        if encoder.encode(&noise_frame(seed)).unwrap().is_some() {
            access_units += 1;
        }
    }

    access_units += encoder.flush().unwrap();

    assert_eq!(access_units, 90);
}

#[test]
fn profiles_beyond_8bit_420_are_refused() {
    for profile in ["high10", "high422", "high444"] {
        let options = EncodingOptions {
            preset: "medium".into(),
            profile: profile.into(),
            ..EncodingOptions::new(64, 64, 30)
        };

        let result = Encoder::open(Vec::new(), options);

        assert!(
            matches!(result, Err(EncoderError::EngineOpen(_))),
            "{profile} was accepted"
        );
    }
}

#[test]
fn requested_profile_is_signaled() {
    let options = EncodingOptions {
        preset: "medium".into(),
        profile: "main".into(),
        ..EncodingOptions::new(64, 64, 30)
    };

    let encoder = Encoder::open(Vec::new(), options).unwrap();
    let headers = nal_units(encoder.sink());

    assert_eq!(headers[0][1], Profile::Main.profile_idc());
}
