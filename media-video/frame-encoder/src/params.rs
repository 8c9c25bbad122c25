//! Compression engine parameters and the preset, tune and profile operations mutating them

use crate::{
    error::ConfigurationError,
    options::{LogLevel, Preset, Profile, Tune, TuneSet},
};

/// Pixel layout of the pictures submitted to the engine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Csp {
    /// Planar YCbCr 4:2:0, three separate planes
    #[default]
    I420,
}

/// Motion estimation search method
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MotionEstimation {
    /// Diamond search, radius 1
    Dia,
    /// Hexagonal search, radius 2
    #[default]
    Hex,
    /// Uneven multi-hexagon search
    Umh,
    /// Exhaustive search
    Esa,
    /// Hadamard exhaustive search
    Tesa,
}

/// Weighted prediction mode for P-frames
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum WeightedPrediction {
    Disabled,
    Simple,
    #[default]
    Smart,
}

/// Adaptive quantization mode
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AqMode {
    Disabled,
    #[default]
    Variance,
    AutoVariance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deblock {
    pub enabled: bool,
    pub alpha: i8,
    pub beta: i8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Psy {
    pub enabled: bool,
    pub rd: f32,
    pub trellis: f32,
}

/// Parameter set consumed by [`CompressionEngine::open`](crate::engine::CompressionEngine::open)
///
/// Defaults correspond to the `medium` preset without any tune.
///
/// Engines read the fields they have a counterpart for and treat the rest as hints. The
/// openh264 engine for example only honors the frame geometry and rate, `keyint_max`, `subme`,
/// `scenecut`, `aq_mode`, `log_level` and `profile`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub width: u32,
    pub height: u32,
    pub csp: Csp,
    pub bit_depth: u8,
    pub log_level: LogLevel,

    /// Variable frame rate input, timestamps are ignored if false
    pub vfr_input: bool,
    /// Emit SPS/PPS before every keyframe
    pub repeat_headers: bool,
    /// Annex-B start codes instead of length prefixes
    pub annexb: bool,
    /// Periodic intra refresh instead of IDR frames
    pub intra_refresh: bool,

    pub keyint_max: u32,
    pub fps_num: u32,
    pub fps_den: u32,

    /// Number of reference frames
    pub ref_frames: u32,
    /// Maximum number of consecutive B-frames
    pub bframes: u32,
    pub b_adapt: u8,
    /// Number of frames for frame-type and rate control lookahead
    pub rc_lookahead: u32,
    /// Frames buffered by the threaded lookahead, `None` means automatic
    pub sync_lookahead: Option<u32>,
    /// Scene cut threshold, 0 disables scene cut detection
    pub scenecut: u32,

    pub cabac: bool,
    pub dct8x8: bool,
    pub weighted_bipred: bool,
    pub weighted_pred: WeightedPrediction,
    pub mixed_refs: bool,
    pub fast_pskip: bool,
    pub dct_decimate: bool,

    /// Subpixel motion estimation and mode decision quality, 0 to 11
    pub subme: u8,
    pub me: MotionEstimation,
    pub me_range: u32,
    pub trellis: u8,

    pub aq_mode: AqMode,
    pub aq_strength: f32,
    pub mbtree: bool,
    pub qcompress: f32,
    pub psy: Psy,
    pub deblock: Deblock,

    pub sliced_threads: bool,
    pub interlaced: bool,

    /// Profile applied by [`EngineParams::apply_profile`]
    pub profile: Option<Profile>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            csp: Csp::I420,
            bit_depth: 8,
            log_level: LogLevel::Info,
            vfr_input: true,
            repeat_headers: false,
            annexb: true,
            intra_refresh: false,
            keyint_max: 250,
            fps_num: 25,
            fps_den: 1,
            ref_frames: 3,
            bframes: 3,
            b_adapt: 1,
            rc_lookahead: 40,
            sync_lookahead: None,
            scenecut: 40,
            cabac: true,
            dct8x8: true,
            weighted_bipred: true,
            weighted_pred: WeightedPrediction::Smart,
            mixed_refs: true,
            fast_pskip: true,
            dct_decimate: true,
            subme: 7,
            me: MotionEstimation::Hex,
            me_range: 16,
            trellis: 1,
            aq_mode: AqMode::Variance,
            aq_strength: 1.0,
            mbtree: true,
            qcompress: 0.6,
            psy: Psy {
                enabled: true,
                rd: 1.0,
                trellis: 0.0,
            },
            deblock: Deblock {
                enabled: true,
                alpha: 0,
                beta: 0,
            },
            sliced_threads: false,
            interlaced: false,
            profile: None,
        }
    }
}

impl EngineParams {
    /// Default parameters with a preset and a set of tunes applied
    pub fn with_preset(preset: Preset, tune: &TuneSet) -> Result<Self, ConfigurationError> {
        let mut params = Self::default();
        params.apply_preset_tuning(preset, tune)?;
        Ok(params)
    }

    /// Reset to the defaults and apply `preset` followed by every tune in `tune`
    pub fn apply_preset_tuning(
        &mut self,
        preset: Preset,
        tune: &TuneSet,
    ) -> Result<(), ConfigurationError> {
        *self = Self::default();

        self.apply_preset(preset);

        for tune in tune.iter() {
            self.apply_tune(tune);
        }

        Ok(())
    }

    fn apply_preset(&mut self, preset: Preset) {
        match preset {
            Preset::UltraFast => {
                self.ref_frames = 1;
                self.scenecut = 0;
                self.deblock.enabled = false;
                self.bframes = 0;
                self.dct8x8 = false;
                self.me = MotionEstimation::Dia;
                self.subme = 0;
                self.aq_mode = AqMode::Disabled;
                self.mixed_refs = false;
                self.trellis = 0;
                self.weighted_bipred = false;
                self.weighted_pred = WeightedPrediction::Disabled;
                self.mbtree = false;
                self.rc_lookahead = 0;
                self.cabac = false;
            }
            Preset::SuperFast => {
                self.me = MotionEstimation::Dia;
                self.subme = 1;
                self.ref_frames = 1;
                self.mixed_refs = false;
                self.trellis = 0;
                self.weighted_pred = WeightedPrediction::Simple;
                self.mbtree = false;
                self.rc_lookahead = 0;
            }
            Preset::VeryFast => {
                self.subme = 2;
                self.ref_frames = 1;
                self.mixed_refs = false;
                self.trellis = 0;
                self.weighted_pred = WeightedPrediction::Simple;
                self.rc_lookahead = 10;
            }
            Preset::Faster => {
                self.mixed_refs = false;
                self.ref_frames = 2;
                self.subme = 4;
                self.weighted_pred = WeightedPrediction::Simple;
                self.rc_lookahead = 20;
            }
            Preset::Fast => {
                self.ref_frames = 2;
                self.subme = 6;
                self.rc_lookahead = 30;
            }
            Preset::Medium => {}
            Preset::Slow => {
                self.me = MotionEstimation::Umh;
                self.subme = 8;
                self.ref_frames = 5;
                self.b_adapt = 2;
                self.rc_lookahead = 50;
            }
            Preset::Slower => {
                self.me = MotionEstimation::Umh;
                self.subme = 9;
                self.ref_frames = 8;
                self.b_adapt = 2;
                self.trellis = 2;
                self.rc_lookahead = 60;
            }
            Preset::VerySlow => {
                self.me = MotionEstimation::Umh;
                self.subme = 10;
                self.me_range = 24;
                self.ref_frames = 16;
                self.b_adapt = 2;
                self.trellis = 2;
                self.bframes = 8;
                self.rc_lookahead = 60;
            }
            Preset::Placebo => {
                self.me = MotionEstimation::Tesa;
                self.subme = 11;
                self.me_range = 24;
                self.ref_frames = 16;
                self.b_adapt = 2;
                self.fast_pskip = false;
                self.trellis = 2;
                self.bframes = 16;
                self.rc_lookahead = 60;
            }
        }
    }

    fn apply_tune(&mut self, tune: Tune) {
        match tune {
            Tune::Film => {
                self.deblock.alpha = -1;
                self.deblock.beta = -1;
                self.psy.trellis = 0.15;
            }
            Tune::Animation => {
                self.ref_frames = if self.ref_frames > 1 {
                    self.ref_frames * 2
                } else {
                    1
                };
                self.deblock.alpha = 1;
                self.deblock.beta = 1;
                self.psy.rd = 0.4;
                self.aq_strength = 0.6;
                self.bframes += 2;
            }
            Tune::Grain => {
                self.deblock.alpha = -2;
                self.deblock.beta = -2;
                self.psy.trellis = 0.25;
                self.dct_decimate = false;
                self.aq_strength = 0.5;
                self.qcompress = 0.8;
            }
            Tune::StillImage => {
                self.deblock.alpha = -3;
                self.deblock.beta = -3;
                self.psy.rd = 2.0;
                self.psy.trellis = 0.7;
                self.aq_strength = 1.2;
            }
            Tune::Psnr => {
                self.aq_mode = AqMode::Disabled;
                self.psy.enabled = false;
            }
            Tune::Ssim => {
                self.aq_mode = AqMode::AutoVariance;
                self.psy.enabled = false;
            }
            Tune::FastDecode => {
                self.deblock.enabled = false;
                self.cabac = false;
                self.weighted_bipred = false;
                self.weighted_pred = WeightedPrediction::Disabled;
            }
            Tune::ZeroLatency => {
                self.rc_lookahead = 0;
                self.sync_lookahead = Some(0);
                self.bframes = 0;
                self.sliced_threads = true;
                self.vfr_input = false;
                self.mbtree = false;
            }
        }
    }

    /// Restrict the parameters to the feature set of `profile`
    ///
    /// Must be called after every other modification, profile constraints override preset and tune values.
    pub fn apply_profile(&mut self, profile: Profile) -> Result<(), ConfigurationError> {
        if self.bit_depth > profile.max_bit_depth() {
            return Err(ConfigurationError::UnsupportedBitDepth {
                profile,
                bit_depth: self.bit_depth,
            });
        }

        if profile == Profile::Baseline && self.interlaced {
            return Err(ConfigurationError::UnsupportedInterlacing(profile));
        }

        if !profile.support_entropy_coding_mode() {
            self.cabac = false;
        }

        if !profile.support_transform_8x8_mode_flag() {
            self.dct8x8 = false;
        }

        if !profile.support_b_frames() {
            self.bframes = 0;
            self.weighted_bipred = false;
            self.weighted_pred = WeightedPrediction::Disabled;
        }

        self.profile = Some(profile);

        Ok(())
    }

    /// Upper bound of pictures an engine with this configuration holds back before emitting output
    pub fn max_delayed_frames(&self) -> u32 {
        let lookahead = if self.mbtree || self.bframes > 0 {
            self.rc_lookahead.max(self.bframes)
        } else {
            0
        };

        self.bframes + lookahead + self.sync_lookahead.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tunes(s: &str) -> TuneSet {
        s.parse().unwrap()
    }

    #[test]
    fn medium_preset_is_default() {
        let params = EngineParams::with_preset(Preset::Medium, &TuneSet::default()).unwrap();
        assert_eq!(params, EngineParams::default());
    }

    #[test]
    fn ultrafast_disables_delay() {
        let params = EngineParams::with_preset(Preset::UltraFast, &TuneSet::default()).unwrap();

        assert_eq!(params.bframes, 0);
        assert_eq!(params.rc_lookahead, 0);
        assert!(!params.cabac);
        assert!(!params.mbtree);
        assert_eq!(params.me, MotionEstimation::Dia);
        assert_eq!(params.max_delayed_frames(), 0);
    }

    #[test]
    fn slower_presets_search_harder() {
        let slow = EngineParams::with_preset(Preset::Slow, &TuneSet::default()).unwrap();
        let placebo = EngineParams::with_preset(Preset::Placebo, &TuneSet::default()).unwrap();

        assert!(placebo.subme > slow.subme);
        assert!(placebo.ref_frames > slow.ref_frames);
        assert_eq!(placebo.me, MotionEstimation::Tesa);
        assert_eq!(placebo.bframes, 16);
        assert!(!placebo.fast_pskip);
    }

    #[test]
    fn zerolatency_tune() {
        let params = EngineParams::with_preset(Preset::Slow, &tunes("film,zerolatency")).unwrap();

        assert_eq!(params.bframes, 0);
        assert_eq!(params.rc_lookahead, 0);
        assert_eq!(params.sync_lookahead, Some(0));
        assert!(params.sliced_threads);
        assert_eq!(params.deblock.alpha, -1);
        assert_eq!(params.max_delayed_frames(), 0);
    }

    #[test]
    fn animation_doubles_references() {
        let params = EngineParams::with_preset(Preset::Medium, &tunes("animation")).unwrap();

        assert_eq!(params.ref_frames, 6);
        assert_eq!(params.bframes, 5);

        let params = EngineParams::with_preset(Preset::UltraFast, &tunes("animation")).unwrap();
        assert_eq!(params.ref_frames, 1);
    }

    #[test]
    fn psnr_and_ssim_disable_psy() {
        let psnr = EngineParams::with_preset(Preset::Medium, &tunes("psnr")).unwrap();
        assert!(!psnr.psy.enabled);
        assert_eq!(psnr.aq_mode, AqMode::Disabled);

        let ssim = EngineParams::with_preset(Preset::Medium, &tunes("ssim")).unwrap();
        assert_eq!(ssim.aq_mode, AqMode::AutoVariance);
    }

    #[test]
    fn preset_resets_previous_values() {
        let mut params = EngineParams {
            width: 1920,
            ..EngineParams::default()
        };

        params
            .apply_preset_tuning(Preset::Fast, &TuneSet::default())
            .unwrap();
        assert_eq!(params.width, 0);
        assert_eq!(params.subme, 6);
    }

    #[test]
    fn baseline_profile_restricts_features() {
        let mut params = EngineParams::with_preset(Preset::VerySlow, &TuneSet::default()).unwrap();
        params.apply_profile(Profile::Baseline).unwrap();

        assert!(!params.cabac);
        assert!(!params.dct8x8);
        assert_eq!(params.bframes, 0);
        assert_eq!(params.weighted_pred, WeightedPrediction::Disabled);
        assert_eq!(params.profile, Some(Profile::Baseline));
    }

    #[test]
    fn main_profile_disables_8x8_transform() {
        let mut params = EngineParams::default();
        params.apply_profile(Profile::Main).unwrap();

        assert!(params.cabac);
        assert!(!params.dct8x8);
        assert_eq!(params.bframes, 3);
    }

    #[test]
    fn profile_bit_depth() {
        let mut params = EngineParams {
            bit_depth: 10,
            ..EngineParams::default()
        };

        assert!(matches!(
            params.apply_profile(Profile::High),
            Err(ConfigurationError::UnsupportedBitDepth {
                profile: Profile::High,
                bit_depth: 10
            })
        ));
        params.apply_profile(Profile::High10).unwrap();
    }

    #[test]
    fn baseline_rejects_interlacing() {
        let mut params = EngineParams {
            interlaced: true,
            ..EngineParams::default()
        };

        assert!(matches!(
            params.apply_profile(Profile::Baseline),
            Err(ConfigurationError::UnsupportedInterlacing(Profile::Baseline))
        ));
    }

    #[test]
    fn delayed_frames_of_defaults() {
        let params = EngineParams::default();
        assert_eq!(params.max_delayed_frames(), 3 + 40);
    }
}
