use crate::error::ConfigurationError;
use std::{fmt, str::FromStr};

/// Encoder configuration, fixed for the lifetime of an [`Encoder`](crate::Encoder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    /// Frame width in pixels. Every encoded image must have exactly this width.
    pub width: u32,

    /// Frame height in pixels. Every encoded image must have exactly this height.
    pub height: u32,

    /// Frames per second.
    ///
    /// Used as the keyframe interval and as the frame-rate numerator (the denominator is always 1).
    pub frame_rate: u32,

    /// Tunings: film, animation, grain, stillimage, psnr, ssim, fastdecode, zerolatency.
    ///
    /// `fastdecode` and `zerolatency` may be combined with one of the others, e.g. `film,zerolatency`.
    pub tune: String,

    /// Presets: ultrafast, superfast, veryfast, faster, fast, medium, slow, slower, veryslow, placebo.
    ///
    /// Only applied when a profile is set as well.
    pub preset: String,

    /// Profiles: baseline, main, high, high10, high422, high444.
    pub profile: String,

    /// Verbosity of the compression engine
    pub log_level: LogLevel,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            frame_rate: 30,
            tune: String::new(),
            preset: String::new(),
            profile: String::new(),
            log_level: LogLevel::Info,
        }
    }
}

impl EncodingOptions {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<ValidatedNames, ConfigurationError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigurationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        if self.frame_rate == 0 {
            return Err(ConfigurationError::InvalidFrameRate);
        }

        Ok(ValidatedNames {
            preset: parse_optional(&self.preset)?,
            tune: self.tune.parse()?,
            profile: parse_optional(&self.profile)?,
        })
    }
}

fn parse_optional<T>(name: &str) -> Result<Option<T>, ConfigurationError>
where
    T: FromStr<Err = ConfigurationError>,
{
    if name.is_empty() {
        Ok(None)
    } else {
        name.parse().map(Some)
    }
}

/// Names of [`EncodingOptions`] resolved into their typed counterparts
#[derive(Debug)]
pub(crate) struct ValidatedNames {
    pub(crate) preset: Option<Preset>,
    pub(crate) tune: TuneSet,
    pub(crate) profile: Option<Profile>,
}

/// Verbosity of the compression engine
///
/// The discriminants match the numeric levels of the classic engine API.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    None = -1,
    Error = 0,
    Warning = 1,
    #[default]
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns true if messages of `level` pass this verbosity
    pub fn allows(self, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::None => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
        }
    }
}

/// Declares a name-parsable enum with its `FromStr` and `Display` impls
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $error:ident {
            $($variant:ident => $str:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $str,)*
                }
            }
        }

        impl FromStr for $name {
            type Err = ConfigurationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok($name::$variant),)*
                    _ => Err(ConfigurationError::$error(s.to_owned())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum! {
    /// Speed/quality trade-off, from fastest to slowest
    Preset, UnknownPreset {
        UltraFast => "ultrafast",
        SuperFast => "superfast",
        VeryFast => "veryfast",
        Faster => "faster",
        Fast => "fast",
        Medium => "medium",
        Slow => "slow",
        Slower => "slower",
        VerySlow => "veryslow",
        Placebo => "placebo",
    }
}

named_enum! {
    /// Tuning for a type of content or use case
    Tune, UnknownTune {
        Film => "film",
        Animation => "animation",
        Grain => "grain",
        StillImage => "stillimage",
        Psnr => "psnr",
        Ssim => "ssim",
        FastDecode => "fastdecode",
        ZeroLatency => "zerolatency",
    }
}

named_enum! {
    /// H.264 profile restricting the features the engine may use
    Profile, UnknownProfile {
        Baseline => "baseline",
        Main => "main",
        High => "high",
        High10 => "high10",
        High422 => "high422",
        High444 => "high444",
    }
}

impl Tune {
    /// Psycho-visual tunes are mutually exclusive
    pub fn is_psy(self) -> bool {
        !matches!(self, Tune::FastDecode | Tune::ZeroLatency)
    }
}

impl Profile {
    pub fn profile_idc(self) -> u8 {
        match self {
            Profile::Baseline => 66,
            Profile::Main => 77,
            Profile::High => 100,
            Profile::High10 => 110,
            Profile::High422 => 122,
            Profile::High444 => 244,
        }
    }

    pub fn max_bit_depth(self) -> u8 {
        match self {
            Profile::Baseline | Profile::Main | Profile::High => 8,
            Profile::High10 | Profile::High422 => 10,
            Profile::High444 => 14,
        }
    }

    pub(crate) fn support_b_frames(self) -> bool {
        !matches!(self, Profile::Baseline)
    }

    pub(crate) fn support_entropy_coding_mode(self) -> bool {
        !matches!(self, Profile::Baseline)
    }

    pub(crate) fn support_transform_8x8_mode_flag(self) -> bool {
        !matches!(self, Profile::Baseline | Profile::Main)
    }
}

impl FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "warning" => Ok(LogLevel::Warning),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            _ => Err(ConfigurationError::UnknownLogLevel(s.to_owned())),
        }
    }
}

/// A combination of tunes: at most one psycho-visual tune plus `fastdecode` and/or `zerolatency`
///
/// Parsed from names separated by `,` or `+`, the empty string is the empty set.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TuneSet {
    tunes: Vec<Tune>,
}

impl TuneSet {
    pub fn new(tunes: impl IntoIterator<Item = Tune>) -> Result<Self, ConfigurationError> {
        let mut set = TuneSet::default();

        for tune in tunes {
            if tune.is_psy() {
                match set.psy() {
                    Some(other) if other != tune => {
                        return Err(ConfigurationError::ConflictingTunes(other, tune));
                    }
                    _ => {}
                }
            }

            if !set.tunes.contains(&tune) {
                set.tunes.push(tune);
            }
        }

        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.tunes.is_empty()
    }

    pub fn contains(&self, tune: Tune) -> bool {
        self.tunes.contains(&tune)
    }

    /// The psycho-visual tune of this set, if any
    pub fn psy(&self) -> Option<Tune> {
        self.tunes.iter().copied().find(|tune| tune.is_psy())
    }

    pub fn iter(&self) -> impl Iterator<Item = Tune> + '_ {
        self.tunes.iter().copied()
    }
}

impl FromStr for TuneSet {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tunes = s
            .split([',', '+'])
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(Tune::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        TuneSet::new(tunes)
    }
}

impl fmt::Display for TuneSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tune) in self.tunes.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }

            f.write_str(tune.as_str())?;
        }

        Ok(())
    }
}
