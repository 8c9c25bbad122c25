#![allow(dead_code)]

use bytes::Bytes;
use frame_encoder::{
    AccessUnit, CompressionEngine, ConfigurationError, EngineParams, OwnedPicture, Picture,
    Preset, Profile, TuneSet, nal,
};
use std::{
    cell::RefCell,
    collections::VecDeque,
    io::{self, Write},
};

pub const MOCK_HEADERS: &[u8] = &[0, 0, 0, 1, 0x67, 0x42, 0xC0, 0x1E, 0, 0, 0, 1, 0x68, 0xCE];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PresetApplied(Preset, TuneSet),
    ProfileApplied(Profile),
    Opened(EngineParams),
    Submitted {
        pts: i64,
        strides: [usize; 3],
        first_samples: [u8; 3],
    },
    Emitted(i64),
    Closed,
}

/// Failures injected into the mock engines of the current test thread
#[derive(Debug, Default, Clone, Copy)]
pub struct Behavior {
    pub fail_open: bool,
    pub fail_headers: bool,
    pub empty_headers: bool,
    pub fail_encode_at: Option<i64>,
}

thread_local! {
    static EVENTS: RefCell<Vec<Event>> = const { RefCell::new(Vec::new()) };
    static BEHAVIOR: RefCell<Behavior> = RefCell::new(Behavior::default());
}

fn record(event: Event) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

pub fn take_events() -> Vec<Event> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

pub fn set_behavior(behavior: Behavior) {
    BEHAVIOR.with(|b| *b.borrow_mut() = behavior);
}

fn behavior() -> Behavior {
    BEHAVIOR.with(|b| *b.borrow())
}

pub fn emitted(events: &[Event]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Emitted(pts) => Some(*pts),
            _ => None,
        })
        .collect()
}

pub fn submitted(events: &[Event]) -> Vec<i64> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Submitted { pts, .. } => Some(*pts),
            _ => None,
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
#[error("mock engine failure: {0}")]
pub struct MockError(&'static str);

/// Engine holding back `DELAY` pictures before emitting the oldest one
pub struct MockEngine<const DELAY: usize> {
    queue: VecDeque<OwnedPicture>,
}

impl<const DELAY: usize> MockEngine<DELAY> {
    /// Access unit layout: start code, slice NAL header, low 7 bits of pts with the high bit set
    pub fn access_unit(pts: i64) -> Bytes {
        let header = if pts == 0 { 0x65 } else { 0x41 };
        let marker = 0x80 | (pts & 0x7F) as u8;

        Bytes::from(vec![0, 0, 0, 1, header, marker])
    }

    fn emit(&mut self) -> Option<AccessUnit> {
        let picture = self.queue.pop_front()?;

        record(Event::Emitted(picture.pts));

        Some(AccessUnit {
            data: Self::access_unit(picture.pts),
            pts: picture.pts,
            keyframe: picture.pts == 0,
        })
    }
}

impl<const DELAY: usize> CompressionEngine for MockEngine<DELAY> {
    type Error = MockError;

    fn apply_preset_tuning(
        params: &mut EngineParams,
        preset: Preset,
        tune: &TuneSet,
    ) -> Result<(), ConfigurationError> {
        record(Event::PresetApplied(preset, tune.clone()));
        params.apply_preset_tuning(preset, tune)
    }

    fn apply_profile(params: &mut EngineParams, profile: Profile) -> Result<(), ConfigurationError> {
        record(Event::ProfileApplied(profile));
        params.apply_profile(profile)
    }

    fn open(params: &EngineParams) -> Result<Self, Self::Error> {
        if behavior().fail_open {
            return Err(MockError("open"));
        }

        record(Event::Opened(params.clone()));

        Ok(Self {
            queue: VecDeque::new(),
        })
    }

    fn headers(&mut self) -> Result<Bytes, Self::Error> {
        let behavior = behavior();

        if behavior.fail_headers {
            Err(MockError("headers"))
        } else if behavior.empty_headers {
            Ok(Bytes::new())
        } else {
            Ok(Bytes::from_static(MOCK_HEADERS))
        }
    }

    fn encode(&mut self, picture: Option<&Picture<'_>>) -> Result<Option<AccessUnit>, Self::Error> {
        let Some(picture) = picture else {
            return Ok(self.emit());
        };

        record(Event::Submitted {
            pts: picture.pts,
            strides: picture.strides,
            first_samples: [picture.planes[0][0], picture.planes[1][0], picture.planes[2][0]],
        });

        if behavior().fail_encode_at == Some(picture.pts) {
            return Err(MockError("encode"));
        }

        self.queue.push_back(picture.to_owned_planes());

        if self.queue.len() > DELAY {
            Ok(self.emit())
        } else {
            Ok(None)
        }
    }

    fn delayed_frames(&self) -> usize {
        self.queue.len()
    }

    fn close(self) {
        record(Event::Closed);
    }
}

/// Sink accepting at most `limit` bytes per write once `full_writes` writes went through
pub struct ShortSink {
    pub data: Vec<u8>,
    pub full_writes: usize,
    pub limit: usize,
}

impl Write for ShortSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = if self.full_writes > 0 {
            self.full_writes -= 1;
            buf.len()
        } else {
            buf.len().min(self.limit)
        };

        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Sink failing every write after `full_writes` writes
pub struct BrokenSink {
    pub full_writes: usize,
}

impl Write for BrokenSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.full_writes > 0 {
            self.full_writes -= 1;
            Ok(buf.len())
        } else {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Split the sink contents into NAL units
pub fn nal_units(sink: &[u8]) -> Vec<Bytes> {
    nal::nal_units(Bytes::copy_from_slice(sink)).collect()
}
