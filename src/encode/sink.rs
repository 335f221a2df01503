use crate::foundation::error::{GloError, GloResult};

/// One opaque RGB8 video frame, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn black(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
        }
    }

    pub fn put(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        if let Some(px) = self.data.get_mut(i..i + 3) {
            px.copy_from_slice(&rgb);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let i = (y as usize * self.width as usize + x as usize) * 3;
        let px = self.data.get(i..i + 3)?;
        Some([px[0], px[1], px[2]])
    }
}

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl SinkConfig {
    pub fn validate(&self) -> GloResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GloError::validation("video width/height must be non-zero"));
        }
        if self.fps == 0 {
            return Err(GloError::validation("video fps must be non-zero"));
        }
        Ok(())
    }
}

/// Consumer of preview frames.
///
/// `push_frame` is called in strictly increasing frame order between one
/// `begin` and one `end`.
pub trait FrameSink {
    fn begin(&mut self, cfg: SinkConfig) -> GloResult<()>;
    fn push_frame(&mut self, idx: u64, frame: &Frame) -> GloResult<()>;
    fn end(&mut self) -> GloResult<()>;
}

/// Sink that keeps every frame, for tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, Frame)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(u64, Frame)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> GloResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &Frame) -> GloResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> GloResult<()> {
        self.finished = true;
        Ok(())
    }
}
