//! Pixel previews of rendered timelines.

use std::path::Path;

use crate::{
    color::Color,
    encode::{Frame, FrameSink, SinkConfig},
    foundation::error::{GloError, GloResult},
};

/// `colors[start..end]`, padded with black wherever the range leaves the
/// timeline.
pub fn window(colors: &[Color], start: i64, end: i64) -> Vec<Color> {
    (start..end)
        .map(|i| {
            usize::try_from(i)
                .ok()
                .and_then(|i| colors.get(i))
                .copied()
                .unwrap_or(Color::BLACK)
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PngOpts {
    /// Pixel height of each program's band.
    pub row_height: u32,
    pub amplify: bool,
}

impl Default for PngOpts {
    fn default() -> Self {
        Self {
            row_height: 10,
            amplify: false,
        }
    }
}

/// One horizontal band per timeline, one pixel column per tick. Returns
/// `(width, height, rgb8 data)`.
pub fn timeline_image(timelines: &[Vec<Color>], opts: &PngOpts) -> GloResult<(u32, u32, Vec<u8>)> {
    let ticks = timelines.iter().map(Vec::len).max().unwrap_or(0);
    if ticks == 0 || opts.row_height == 0 {
        return Err(GloError::validation("nothing to draw: empty timeline or zero row height"));
    }
    let width = u32::try_from(ticks)
        .map_err(|_| GloError::validation(format!("timeline of {ticks} ticks is too wide")))?;
    let height = u32::try_from(timelines.len())
        .ok()
        .and_then(|n| n.checked_mul(opts.row_height))
        .ok_or_else(|| GloError::validation("too many timelines for one image"))?;

    let mut data = Vec::with_capacity(ticks * height as usize * 3);
    for colors in timelines {
        let row: Vec<u8> = window(colors, 0, ticks as i64)
            .iter()
            .flat_map(|c| c.to_rgb8(opts.amplify))
            .collect();
        for _ in 0..opts.row_height {
            data.extend_from_slice(&row);
        }
    }
    Ok((width, height, data))
}

pub fn write_png(path: &Path, timelines: &[Vec<Color>], opts: &PngOpts) -> GloResult<()> {
    use anyhow::Context as _;
    let (width, height, data) = timeline_image(timelines, opts)?;
    crate::encode::ffmpeg::ensure_parent_dir(path)?;
    image::save_buffer_with_format(
        path,
        &data,
        width,
        height,
        image::ColorType::Rgb8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), width, height, "wrote png preview");
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoOpts {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub ticks_per_second: u32,
    pub amplify: bool,
}

/// Push fixed-fps frames into `sink`. Each program gets an equal-width
/// column; rows show a window of ticks with the current tick in the middle,
/// earlier ticks above. Returns the number of frames pushed.
#[tracing::instrument(skip(timelines, sink))]
pub fn render_video(
    timelines: &[Vec<Color>],
    opts: &VideoOpts,
    sink: &mut dyn FrameSink,
) -> GloResult<u64> {
    if timelines.is_empty() {
        return Err(GloError::validation("no timelines to render"));
    }
    if opts.ticks_per_second == 0 {
        return Err(GloError::validation("ticks_per_second must be > 0"));
    }
    let cfg = SinkConfig {
        width: opts.width,
        height: opts.height,
        fps: opts.fps,
    };
    cfg.validate()?;

    let ticks = timelines.iter().map(Vec::len).max().unwrap_or(0) as u64;
    let fps = u64::from(opts.fps);
    let tps = u64::from(opts.ticks_per_second);
    let frames = (ticks * fps).div_ceil(tps);
    let half = i64::from(opts.height / 2);
    let columns = timelines.len() as u64;

    sink.begin(cfg)?;
    for idx in 0..frames {
        let now = (idx * tps / fps) as i64;
        let strips: Vec<Vec<[u8; 3]>> = timelines
            .iter()
            .map(|colors| {
                window(colors, now - half, now - half + i64::from(opts.height))
                    .iter()
                    .map(|c| c.to_rgb8(opts.amplify))
                    .collect()
            })
            .collect();

        let mut frame = Frame::black(opts.width, opts.height);
        for x in 0..opts.width {
            let column = (u64::from(x) * columns / u64::from(opts.width)) as usize;
            for (y, rgb) in strips[column].iter().enumerate() {
                frame.put(x, y as u32, *rgb);
            }
        }
        sink.push_frame(idx, &frame)?;
    }
    sink.end()?;
    Ok(frames)
}
