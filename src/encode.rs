pub mod ffmpeg;
pub mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path};
pub use sink::{Frame, FrameSink, InMemorySink, SinkConfig};
