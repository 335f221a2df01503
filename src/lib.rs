//! `aeroglo` compiles GLO light-show programs for small lighting controllers.
//!
//! A parsed [`GloFile`] goes through constant resolution, time-anchor
//! resolution, optional compression and controller-limit resolution, then is
//! exported as text or rendered to a per-tick [`Color`] timeline for previews.
#![forbid(unsafe_code)]

pub mod anchor;
pub mod args;
pub mod color;
pub mod command;
pub mod compress;
pub mod encode;
pub mod file;
pub mod fingerprint;
pub mod foundation;
pub mod labels;
pub mod limits;
pub mod parse;
pub mod pipeline;
pub mod preview;
pub mod sequence;
pub mod style;

pub use anchor::resolve_time;
pub use args::{Arg, Arguments, Value};
pub use color::Color;
pub use command::{Command, CommandKind};
pub use compress::{CompressStats, compress_file, find_repeated_ngrams, find_repeated_ngrams_grouped};
pub use encode::{FfmpegSink, FfmpegSinkOpts, Frame, FrameSink, InMemorySink, SinkConfig};
pub use file::{GloFile, MAX_CALL_DEPTH, Scope};
pub use foundation::core::{CompileConfig, Limits, Ticks};
pub use foundation::error::{GloError, GloResult};
pub use labels::{LabelDialect, Labels};
pub use limits::{LimitStats, resolve_limits};
pub use parse::{Line, parse_glo, parse_glo_path, split_line};
pub use pipeline::{CompileStats, Compiler, merge_files};
pub use preview::{PngOpts, VideoOpts, render_video, timeline_image, window, write_png};
pub use sequence::{Node, NodeKind, Sequence, SequenceKind};
pub use style::{ExportOpts, Style, Styles};
