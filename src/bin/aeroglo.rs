use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "aeroglo", version, about = "GLO light-show compiler")]
struct Cli {
    /// Log compiler passes at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile GLO programs for the controller.
    Compile(CompileArgs),
    /// Render program timelines as a PNG, one band per program.
    Png(PngArgs),
    /// Render program timelines as an MP4 video (requires `ffmpeg` on PATH).
    Video(VideoArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Input GLO sources.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Audio-editor label/marker file for time anchors.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Compile configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CompileArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output file (merged or single input) or directory (several inputs).
    /// Defaults to stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Namespace and merge every input into one program.
    #[arg(long)]
    merge: bool,

    /// Run the compression passes.
    #[arg(long)]
    compress: bool,

    /// Lossy curve simplification threshold (negative disables).
    #[arg(long, allow_hyphen_values = true)]
    epsilon: Option<f64>,

    /// Keep loops and delays that exceed controller limits.
    #[arg(long)]
    no_limits: bool,

    /// Drop comments and diagnostics from the output.
    #[arg(long)]
    strip_comments: bool,

    /// Spelling variants to export with.
    #[arg(long, value_enum, num_args = 1..)]
    style: Vec<StyleChoice>,

    /// Spaces per nesting level.
    #[arg(long, default_value_t = 0)]
    indent: usize,

    /// Print compile statistics as JSON on stderr.
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
struct PngArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pixel height of each program band.
    #[arg(long, default_value_t = 10)]
    row_height: u32,

    /// Brighten dim colors.
    #[arg(long)]
    amplify: bool,
}

#[derive(Args, Debug)]
struct VideoArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 25)]
    fps: u32,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Brighten dim colors.
    #[arg(long)]
    amplify: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StyleChoice {
    Legacy,
    British,
    Camel,
    Call,
}

impl From<StyleChoice> for aeroglo::Style {
    fn from(s: StyleChoice) -> Self {
        match s {
            StyleChoice::Legacy => aeroglo::Style::Legacy,
            StyleChoice::British => aeroglo::Style::British,
            StyleChoice::Camel => aeroglo::Style::Camel,
            StyleChoice::Call => aeroglo::Style::Call,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Png(args) => cmd_png(args),
        Command::Video(args) => cmd_video(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(common: &CommonArgs) -> anyhow::Result<aeroglo::CompileConfig> {
    match &common.config {
        Some(path) => Ok(aeroglo::CompileConfig::from_json_path(path)?),
        None => Ok(aeroglo::CompileConfig::default()),
    }
}

fn load_labels(
    common: &CommonArgs,
    cfg: &aeroglo::CompileConfig,
) -> anyhow::Result<Option<aeroglo::Labels>> {
    common
        .labels
        .as_deref()
        .map(|p| aeroglo::Labels::from_path(p, cfg))
        .transpose()
        .map_err(Into::into)
}

fn parse_inputs(inputs: &[PathBuf]) -> anyhow::Result<Vec<aeroglo::GloFile>> {
    inputs
        .iter()
        .map(|p| {
            aeroglo::parse_glo_path(p).with_context(|| format!("parse '{}'", p.display()))
        })
        .collect()
}

fn write_text(out: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("write '{}'", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.common)?;
    cfg.compress |= args.compress;
    if let Some(eps) = args.epsilon {
        cfg.epsilon = eps;
    }
    cfg.resolve_limits &= !args.no_limits;
    cfg.strip_comments |= args.strip_comments;

    let labels = load_labels(&args.common, &cfg)?;
    let compiler = aeroglo::Compiler::new(cfg)?;
    let opts = aeroglo::ExportOpts {
        styles: args.style.iter().copied().map(aeroglo::Style::from).collect(),
        indent: args.indent,
    };

    let files = parse_inputs(&args.common.inputs)?;
    let units: Vec<(PathBuf, aeroglo::GloFile)> = if args.merge {
        vec![(PathBuf::from("merged"), aeroglo::merge_files(files)?)]
    } else {
        args.common.inputs.iter().cloned().zip(files).collect()
    };
    let several = units.len() > 1;

    for (input, mut file) in units {
        let stats = compiler
            .compile(&mut file, labels.as_ref())
            .with_context(|| format!("compile '{}'", input.display()))?;
        if args.stats {
            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }

        let out = match (&args.out, several) {
            (Some(dir), true) => {
                let name = input
                    .file_name()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("out.glo"));
                Some(dir.join(name))
            }
            (Some(path), false) => Some(path.clone()),
            (None, _) => None,
        };
        write_text(out.as_deref(), &file.export(&opts))?;
    }
    Ok(())
}

/// Compile every input and render its per-tick colors.
fn timelines(
    common: &CommonArgs,
) -> anyhow::Result<(aeroglo::CompileConfig, Vec<Vec<aeroglo::Color>>)> {
    let cfg = load_config(common)?;
    let labels = load_labels(common, &cfg)?;
    let compiler = aeroglo::Compiler::new(cfg.clone())?;
    let mut out = Vec::new();
    for (input, mut file) in common.inputs.iter().zip(parse_inputs(&common.inputs)?) {
        compiler
            .compile(&mut file, labels.as_ref())
            .with_context(|| format!("compile '{}'", input.display()))?;
        out.push(file.render()?);
    }
    Ok((cfg, out))
}

fn cmd_png(args: PngArgs) -> anyhow::Result<()> {
    let (_, timelines) = timelines(&args.common)?;
    let opts = aeroglo::PngOpts {
        row_height: args.row_height,
        amplify: args.amplify,
    };
    aeroglo::write_png(&args.out, &timelines, &opts)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_video(args: VideoArgs) -> anyhow::Result<()> {
    let (cfg, timelines) = timelines(&args.common)?;
    let opts = aeroglo::VideoOpts {
        width: args.width,
        height: args.height,
        fps: args.fps,
        ticks_per_second: cfg.ticks_per_second,
        amplify: args.amplify,
    };
    let mut sink = aeroglo::FfmpegSink::new(aeroglo::FfmpegSinkOpts::new(&args.out));
    let frames = aeroglo::render_video(&timelines, &opts, &mut sink)?;
    eprintln!("wrote {} ({frames} frames)", args.out.display());
    Ok(())
}
