use std::io;
use std::path::PathBuf;
use std::process;
use log::LevelFilter;
use structopt::StructOpt;
use video_splitter::probe::{parse_bit_rate, MissingBitRatePolicy};
use video_splitter::prompt::Prompter;
use video_splitter::transcode::FfmpegTranscoder;
use video_splitter::{Config, Tools};

/// Splits a video into parts, keeping its bit rate and resolution and
/// optionally changing its frame rate.
#[derive(Debug, StructOpt)]
#[structopt(name = "video-splitter")]
struct Opt {
    /// The input video filename. If not specified, you will be asked for it
    #[structopt(short, long)]
    input: Option<PathBuf>,
    /// The ffmpeg executable to use
    #[structopt(long)]
    ffmpeg: Option<PathBuf>,
    /// The ffprobe executable to use
    #[structopt(long)]
    ffprobe: Option<PathBuf>,
    /// The bitrate in bits/second to assume when the input doesn't report one
    #[structopt(long, default_value = "2000000", parse(try_from_str = parse_bit_rate))]
    default_bitrate: u64,
    /// Log more details (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn main() {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    let defaults = Tools::default();
    let config = Config {
        tools: Tools {
            ffmpeg: opt.ffmpeg.unwrap_or(defaults.ffmpeg),
            ffprobe: opt.ffprobe.unwrap_or(defaults.ffprobe),
        },
        input: opt.input,
        missing_bit_rate: MissingBitRatePolicy::UseDefault(opt.default_bitrate),
    };

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let mut transcoder = FfmpegTranscoder::new(&config.tools.ffmpeg);

    let res = video_splitter::split_interactive(&config, &mut prompter, &mut transcoder);

    match res {
        Ok(Some(report)) if report.is_total_failure() => {
            eprintln!("No segments could be created");
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(-1);
        }
    }
}
