#[macro_use] extern crate serde_derive;
#[macro_use] extern crate snafu;
extern crate serde_json as json;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use snafu::ResultExt;

pub mod encoders;
pub mod params;
pub mod paths;
pub mod plan;
pub mod probe;
pub mod prompt;
pub mod transcode;
pub mod verify;

use encoders::EncoderSet;
use params::EncodingParameters;
use plan::{SegmentPlan, SplitMode};
use probe::{BitRateSource, MissingBitRatePolicy, SourceMediaInfo};
use prompt::Prompter;
use transcode::{Job, RunReport, Transcoder};

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read answer: {}", source))]
    Prompt {
        source: io::Error,
    },
    #[snafu(display("Could not probe '{}': {}", input.display(), source))]
    ProbeInput {
        input: PathBuf,
        source: probe::Error,
    },
    #[snafu(display("Could not plan segments: {}", source))]
    Plan {
        source: plan::Error,
    },
    #[snafu(display("Could not split video: {}", source))]
    Split {
        source: transcode::Error,
    },
}

/// Locations of the external programs.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            ffmpeg: PathBuf::from(transcode::FFMPEG_EXE),
            ffprobe: PathBuf::from(probe::FFPROBE_EXE),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub tools: Tools,
    /// Skips the path question when it names an existing file.
    pub input: Option<PathBuf>,
    pub missing_bit_rate: MissingBitRatePolicy,
}

/// Asks the user how to split a video, then does it.
///
/// Returns `None` when the user declines at the confirmation step.
pub fn split_interactive<R, W, T>(
    config: &Config,
    prompter: &mut Prompter<R, W>,
    transcoder: &mut T,
) -> Result<Option<RunReport>>
where
    R: BufRead,
    W: Write,
    T: Transcoder,
{
    println!("Welcome to Video Splitter!");

    let input = match &config.input {
        Some(input) if input.is_file() => input.clone(),
        Some(input) => {
            println!("Error: File '{}' does not exist. Please try again.", input.display());
            prompter.input_path().context(Prompt)?
        }
        None => prompter.input_path().context(Prompt)?,
    };

    println!("\nAnalyzing video: {}", input.display());

    let info = probe::probe(&config.tools.ffprobe, &input, config.missing_bit_rate)
        .context(ProbeInput { input: &input })?;

    if info.bit_rate_source == BitRateSource::Default {
        println!("Warning: Could not determine bit rate, using default: {:.2} Mbps", mbps(info.bit_rate));
    }

    let encoders = encoders::query(&config.tools.ffmpeg).unwrap_or_else(|e| {
        println!("Warning: {}, assuming no hardware encoder", e);
        EncoderSet::new()
    });
    log::info!("Hardware encoder available: {}", encoders.has_hardware_encoder());

    print_source_info(&info);

    let mode = prompter.split_mode().context(Prompt)?;
    let plan = SegmentPlan::new(info.duration, mode).context(Plan)?;
    log::info!("Planned {} segments ({})", plan.len(), plan.mode());
    let target_fps = prompter.target_fps(info.frame_rate.as_f64()).context(Prompt)?;
    let rate_control = prompter.rate_control().context(Prompt)?;
    let params = EncodingParameters::derive(&info, target_fps, rate_control, &encoders);
    let output_dir = paths::output_dir(&input);

    print_settings(&input, &output_dir, &plan, &params, &encoders);

    if !prompter.confirm("Proceed with these settings?").context(Prompt)? {
        println!("Operation cancelled.");
        return Ok(None);
    }

    let job = Job {
        input: &input,
        output_dir: &output_dir,
        plan: &plan,
        params: &params,
    };
    let report = transcode::split(&job, transcoder).context(Split)?;

    print_report(&report, &output_dir);
    print_verification(&config.tools.ffprobe, &output_dir, &params);

    Ok(Some(report))
}

fn mbps(bit_rate: u64) -> f64 {
    bit_rate as f64 / 1_000_000.
}

fn print_source_info(info: &SourceMediaInfo) {
    println!("\nVideo information:");
    println!("  Current frame rate: {} fps", info.frame_rate);
    println!("  Current bit rate: {:.2} Mbps", mbps(info.bit_rate));
    println!("  Resolution: {}x{}", info.width, info.height);
    println!("  Duration: {:.2} seconds", info.duration);
}

fn print_settings(
    input: &Path,
    output_dir: &Path,
    plan: &SegmentPlan,
    params: &EncodingParameters,
    encoders: &EncoderSet,
) {
    println!("\nSettings Summary:");
    println!("  Input file: {}", input.display());
    println!("  Output directory: {}", output_dir.display());

    match plan.mode() {
        SplitMode::ByCount(_) => {
            println!("  Number of segments: {}", plan.len());
            println!("  Segment duration: {:.2} seconds", plan.segment_length());
        }
        SplitMode::ByDuration(_) => {
            println!("  Segment duration: {:.2} seconds", plan.segment_length());
            println!("  Number of segments: {}", plan.len());
        }
    }

    println!("  Target frame rate: {} fps", params.target_fps);
    println!("  Bit rate: {:.2} Mbps", mbps(params.bit_rate));
    println!("  Rate control: {}", params.rate_control);
    println!(
        "  Hardware acceleration: {}",
        if encoders.has_hardware_encoder() { "Available" } else { "Not available" },
    );
    println!("  Encoder: {}", params.encoder);
}

fn print_report(report: &RunReport, output_dir: &Path) {
    println!(
        "\nVideo splitting complete. {} of {} segments created. Output files in: {}",
        report.succeeded(),
        report.outcomes.len(),
        output_dir.display(),
    );

    for (index, cause) in report.failures() {
        println!("  Segment {} failed: {}", index, cause);
    }
}

fn print_verification(ffprobe: &Path, output_dir: &Path, params: &EncodingParameters) {
    match verify::verify(ffprobe, output_dir) {
        Ok(verification) => {
            println!("\nVerifying {}:", verification.path.display());
            println!("  Actual frame rate: {} fps", verification.frame_rate);
            println!("  Actual bit rate: {:.2} Mbps", mbps(verification.bit_rate));
            println!("  Encoder used: {}", params.encoder);
        }
        Err(e) => println!("\nWarning: Could not verify output: {}", e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::fs;
    use std::io::Cursor;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Writing an executable while another test forks can make exec fail with
    // ETXTBSY, so script-backed sessions run one at a time.
    static TOOLS: Mutex<()> = Mutex::new(());

    const METADATA_JSON: &str = r#"{
  "streams": [
    { "codec_type": "video", "avg_frame_rate": "30/1", "r_frame_rate": "30/1",
      "width": 1920, "height": 1080, "bit_rate": "8500000" },
    { "codec_type": "audio", "bit_rate": "128000" }
  ],
  "format": { "duration": "300.500000", "bit_rate": "8700000" }
}"#;

    const ENCODERS: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D h264_videotoolbox    VideoToolbox H.264 Encoder (codec h264)";

    #[derive(Default)]
    struct RecordingTranscoder {
        calls: Vec<Vec<OsString>>,
    }

    impl Transcoder for RecordingTranscoder {
        fn transcode(&mut self, args: &[OsString]) -> std::result::Result<(), transcode::Error> {
            self.calls.push(args.to_vec());
            Ok(())
        }
    }

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_mode(0o755);
        fs::set_permissions(&path, permissions).unwrap();
        path
    }

    fn printing(output: &str) -> String {
        format!("cat <<'EOF'\n{}\nEOF", output)
    }

    /// A directory with an input video and stand-in tools.
    fn workspace(ffprobe_body: &str, ffmpeg_body: Option<&str>) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.mp4");
        fs::write(&input, b"").unwrap();

        let ffprobe = script(dir.path(), "ffprobe", ffprobe_body);
        let ffmpeg = match ffmpeg_body {
            Some(body) => script(dir.path(), "ffmpeg", body),
            None => dir.path().join("missing-ffmpeg"),
        };

        let config = Config {
            tools: Tools { ffmpeg, ffprobe },
            input: Some(input),
            missing_bit_rate: MissingBitRatePolicy::default(),
        };

        (dir, config)
    }

    fn prompter(answers: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(answers.as_bytes().to_vec()), Vec::new())
    }

    fn value_of(args: &[OsString], flag: &str) -> Option<String> {
        args.iter()
            .position(|arg| arg == flag)
            .map(|i| args[i + 1].to_string_lossy().into_owned())
    }

    #[test]
    fn declining_runs_nothing() {
        let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, config) = workspace(&printing(METADATA_JSON), None);
        let mut prompter = prompter("1\n3\n\n1\nn\n");
        let mut transcoder = RecordingTranscoder::default();

        let result = split_interactive(&config, &mut prompter, &mut transcoder).unwrap();

        assert!(result.is_none());
        assert!(transcoder.calls.is_empty());
    }

    #[test]
    fn unreadable_metadata_aborts() {
        let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, config) = workspace("exit 1", None);
        let mut prompter = prompter("");
        let mut transcoder = RecordingTranscoder::default();

        match split_interactive(&config, &mut prompter, &mut transcoder) {
            Err(Error::ProbeInput { .. }) => {}
            other => panic!("expected ProbeInput, got {:?}", other),
        }
        assert!(transcoder.calls.is_empty());
    }

    #[test]
    fn missing_input_is_asked_again_and_software_is_used_without_encoder_list() {
        let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
        let (dir, mut config) = workspace(&printing(METADATA_JSON), None);
        let input = config.input.replace(dir.path().join("not-there.mp4")).unwrap();
        let answers = format!("{}\n2\n60\n\n2\ny\n", input.display());
        let mut prompter = prompter(&answers);
        let mut transcoder = RecordingTranscoder::default();

        let report = split_interactive(&config, &mut prompter, &mut transcoder)
            .unwrap()
            .unwrap();

        assert_eq!(report.outcomes.len(), 6);
        assert!(report.is_complete());
        assert_eq!(transcoder.calls.len(), 6);
        for args in &transcoder.calls {
            assert_eq!(value_of(args, "-c:v").as_deref(), Some("libx264"));
            assert_eq!(value_of(args, "-r").as_deref(), Some("30"));
            assert_eq!(value_of(args, "-bufsize").as_deref(), Some("17000000"));
        }
        assert!(dir.path().join("clip_parts").is_dir());
    }

    #[test]
    fn variable_rate_uses_reported_hardware_encoder() {
        let _guard = TOOLS.lock().unwrap_or_else(|e| e.into_inner());
        let (_dir, config) = workspace(&printing(METADATA_JSON), Some(printing(ENCODERS).as_str()));
        let mut prompter = prompter("1\n6\n24\n2\ny\n");
        let mut transcoder = RecordingTranscoder::default();

        let report = split_interactive(&config, &mut prompter, &mut transcoder)
            .unwrap()
            .unwrap();

        assert_eq!(report.outcomes.len(), 6);
        let starts: Vec<_> = transcoder.calls.iter()
            .map(|args| value_of(args, "-ss").unwrap())
            .collect();
        assert_eq!(starts, vec!["0", "51", "102", "153", "204", "255"]);
        for args in &transcoder.calls {
            assert_eq!(value_of(args, "-c:v").as_deref(), Some("h264_videotoolbox"));
            assert_eq!(value_of(args, "-r").as_deref(), Some("24"));
            assert_eq!(value_of(args, "-bufsize"), None);
        }
    }
}
