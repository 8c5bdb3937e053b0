use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use snafu::ResultExt;
use crate::params::EncodingParameters;
use crate::paths;
use crate::plan::SegmentPlan;

#[cfg(target_os = "windows")]
pub const FFMPEG_EXE: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
pub const FFMPEG_EXE: &str = "ffmpeg";

/// Runs one external transcode to completion.
pub trait Transcoder {
    fn transcode(&mut self, args: &[OsString]) -> Result<(), Error>;
}

pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        FfmpegTranscoder { program: program.into() }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&mut self, args: &[OsString]) -> Result<(), Error> {
        log::debug!("Running {} {:?}", self.program.display(), args);

        // ffmpeg reads stdin for interactive commands; keep it away from the prompts.
        let status = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .context(ProcessError)?;

        ensure!(status.success(), FfmpegError { status: status.to_string() });

        Ok(())
    }
}

pub struct Job<'a> {
    pub input: &'a Path,
    pub output_dir: &'a Path,
    pub plan: &'a SegmentPlan,
    pub params: &'a EncodingParameters,
}

#[derive(Debug)]
pub enum SegmentOutcome {
    Success(PathBuf),
    Failure {
        index: u64,
        cause: Error,
    },
}

impl SegmentOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            SegmentOutcome::Success(_) => true,
            SegmentOutcome::Failure { .. } => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<SegmentOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (u64, &Error)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            SegmentOutcome::Failure { index, cause } => Some((*index, cause)),
            SegmentOutcome::Success(_) => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    pub fn is_total_failure(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }
}

/// Transcodes every segment of the plan in order, one at a time.
///
/// A failed segment is recorded and the next one is attempted. Only failing to
/// create the output directory stops the run.
pub fn split<T: Transcoder>(job: &Job, transcoder: &mut T) -> Result<RunReport, Error> {
    fs::create_dir_all(job.output_dir)
        .context(CreateOutputDir { path: job.output_dir })?;

    let total = job.plan.len();
    let mut report = RunReport::default();

    for segment in job.plan {
        let output = paths::segment_path(job.input, job.output_dir, segment.index);
        let args = job.params.ffmpeg_args(job.input, &segment, &output);

        println!("\nCreating segment {}/{}: {}", segment.index, total, output.display());

        let outcome = match transcoder.transcode(&args) {
            Ok(()) => SegmentOutcome::Success(output),
            Err(cause) => {
                println!("Error creating segment {}: {}", segment.index, cause);
                log::warn!("Segment {} failed: {}", segment.index, cause);
                SegmentOutcome::Failure { index: segment.index, cause }
            }
        };

        report.outcomes.push(outcome);
    }

    Ok(report)
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not run ffmpeg: {}", source))]
    ProcessError {
        source: io::Error,
    },
    #[snafu(display("ffmpeg exited unsuccessfully ({})", status))]
    FfmpegError {
        status: String,
    },
    #[snafu(display("Could not create output directory {}: {}", path.display(), source))]
    CreateOutputDir {
        path: PathBuf,
        source: io::Error,
    },
}
