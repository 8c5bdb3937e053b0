use snafu::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;

#[cfg(target_os = "windows")]
pub const FFPROBE_EXE: &str = "ffprobe.exe";
#[cfg(not(target_os = "windows"))]
pub const FFPROBE_EXE: &str = "ffprobe";

/// Bit rate used when neither the stream nor the container reports one.
pub const DEFAULT_BIT_RATE: u64 = 2_000_000;

/// Lowest accepted bit rate; x264 takes its rate in whole kbps.
pub const MIN_BIT_RATE: u64 = 1_000;
/// Highest accepted bit rate, 10 Gbps.
pub const MAX_BIT_RATE: u64 = 10_000_000_000;

/// Frame rate used when a stream reports neither an average nor a nominal rate.
const DEFAULT_FRAME_RATE: FrameRate = FrameRate { num: 30, den: 1 };

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not run ffprobe: {}", source))]
    ProcessError {
        source: io::Error,
    },
    #[snafu(display("'{}' exited unsuccessfully ({})", command, status))]
    FfprobeError {
        command: String,
        status: ExitStatus,
    },
    #[snafu(display("Could not parse ffprobe output for '{}': {}", path.display(), source))]
    ParseProbeOutput {
        path: PathBuf,
        source: json::Error,
    },
    #[snafu(display("No video stream found"))]
    NoVideoStream,
    #[snafu(display("Video stream has no {}", field))]
    MissingField {
        field: &'static str,
    },
    #[snafu(display("Invalid frame rate '{}', expected <numerator>/<denominator>", value))]
    InvalidFrameRate {
        value: String,
    },
    #[snafu(display("Frame rate '{}' is zero", value))]
    ZeroFrameRate {
        value: String,
    },
    #[snafu(display("Invalid {} '{}': {}", field, value, source))]
    InvalidInteger {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
    #[snafu(display("Invalid duration '{}': {}", value, source))]
    InvalidDuration {
        value: String,
        source: ParseFloatError,
    },
    #[snafu(display("Could not determine bit rate"))]
    MissingBitRate,
    #[snafu(display("Bit rate {} bps is outside {}..={}", bit_rate, MIN_BIT_RATE, MAX_BIT_RATE))]
    InvalidBitRate {
        bit_rate: u64,
    },
}

pub fn check_bit_rate(bit_rate: u64) -> Result<u64, Error> {
    ensure!(bit_rate >= MIN_BIT_RATE && bit_rate <= MAX_BIT_RATE, InvalidBitRate { bit_rate });

    Ok(bit_rate)
}

/// Parses a bit rate in bits/second given on the command line.
pub fn parse_bit_rate(s: &str) -> Result<u64, Error> {
    let bit_rate = s.trim().parse::<u64>()
        .context(InvalidInteger { field: "bit rate", value: s })?;

    check_bit_rate(bit_rate)
}

/// A frame rate as ffprobe reports it, e.g. `30000/1001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// `0/1` and `0/0` are how ffprobe says "unknown".
    pub fn is_zero(self) -> bool {
        self.num == 0 || self.den == 0
    }
}

impl FromStr for FrameRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let mut parts = s.trim().splitn(2, '/');
        let num = parts.next().unwrap_or("");
        let den = parts.next().context(InvalidFrameRate { value: s })?;
        let is_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());

        ensure!(is_digits(num) && is_digits(den), InvalidFrameRate { value: s });

        Ok(FrameRate {
            num: num.parse().context(InvalidInteger { field: "frame rate numerator", value: num })?,
            den: den.parse().context(InvalidInteger { field: "frame rate denominator", value: den })?,
        })
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{:.2}", self.as_f64())
        }
    }
}

/// What to do when no bit rate can be found for the video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingBitRatePolicy {
    UseDefault(u64),
    Fail,
}

impl Default for MissingBitRatePolicy {
    fn default() -> Self {
        MissingBitRatePolicy::UseDefault(DEFAULT_BIT_RATE)
    }
}

/// Where the bit rate in [`SourceMediaInfo`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitRateSource {
    Stream,
    StreamTag,
    Container,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceMediaInfo {
    pub frame_rate: FrameRate,
    /// Bits per second.
    pub bit_rate: u64,
    pub bit_rate_source: BitRateSource,
    pub width: u32,
    pub height: u32,
    /// Seconds.
    pub duration: f64,
}

pub fn probe(ffprobe: &Path, path: &Path, policy: MissingBitRatePolicy) -> Result<SourceMediaInfo, Error> {
    log::debug!("Probing {} with {}", path.display(), ffprobe.display());

    let output = Command::new(ffprobe)
        .args(&[
            "-v", "error",
            "-show_streams",
            "-show_format",
            "-print_format", "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .context(ProcessError)?;

    ensure!(output.status.success(), FfprobeError {
        command: ffprobe.display().to_string(),
        status: output.status,
    });

    let specs = json::from_slice::<Specs>(&output.stdout)
        .context(ParseProbeOutput { path })?;

    specs.media_info(policy)
}

#[derive(Deserialize)]
pub struct Specs {
    #[serde(default)]
    pub streams: Vec<Stream>,
    #[serde(default)]
    pub format: Format,
}

#[derive(Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub codec_type: String,
    pub avg_frame_rate: Option<String>,
    pub r_frame_rate: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Deserialize, Default)]
pub struct Format {
    pub duration: Option<String>,
    pub bit_rate: Option<String>,
}

impl Specs {
    pub fn media_info(&self, policy: MissingBitRatePolicy) -> Result<SourceMediaInfo, Error> {
        let stream = self.streams.iter()
            .find(|stream| stream.codec_type == "video")
            .context(NoVideoStream)?;

        let frame_rate = stream.frame_rate()?;
        let width = stream.width.context(MissingField { field: "width" })?;
        let height = stream.height.context(MissingField { field: "height" })?;
        let (bit_rate, bit_rate_source) = self.bit_rate(stream, policy)?;

        let duration = self.format.duration.as_ref()
            .context(MissingField { field: "duration" })?;
        let duration = duration.trim().parse::<f64>()
            .context(InvalidDuration { value: duration.as_str() })?;

        Ok(SourceMediaInfo {
            frame_rate,
            bit_rate,
            bit_rate_source,
            width,
            height,
            duration,
        })
    }

    fn bit_rate(&self, stream: &Stream, policy: MissingBitRatePolicy) -> Result<(u64, BitRateSource), Error> {
        let candidates = [
            (stream.bit_rate.as_ref(), BitRateSource::Stream, "stream bit rate"),
            (stream.tags.get("BPS"), BitRateSource::StreamTag, "BPS tag"),
            (self.format.bit_rate.as_ref(), BitRateSource::Container, "container bit rate"),
        ];

        for &(value, source, field) in &candidates {
            if let Some(value) = value {
                let bit_rate = value.trim().parse::<u64>()
                    .context(InvalidInteger { field, value: value.as_str() })?;
                return Ok((check_bit_rate(bit_rate)?, source));
            }
        }

        match policy {
            MissingBitRatePolicy::UseDefault(bit_rate) => {
                log::warn!("Could not determine bit rate, using default of {} bps", bit_rate);
                Ok((check_bit_rate(bit_rate)?, BitRateSource::Default))
            }
            MissingBitRatePolicy::Fail => MissingBitRate.fail(),
        }
    }
}

impl Stream {
    fn frame_rate(&self) -> Result<FrameRate, Error> {
        if let Some(avg) = &self.avg_frame_rate {
            let avg = avg.parse::<FrameRate>()?;
            if !avg.is_zero() {
                return Ok(avg);
            }
        }

        let nominal = match &self.r_frame_rate {
            Some(nominal) => nominal.parse::<FrameRate>()?,
            None => DEFAULT_FRAME_RATE,
        };

        log::debug!("Average frame rate unset, using nominal rate {}/{}", nominal.num, nominal.den);

        ensure!(!nominal.is_zero(), ZeroFrameRate {
            value: format!("{}/{}", nominal.num, nominal.den),
        });

        Ok(nominal)
    }
}
