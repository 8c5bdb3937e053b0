use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::string;
use snafu::ResultExt;

pub const SOFTWARE_ENCODER: &str = "libx264";
pub const HARDWARE_ENCODER: &str = "h264_videotoolbox";

/// Encoder names reported by `ffmpeg -encoders`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncoderSet {
    names: BTreeSet<String>,
}

impl EncoderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn has_hardware_encoder(&self) -> bool {
        self.contains(HARDWARE_ENCODER)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Parses the table printed by `ffmpeg -encoders`.
    ///
    /// Everything up to the ` ------` separator is the legend. Each row after
    /// it is `<flags> <name> <description>`.
    pub fn parse(listing: &str) -> Self {
        let names = listing
            .lines()
            .skip_while(|line| !line.trim_start().starts_with("---"))
            .skip(1)
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_owned)
            .collect();

        EncoderSet { names }
    }
}

impl<S: Into<String>> std::iter::FromIterator<S> for EncoderSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        EncoderSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

pub fn query(ffmpeg: &Path) -> Result<EncoderSet, Error> {
    log::debug!("Querying encoders with {} -encoders", ffmpeg.display());

    let output = Command::new(ffmpeg)
        .args(&["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .context(ProcessError)?;

    ensure!(output.status.success(), FfmpegError { status: output.status });

    let stdout = String::from_utf8(output.stdout)
        .context(InvalidUtf8)?;
    let encoders = EncoderSet::parse(&stdout);

    log::debug!("ffmpeg reports {} encoders", encoders.len());

    Ok(encoders)
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not get ffmpeg encoder list: {}", source))]
    ProcessError {
        source: io::Error,
    },
    #[snafu(display("ffmpeg -encoders exited unsuccessfully ({})", status))]
    FfmpegError {
        status: ExitStatus,
    },
    #[snafu(display("Invalid UTF-8 in encoder list: {}", source))]
    InvalidUtf8 {
        source: string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 A..... = Audio
 S..... = Subtitle
 .F.... = Frame-level multithreading
 ..S... = Slice-level multithreading
 ...X.. = Codec is experimental
 ....B. = Supports draw_horiz_band
 .....D = Supports direct rendering method 1
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC / MPEG-4 part 10 (codec h264)
 V....D h264_videotoolbox    VideoToolbox H.264 Encoder (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn parses_names_after_separator() {
        let encoders = EncoderSet::parse(LISTING);

        assert_eq!(encoders.len(), 3);
        assert!(encoders.contains("libx264"));
        assert!(encoders.contains("aac"));
        assert!(encoders.has_hardware_encoder());
    }

    #[test]
    fn legend_is_not_an_encoder() {
        let encoders = EncoderSet::parse(LISTING);

        assert!(!encoders.contains("="));
        assert!(!encoders.contains("Video"));
    }

    #[test]
    fn description_mentions_do_not_count() {
        let listing = " ------\n V....D libx264  mentions h264_videotoolbox in passing\n";
        let encoders = EncoderSet::parse(listing);

        assert!(encoders.contains("libx264"));
        assert!(!encoders.has_hardware_encoder());
    }

    #[test]
    fn empty_listing() {
        assert!(EncoderSet::parse("").is_empty());
        assert!(EncoderSet::parse("garbage\nwithout separator\n").is_empty());
    }
}
