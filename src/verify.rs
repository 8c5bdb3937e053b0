use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use snafu::{OptionExt, ResultExt};
use crate::probe::{self, FrameRate, MissingBitRatePolicy};

/// What one of the produced files actually looks like.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub path: PathBuf,
    pub frame_rate: FrameRate,
    pub bit_rate: u64,
}

/// Picks the lexicographically first file in `output_dir`.
pub fn first_output(output_dir: &Path) -> Result<PathBuf, Error> {
    let entries = fs::read_dir(output_dir)
        .context(ReadOutputDir { path: output_dir })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.context(ReadOutputDir { path: output_dir })?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.into_iter().min().context(NoOutputs { path: output_dir })
}

pub fn verify(ffprobe: &Path, output_dir: &Path) -> Result<Verification, Error> {
    let path = first_output(output_dir)?;
    let info = probe::probe(ffprobe, &path, MissingBitRatePolicy::Fail)
        .context(ProbeOutput { path: &path })?;

    Ok(Verification {
        path,
        frame_rate: info.frame_rate,
        bit_rate: info.bit_rate,
    })
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not read {}: {}", path.display(), source))]
    ReadOutputDir {
        path: PathBuf,
        source: io::Error,
    },
    #[snafu(display("No output files found in {}", path.display()))]
    NoOutputs {
        path: PathBuf,
    },
    #[snafu(display("Could not probe '{}': {}", path.display(), source))]
    ProbeOutput {
        path: PathBuf,
        source: probe::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn picks_lexicographically_first_file() {
        let dir = tempfile::tempdir().unwrap();
        for name in &["clip_part010.mp4", "clip_part002.mp4", "clip_part001.mp4"] {
            File::create(dir.path().join(name)).unwrap();
        }
        fs::create_dir(dir.path().join("a_subdirectory")).unwrap();

        assert_eq!(first_output(dir.path()).unwrap(), dir.path().join("clip_part001.mp4"));
    }

    #[test]
    fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();

        match first_output(dir.path()) {
            Err(Error::NoOutputs { .. }) => {}
            other => panic!("expected NoOutputs, got {:?}", other),
        }
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();

        match first_output(&dir.path().join("missing")) {
            Err(Error::ReadOutputDir { .. }) => {}
            other => panic!("expected ReadOutputDir, got {:?}", other),
        }
    }
}
