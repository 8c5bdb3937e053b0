use std::fmt;

/// How the user asked for the source to be cut up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitMode {
    /// A fixed number of parts, each `ceil(duration / n)` seconds long.
    ByCount(u64),
    /// Parts of a fixed length in seconds.
    ByDuration(f64),
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SplitMode::ByCount(n) => write!(f, "{} segments", n),
            SplitMode::ByDuration(d) => write!(f, "{:.2} seconds per segment", d),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// 1-based, as used in the output file name.
    pub index: u64,
    pub start: f64,
    pub length: f64,
}

/// Contiguous segments covering `[0, count * length)`.
///
/// The last segment may run past the end of the source; ffmpeg stops at the
/// end of the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    mode: SplitMode,
    count: u64,
    length: f64,
}

impl SegmentPlan {
    pub fn new(duration: f64, mode: SplitMode) -> Result<Self, Error> {
        ensure!(duration.is_finite() && duration > 0., InvalidDuration { duration });

        let (count, length) = match mode {
            SplitMode::ByCount(count) => {
                ensure!(count > 0, InvalidCount);
                (count, (duration / count as f64).ceil())
            }
            SplitMode::ByDuration(length) => {
                ensure!(length.is_finite() && length > 0., InvalidLength { length });
                ((duration / length).ceil() as u64, length)
            }
        };

        Ok(SegmentPlan { mode, count, length })
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn len(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Nominal length of every segment.
    pub fn segment_length(&self) -> f64 {
        self.length
    }

    pub fn segments(&self) -> Segments {
        Segments {
            next: 0,
            count: self.count,
            length: self.length,
        }
    }
}

impl<'a> IntoIterator for &'a SegmentPlan {
    type Item = Segment;
    type IntoIter = Segments;

    fn into_iter(self) -> Segments {
        self.segments()
    }
}

pub struct Segments {
    next: u64,
    count: u64,
    length: f64,
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.next >= self.count {
            return None;
        }

        let position = self.next;
        self.next += 1;

        Some(Segment {
            index: position + 1,
            start: position as f64 * self.length,
            length: self.length,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        if remaining > usize::MAX as u64 {
            (usize::MAX, None)
        } else {
            (remaining as usize, Some(remaining as usize))
        }
    }
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Duration must be a positive number of seconds, got {}", duration))]
    InvalidDuration {
        duration: f64,
    },
    #[snafu(display("Segment count must be positive"))]
    InvalidCount,
    #[snafu(display("Segment length must be a positive number of seconds, got {}", length))]
    InvalidLength {
        length: f64,
    },
}
