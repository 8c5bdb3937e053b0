use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use crate::encoders::{EncoderSet, HARDWARE_ENCODER, SOFTWARE_ENCODER};
use crate::plan::Segment;
use crate::probe::SourceMediaInfo;

const CONSTANT_PRESET: &str = "veryslow";
const VARIABLE_PRESET: &str = "medium";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    Constant,
    Variable,
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RateControl::Constant => f.write_str("Constant bit rate (CBR)"),
            RateControl::Variable => f.write_str("Variable bit rate (VBR)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    Software,
    Hardware,
}

impl Encoder {
    pub fn as_ffmpeg_codec(self) -> &'static str {
        match self {
            Encoder::Software => SOFTWARE_ENCODER,
            Encoder::Hardware => HARDWARE_ENCODER,
        }
    }
}

impl fmt::Display for Encoder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Encoder::Software => write!(f, "{} (Software)", self.as_ffmpeg_codec()),
            Encoder::Hardware => write!(f, "{} (Hardware accelerated)", self.as_ffmpeg_codec()),
        }
    }
}

/// Everything ffmpeg needs to encode one segment, apart from where it starts
/// and how long it is.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingParameters {
    pub encoder: Encoder,
    pub target_fps: f64,
    pub width: u32,
    pub height: u32,
    pub rate_control: RateControl,
    /// Bits per second.
    pub bit_rate: u64,
    pub min_rate: Option<u64>,
    pub max_rate: Option<u64>,
    /// Rate control buffer, in bits.
    pub buffer_size: Option<u64>,
    pub preset: Option<&'static str>,
    pub x264_params: Option<String>,
    pub qmin: Option<u32>,
}

impl EncodingParameters {
    pub fn derive(
        source: &SourceMediaInfo,
        target_fps: f64,
        rate_control: RateControl,
        encoders: &EncoderSet,
    ) -> Self {
        let bit_rate = source.bit_rate;
        let mut params = EncodingParameters {
            encoder: Encoder::Software,
            target_fps,
            width: source.width,
            height: source.height,
            rate_control,
            bit_rate,
            min_rate: None,
            max_rate: None,
            buffer_size: None,
            preset: None,
            x264_params: None,
            qmin: None,
        };

        match rate_control {
            // VideoToolbox can't be relied on to hold an exact rate, so CBR
            // always goes through x264.
            RateControl::Constant => {
                params.min_rate = Some(bit_rate);
                params.max_rate = Some(bit_rate);
                params.buffer_size = Some(bit_rate / 8);
                params.preset = Some(CONSTANT_PRESET);
                params.x264_params = Some(format!(
                    "nal-hrd=cbr:force-cfr=1:bitrate={}",
                    bit_rate / 1000,
                ));
                params.qmin = Some(0);
            }
            RateControl::Variable if encoders.has_hardware_encoder() => {
                params.encoder = Encoder::Hardware;
            }
            RateControl::Variable => {
                params.buffer_size = Some(bit_rate.saturating_mul(2));
                params.preset = Some(VARIABLE_PRESET);
            }
        }

        params
    }

    /// Full ffmpeg argument list for one segment.
    pub fn ffmpeg_args(&self, input: &Path, segment: &Segment, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into()];

        args.push("-i".into());
        args.push(input.into());
        push(&mut args, "-ss", segment.start);
        push(&mut args, "-t", segment.length);
        push(&mut args, "-c:v", self.encoder.as_ffmpeg_codec());
        push(&mut args, "-r", self.target_fps);
        push(&mut args, "-b:v", self.bit_rate);

        if let Some(min_rate) = self.min_rate {
            push(&mut args, "-minrate", min_rate);
        }
        if let Some(max_rate) = self.max_rate {
            push(&mut args, "-maxrate", max_rate);
        }
        if let Some(buffer_size) = self.buffer_size {
            push(&mut args, "-bufsize", buffer_size);
        }
        if let Some(preset) = self.preset {
            push(&mut args, "-preset", preset);
        }
        if let Some(x264_params) = &self.x264_params {
            push(&mut args, "-x264-params", x264_params);
        }
        if let Some(qmin) = self.qmin {
            push(&mut args, "-qmin", qmin);
        }

        push(&mut args, "-vf", format!("scale={}:{}", self.width, self.height));
        push(&mut args, "-c:a", "copy");
        push(&mut args, "-avoid_negative_ts", 1);
        args.push(output.into());

        args
    }
}

fn push(args: &mut Vec<OsString>, flag: &str, value: impl fmt::Display) {
    args.push(flag.into());
    args.push(value.to_string().into());
}
