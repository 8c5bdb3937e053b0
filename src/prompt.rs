use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;
use crate::params::RateControl;
use crate::paths::clean_path;
use crate::plan::SplitMode;

/// Line-oriented questions and answers. Bad answers are re-asked.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Prompter { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
        }

        Ok(line.trim().to_owned())
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    fn positive<T>(&mut self, question: &str) -> io::Result<T>
    where
        T: FromStr + PartialOrd + Default,
    {
        loop {
            match self.ask(question)?.parse::<T>() {
                Ok(value) if value > T::default() => return Ok(value),
                Ok(_) => self.say("Please enter a positive number.")?,
                Err(_) => self.say("Please enter a valid number.")?,
            }
        }
    }

    fn positive_f64(&mut self, question: &str) -> io::Result<f64> {
        loop {
            let value = self.positive::<f64>(question)?;
            if value.is_finite() {
                return Ok(value);
            }
            self.say("Please enter a valid number.")?;
        }
    }

    /// Asks until the answer names an existing file.
    pub fn input_path(&mut self) -> io::Result<PathBuf> {
        loop {
            let path = clean_path(&self.ask("\nEnter the path to your video file: ")?);
            if path.is_file() {
                return Ok(path);
            }
            self.say(&format!("Error: File '{}' does not exist. Please try again.", path.display()))?;
        }
    }

    pub fn split_mode(&mut self) -> io::Result<SplitMode> {
        loop {
            let answer = self.ask(
                "\nDo you want to split by (1) number of segments or (2) duration per segment? Enter 1 or 2: ",
            )?;

            match answer.as_str() {
                "1" => {
                    let count = self.positive::<u64>("\nHow many segments would you like to split the video into? ")?;
                    return Ok(SplitMode::ByCount(count));
                }
                "2" => {
                    let length = self.positive_f64("\nEnter the duration (in seconds) for each segment: ")?;
                    return Ok(SplitMode::ByDuration(length));
                }
                _ => self.say("Please enter either 1 or 2.")?,
            }
        }
    }

    /// A blank answer keeps `source_fps`.
    pub fn target_fps(&mut self, source_fps: f64) -> io::Result<f64> {
        let question = format!(
            "\nWhat frame rate would you like for the output? (press Enter to keep {:.2}): ",
            source_fps,
        );

        loop {
            let answer = self.ask(&question)?;
            if answer.is_empty() {
                return Ok(source_fps);
            }

            match answer.parse::<f64>() {
                Ok(fps) if fps.is_finite() && fps > 0. => return Ok(fps),
                Ok(_) => self.say("Please enter a positive number.")?,
                Err(_) => self.say("Please enter a valid number.")?,
            }
        }
    }

    pub fn rate_control(&mut self) -> io::Result<RateControl> {
        loop {
            let answer = self.ask(
                "\nRate control: (1) constant bit rate or (2) variable bit rate? Enter 1 or 2: ",
            )?;

            match answer.as_str() {
                "1" => return Ok(RateControl::Constant),
                "2" => return Ok(RateControl::Variable),
                _ => self.say("Please enter either 1 or 2.")?,
            }
        }
    }

    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.ask(&format!("\n{} (y/n): ", question))?.to_lowercase();

        Ok(answer == "y" || answer == "yes")
    }
}
