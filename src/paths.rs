use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Strips surrounding whitespace and quotes, as left behind by dragging a
/// file into a terminal.
pub fn clean_path(input: &str) -> PathBuf {
    let trimmed = input
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();

    PathBuf::from(trimmed)
}

fn stem(input: &Path) -> OsString {
    input.file_stem().map(Into::into).unwrap_or_else(|| "output".into())
}

/// `<dir>/<stem>_parts` next to the input file.
pub fn output_dir(input: &Path) -> PathBuf {
    let mut name = stem(input);
    name.push("_parts");

    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

/// `<output_dir>/<stem>_part<index:03>.<ext>`
pub fn segment_path(input: &Path, output_dir: &Path, index: u64) -> PathBuf {
    let mut name = stem(input);
    name.push(format!("_part{:03}", index));

    if let Some(extension) = input.extension() {
        name.push(".");
        name.push(extension);
    }

    output_dir.join(name)
}
