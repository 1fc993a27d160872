//! Numbered frame sequences and output-name templates.
//!
//! Time-lapse inputs arrive as pairs of first/last filenames like
//! `dsc0100.jpg` / `dsc0250.jpg`; the pair expands into every name in
//! between with the same zero-padded width. Output names come from a
//! template whose stem ends in a run of `X` characters that is replaced by
//! the frame index.

use std::path::{Path, PathBuf};

use crate::{IoError, IoResult};

/// A filename split into sequence parts.
///
/// `name = prefix + zero-padded number (digits wide) + suffix`. The suffix
/// is the extension including its dot. Names without trailing digits have
/// `digits == 0` and `number == 0`.
///
/// # Example
///
/// ```rust
/// use lapse_io::split_name;
///
/// let s = split_name("shots/dsc0042.jpg").unwrap();
/// assert_eq!(s.prefix, "shots/dsc");
/// assert_eq!(s.digits, 4);
/// assert_eq!(s.number, 42);
/// assert_eq!(s.suffix, ".jpg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceName {
    /// Everything before the digit run.
    pub prefix: String,
    /// Width of the digit run.
    pub digits: usize,
    /// Numeric value of the digit run.
    pub number: i64,
    /// Extension including the dot, or empty.
    pub suffix: String,
}

/// Splits a filename into (prefix, digit run, suffix).
///
/// A leading dot with no other dot is not treated as an extension, so
/// hidden files keep their full name as the stem.
///
/// # Errors
///
/// Returns [`IoError::EmptyFileName`] for an empty input.
pub fn split_name(name: &str) -> IoResult<SequenceName> {
    if name.is_empty() {
        return Err(IoError::EmptyFileName);
    }

    let (stem, suffix) = match name.rfind('.') {
        Some(pos) if pos != 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };

    let digit_start = stem
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|pos| pos + c_len(stem, pos))
        .unwrap_or(0);
    let digit_run = &stem[digit_start..];

    let number = if digit_run.is_empty() {
        0
    } else {
        digit_run
            .parse::<i64>()
            .map_err(|_| IoError::Format(format!("digit run too large in '{name}'")))?
    };

    Ok(SequenceName {
        prefix: stem[..digit_start].to_string(),
        digits: digit_run.len(),
        number,
        suffix: suffix.to_string(),
    })
}

/// UTF-8 length of the char starting at `pos`.
fn c_len(s: &str, pos: usize) -> usize {
    s[pos..].chars().next().map_or(1, char::len_utf8)
}

/// Expands a first/last filename pair into the full list of frame names.
///
/// Prefixes, suffixes, and digit widths must match, and the numeric value
/// of `last` must not be below `first`. The result covers the inclusive
/// range with the pair's zero-padded width.
///
/// # Example
///
/// ```rust
/// use lapse_io::expand_pair;
///
/// let names = expand_pair("f08.jpg", "f11.jpg").unwrap();
/// assert_eq!(names, ["f08.jpg", "f09.jpg", "f10.jpg", "f11.jpg"]);
/// ```
pub fn expand_pair(first: &str, last: &str) -> IoResult<Vec<String>> {
    let a = split_name(first)?;
    let b = split_name(last)?;

    if a.prefix != b.prefix || a.suffix != b.suffix || a.digits != b.digits {
        return Err(IoError::SequenceMismatch {
            first: first.to_string(),
            last: last.to_string(),
        });
    }
    if a.number > b.number {
        return Err(IoError::DecreasingRange {
            first: first.to_string(),
            last: last.to_string(),
        });
    }

    let mut names = Vec::with_capacity((b.number - a.number + 1) as usize);
    for n in a.number..=b.number {
        if a.digits > 0 {
            names.push(format!(
                "{}{:0width$}{}",
                a.prefix,
                n,
                a.suffix,
                width = a.digits
            ));
        } else {
            names.push(format!("{}{}", a.prefix, a.suffix));
        }
    }
    Ok(names)
}

/// Output filename template.
///
/// The stem must end in a run of `X` characters; that run is replaced by
/// the zero-padded decimal frame index of matching width.
///
/// # Example
///
/// ```rust
/// use lapse_io::OutputTemplate;
///
/// let tmpl = OutputTemplate::parse("out/frameXXX.jpg").unwrap();
/// assert_eq!(tmpl.frame_path(7), std::path::PathBuf::from("out/frame007.jpg"));
/// ```
#[derive(Debug, Clone)]
pub struct OutputTemplate {
    parent: PathBuf,
    prefix: String,
    width: usize,
    extension: Option<String>,
}

impl OutputTemplate {
    /// Parses a template of the form `[path/]nameXXXX.ext`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidOutputTemplate`] when the stem has no
    /// trailing `X` run.
    pub fn parse(template: &str) -> IoResult<Self> {
        let path = Path::new(template);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let x_start = stem
            .rfind(|c| c != 'X')
            .map(|pos| pos + c_len(stem, pos))
            .unwrap_or(0);
        if x_start >= stem.len() {
            return Err(IoError::InvalidOutputTemplate(template.to_string()));
        }

        Ok(Self {
            parent: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            prefix: stem[..x_start].to_string(),
            width: stem.len() - x_start,
            extension: path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_string),
        })
    }

    /// Builds the output path for a frame index.
    ///
    /// Indices wider than the `X` run grow the number rather than truncate
    /// it.
    pub fn frame_path(&self, index: usize) -> PathBuf {
        let mut name = format!("{}{:0width$}", self.prefix, index, width = self.width);
        if let Some(ext) = &self.extension {
            name.push('.');
            name.push_str(ext);
        }
        self.parent.join(name)
    }
}
