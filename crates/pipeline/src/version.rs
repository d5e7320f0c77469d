//! `__version__ = "X.Y.Z"` handling for the package `__init__.py`.

use crate::error::{PipelineError, PipelineErrorExt};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const VERSION_VARIABLE: &str = "__version__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// The next patch version.
    ///
    /// # Errors
    /// A version error when the patch number is already at its maximum.
    pub fn increment(self) -> Result<Self, PipelineError> {
        let patch = self
            .patch
            .checked_add(1)
            .ok_or_else(|| PipelineError::version(format!("cannot increment {self}")))?;
        Ok(Self { patch, ..self })
    }
}

impl FromStr for Version {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            PipelineError::version(format!(
                "version has to be of form '1.2.3' (three numbers and two dots), got '{s}'"
            ))
        };
        let parts: Vec<u64> = s
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                part.parse::<u64>().map_err(|_| invalid())
            })
            .collect::<Result<_, _>>()?;

        match parts[..] {
            [major, minor, patch] => Ok(Self { major, minor, patch }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// What the release step does with the version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionRequest {
    /// Leave `__version__` alone (`""`, `None`).
    Keep,
    /// Patch + 1 (`increment`).
    Increment,
    /// An explicit `X.Y.Z`.
    Set(Version),
}

impl FromStr for VersionRequest {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "None" | "none" => Ok(Self::Keep),
            "increment" => Ok(Self::Increment),
            explicit => explicit.parse().map(Self::Set),
        }
    }
}

/// A located `__version__` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionLine {
    index: usize,
    quote: char,
    prefix: String,
    suffix: String,
    raw: String,
}

fn find_version_line(contents: &str) -> Result<VersionLine, PipelineError> {
    for (index, line) in contents.split_inclusive('\n').enumerate() {
        if !line.starts_with(VERSION_VARIABLE) {
            continue;
        }
        let malformed =
            || PipelineError::version(format!("malformed version line: {}", line.trim()));
        let value_at = line.find('=').ok_or_else(malformed)? + 1;
        let quote = line[value_at..]
            .chars()
            .find(|c| matches!(c, '"' | '\''))
            .ok_or_else(malformed)?;
        let mut pieces = line.splitn(3, quote);
        let (Some(prefix), Some(raw), Some(suffix)) = (pieces.next(), pieces.next(), pieces.next())
        else {
            return Err(malformed());
        };
        return Ok(VersionLine {
            index,
            quote,
            prefix: prefix.to_owned(),
            suffix: suffix.to_owned(),
            raw: raw.to_owned(),
        });
    }
    Err(PipelineError::version(format!("{VERSION_VARIABLE} variable not found")))
}

/// Reads the raw `__version__` string.
///
/// # Errors
/// An I/O error, or a version error when the variable is missing.
pub fn read_version(init: &Path) -> Result<String, PipelineError> {
    let contents = fs::read_to_string(init)
        .with_context(|| format!("Failed to read {}", init.display()))?;
    Ok(find_version_line(&contents)?.raw)
}

/// Rewrites `__version__` to `version`, keeping its quote style and every other line.
///
/// # Errors
/// An I/O error, or a version error when the variable is missing.
pub fn write_version(init: &Path, version: &str) -> Result<(), PipelineError> {
    let contents = fs::read_to_string(init)
        .with_context(|| format!("Failed to read {}", init.display()))?;
    let line = find_version_line(&contents)?;

    let rewritten: String = contents
        .split_inclusive('\n')
        .enumerate()
        .map(|(i, l)| {
            if i == line.index {
                format!("{}{q}{version}{q}{}", line.prefix, line.suffix, q = line.quote)
            } else {
                l.to_owned()
            }
        })
        .collect();

    fs::write(init, rewritten).with_context(|| format!("Failed to write {}", init.display()))
}

/// The version `request` turns `current` into.
///
/// # Errors
/// A version error when incrementing an unparsable `current`.
pub fn plan(current: &str, request: VersionRequest) -> Result<String, PipelineError> {
    Ok(match request {
        VersionRequest::Keep => current.to_owned(),
        VersionRequest::Increment => current.parse::<Version>()?.increment()?.to_string(),
        VersionRequest::Set(version) => version.to_string(),
    })
}

/// Applies `request` and returns `(previous, current)` raw version strings.
///
/// # Errors
/// An I/O error, or a version error for a missing variable or an unparsable current version
/// when incrementing.
pub fn apply_request(
    init: &Path,
    request: VersionRequest,
) -> Result<(String, String), PipelineError> {
    let previous = read_version(init)?;
    let next = plan(&previous, request)?;
    if next != previous {
        write_version(init, &next)?;
    }
    info!(from = %previous, to = %next, "version updated");
    Ok((previous, next))
}
