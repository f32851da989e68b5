//! Resolving which on-disk copy of the tz database corpus to compile.
//!
//! A work directory may contain more than one extracted `tzdata<version>`
//! directory and/or `tzdata<version>.tar.gz` archive, left over from
//! previous runs. This module picks the one to use: either the version
//! named explicitly on the command line, or the newest one found.

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum Error {
    /// No `tzdata<version>` directory or archive was found in the work
    /// directory.
    NoneFound,

    /// An explicit version string didn't name a 4-digit-year-plus-letter
    /// version, or didn't correspond to anything in the work directory.
    NotFound(String),

    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoneFound => write!(
                f,
                "no tzdata<version> directory or archive found in the work directory"
            ),
            Error::NotFound(v) => write!(f, "no tzdata{v} directory or archive found"),
            Error::Io(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(source) => Some(source),
            Error::NoneFound | Error::NotFound(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Error {
        Error::Io(source)
    }
}

/// One candidate corpus found on disk.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Discovered {
    /// The version string, e.g. `"2023b"`.
    pub version: String,
    /// Where it lives: either the extracted directory, or the archive.
    pub path: PathBuf,
    /// Whether `path` is a directory (as opposed to a `.tar.gz` archive).
    pub is_directory: bool,
}

/// Parses a version string into `(year, letter)` for comparison: 4
/// digits followed by exactly one lowercase ASCII letter.
fn parse_version(input: &str) -> Option<(u16, char)> {
    if input.len() != 5 || !input.is_char_boundary(4) {
        return None;
    }
    let (year, letter) = input.split_at(4);
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let letter = letter.chars().next()?;
    if !letter.is_ascii_lowercase() {
        return None;
    }
    Some((year.parse().ok()?, letter))
}

/// Orders two version strings the way `spec.md` §6 describes: numeric
/// ascending on the year, then ascending on the letter — so the
/// "newest" version is the one that compares `Greater`. Returns `None`
/// if either string isn't a well-formed version.
pub fn compare(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_version(a)?.cmp(&parse_version(b)?))
}

fn entry_version(file_name: &str) -> Option<(String, bool)> {
    if let Some(stripped) = file_name.strip_suffix(".tar.gz") {
        let version = stripped.strip_prefix("tzdata")?;
        parse_version(version)?;
        Some((version.to_owned(), false))
    } else {
        let version = file_name.strip_prefix("tzdata")?;
        parse_version(version)?;
        Some((version.to_owned(), true))
    }
}

/// Scans `workdir` for every `tzdata<version>` directory or
/// `tzdata<version>.tar.gz` archive, and returns the newest one.
/// Directories beat archives when the version is otherwise tied.
pub fn discover_newest(workdir: &Path) -> Result<Discovered, Error> {
    let mut best: Option<Discovered> = None;

    for entry in fs::read_dir(workdir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some((version, is_directory)) = entry_version(name) else {
            continue;
        };

        let path = entry.path();
        if is_directory != path.is_dir() {
            continue;
        }

        let candidate = Discovered {
            version,
            path,
            is_directory,
        };

        best = Some(match best {
            None => candidate,
            Some(current) => pick_newer(current, candidate),
        });
    }

    best.ok_or(Error::NoneFound)
}

fn pick_newer(a: Discovered, b: Discovered) -> Discovered {
    match compare(&a.version, &b.version).expect("both candidates were already validated") {
        Ordering::Less => b,
        Ordering::Greater => a,
        Ordering::Equal if b.is_directory && !a.is_directory => b,
        Ordering::Equal => a,
    }
}

/// Resolves the corpus to compile: the explicit `version`, if given,
/// otherwise the newest one found in `workdir`.
pub fn resolve(version: Option<&str>, workdir: &Path) -> Result<Discovered, Error> {
    match version {
        None => discover_newest(workdir),
        Some(version) => {
            parse_version(version).ok_or_else(|| Error::NotFound(version.to_owned()))?;

            let dir = workdir.join(format!("tzdata{version}"));
            if dir.is_dir() {
                return Ok(Discovered {
                    version: version.to_owned(),
                    path: dir,
                    is_directory: true,
                });
            }

            let archive = workdir.join(format!("tzdata{version}.tar.gz"));
            if archive.is_file() {
                return Ok(Discovered {
                    version: version.to_owned(),
                    path: archive,
                    is_directory: false,
                });
            }

            Err(Error::NotFound(version.to_owned()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_year_wins() {
        assert_eq!(compare("2022a", "2023a"), Some(Ordering::Less));
    }

    #[test]
    fn later_letter_wins_within_a_year() {
        assert_eq!(compare("2023a", "2023b"), Some(Ordering::Less));
    }

    #[test]
    fn malformed_versions_do_not_compare() {
        assert_eq!(compare("2023", "2023a"), None);
        assert_eq!(compare("abcde", "2023a"), None);
    }

    #[test]
    fn directory_beats_archive_on_a_tie() {
        let dir = Discovered {
            version: "2023b".to_owned(),
            path: PathBuf::from("tzdata2023b"),
            is_directory: true,
        };
        let archive = Discovered {
            version: "2023b".to_owned(),
            path: PathBuf::from("tzdata2023b.tar.gz"),
            is_directory: false,
        };
        assert_eq!(pick_newer(dir.clone(), archive.clone()), dir);
        assert_eq!(pick_newer(archive, dir.clone()), dir);
    }

    #[test]
    fn newer_year_beats_older_directory() {
        let old = Discovered {
            version: "2022a".to_owned(),
            path: PathBuf::from("tzdata2022a"),
            is_directory: true,
        };
        let new = Discovered {
            version: "2023a".to_owned(),
            path: PathBuf::from("tzdata2023a.tar.gz"),
            is_directory: false,
        };
        assert_eq!(pick_newer(old, new.clone()), new);
    }
}
