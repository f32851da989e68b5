//! The crate-wide error type, uniting the smaller errors raised by each
//! stage of the pipeline with the zone/rule/version context needed to
//! make an abort message actionable.
//!
//! Following the teacher's own style (`line::Error`, `table::Error`),
//! this is a manual enum with a hand-written `Display` impl rather than
//! a `thiserror`-derived one — the variant set is small and closed, and
//! none of the formatting needs more than `write!`.

use std::fmt;
use std::io;

use crate::{line, synth, versions};

#[derive(Debug)]
pub enum Error {
    /// A line couldn't be parsed; the offending line's cleaned text is
    /// embedded in the message.
    Line { line: String, source: line::Error },

    /// A line parsed fine but couldn't be interpreted into the table
    /// (duplicate zone or link name, continuation out of place, or a
    /// reference to an undefined ruleset).
    Table(String),

    /// Synthesising or validating one zone's transition history failed.
    Zone { zone_id: String, source: synth::Error },

    /// A link's target, after following the alias chain, never reached a
    /// zone actually present in the zone table.
    UnresolvedLink { alias: String, target: String },

    /// Version discovery or selection failed.
    Version(versions::Error),

    /// A requested feature is out of scope for this compiler.
    Unsupported(&'static str),

    /// Reading an input file, or writing the output, failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Line { line, source } => {
                write!(f, "failed to parse line \"{line}\": {source}")
            }
            Error::Table(message) => write!(f, "{message}"),
            Error::Zone { zone_id, source } => {
                write!(f, "failed to synthesise zone \"{zone_id}\": {source}")
            }
            Error::UnresolvedLink { alias, target } => write!(
                f,
                "link \"{alias}\" resolves to \"{target}\", which is not a known zone"
            ),
            Error::Version(source) => write!(f, "{source}"),
            Error::Unsupported(feature) => write!(f, "{feature} is out of scope for this compiler"),
            Error::Io(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Line { source, .. } => Some(source),
            Error::Zone { source, .. } => Some(source),
            Error::Version(source) => Some(source),
            Error::Io(source) => Some(source),
            Error::Table(_) | Error::UnresolvedLink { .. } | Error::Unsupported(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Error {
        Error::Io(source)
    }
}

impl From<versions::Error> for Error {
    fn from(source: versions::Error) -> Error {
        Error::Version(source)
    }
}
