//! Compiles the text files comprising the [zoneinfo database][w], which
//! records time zone changes and offsets across the world from multiple
//! sources, into a compact binary zone repository.
//!
//! The zoneinfo database is distributed as a set of raw text files, one
//! per continent plus a handful of auxiliary files (leap seconds, link
//! aliases, and so on). This crate reads that text corpus and produces a
//! single binary file a runtime can load without re-parsing or
//! re-deriving any of it.
//!
//! The database itself is maintained by IANA. For more information, see
//! [IANA’s page on the time zone database][iana]. You can also find the text
//! files themselves in [the tz repository][tz].
//!
//! [iana]: https://www.iana.org/time-zones
//! [tz]: https://github.com/eggert/tz
//! [w]: https://en.wikipedia.org/wiki/Tz_database
//!
//! ## Outline
//!
//! Turning the text corpus into a repository is split into four stages:
//!
//! - **Parsing** individual lines of text into `Line`s is done by the
//!   `line` module, after `lexer` strips comments and whitespace;
//! - **Interpreting** these lines into a complete `Table` is done by the
//!   `table` module;
//! - **Synthesising** each zone's transition history from its table entry
//!   is done by the `synth` module, producing the validated data model in
//!   `history`;
//! - **Serialising** the synthesised zones, aliases, and leap seconds into
//!   the binary repository format is done by the `serializer` module.
//!
//! `compile` ties these stages together behind a single entry point, and
//! `versions` resolves which on-disk copy of the corpus to read when more
//! than one is present.

#![warn(missing_copy_implementations)]
//#![warn(missing_docs)]
#![warn(nonstandard_style)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused)]

pub mod calendar;
pub mod compile;
pub mod error;
pub mod history;
pub mod lexer;
pub mod line;
pub mod serializer;
pub mod synth;
pub mod table;
pub mod versions;
