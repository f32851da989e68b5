//! The front door: ties Lexer, Parser, Synthesiser, and Serialiser
//! together behind a single `compile` entry point.
//!
//! The CLI (`src/bin/tzdb-compile.rs`) is a thin adapter on top of this:
//! it resolves a corpus version, reads the relevant files into the
//! `filename -> text` map this module expects, and hands the result to
//! [`compile`].

use std::collections::HashMap;

use crate::error::Error;
use crate::history::TransitionHistory;
use crate::lexer;
use crate::line::{self, Line, LineParser};
use crate::serializer::{self, Repository};
use crate::synth;
use crate::table::{Table, TableBuilder};

/// The input files the corpus is expected to carry, in the order
/// `spec.md` §6 lists them. Anything else present alongside them is
/// ignored.
pub const INPUT_FILES: &[&str] = &[
    "africa",
    "antarctica",
    "asia",
    "australasia",
    "backward",
    "etcetera",
    "europe",
    "leapseconds",
    "leap-seconds.list",
    "northamerica",
    "southamerica",
];

/// The one auxiliary file that isn't parsed as ordinary `Rule`/`Zone`/
/// `Link`/`Leap` lines — it's the IERS `leap-seconds.list` distribution,
/// consulted only for its `#@<ntp-seconds>` expiry marker.
const EXPIRY_FILE: &str = "leap-seconds.list";

/// The `leapseconds` file ends with an uncommented zic directive,
/// `Expires  YYYY  Mon  DD  HH:MM:SS`, which isn't a `Rule`/`Zone`/`Link`/
/// `Leap` line and isn't part of `spec.md`'s grammar. The repository's
/// expiry date is sourced from `leap-seconds.list`'s `#@` marker instead
/// (see `find_expiry`), so this directive is simply skipped here rather
/// than parsed.
const LEAPSECONDS_FILE: &str = "leapseconds";
const EXPIRES_DIRECTIVE_KEYWORD: &str = "Expires";

/// Options controlling one compile invocation.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Whether to keep leading `LMT` eras instead of eliding them.
    pub include_lmt: bool,
    /// The version label to stamp into the repository (e.g. `"2023b"`).
    pub version: String,
}

/// Parses every recognised input file into a [`Table`], tolerating the
/// input oddities `spec.md` §7 lists (skipping non-`-` Rule `TYPE`
/// columns with a warning, and `leapseconds`' trailing `Expires`
/// directive) and aborting on anything else.
pub fn parse_all(sources: &HashMap<String, String>) -> Result<Table, Error> {
    let parser = LineParser::default();
    let mut builder = TableBuilder::new();

    for filename in INPUT_FILES {
        if *filename == EXPIRY_FILE {
            continue;
        }
        let Some(text) = sources.get(*filename) else {
            continue;
        };

        for raw_line in text.lines() {
            let Some(cleaned) = lexer::clean_line(raw_line) else {
                continue;
            };

            if *filename == LEAPSECONDS_FILE && cleaned.starts_with(EXPIRES_DIRECTIVE_KEYWORD) {
                log::debug!("skipping zic \"Expires\" directive in {filename}: \"{cleaned}\"");
                continue;
            }

            let line = match parser.parse_str(&cleaned) {
                Ok(line) => line,
                Err(line::Error::TypeColumnContainedNonHyphen(t)) => {
                    log::warn!(
                        "skipping Rule line with non-\"-\" TYPE column ({t:?}) in {filename}: \"{cleaned}\""
                    );
                    continue;
                }
                Err(source) => {
                    return Err(Error::Line {
                        line: cleaned,
                        source,
                    })
                }
            };

            match line {
                Line::Space => {}
                Line::Zone(zone) => builder
                    .add_zone_line(zone)
                    .map_err(|e| Error::Table(e.to_string()))?,
                Line::Continuation(cont) => builder
                    .add_continuation_line(cont)
                    .map_err(|e| Error::Table(e.to_string()))?,
                Line::Rule(rule) => builder
                    .add_rule_line(rule)
                    .map_err(|e| Error::Table(e.to_string()))?,
                Line::Link(link) => builder
                    .add_link_line(link)
                    .map_err(|e| Error::Table(e.to_string()))?,
                Line::Leap(leap) => builder
                    .add_leap_line(leap)
                    .map_err(|e| Error::Table(e.to_string()))?,
            }
        }
    }

    Ok(builder.build())
}

/// Scans `leap-seconds.list`, if present, for its `#@<ntp-seconds>`
/// expiry marker. The rest of that file's content is redundant with
/// `leapseconds` (already parsed into `Table::leap_seconds` above) and
/// is otherwise ignored.
fn find_expiry(sources: &HashMap<String, String>) -> Option<crate::calendar::CalendarDate> {
    let text = sources.get(EXPIRY_FILE)?;
    text.lines().find_map(lexer::leap_list_expiry)
}

/// Synthesises every zone in `table` into a validated
/// [`TransitionHistory`], sorted by zone ID ("zones are serialised in
/// ascending lexicographic ID order", `spec.md` §5).
fn synthesize_all(
    table: &Table,
    include_lmt: bool,
) -> Result<Vec<(String, TransitionHistory)>, Error> {
    let mut zone_ids: Vec<&String> = table.zonesets.keys().collect();
    zone_ids.sort();

    let mut histories = Vec::with_capacity(zone_ids.len());
    for zone_id in zone_ids {
        let eras = &table.zonesets[zone_id];
        let history = synth::synthesize(eras, &table.rulesets, include_lmt).map_err(|source| {
            Error::Zone {
                zone_id: zone_id.clone(),
                source,
            }
        })?;
        histories.push((zone_id.clone(), history));
    }

    Ok(histories)
}

/// Runs the full pipeline over one corpus: parses every input file,
/// synthesises every zone's transition history, resolves the alias
/// table, and returns the [`Repository`] ready for the Serialiser to
/// write out.
pub fn compile(sources: &HashMap<String, String>, options: &CompileOptions) -> Result<Repository, Error> {
    let table = parse_all(sources)?;
    let zones = synthesize_all(&table, options.include_lmt)?;
    let aliases = serializer::resolve_aliases(&table, &zones)?;
    let expiry = find_expiry(sources);

    Ok(Repository {
        version: options.version.clone(),
        zones,
        aliases,
        leap_seconds: table.leap_seconds,
        expiry,
    })
}
