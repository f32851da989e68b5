//! Writing the compiled zone data out as a self-describing binary
//! repository.
//!
//! The teacher never had this module: its downstream is Rust source
//! generated with `phf_codegen` (`chrono-tz-build::write_timezone_file`),
//! not a binary container. This is the write-side mirror of the
//! `byteorder`-based tzfile reader in the pack's `zoneinfo-compiled`
//! parser — same crate, same `BigEndian` discipline, opposite direction.
//!
//! All multi-byte integers are big-endian. Every UTF-8 string (version,
//! zone ID, alias name) is written as a `u16` byte length followed by
//! its bytes — one width, used consistently, rather than picking a
//! different prefix size per field.

use std::collections::HashSet;
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};

use crate::calendar::CalendarDate;
use crate::error::Error;
use crate::history::TransitionHistory;
use crate::table::{LeapInfo, Table};

/// Magic bytes opening every repository file: `tzrepo`.
pub const MAGIC: &[u8; 6] = b"tzrepo";

/// An alias, resolved to the index of its canonical target in
/// [`Repository::zones`].
#[derive(PartialEq, Debug, Clone)]
pub struct ResolvedAlias {
    pub name: String,
    pub target_index: u16,
}

/// The fully-synthesised, ready-to-serialise repository: one
/// `TransitionHistory` per zone (sorted by ID), the alias table resolved
/// to zone-table indices, the leap-second table, and the corpus expiry
/// date.
#[derive(PartialEq, Debug, Clone)]
pub struct Repository {
    pub version: String,
    pub zones: Vec<(String, TransitionHistory)>,
    pub aliases: Vec<ResolvedAlias>,
    pub leap_seconds: Vec<LeapInfo>,
    pub expiry: Option<CalendarDate>,
}

/// Follows a link's alias chain until it reaches a zone ID actually
/// present in `table.zonesets`. Bounded by the number of known links so
/// a cycle (`A -> B -> A`) is reported as an unresolved link instead of
/// looping forever.
fn resolve_chain(table: &Table, alias: &str) -> Result<String, Error> {
    let mut current = alias.to_owned();
    let mut seen = HashSet::new();

    loop {
        if table.zonesets.contains_key(&current) {
            return Ok(current);
        }

        if !seen.insert(current.clone()) {
            return Err(Error::UnresolvedLink {
                alias: alias.to_owned(),
                target: current,
            });
        }

        match table.links.get(&current) {
            Some(next) => current = next.clone(),
            None => {
                return Err(Error::UnresolvedLink {
                    alias: alias.to_owned(),
                    target: current,
                })
            }
        }
    }
}

/// Builds the alias table: every `Link` in `table`, resolved transitively
/// to the index of its canonical target within `zones` (which must
/// already be sorted by zone ID — the same order it will be serialised
/// in).
pub fn resolve_aliases(table: &Table, zones: &[(String, TransitionHistory)]) -> Result<Vec<ResolvedAlias>, Error> {
    let mut aliases = Vec::with_capacity(table.links.len());

    for name in table.links.keys() {
        let target = resolve_chain(table, name)?;
        let target_index = zones
            .iter()
            .position(|(id, _)| id == &target)
            .expect("resolve_chain only returns zone IDs present in the table") as u16;

        aliases.push(ResolvedAlias {
            name: name.clone(),
            target_index,
        });
    }

    aliases.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(aliases)
}

fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    out.write_u16::<BigEndian>(s.len() as u16)?;
    out.write_all(s.as_bytes())
}

impl Repository {
    /// Writes the binary repository container to `out`, in the order
    /// laid out by the serialiser's contract: magic, version, zone
    /// table, alias table, leap table, expiry.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(MAGIC)?;
        write_string(out, &self.version)?;

        out.write_u32::<BigEndian>(self.zones.len() as u32)?;
        for (id, history) in &self.zones {
            write_string(out, id)?;
            let blob = history.to_bytes();
            out.write_u32::<BigEndian>(blob.len() as u32)?;
            out.write_all(&blob)?;
        }

        out.write_u16::<BigEndian>(self.aliases.len() as u16)?;
        for alias in &self.aliases {
            write_string(out, &alias.name)?;
            out.write_u16::<BigEndian>(alias.target_index)?;
        }

        out.write_u16::<BigEndian>(self.leap_seconds.len() as u16)?;
        for leap in &self.leap_seconds {
            let date = crate::calendar::posix_seconds_to_date(leap.timestamp);
            out.write_u16::<BigEndian>(date.year as u16)?;
            out.write_u8(date.month as u8)?;
            out.write_u8(date.day as u8)?;
            out.write_i8(leap.shift)?;
        }

        let expiry = self.expiry.unwrap_or(CalendarDate { year: 0, month: 0, day: 0 });
        out.write_u16::<BigEndian>(expiry.year as u16)?;
        out.write_u8(expiry.month as u8)?;
        out.write_u8(expiry.day as u8)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::TransitionHistory;
    use crate::table::TableBuilder;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    fn sample_repository() -> Repository {
        let history = TransitionHistory::new(3600, vec![], vec![]).unwrap();
        Repository {
            version: "2023b".to_owned(),
            zones: vec![("Etc/UTC".to_owned(), history)],
            aliases: vec![ResolvedAlias {
                name: "Etc/Zulu".to_owned(),
                target_index: 0,
            }],
            leap_seconds: vec![LeapInfo {
                timestamp: crate::calendar::time_to_timestamp(1972, 7, 1, 0, 0, 0),
                shift: 1,
            }],
            expiry: Some(CalendarDate { year: 2024, month: 6, day: 28 }),
        }
    }

    #[test]
    fn starts_with_the_magic_bytes() {
        let mut out = Vec::new();
        sample_repository().write_to(&mut out).unwrap();
        assert_eq!(&out[..6], MAGIC);
    }

    #[test]
    fn written_zone_count_matches() {
        let mut out = Vec::new();
        sample_repository().write_to(&mut out).unwrap();

        let mut cursor = Cursor::new(&out[..]);
        let mut magic = [0u8; 6];
        std::io::Read::read_exact(&mut cursor, &mut magic).unwrap();
        let version_len = cursor.read_u16::<BigEndian>().unwrap();
        cursor.set_position(cursor.position() + version_len as u64);
        let zone_count = cursor.read_u32::<BigEndian>().unwrap();
        assert_eq!(zone_count, 1);
    }

    #[test]
    fn alias_chain_resolves_through_multiple_hops() {
        let mut builder = TableBuilder::new();
        builder
            .add_zone_line(crate::line::Zone {
                name: "Canonical/Zone",
                info: crate::line::ZoneInfo {
                    utc_offset: crate::line::TimeSpec::Zero,
                    saving: crate::line::Saving::NoSaving,
                    format: "UTC",
                    time: None,
                },
            })
            .unwrap();

        let table = {
            builder
                .add_link_line(crate::line::Link { existing: "Canonical/Zone", new: "Middle/Alias" })
                .unwrap();
            builder
                .add_link_line(crate::line::Link { existing: "Middle/Alias", new: "Outer/Alias" })
                .unwrap();
            builder.build()
        };

        let zones = vec![(
            "Canonical/Zone".to_owned(),
            TransitionHistory::new(0, vec![], vec![]).unwrap(),
        )];

        let aliases = resolve_aliases(&table, &zones).unwrap();
        assert_eq!(aliases.len(), 2);
        assert!(aliases.iter().all(|a| a.target_index == 0));
    }

    #[test]
    fn unresolved_link_is_an_error() {
        let mut builder = TableBuilder::new();
        builder
            .add_link_line(crate::line::Link { existing: "Nowhere/Real", new: "Some/Alias" })
            .unwrap();
        let table = builder.build();

        assert!(matches!(
            resolve_aliases(&table, &[]),
            Err(Error::UnresolvedLink { .. })
        ));
    }
}
