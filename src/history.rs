//! The data model the synthesiser builds and the serialiser writes.
//!
//! `TransitionHistory` is the validated, per-zone result of synthesis: an
//! initial offset, a strictly time-ordered list of `ZonalTransition`s, and
//! whatever `DaylightSavingRule` patterns are still open-ended at the end
//! of the input (a rule whose `to` year is `max` doesn't get expanded
//! forever — it's carried forward as a pattern instead). This plays the
//! role of the "black-box collaborator" the synthesiser feeds: a real
//! runtime would also need to *read* these back to answer queries, but
//! that's the downstream consumer, not this compiler.

use std::fmt;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::line::{DaySpec, Month, TimeType, Weekday};

/// A recurring daylight-saving pattern: everything a `RuleInfo` carries
/// except the name and year range, which only matter while a rule is
/// still being looked up in a table — once synthesis is done, all that's
/// left is "this is how to realise the next occurrence".
#[derive(PartialEq, Debug, Clone)]
pub struct DaylightSavingRule {
    pub month: Month,
    pub day: DaySpec,
    pub time: i64,
    pub time_type: TimeType,
    pub time_to_add: i64,
    pub letters: Option<String>,
}

/// One change in a zone's total UTC offset, expressed as an absolute
/// POSIX second plus the totals either side of it.
#[derive(PartialEq, Debug, Copy, Clone)]
pub struct ZonalTransition {
    pub posix_time: i64,
    pub previous_total: i64,
    pub new_total: i64,
    pub daylight_saving: i64,
}

/// The validated, serialisable result of synthesising one zone.
#[derive(PartialEq, Debug, Clone)]
pub struct TransitionHistory {
    initial_offset: i64,
    transitions: Vec<ZonalTransition>,
    recurring_rules: Vec<DaylightSavingRule>,
}

/// Something that can go wrong constructing a `TransitionHistory`.
#[derive(PartialEq, Debug, Clone)]
pub enum Error {
    /// Transition POSIX times were not strictly increasing.
    NotMonotonic { at: usize, posix_time: i64 },

    /// A transition's `previous_total` didn't match the offset in effect
    /// immediately beforehand (either the previous transition's
    /// `new_total`, or `initial_offset` for the first transition).
    DiscontinuousChain {
        at: usize,
        expected: i64,
        found: i64,
    },

    /// The serialised byte stream was truncated or malformed.
    Truncated,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotMonotonic { at, posix_time } => write!(
                f,
                "transition {at} is not strictly after its predecessor (at {posix_time})"
            ),
            Error::DiscontinuousChain {
                at,
                expected,
                found,
            } => write!(
                f,
                "transition {at} has previous_total {found}, expected {expected}"
            ),
            Error::Truncated => write!(f, "truncated transition history blob"),
        }
    }
}

impl std::error::Error for Error {}

impl TransitionHistory {
    /// Validates and builds a `TransitionHistory` from the synthesiser's
    /// raw output.
    pub fn new(
        initial_offset: i64,
        transitions: Vec<ZonalTransition>,
        recurring_rules: Vec<DaylightSavingRule>,
    ) -> Result<TransitionHistory, Error> {
        let mut expected_previous = initial_offset;
        let mut last_time = None;

        for (at, t) in transitions.iter().enumerate() {
            if let Some(last) = last_time {
                if t.posix_time <= last {
                    return Err(Error::NotMonotonic {
                        at,
                        posix_time: t.posix_time,
                    });
                }
            }
            if t.previous_total != expected_previous {
                return Err(Error::DiscontinuousChain {
                    at,
                    expected: expected_previous,
                    found: t.previous_total,
                });
            }
            expected_previous = t.new_total;
            last_time = Some(t.posix_time);
        }

        Ok(TransitionHistory {
            initial_offset,
            transitions,
            recurring_rules,
        })
    }

    pub fn initial_offset(&self) -> i64 {
        self.initial_offset
    }

    pub fn transitions(&self) -> &[ZonalTransition] {
        &self.transitions
    }

    pub fn recurring_rules(&self) -> &[DaylightSavingRule] {
        &self.recurring_rules
    }

    /// Encodes this history into the opaque per-zone blob format the
    /// serialiser embeds in the repository.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.write_i64::<BigEndian>(self.initial_offset).unwrap();

        out.write_u32::<BigEndian>(self.transitions.len() as u32)
            .unwrap();
        for t in &self.transitions {
            out.write_i64::<BigEndian>(t.posix_time).unwrap();
            out.write_i32::<BigEndian>(t.previous_total as i32).unwrap();
            out.write_i32::<BigEndian>(t.new_total as i32).unwrap();
            out.write_i32::<BigEndian>(t.daylight_saving as i32)
                .unwrap();
        }

        out.write_u32::<BigEndian>(self.recurring_rules.len() as u32)
            .unwrap();
        for rule in &self.recurring_rules {
            write_rule(&mut out, rule);
        }

        out
    }

    /// Decodes a blob produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(mut input: &[u8]) -> Result<TransitionHistory, Error> {
        let initial_offset = input.read_i64::<BigEndian>().map_err(|_| Error::Truncated)?;

        let transition_count = input.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;
        let mut transitions = Vec::with_capacity(transition_count as usize);
        for _ in 0..transition_count {
            let posix_time = input.read_i64::<BigEndian>().map_err(|_| Error::Truncated)?;
            let previous_total = input.read_i32::<BigEndian>().map_err(|_| Error::Truncated)? as i64;
            let new_total = input.read_i32::<BigEndian>().map_err(|_| Error::Truncated)? as i64;
            let daylight_saving = input.read_i32::<BigEndian>().map_err(|_| Error::Truncated)? as i64;
            transitions.push(ZonalTransition {
                posix_time,
                previous_total,
                new_total,
                daylight_saving,
            });
        }

        let rule_count = input.read_u32::<BigEndian>().map_err(|_| Error::Truncated)?;
        let mut recurring_rules = Vec::with_capacity(rule_count as usize);
        for _ in 0..rule_count {
            recurring_rules.push(read_rule(&mut input)?);
        }

        TransitionHistory::new(initial_offset, transitions, recurring_rules)
    }
}

fn month_to_u8(month: Month) -> u8 {
    month as u8
}

fn month_from_u8(tag: u8) -> Result<Month, Error> {
    Ok(match tag {
        1 => Month::January,
        2 => Month::February,
        3 => Month::March,
        4 => Month::April,
        5 => Month::May,
        6 => Month::June,
        7 => Month::July,
        8 => Month::August,
        9 => Month::September,
        10 => Month::October,
        11 => Month::November,
        12 => Month::December,
        _ => return Err(Error::Truncated),
    })
}

fn weekday_to_u8(weekday: Weekday) -> u8 {
    match weekday {
        Weekday::Sunday => 0,
        Weekday::Monday => 1,
        Weekday::Tuesday => 2,
        Weekday::Wednesday => 3,
        Weekday::Thursday => 4,
        Weekday::Friday => 5,
        Weekday::Saturday => 6,
    }
}

fn weekday_from_u8(tag: u8) -> Result<Weekday, Error> {
    Ok(match tag {
        0 => Weekday::Sunday,
        1 => Weekday::Monday,
        2 => Weekday::Tuesday,
        3 => Weekday::Wednesday,
        4 => Weekday::Thursday,
        5 => Weekday::Friday,
        6 => Weekday::Saturday,
        _ => return Err(Error::Truncated),
    })
}

fn write_day_spec(out: &mut Vec<u8>, day: DaySpec) {
    match day {
        DaySpec::Ordinal(d) => {
            out.write_u8(0).unwrap();
            out.write_i8(d).unwrap();
        }
        DaySpec::Last(wd) => {
            out.write_u8(1).unwrap();
            out.write_u8(weekday_to_u8(wd)).unwrap();
        }
        DaySpec::LastOnOrBefore(wd, d) => {
            out.write_u8(2).unwrap();
            out.write_u8(weekday_to_u8(wd)).unwrap();
            out.write_i8(d).unwrap();
        }
        DaySpec::FirstOnOrAfter(wd, d) => {
            out.write_u8(3).unwrap();
            out.write_u8(weekday_to_u8(wd)).unwrap();
            out.write_i8(d).unwrap();
        }
    }
}

fn read_day_spec(input: &mut &[u8]) -> Result<DaySpec, Error> {
    let tag = input.read_u8().map_err(|_| Error::Truncated)?;
    Ok(match tag {
        0 => DaySpec::Ordinal(input.read_i8().map_err(|_| Error::Truncated)?),
        1 => DaySpec::Last(weekday_from_u8(
            input.read_u8().map_err(|_| Error::Truncated)?,
        )?),
        2 => {
            let wd = weekday_from_u8(input.read_u8().map_err(|_| Error::Truncated)?)?;
            let d = input.read_i8().map_err(|_| Error::Truncated)?;
            DaySpec::LastOnOrBefore(wd, d)
        }
        3 => {
            let wd = weekday_from_u8(input.read_u8().map_err(|_| Error::Truncated)?)?;
            let d = input.read_i8().map_err(|_| Error::Truncated)?;
            DaySpec::FirstOnOrAfter(wd, d)
        }
        _ => return Err(Error::Truncated),
    })
}

fn time_type_to_u8(tt: TimeType) -> u8 {
    match tt {
        TimeType::Wall => 0,
        TimeType::Standard => 1,
        TimeType::UTC => 2,
    }
}

fn time_type_from_u8(tag: u8) -> Result<TimeType, Error> {
    Ok(match tag {
        0 => TimeType::Wall,
        1 => TimeType::Standard,
        2 => TimeType::UTC,
        _ => return Err(Error::Truncated),
    })
}

fn write_rule(out: &mut Vec<u8>, rule: &DaylightSavingRule) {
    out.write_u8(month_to_u8(rule.month)).unwrap();
    write_day_spec(out, rule.day);
    out.write_i64::<BigEndian>(rule.time).unwrap();
    out.write_u8(time_type_to_u8(rule.time_type)).unwrap();
    out.write_i64::<BigEndian>(rule.time_to_add).unwrap();
    match &rule.letters {
        Some(letters) => {
            out.write_u16::<BigEndian>(letters.len() as u16).unwrap();
            out.extend_from_slice(letters.as_bytes());
        }
        None => {
            out.write_u16::<BigEndian>(0xFFFF).unwrap();
        }
    }
}

fn read_rule(input: &mut &[u8]) -> Result<DaylightSavingRule, Error> {
    let month = month_from_u8(input.read_u8().map_err(|_| Error::Truncated)?)?;
    let day = read_day_spec(input)?;
    let time = input.read_i64::<BigEndian>().map_err(|_| Error::Truncated)?;
    let time_type = time_type_from_u8(input.read_u8().map_err(|_| Error::Truncated)?)?;
    let time_to_add = input.read_i64::<BigEndian>().map_err(|_| Error::Truncated)?;
    let letters_len = input.read_u16::<BigEndian>().map_err(|_| Error::Truncated)?;
    let letters = if letters_len == 0xFFFF {
        None
    } else {
        if input.len() < letters_len as usize {
            return Err(Error::Truncated);
        }
        let (bytes, rest) = input.split_at(letters_len as usize);
        *input = rest;
        Some(String::from_utf8(bytes.to_vec()).map_err(|_| Error::Truncated)?)
    };

    Ok(DaylightSavingRule {
        month,
        day,
        time,
        time_type,
        time_to_add,
        letters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> DaylightSavingRule {
        DaylightSavingRule {
            month: Month::March,
            day: DaySpec::Last(Weekday::Sunday),
            time: 7200,
            time_type: TimeType::Wall,
            time_to_add: 3600,
            letters: Some("S".to_owned()),
        }
    }

    #[test]
    fn accepts_empty_history() {
        let history = TransitionHistory::new(0, vec![], vec![]).unwrap();
        assert_eq!(history.initial_offset(), 0);
        assert!(history.transitions().is_empty());
    }

    #[test]
    fn rejects_non_monotonic_transitions() {
        let transitions = vec![
            ZonalTransition {
                posix_time: 100,
                previous_total: 0,
                new_total: 3600,
                daylight_saving: 3600,
            },
            ZonalTransition {
                posix_time: 100,
                previous_total: 3600,
                new_total: 0,
                daylight_saving: 0,
            },
        ];
        assert!(matches!(
            TransitionHistory::new(0, transitions, vec![]),
            Err(Error::NotMonotonic { at: 1, .. })
        ));
    }

    #[test]
    fn rejects_discontinuous_chain() {
        let transitions = vec![ZonalTransition {
            posix_time: 100,
            previous_total: 1234,
            new_total: 3600,
            daylight_saving: 0,
        }];
        assert!(matches!(
            TransitionHistory::new(0, transitions, vec![]),
            Err(Error::DiscontinuousChain { at: 0, .. })
        ));
    }

    #[test]
    fn roundtrips_through_bytes() {
        let transitions = vec![
            ZonalTransition {
                posix_time: 100,
                previous_total: 0,
                new_total: 3600,
                daylight_saving: 0,
            },
            ZonalTransition {
                posix_time: 200,
                previous_total: 3600,
                new_total: 7200,
                daylight_saving: 3600,
            },
        ];
        let history =
            TransitionHistory::new(0, transitions, vec![sample_rule()]).unwrap();

        let bytes = history.to_bytes();
        let decoded = TransitionHistory::from_bytes(&bytes).unwrap();
        assert_eq!(history, decoded);
    }

    #[test]
    fn roundtrips_rule_without_letters() {
        let mut rule = sample_rule();
        rule.letters = None;
        let history = TransitionHistory::new(0, vec![], vec![rule]).unwrap();
        let bytes = history.to_bytes();
        let decoded = TransitionHistory::from_bytes(&bytes).unwrap();
        assert_eq!(history, decoded);
    }
}
