//! The zone-synthesis core.
//!
//! Given one zone's ordered eras (`ZoneInfo` list) and the global rule-name
//! → sorted-bucket map, walks the eras in order, interleaving each with
//! its rule bucket (if any), and produces the validated `TransitionHistory`
//! that the serialiser will later write out for that zone.

use std::collections::HashMap;
use std::fmt;

use crate::calendar;
use crate::history::{DaylightSavingRule, TransitionHistory, ZonalTransition};
use crate::line::{ChangeTime, TimeSpecAndType, TimeType, Year};
use crate::table::{Format, RuleInfo, Saving, ZoneInfo};

/// Classic zic-style horizon, used only when a terminal era's rule bucket
/// has no rule with a finite `to` year to size the expansion window by —
/// every rule in the bucket is open-ended and already captured in the
/// recurring-rule output, but the window still needs a real upper bound
/// so that concrete transitions appear near the start of the bucket's
/// range rather than nowhere at all.
const SYNTH_HORIZON: i64 = 2037;

#[derive(PartialEq, Debug, Clone)]
pub enum Error {
    /// A `Zone` era's `RULES` column named a ruleset that was never
    /// defined.
    UnknownRuleset(String),
    /// The synthesised result failed `TransitionHistory`'s own
    /// consistency checks.
    History(crate::history::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownRuleset(name) => {
                write!(f, "zone refers to a ruleset that isn't defined: \"{name}\"")
            }
            Error::History(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<crate::history::Error> for Error {
    fn from(e: crate::history::Error) -> Error {
        Error::History(e)
    }
}

fn shift_for(time_type: TimeType, raw_offset: i64, dst_offset: i64) -> i64 {
    match time_type {
        TimeType::UTC => 0,
        TimeType::Standard => raw_offset,
        TimeType::Wall => raw_offset + dst_offset,
    }
}

/// The offset-indicator of a `ChangeTime`'s time-of-day field, defaulting
/// to `Wall` for the variants that don't carry one (no time column at all
/// means "the earliest point", which is a wall-clock notion).
fn until_indicator(change: &ChangeTime) -> TimeType {
    match change {
        ChangeTime::UntilTime(_, _, _, TimeSpecAndType(_, tt)) => *tt,
        _ => TimeType::Wall,
    }
}

fn numeric_year(year: Year) -> i64 {
    match year {
        Year::Number(n) => n,
        Year::Minimum => 1,
        Year::Maximum => 9999,
    }
}

fn lookup<'a>(
    rulesets: &'a HashMap<String, Vec<RuleInfo>>,
    name: &str,
) -> Result<&'a [RuleInfo], Error> {
    rulesets
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| Error::UnknownRuleset(name.to_owned()))
}

fn to_pattern(rule: &RuleInfo) -> DaylightSavingRule {
    DaylightSavingRule {
        month: rule.month,
        day: rule.day,
        time: rule.time,
        time_type: rule.time_type,
        time_to_add: rule.time_to_add,
        letters: rule.letters.clone(),
    }
}

/// Computes the end year of the expansion window for one era, plus any
/// rules in its bucket that are open-ended (`to = max`) and therefore
/// need to be carried forward as recurring patterns rather than expanded.
fn resolve_end_year(
    end_time: Option<&ChangeTime>,
    bucket: &[RuleInfo],
) -> (i64, Vec<DaylightSavingRule>) {
    if let Some(ct) = end_time {
        return (ct.year(), Vec::new());
    }

    let mut max_finite = None;
    let mut recurring = Vec::new();

    for rule in bucket {
        match rule.to_year {
            Some(Year::Number(to)) => {
                max_finite = Some(max_finite.map_or(to, |m: i64| m.max(to)));
            }
            None => {
                // An `only` rule: `to` implicitly equals `from`.
                if let Year::Number(from) = rule.from_year {
                    max_finite = Some(max_finite.map_or(from, |m: i64| m.max(from)));
                }
            }
            Some(Year::Maximum) => recurring.push(to_pattern(rule)),
            Some(Year::Minimum) => {}
        }
    }

    (max_finite.unwrap_or(SYNTH_HORIZON), recurring)
}

/// The saving in effect at `start_time`, found by scanning the bucket (in
/// its stored firing-instant order) for the latest rule applicable to
/// `start_year` whose realised instant is at or before `start_time` —
/// each candidate's instant is computed using the saving most recently
/// established by an earlier rule in the same scan, per the "previous
/// rule's saving as shift basis" rule.
fn dst_in_effect_at(bucket: &[RuleInfo], raw_offset: i64, start_time: i64, start_year: i64, old_dst: i64) -> i64 {
    let mut current = old_dst;

    for rule in bucket {
        if !rule.applies_to_year(start_year) {
            continue;
        }

        let tt = rule.absolute_datetime(start_year, raw_offset, current);
        if tt <= start_time {
            current = rule.time_to_add;
        }
    }

    current
}

/// The transition-append policy: collapse same-instant emissions into a
/// single record, drop no-op transitions, otherwise append.
fn append_transition(transitions: &mut Vec<ZonalTransition>, new: ZonalTransition) {
    if let Some(last) = transitions.last_mut() {
        if last.posix_time == new.posix_time {
            last.new_total = new.new_total;
            last.daylight_saving = new.daylight_saving;
            return;
        }
        if (last.new_total, last.daylight_saving) == (new.new_total, new.daylight_saving) {
            return;
        }
    }
    transitions.push(new);
}

/// Walks `bucket` across `[start_year - 1, end_year + 1]`, firing rules
/// whose instant falls within `[start_time, end_time)` and updating
/// `dst_offset` (and `transitions`) as it goes. Mirrors `addRuleTransitions`.
fn add_rule_transitions(
    bucket: &[RuleInfo],
    raw_offset: i64,
    dst_offset: &mut i64,
    start_time: i64,
    end_time: i64,
    start_year: i64,
    end_year: i64,
    transitions: &mut Vec<ZonalTransition>,
) {
    for year in (start_year - 1)..=(end_year + 1) {
        for rule in bucket {
            if !rule.applies_to_year(year) {
                continue;
            }

            let tt = rule.absolute_datetime(year, raw_offset, *dst_offset);
            if tt < start_time {
                continue;
            }
            if tt >= end_time {
                return;
            }

            let previous_total = raw_offset + *dst_offset;
            *dst_offset = rule.time_to_add;
            let new_total = raw_offset + *dst_offset;

            append_transition(
                transitions,
                ZonalTransition {
                    posix_time: tt,
                    previous_total,
                    new_total,
                    daylight_saving: *dst_offset,
                },
            );
        }
    }
}

/// Synthesises the `TransitionHistory` for one zone's ordered era list.
///
/// `include_lmt` mirrors the CLI's `--lmt` flag: by default, leading eras
/// whose `format` is the literal `"LMT"` are elided, and `initial_offset`
/// is re-seeded from the last-discarded transition's new total.
pub fn synthesize(
    eras: &[ZoneInfo],
    rulesets: &HashMap<String, Vec<RuleInfo>>,
    include_lmt: bool,
) -> Result<TransitionHistory, Error> {
    let mut transitions: Vec<ZonalTransition> = Vec::new();
    let mut recurring_rules: Vec<DaylightSavingRule> = Vec::new();
    let mut dst_offset: i64 = 0;
    let mut initial_offset: i64 = 0;

    for (index, era) in eras.iter().enumerate() {
        let raw_offset = era.offset;

        let end_time_for = |offset: i64, dst: i64| match &era.end_time {
            Some(ct) => ct.to_timestamp() - shift_for(until_indicator(ct), offset, dst),
            None => i64::MAX,
        };

        if index == 0 {
            // initial_offset always records the offset in force at the
            // dawn of time, i.e. before any rule has ever fired — not
            // whatever dst_offset ends up being after the init era's
            // rules have been expanded.
            match &era.saving {
                Saving::NoSaving => {
                    dst_offset = 0;
                    initial_offset = raw_offset;
                }
                Saving::OneOff(t) => {
                    dst_offset = *t;
                    initial_offset = raw_offset + dst_offset;
                }
                Saving::Multiple(name) => {
                    let bucket = lookup(rulesets, name)?;
                    dst_offset = 0;
                    initial_offset = raw_offset;

                    if !bucket.is_empty() {
                        let start_year = bucket
                            .iter()
                            .map(|r| numeric_year(r.from_year))
                            .min()
                            .expect("checked non-empty above");

                        let (end_year, recurring) = resolve_end_year(era.end_time.as_ref(), bucket);
                        recurring_rules.extend(recurring);

                        let end_time = end_time_for(raw_offset, dst_offset);

                        add_rule_transitions(
                            bucket,
                            raw_offset,
                            &mut dst_offset,
                            i64::MIN,
                            end_time,
                            start_year,
                            end_year,
                            &mut transitions,
                        );
                    }
                }
            }
        } else {
            let previous = &eras[index - 1];
            let previous_until = previous
                .end_time
                .as_ref()
                .expect("non-terminal era must carry an until");
            let old_dst = dst_offset;
            let start_time =
                previous_until.to_timestamp() - shift_for(until_indicator(previous_until), previous.offset, old_dst);
            let start_year = calendar::year_from_timestamp(start_time);

            let mut new_dst = match &era.saving {
                Saving::NoSaving => 0,
                Saving::OneOff(t) => *t,
                Saving::Multiple(name) => {
                    let bucket = lookup(rulesets, name)?;
                    dst_in_effect_at(bucket, raw_offset, start_time, start_year, old_dst)
                }
            };

            if (previous.offset, old_dst) != (raw_offset, new_dst) {
                append_transition(
                    &mut transitions,
                    ZonalTransition {
                        posix_time: start_time,
                        previous_total: previous.offset + old_dst,
                        new_total: raw_offset + new_dst,
                        daylight_saving: new_dst,
                    },
                );
            }

            if let Saving::Multiple(name) = &era.saving {
                let bucket = lookup(rulesets, name)?;
                let (end_year, recurring) = resolve_end_year(era.end_time.as_ref(), bucket);
                recurring_rules.extend(recurring);

                let end_time = end_time_for(raw_offset, new_dst);

                add_rule_transitions(
                    bucket,
                    raw_offset,
                    &mut new_dst,
                    start_time,
                    end_time,
                    start_year,
                    end_year,
                    &mut transitions,
                );
            }

            dst_offset = new_dst;
        }
    }

    if !include_lmt {
        let lmt_count = eras
            .iter()
            .take_while(|e| matches!(&e.format, Format::Constant(s) if s == "LMT"))
            .count();
        let discard = lmt_count.min(transitions.len());
        if discard > 0 {
            initial_offset = transitions[discard - 1].new_total;
            transitions.drain(0..discard);
        }
    }

    Ok(TransitionHistory::new(initial_offset, transitions, recurring_rules)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{DaySpec, Month, Weekday};

    fn zone(offset: i64, format: &str, saving: Saving, end_time: Option<ChangeTime>) -> ZoneInfo {
        ZoneInfo {
            offset,
            saving,
            format: Format::new(format),
            end_time,
        }
    }

    #[test]
    fn no_transitions_for_a_single_constant_era() {
        let eras = vec![zone(0, "UTC", Saving::NoSaving, None)];
        let rulesets = HashMap::new();

        let history = synthesize(&eras, &rulesets, true).unwrap();
        assert_eq!(history.initial_offset(), 0);
        assert!(history.transitions().is_empty());
        assert!(history.recurring_rules().is_empty());
    }

    #[test]
    fn unchanged_totals_across_a_continuation_emit_nothing() {
        let eras = vec![
            zone(
                3600,
                "CET",
                Saving::NoSaving,
                Some(ChangeTime::UntilTime(
                    Year::Number(1980),
                    Month::January,
                    DaySpec::Ordinal(1),
                    TimeSpecAndType(crate::line::TimeSpec::Zero, TimeType::UTC),
                )),
            ),
            zone(3600, "CET", Saving::NoSaving, None),
        ];
        let rulesets = HashMap::new();

        let history = synthesize(&eras, &rulesets, true).unwrap();
        assert!(history.transitions().is_empty());
        assert_eq!(history.initial_offset(), 3600);
    }

    #[test]
    fn terminal_era_with_open_ended_rules_keeps_them_recurring() {
        let mut rulesets = HashMap::new();
        rulesets.insert(
            "R".to_owned(),
            vec![
                RuleInfo {
                    from_year: Year::Number(1970),
                    to_year: Some(Year::Maximum),
                    month: Month::March,
                    day: DaySpec::Last(Weekday::Sunday),
                    time: 7200,
                    time_type: TimeType::Wall,
                    time_to_add: 3600,
                    letters: Some("D".to_owned()),
                },
                RuleInfo {
                    from_year: Year::Number(1970),
                    to_year: Some(Year::Maximum),
                    month: Month::October,
                    day: DaySpec::Last(Weekday::Sunday),
                    time: 10_800,
                    time_type: TimeType::Wall,
                    time_to_add: 0,
                    letters: Some("S".to_owned()),
                },
            ],
        );

        let eras = vec![zone(3600, "CE%sT", Saving::Multiple("R".to_owned()), None)];

        let history = synthesize(&eras, &rulesets, true).unwrap();
        assert_eq!(history.recurring_rules().len(), 2);
        assert!(!history.transitions().is_empty());

        for window in history.transitions().windows(2) {
            assert!(window[0].posix_time < window[1].posix_time);
        }

        let totals: Vec<i64> = history.transitions().iter().map(|t| t.new_total).collect();
        assert!(totals.contains(&7200));
        assert!(totals.contains(&3600));
    }

    #[test]
    fn two_rules_firing_at_the_identical_instant_collapse_into_one_transition() {
        // Two rules in the same bucket, same month/day/time-of-day and both
        // UTC-indicated so their realised instant doesn't depend on the
        // in-progress dst_offset: they fire at the exact same posix_time,
        // and append_transition's same-instant branch must collapse them
        // into a single record whose previous_total is the pre-collision
        // previous and whose new_total/daylight_saving are the
        // post-collision ones (spec.md §8 scenario 4).
        let mut rulesets = HashMap::new();
        rulesets.insert(
            "Collide".to_owned(),
            vec![
                RuleInfo {
                    from_year: Year::Number(1970),
                    to_year: Some(Year::Maximum),
                    month: Month::March,
                    day: DaySpec::Ordinal(1),
                    time: 7200,
                    time_type: TimeType::UTC,
                    time_to_add: 3600,
                    letters: Some("D".to_owned()),
                },
                RuleInfo {
                    from_year: Year::Number(1970),
                    to_year: Some(Year::Maximum),
                    month: Month::March,
                    day: DaySpec::Ordinal(1),
                    time: 7200,
                    time_type: TimeType::UTC,
                    time_to_add: 7200,
                    letters: Some("X".to_owned()),
                },
            ],
        );

        let eras = vec![zone(3600, "CE%sT", Saving::Multiple("Collide".to_owned()), None)];

        let history = synthesize(&eras, &rulesets, true).unwrap();

        let collision_time =
            ChangeTime::UntilDay(Year::Number(1970), Month::March, DaySpec::Ordinal(1)).to_timestamp() + 7200;
        let collided: Vec<_> = history
            .transitions()
            .iter()
            .filter(|t| t.posix_time == collision_time)
            .collect();

        assert_eq!(collided.len(), 1, "no duplicate times should survive");
        assert_eq!(collided[0].previous_total, 3600 + 0);
        assert_eq!(collided[0].new_total, 3600 + 7200);
        assert_eq!(collided[0].daylight_saving, 7200);
    }

    #[test]
    fn lmt_elision_reseeds_initial_offset() {
        let eras = vec![
            zone(
                -1234,
                "LMT",
                Saving::NoSaving,
                Some(ChangeTime::UntilYear(Year::Number(1900))),
            ),
            zone(3600, "CET", Saving::NoSaving, None),
        ];
        let rulesets = HashMap::new();

        let history = synthesize(&eras, &rulesets, false).unwrap();
        assert!(history.transitions().is_empty());
        assert_eq!(history.initial_offset(), 3600);
    }

    #[test]
    fn lmt_kept_when_requested() {
        let eras = vec![
            zone(
                -1234,
                "LMT",
                Saving::NoSaving,
                Some(ChangeTime::UntilYear(Year::Number(1900))),
            ),
            zone(3600, "CET", Saving::NoSaving, None),
        ];
        let rulesets = HashMap::new();

        let history = synthesize(&eras, &rulesets, true).unwrap();
        assert_eq!(history.transitions().len(), 1);
        assert_eq!(history.initial_offset(), -1234);
    }

    #[test]
    fn unknown_ruleset_is_an_error() {
        let eras = vec![zone(3600, "CE%sT", Saving::Multiple("Ghost".to_owned()), None)];
        let rulesets = HashMap::new();

        assert!(matches!(
            synthesize(&eras, &rulesets, true),
            Err(Error::UnknownRuleset(name)) if name == "Ghost"
        ));
    }
}
