//! Cleaning raw lines of input before they reach the `line` parser.
//!
//! Every line in the corpus may carry a trailing `#` comment, and
//! whitespace between fields is whatever the original file's author
//! happened to type — runs of spaces, runs of tabs, or a mix. This
//! module strips the former and normalises the latter, honouring quoted
//! strings so a `#` or run of whitespace inside one is left alone.

use crate::calendar::{self, CalendarDate};

/// Cleans one line of input: strips a trailing `#` comment (unless it's
/// inside a quoted string), collapses runs of unquoted whitespace to a
/// single tab, and returns `None` for a line that ends up with nothing
/// in it (blank, or entirely a comment).
///
/// A *leading* run of whitespace collapses to a single tab too, rather
/// than being dropped: that leading tab is the only thing that tells
/// the classifier a line is a zone continuation (no keyword, just
/// indentation) instead of a fresh `Rule`/`Zone`/`Link`/`Leap` line.
///
/// ```
/// use tzdb_compiler::lexer::clean_line;
///
/// assert_eq!(clean_line("Zone  Europe/Paris 0:09:21 - LMT").as_deref(), Some("Zone\tEurope/Paris\t0:09:21\t-\tLMT"));
/// assert_eq!(clean_line("      9:30  Aus  AC%sT").as_deref(), Some("\t9:30\tAus\tAC%sT"));
/// assert_eq!(clean_line("# just a comment"), None);
/// assert_eq!(clean_line("   "), None);
/// ```
pub fn clean_line(input: &str) -> Option<String> {
    let mut output = String::with_capacity(input.len());
    let mut quoted = false;
    let mut pending_tab = false;

    for c in input.chars() {
        if c == '"' {
            if pending_tab {
                output.push('\t');
                pending_tab = false;
            }
            quoted = !quoted;
            output.push(c);
            continue;
        }

        if c == '#' && !quoted {
            break;
        }

        if c.is_whitespace() && !quoted {
            pending_tab = true;
            continue;
        }

        if pending_tab {
            output.push('\t');
            pending_tab = false;
        }
        output.push(c);
    }

    if output.is_empty() {
        None
    } else {
        Some(output)
    }
}

/// Recognises the `#@<integer>` special form used in `leap-seconds.list`
/// to mark the list's expiry: the payload is an NTP epoch second (seconds
/// since 1900-01-01), converted here to a calendar date. Returns `None`
/// for any line that doesn't carry the marker, including lines with an
/// ordinary comment.
///
/// ```
/// use tzdb_compiler::lexer::leap_list_expiry;
/// use tzdb_compiler::calendar::{CalendarDate, NTP_EPOCH_OFFSET};
///
/// assert_eq!(
///     leap_list_expiry(&format!("#@{NTP_EPOCH_OFFSET}")),
///     Some(CalendarDate { year: 1970, month: 1, day: 1 }),
/// );
/// assert_eq!(leap_list_expiry("# ordinary comment"), None);
/// ```
pub fn leap_list_expiry(input: &str) -> Option<CalendarDate> {
    let comment = &input[input.find('#')? + 1..];
    let payload = comment.trim_start().strip_prefix('@')?;
    let ntp_seconds: i64 = payload.trim().parse().ok()?;
    Some(calendar::ntp_seconds_to_date(ntp_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_comment() {
        assert_eq!(
            clean_line("Rule\tUS\t1967\t1973\t-\tApr\tlastSun\t2:00\t1:00\tD  # historical").as_deref(),
            Some("Rule\tUS\t1967\t1973\t-\tApr\tlastSun\t2:00\t1:00\tD")
        );
    }

    #[test]
    fn leading_indentation_collapses_to_a_single_tab() {
        assert_eq!(
            clean_line("\t\t\t1:00\tC-Eur\tCE%sT\t1943 Oct 25").as_deref(),
            Some("\t1:00\tC-Eur\tCE%sT\t1943\tOct\t25")
        );
    }

    #[test]
    fn quoted_hash_is_not_a_comment() {
        assert_eq!(
            clean_line(r#"Zone  "Weird#Zone"  0 - GMT"#).as_deref(),
            Some("Zone\t\"Weird#Zone\"\t0\t-\tGMT")
        );
    }

    #[test]
    fn quoted_whitespace_is_preserved() {
        assert_eq!(
            clean_line(r#"Zone  "a  b"  0 - GMT"#).as_deref(),
            Some("Zone\t\"a  b\"\t0\t-\tGMT")
        );
    }

    #[test]
    fn mixed_tabs_and_spaces_collapse() {
        assert_eq!(
            clean_line("Link \t Europe/Istanbul\t\tAsia/Istanbul").as_deref(),
            Some("Link\tEurope/Istanbul\tAsia/Istanbul")
        );
    }

    #[test]
    fn blank_and_comment_only_lines_vanish() {
        assert_eq!(clean_line(""), None);
        assert_eq!(clean_line("      "), None);
        assert_eq!(clean_line("# nothing but a comment"), None);
        assert_eq!(clean_line("   # also nothing, just indented"), None);
    }

    #[test]
    fn expiry_marker_parses_ntp_epoch() {
        let expiry = leap_list_expiry(&format!("#@{}", calendar::NTP_EPOCH_OFFSET)).unwrap();
        assert_eq!(expiry, CalendarDate { year: 1970, month: 1, day: 1 });
    }

    #[test]
    fn ordinary_comment_has_no_expiry() {
        assert_eq!(leap_list_expiry("#  Updated through IERS Bulletin C"), None);
    }
}
