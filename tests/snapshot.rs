//! Snapshot-tests the line parser against a representative sample of
//! each supported line kind, the same way the pack's upstream test
//! suite snapshots its parse of the full corpus — except here the
//! sample is a small embedded fixture rather than an external checkout,
//! since no tz corpus is vendored alongside this crate.

use insta::assert_debug_snapshot;

use tzdb_compiler::lexer::clean_line;
use tzdb_compiler::line::{Line, LineParser};

const SAMPLE: &str = "\
Rule\tUS\t1967\t1973\t-\tApr\tlastSun\t2:00\t1:00\tD
Rule\tUS\t1967\t2006\t-\tOct\tlastSun\t2:00\t0\tS
Zone\tAmerica/New_York\t-5:00\tUS\tE%sT
Zone\tEurope/Paris\t0:09:21\t-\tLMT\t1911\tMar\t11\t0:01:15
\t1:00\tFrance\tCE%sT\t1945\tSep\t16\t3:00
\t1:00\tFrance\tCE%sT
Link\tEurope/Paris\tEurope/Brazzaville
Leap\t1972\tJun\t30\t23:59:60\t+\tS
";

#[ignore]
#[test]
fn parses_a_representative_sample_of_every_line_kind() {
    let parser = LineParser::default();
    let mut lines = Vec::new();

    for raw in SAMPLE.lines() {
        let Some(cleaned) = clean_line(raw) else {
            continue;
        };
        match parser.parse_str(&cleaned).unwrap() {
            Line::Space => continue,
            line => lines.push(format!("{line:?}")),
        }
    }

    assert_debug_snapshot!(lines);
}
