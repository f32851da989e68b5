//! A quick throughput check for the Lexer + Parser + Table-building
//! stages, run by hand with `cargo run --release --example benchmark`.
//! Not wired into CI; it's a development tool, in the same spirit as
//! the pack's own ad hoc benchmark binaries.

extern crate tzdb_compiler;

use tzdb_compiler::lexer::clean_line;
use tzdb_compiler::line::{Line, LineParser};
use tzdb_compiler::table::TableBuilder;

const SAMPLE: &str = "\
Rule\tEU\t1977\t1980\t-\tApr\tSun>=1\t1:00u\t1:00\tS
Rule\tEU\t1977\tonly\t-\tSep\tlastSun\t1:00u\t0\t-
Rule\tEU\t1978\tonly\t-\tOct\t1\t1:00u\t0\t-
Rule\tEU\t1979\t1995\t-\tSep\tlastSun\t1:00u\t0\t-
Rule\tEU\t1981\tmax\t-\tMar\tlastSun\t1:00u\t1:00\tS
Rule\tEU\t1996\tmax\t-\tOct\tlastSun\t1:00u\t0\t-
Zone\tEurope/Paris\t0:09:21\t-\tLMT\t1891\tMar\t15
\t0:09:21\t-\tPMT\t1911\tMar\t11
\t0:00\tFrance\tWE%sT\t1940\tJun\t14\t23:00
\t1:00\tGermany\tCE%sT\t1944\tAug\t25
\t0:00\tFrance\tWE%sT\t1945\tSep\t16\t3:00
\t1:00\tFrance\tCE%sT
Link\tEurope/Paris\tEurope/Monaco
";

fn main() {
    for _ in 0..1000 {
        let parser = LineParser::default();
        let mut builder = TableBuilder::new();
        for raw_line in SAMPLE.lines() {
            let Some(cleaned) = clean_line(raw_line) else {
                continue;
            };
            match parser.parse_str(&cleaned).unwrap() {
                Line::Zone(zone) => builder.add_zone_line(zone).unwrap(),
                Line::Continuation(cont) => builder.add_continuation_line(cont).unwrap(),
                Line::Rule(rule) => builder.add_rule_line(rule).unwrap(),
                Line::Link(link) => builder.add_link_line(link).unwrap(),
                Line::Leap(leap) => builder.add_leap_line(leap).unwrap(),
                Line::Space => {}
            }
        }
        let _table = builder.build();
    }
}
