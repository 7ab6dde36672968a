use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use crate::types::{Averages, DurationBreakdown, SampleTimings};

pub const TRACE_ID_WIDTH: usize = 35;
pub const NUMBER_WIDTH: usize = 12;

/// Right-align `value` in `width` columns. Longer values keep their
/// rightmost `width` characters.
pub fn cell(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len > width {
        value.chars().skip(len - width).collect()
    } else {
        format!("{:>width$}", value, width = width)
    }
}

fn row(label: &str, numbers: [&str; 4]) -> String {
    let mut out = cell(label, TRACE_ID_WIDTH);
    for n in numbers {
        out.push_str(&cell(n, NUMBER_WIDTH));
    }
    out
}

pub fn header_row() -> String {
    let header = row("XRAY TRACE ID", ["PRE[ms]", "INIT[ms]", "INV[ms]", "TOTAL[ms]"]);
    header
        .if_supports_color(Stream::Stdout, |s| s.dimmed())
        .to_string()
}

pub fn sample_row(trace_id: &str, b: &DurationBreakdown) -> String {
    row(
        trace_id,
        [
            &b.pre_initialization.to_string(),
            &b.initialization.to_string(),
            &b.invocation.to_string(),
            &b.total.to_string(),
        ],
    )
}

/// Row printed in place of a sample that failed under the skip policy.
pub fn failed_row(sample: u32, error: &str) -> String {
    let label = cell(&format!("sample {} FAILED", sample), TRACE_ID_WIDTH);
    format!("{}  {}", label, error)
        .if_supports_color(Stream::Stdout, |s| s.red())
        .to_string()
}

pub fn average_row(avg: &Averages) -> String {
    let line = row(
        "AVERAGE",
        [
            &avg.pre_initialization.to_string(),
            &avg.initialization.to_string(),
            &avg.invocation.to_string(),
            &avg.total.to_string(),
        ],
    );
    line.if_supports_color(Stream::Stdout, |s| s.bold())
        .to_string()
}

pub fn success_rate_line(succeeded: u32, attempted: u32) -> String {
    format!("succeeded {}/{} samples", succeeded, attempted)
}

/// JSON output format.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub function: &'a str,
    pub generated_at: String,
    pub attempted: u32,
    pub succeeded: u32,
    pub samples: Vec<JsonSample<'a>>,
    pub failures: Vec<JsonFailure>,
    pub average: Option<Averages>,
}

#[derive(Serialize)]
pub struct JsonSample<'a> {
    #[serde(flatten)]
    pub timings: &'a SampleTimings,
    pub durations: DurationBreakdown,
}

#[derive(Serialize)]
pub struct JsonFailure {
    pub sample: u32,
    pub error: String,
}

pub fn format_json(report: &JsonReport<'_>) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Window;

    fn breakdown() -> DurationBreakdown {
        DurationBreakdown {
            total: 350,
            pre_initialization: 100,
            initialization: 20,
            initialization_to_invocation: 0,
            invocation: 180,
            invocation_to_overhead: 190,
            overhead: 10,
            post_overhead: 40,
        }
    }

    #[test]
    fn cell_pads_left() {
        assert_eq!(cell("42", 5), "   42");
        assert_eq!(cell("", 3), "   ");
    }

    #[test]
    fn cell_keeps_rightmost_when_too_long() {
        assert_eq!(cell("abcdefgh", 5), "defgh");
        assert_eq!(cell("12345", 5), "12345");
    }

    #[test]
    fn header_has_fixed_columns() {
        let h = header_row();
        assert_eq!(h.len(), TRACE_ID_WIDTH + 4 * NUMBER_WIDTH);
        assert!(h.starts_with(&format!("{:>35}", "XRAY TRACE ID")));
        assert!(h.ends_with("   TOTAL[ms]"));
    }

    #[test]
    fn sample_row_layout() {
        let r = sample_row("1-6530f1a2-3c9d4e5f6a7b8c9d0e1f2a3b", &breakdown());
        assert_eq!(
            r,
            format!(
                "{}{:>12}{:>12}{:>12}{:>12}",
                "1-6530f1a2-3c9d4e5f6a7b8c9d0e1f2a3b", 100, 20, 180, 350
            )
        );
    }

    #[test]
    fn sample_row_negative_numbers() {
        let mut b = breakdown();
        b.initialization = -3;
        let r = sample_row("t", &b);
        assert_eq!(&r[TRACE_ID_WIDTH + NUMBER_WIDTH..TRACE_ID_WIDTH + 2 * NUMBER_WIDTH], "          -3");
    }

    #[test]
    fn average_row_layout() {
        let avg = Averages {
            pre_initialization: 101,
            initialization: 21,
            invocation: 179,
            total: 352,
        };
        let r = average_row(&avg);
        assert!(r.starts_with(&format!("{:>35}", "AVERAGE")));
        assert!(r.ends_with("         352"));
    }

    #[test]
    fn failed_row_mentions_error() {
        let r = failed_row(2, "Overhead was not found in the function segment");
        assert!(r.contains("sample 2 FAILED"));
        assert!(r.contains("Overhead was not found"));
    }

    #[test]
    fn json_report_flattens_timings() {
        let timings = SampleTimings {
            trace_id: "1-abc".to_string(),
            lambda: Window { start_ms: 0, end_ms: 350 },
            initialization: Window { start_ms: 100, end_ms: 120 },
            invocation: Window { start_ms: 120, end_ms: 300 },
            overhead: Window { start_ms: 300, end_ms: 310 },
        };
        let report = JsonReport {
            function: "my-fn",
            generated_at: "2026-10-16T00:00:00Z".to_string(),
            attempted: 1,
            succeeded: 1,
            samples: vec![JsonSample {
                timings: &timings,
                durations: breakdown(),
            }],
            failures: vec![],
            average: None,
        };
        let parsed: serde_json::Value = serde_json::from_str(&format_json(&report)).unwrap();
        assert_eq!(parsed["samples"][0]["trace_id"], "1-abc");
        assert_eq!(parsed["samples"][0]["invocation"]["end_ms"], 300);
        assert_eq!(parsed["samples"][0]["durations"]["post_overhead"], 40);
        assert!(parsed["average"].is_null());
    }
}
