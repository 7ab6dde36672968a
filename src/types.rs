use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ColdstartError;

/// One segment document as stored by X-Ray (loosely typed).
///
/// While X-Ray is still recording a segment it carries `in_progress: true`
/// and no `end_time`.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentDocument {
    pub origin: Option<String>,
    pub start_time: f64,
    pub end_time: Option<f64>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub subsegments: Vec<Subsegment>,
}

impl SegmentDocument {
    /// Neither the segment nor any of its subsegments is still being recorded.
    pub fn is_complete(&self) -> bool {
        !self.in_progress && self.subsegments.iter().all(|s| !s.in_progress)
    }
}

/// A named, timed child interval of a segment.
#[derive(Debug, Clone, Deserialize)]
pub struct Subsegment {
    pub name: String,
    pub start_time: f64,
    pub end_time: Option<f64>,
    #[serde(default)]
    pub in_progress: bool,
}

/// Millisecond offsets relative to the container segment start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Normalized timings of a single cold-start sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleTimings {
    pub trace_id: String,
    pub lambda: Window,
    pub initialization: Window,
    pub invocation: Window,
    pub overhead: Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationBreakdown {
    pub total: i64,
    pub pre_initialization: i64,
    pub initialization: i64,
    pub initialization_to_invocation: i64,
    pub invocation: i64,
    pub invocation_to_overhead: i64,
    pub overhead: i64,
    pub post_overhead: i64,
}

impl From<&SampleTimings> for DurationBreakdown {
    fn from(t: &SampleTimings) -> Self {
        Self {
            total: t.lambda.end_ms - t.lambda.start_ms,
            pre_initialization: t.initialization.start_ms,
            initialization: t.initialization.end_ms - t.initialization.start_ms,
            initialization_to_invocation: t.invocation.start_ms - t.initialization.end_ms,
            invocation: t.invocation.end_ms - t.invocation.start_ms,
            invocation_to_overhead: t.overhead.end_ms - t.invocation.start_ms,
            overhead: t.overhead.end_ms - t.overhead.start_ms,
            post_overhead: t.lambda.end_ms - t.overhead.end_ms,
        }
    }
}

/// Per-column sums across the samples of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningTotals {
    pub pre_initialization: i64,
    pub initialization: i64,
    pub invocation: i64,
    pub total: i64,
    pub samples: u32,
}

impl RunningTotals {
    pub fn add(&mut self, breakdown: &DurationBreakdown) {
        self.pre_initialization += breakdown.pre_initialization;
        self.initialization += breakdown.initialization;
        self.invocation += breakdown.invocation;
        self.total += breakdown.total;
        self.samples += 1;
    }

    /// Returns `None` when nothing has been folded in yet.
    pub fn averages(&self) -> Option<Averages> {
        if self.samples == 0 {
            return None;
        }
        let n = f64::from(self.samples);
        let avg = |sum: i64| (sum as f64 / n).round() as i64;
        Some(Averages {
            pre_initialization: avg(self.pre_initialization),
            initialization: avg(self.initialization),
            invocation: avg(self.invocation),
            total: avg(self.total),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Averages {
    pub pre_initialization: i64,
    pub initialization: i64,
    pub invocation: i64,
    pub total: i64,
}

/// A sample count that has been checked to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleCount(u32);

impl SampleCount {
    pub fn new(value: i64) -> Result<Self, ColdstartError> {
        match u32::try_from(value) {
            Ok(n) if n > 0 => Ok(Self(n)),
            _ => Err(ColdstartError::InvalidSampleCount { value }),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// What the run loop does when a sample fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Skip,
}

/// `LastUpdateStatus` of a function configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    InProgress,
    Successful,
    Failed { reason: Option<String> },
    Other(String),
}

impl UpdateStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, UpdateStatus::InProgress)
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::InProgress => f.write_str("InProgress"),
            UpdateStatus::Successful => f.write_str("Successful"),
            UpdateStatus::Failed { .. } => f.write_str("Failed"),
            UpdateStatus::Other(s) => f.write_str(s),
        }
    }
}

/// Response of a single synchronous invocation.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub log_tail_base64: Option<String>,
    pub function_error: Option<String>,
}
