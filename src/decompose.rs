//! Turn the two segments of a cold-start trace into relative timing windows.

use tracing::warn;

use crate::errors::ColdstartError;
use crate::types::{SampleTimings, SegmentDocument, Subsegment, Window};

pub const CONTAINER_ORIGIN: &str = "AWS::Lambda";
pub const FUNCTION_ORIGIN: &str = "AWS::Lambda::Function";

pub const INITIALIZATION: &str = "Initialization";
pub const INVOCATION: &str = "Invocation";
pub const OVERHEAD: &str = "Overhead";

/// Start and end of one closed interval, in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub start: f64,
    pub end: f64,
}

/// The pieces of a trace that carry cold-start timings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposed {
    pub container: Bounds,
    pub initialization: Bounds,
    pub invocation: Bounds,
    pub overhead: Bounds,
}

pub fn decompose(segments: &[SegmentDocument]) -> Result<Decomposed, ColdstartError> {
    let container = find_segment(segments, CONTAINER_ORIGIN)?;
    let function = find_segment(segments, FUNCTION_ORIGIN)?;

    let decomposed = Decomposed {
        container: closed(CONTAINER_ORIGIN, container.start_time, container.end_time)?,
        initialization: find_phase(function, INITIALIZATION)?,
        invocation: find_phase(function, INVOCATION)?,
        overhead: find_phase(function, OVERHEAD)?,
    };
    if !decomposed.phases_in_order() {
        warn!("cold-start phases overlap or are out of order; reporting them as recorded");
    }
    Ok(decomposed)
}

fn find_segment<'a>(
    segments: &'a [SegmentDocument],
    origin: &'static str,
) -> Result<&'a SegmentDocument, ColdstartError> {
    segments
        .iter()
        .find(|s| s.origin.as_deref() == Some(origin))
        .ok_or(ColdstartError::SegmentNotFound { which: origin })
}

fn find_phase(function: &SegmentDocument, name: &'static str) -> Result<Bounds, ColdstartError> {
    let phase: &Subsegment = function
        .subsegments
        .iter()
        .find(|s| s.name == name)
        .ok_or(ColdstartError::PhaseNotFound { name })?;
    closed(name, phase.start_time, phase.end_time)
}

// Only intervals that are actually measured need an end.
fn closed(what: &str, start: f64, end: Option<f64>) -> Result<Bounds, ColdstartError> {
    let end = end.ok_or_else(|| ColdstartError::MalformedSegment {
        detail: format!("{what} has no end_time"),
    })?;
    Ok(Bounds { start, end })
}

impl Decomposed {
    fn phases_in_order(&self) -> bool {
        let bounds = [
            self.initialization.start,
            self.initialization.end,
            self.invocation.start,
            self.invocation.end,
            self.overhead.start,
            self.overhead.end,
        ];
        bounds.windows(2).all(|w| w[0] <= w[1])
    }
}

/// Milliseconds from `origin` to `timestamp`, both in epoch seconds.
///
/// Rounds half away from zero.
pub fn offset_ms(origin: f64, timestamp: f64) -> i64 {
    ((timestamp - origin) * 1000.0).round() as i64
}

/// Rebase every boundary onto the container segment's start.
pub fn normalize(trace_id: &str, parts: &Decomposed) -> SampleTimings {
    let origin = parts.container.start;
    let window = |bounds: Bounds| Window {
        start_ms: offset_ms(origin, bounds.start),
        end_ms: offset_ms(origin, bounds.end),
    };

    SampleTimings {
        trace_id: trace_id.to_string(),
        lambda: window(parts.container),
        initialization: window(parts.initialization),
        invocation: window(parts.invocation),
        overhead: window(parts.overhead),
    }
}
