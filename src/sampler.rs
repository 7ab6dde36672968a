//! The measurement loop: one trigger-invoke-measure cycle per sample, run
//! strictly one after another.

use std::io::Write;

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::Settings;
use crate::decompose::{decompose, normalize};
use crate::display::StatusLine;
use crate::errors::ColdstartError;
use crate::platform::{ExecutionPlatform, invoke_for_trace_id, trigger_new_version, wait_until_ready};
use crate::report::{self, JsonFailure, JsonReport, JsonSample};
use crate::traces::{TraceBackend, wait_for_trace};
use crate::types::{DurationBreakdown, FailurePolicy, RunningTotals, SampleCount, SampleTimings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStage {
    Updating,
    WaitingReady,
    Invoking,
    WaitingTrace,
    Parsing,
    Normalized,
    Failed,
    Reported,
}

impl SampleStage {
    pub fn message(self) -> &'static str {
        match self {
            SampleStage::Updating => "updating the function...",
            SampleStage::WaitingReady => "waiting for the function to be ready...",
            SampleStage::Invoking => "executing the function...",
            SampleStage::WaitingTrace => "retrieving X-Ray trace...",
            SampleStage::Parsing => "decomposing the trace...",
            SampleStage::Normalized => "sample complete",
            SampleStage::Failed => "sample failed",
            SampleStage::Reported => "sample reported",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

/// Everything a finished run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub attempted: u32,
    pub samples: Vec<SampleTimings>,
    pub failures: Vec<(u32, String)>,
    pub totals: RunningTotals,
}

pub struct Sampler<'a, P: ?Sized, B: ?Sized> {
    platform: &'a P,
    traces: &'a B,
    settings: &'a Settings,
}

impl<'a, P, B> Sampler<'a, P, B>
where
    P: ExecutionPlatform + ?Sized,
    B: TraceBackend + ?Sized,
{
    pub fn new(platform: &'a P, traces: &'a B, settings: &'a Settings) -> Self {
        Self {
            platform,
            traces,
            settings,
        }
    }

    /// Run one full cycle and return its normalized timings.
    ///
    /// `on_stage` sees every stage entered, ending in either
    /// [`SampleStage::Normalized`] or [`SampleStage::Failed`].
    pub async fn run_sample(
        &self,
        function: &str,
        on_stage: &mut dyn FnMut(SampleStage),
    ) -> Result<SampleTimings, ColdstartError> {
        let result = self.measure(function, on_stage).await;
        if result.is_err() {
            on_stage(SampleStage::Failed);
        }
        result
    }

    async fn measure(
        &self,
        function: &str,
        on_stage: &mut dyn FnMut(SampleStage),
    ) -> Result<SampleTimings, ColdstartError> {
        let options = self.settings.poll_options();

        on_stage(SampleStage::Updating);
        trigger_new_version(self.platform, function, &self.settings.version_variable).await?;

        on_stage(SampleStage::WaitingReady);
        wait_until_ready(self.platform, function, &options).await?;

        on_stage(SampleStage::Invoking);
        let trace_id = invoke_for_trace_id(self.platform, function).await?;
        debug!(%trace_id, "invocation traced");

        on_stage(SampleStage::WaitingTrace);
        let segments = wait_for_trace(self.traces, &trace_id, &options).await?;

        on_stage(SampleStage::Parsing);
        let parts = decompose(&segments)?;
        let timings = normalize(&trace_id, &parts);

        on_stage(SampleStage::Normalized);
        Ok(timings)
    }

    /// Run `times` samples in sequence, streaming a table row as each one
    /// completes, followed by the averages.
    pub async fn run(
        &self,
        function: &str,
        times: SampleCount,
        policy: FailurePolicy,
        format: ReportFormat,
        out: &mut dyn Write,
        status: &mut StatusLine,
    ) -> Result<RunSummary, ColdstartError> {
        let mut summary = RunSummary::default();

        if format == ReportFormat::Table {
            writeln!(out, "{}", report::header_row())?;
        }

        for n in 1..=times.get() {
            summary.attempted += 1;
            let span = info_span!("sample", n, of = times.get());
            let result = self
                .run_sample(function, &mut |stage: SampleStage| {
                    debug!(?stage, "stage");
                    status.set(stage.message());
                })
                .instrument(span)
                .await;
            status.clear();

            match result {
                Ok(timings) => {
                    let breakdown = DurationBreakdown::from(&timings);
                    summary.totals.add(&breakdown);
                    info!(
                        sample = n,
                        trace_id = %timings.trace_id,
                        total_ms = breakdown.total,
                        "sample reported"
                    );
                    if format == ReportFormat::Table {
                        writeln!(out, "{}", report::sample_row(&timings.trace_id, &breakdown))?;
                        out.flush()?;
                    }
                    debug!(sample = n, stage = ?SampleStage::Reported, "stage");
                    summary.samples.push(timings);
                }
                Err(err) if policy == FailurePolicy::Skip => {
                    warn!(sample = n, error = %err, "sample failed, continuing");
                    if format == ReportFormat::Table {
                        writeln!(out, "{}", report::failed_row(n, &err.to_string()))?;
                        out.flush()?;
                    }
                    summary.failures.push((n, err.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        let averages = summary.totals.averages();
        match format {
            ReportFormat::Table => {
                if let Some(ref avg) = averages {
                    writeln!(out, "{}", report::average_row(avg))?;
                }
                if policy == FailurePolicy::Skip {
                    writeln!(
                        out,
                        "{}",
                        report::success_rate_line(summary.totals.samples, summary.attempted)
                    )?;
                }
            }
            ReportFormat::Json => {
                let json = JsonReport {
                    function,
                    generated_at: report::timestamp(Utc::now()),
                    attempted: summary.attempted,
                    succeeded: summary.totals.samples,
                    samples: summary
                        .samples
                        .iter()
                        .map(|timings| JsonSample {
                            timings,
                            durations: DurationBreakdown::from(timings),
                        })
                        .collect(),
                    failures: summary
                        .failures
                        .iter()
                        .map(|(sample, error)| JsonFailure {
                            sample: *sample,
                            error: error.clone(),
                        })
                        .collect(),
                    average: averages,
                };
                writeln!(out, "{}", report::format_json(&json))?;
            }
        }

        if summary.totals.samples == 0 {
            return Err(ColdstartError::NoSuccessfulSamples {
                attempted: summary.attempted,
            });
        }
        Ok(summary)
    }
}
