use planlog_core::{ExtractOptions, Extracted, PlanExtractor, PlanSink, SinkError, WriteOutcome};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Counts reported at the end of a run. Every skipped plan shows up here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sink: String,
    pub lines: usize,
    pub plans: usize,
    pub written: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub skipped_empty: usize,
}

/// Drive the extractor over `text` in line order and hand each plan to `sink`
/// before reading on. Sink errors end the run; marker errors do not.
pub fn ingest<S>(
    text: &str,
    options: ExtractOptions,
    skip_empty: bool,
    sink: &mut S,
) -> Result<RunSummary, SinkError>
where
    S: PlanSink + ?Sized,
{
    let mut summary = RunSummary {
        sink: sink.name().to_string(),
        ..RunSummary::default()
    };
    let mut extractor = PlanExtractor::new(options);

    for line in text.lines() {
        for item in extractor.push_line(line) {
            handle(item, skip_empty, sink, &mut summary)?;
        }
    }
    summary.lines = extractor.lines_seen();
    if let Some(last) = extractor.finish() {
        handle(Ok(last), skip_empty, sink, &mut summary)?;
    }

    info!(
        plans = summary.plans,
        written = summary.written,
        duplicates = summary.duplicates,
        malformed = summary.malformed,
        "Extraction finished"
    );
    Ok(summary)
}

fn handle<S>(
    item: Extracted,
    skip_empty: bool,
    sink: &mut S,
    summary: &mut RunSummary,
) -> Result<(), SinkError>
where
    S: PlanSink + ?Sized,
{
    let plan = match item {
        Ok(plan) => plan,
        Err(err) => {
            warn!("{err}, skipping plan");
            summary.malformed += 1;
            return Ok(());
        }
    };

    summary.plans += 1;
    debug!(
        line = plan.line_number,
        db = %plan.database(),
        pid = ?plan.marker.pid,
        duration_ms = ?plan.marker.duration_ms,
        "Extracted plan"
    );
    if skip_empty && plan.is_empty() {
        debug!(line = plan.line_number, "Skipping plan with empty body");
        summary.skipped_empty += 1;
        return Ok(());
    }

    let record = plan.into_record();
    match sink.write(&record)? {
        WriteOutcome::Written => summary.written += 1,
        WriteOutcome::Duplicate => summary.duplicates += 1,
    }
    Ok(())
}
