//! Plan extraction state machine.
//!
//! Feeds on log lines in file order and yields closed plans. A plan opens on a
//! marker line and closes on the next date-prefixed line, the next marker, or at
//! end of input.
//! No I/O happens here.

use regex::Regex;
use std::collections::VecDeque;
use std::sync::LazyLock;
use tracing::trace;

use crate::error::MalformedMarkerError;
use crate::marker::{parse_marker, MarkerLayout, DEFAULT_MARKER_TOKEN};
use crate::record::{ExtractedPlan, MarkerLine};

static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").unwrap());

/// One item of extractor output.
pub type Extracted = Result<ExtractedPlan, MalformedMarkerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub layout: MarkerLayout,
    pub marker_token: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            layout: MarkerLayout::default(),
            marker_token: DEFAULT_MARKER_TOKEN.to_string(),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    InPlan,
}

/// A log line starting with `YYYY-MM-DD` begins a new log entry.
pub fn is_boundary(line: &str) -> bool {
    BOUNDARY_RE.is_match(line)
}

struct OpenPlan {
    marker: MarkerLine,
    line_number: usize,
    body: Vec<String>,
}

impl OpenPlan {
    fn close(self) -> ExtractedPlan {
        ExtractedPlan {
            marker: self.marker,
            body: self.body.join("\n"),
            line_number: self.line_number,
        }
    }
}

/// Line-in, plan-out transducer. At most one plan is open at a time.
pub struct PlanExtractor {
    options: ExtractOptions,
    open: Option<OpenPlan>,
    line_number: usize,
}

impl Default for PlanExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl PlanExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            open: None,
            line_number: 0,
        }
    }

    #[cfg(test)]
    fn mode(&self) -> Mode {
        if self.open.is_some() {
            Mode::InPlan
        } else {
            Mode::Idle
        }
    }

    /// Lines consumed so far.
    pub fn lines_seen(&self) -> usize {
        self.line_number
    }

    /// Consume one line. Yields at most one closed plan followed by at most one
    /// marker error, in that order. An open plan is never dropped silently: a
    /// second marker closes it even when the marker line is not date-prefixed.
    pub fn push_line(&mut self, line: &str) -> Vec<Extracted> {
        self.line_number += 1;
        let mut out = Vec::new();

        if self.open.is_some() && is_boundary(line) {
            if let Some(plan) = self.open.take() {
                trace!(line = self.line_number, "plan end");
                out.push(Ok(plan.close()));
            }
        }

        if line.contains(self.options.marker_token.as_str()) {
            match parse_marker(line, self.options.layout) {
                Ok(marker) => {
                    if let Some(plan) = self.open.take() {
                        trace!(line = self.line_number, "plan end at next marker");
                        out.push(Ok(plan.close()));
                    }
                    trace!(
                        line = self.line_number,
                        db = %marker.metadata.database,
                        pid = ?marker.pid,
                        duration_ms = ?marker.duration_ms,
                        "plan begin"
                    );
                    self.open = Some(OpenPlan {
                        marker,
                        line_number: self.line_number,
                        body: Vec::new(),
                    });
                }
                Err(fault) => {
                    if let Some(dropped) = self.open.take() {
                        trace!(
                            line = dropped.line_number,
                            "open plan dropped by malformed marker"
                        );
                    }
                    out.push(Err(MalformedMarkerError {
                        line_number: self.line_number,
                        fault,
                    }));
                }
            }
            return out;
        }

        if let Some(open) = self.open.as_mut() {
            open.body.push(line.to_string());
        }
        out
    }

    /// End of input. Flushes the open plan, if any.
    pub fn finish(self) -> Option<ExtractedPlan> {
        self.open.map(|plan| {
            trace!(line = plan.line_number, "plan end at end of input");
            plan.close()
        })
    }
}

/// Iterator over the plans of a line sequence, including the end-of-input flush.
pub fn extract_plans<I>(lines: I, options: ExtractOptions) -> ExtractPlans<I::IntoIter>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    ExtractPlans {
        lines: lines.into_iter(),
        extractor: Some(PlanExtractor::new(options)),
        queued: VecDeque::new(),
    }
}

pub struct ExtractPlans<I> {
    lines: I,
    extractor: Option<PlanExtractor>,
    queued: VecDeque<Extracted>,
}

impl<I> Iterator for ExtractPlans<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Extracted;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.queued.pop_front() {
                return Some(item);
            }
            let extractor = self.extractor.as_mut()?;
            match self.lines.next() {
                Some(line) => self.queued.extend(extractor.push_line(line.as_ref())),
                None => {
                    let last = self.extractor.take().and_then(PlanExtractor::finish);
                    return last.map(Ok);
                }
            }
        }
    }
}
