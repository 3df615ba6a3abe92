use crate::error::SinkError;
use crate::record::PlanRecord;

/// What a sink did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Already persisted by an earlier run. Counts as success.
    Duplicate,
}

/// Destination for completed plan records.
pub trait PlanSink {
    /// Sink name for logs and summaries (e.g. "file-tree", "sqlite").
    fn name(&self) -> &str;

    /// Persist one record. Errors are fatal for the run.
    fn write(&mut self, record: &PlanRecord) -> Result<WriteOutcome, SinkError>;
}

impl<S: PlanSink + ?Sized> PlanSink for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn write(&mut self, record: &PlanRecord) -> Result<WriteOutcome, SinkError> {
        (**self).write(record)
    }
}
