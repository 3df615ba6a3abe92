use chrono::NaiveDateTime;

use crate::query_name::resolve_query_name;

/// Connection descriptor carried by a plan marker line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMetadata {
    pub database: String,
    pub user: String,
    pub application: String,
    pub client: String,
}

/// Everything a marker line yields once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLine {
    pub metadata: ConnectionMetadata,
    /// Second precision, as recorded in the log. The zone token is dropped.
    pub logged_at: NaiveDateTime,
    pub pid: Option<u32>,
    pub duration_ms: Option<f64>,
}

/// A closed plan as emitted by [`crate::extract::PlanExtractor`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPlan {
    pub marker: MarkerLine,
    /// Newline-joined lines between the marker and the closing line.
    pub body: String,
    /// 1-based line number of the marker that opened this plan.
    pub line_number: usize,
}

impl ExtractedPlan {
    pub fn database(&self) -> &str {
        &self.marker.metadata.database
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Resolve the record identity and hand over the body.
    pub fn into_record(self) -> PlanRecord {
        let query_name = resolve_query_name(&self.body, self.marker.logged_at);
        PlanRecord {
            database: self.marker.metadata.database,
            logged_at: self.marker.logged_at,
            query_name,
            body: self.body,
        }
    }
}

/// The unit persisted by a [`crate::sink::PlanSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRecord {
    pub database: String,
    pub logged_at: NaiveDateTime,
    pub query_name: String,
    pub body: String,
}
