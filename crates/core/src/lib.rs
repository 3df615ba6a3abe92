pub mod error;
pub mod extract;
pub mod marker;
pub mod query_name;
pub mod record;
pub mod sink;

pub use error::{MalformedMarkerError, MarkerFault, SinkError};
pub use extract::{extract_plans, ExtractOptions, Extracted, PlanExtractor};
pub use marker::{parse_marker, MarkerLayout, DEFAULT_MARKER_TOKEN};
pub use query_name::resolve_query_name;
pub use record::{ConnectionMetadata, ExtractedPlan, MarkerLine, PlanRecord};
pub use sink::{PlanSink, WriteOutcome};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
