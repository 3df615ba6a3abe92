use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

static RESULT_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_Result[0-9]+").unwrap());

/// Filename-safe rendering used when a body carries no result-set id.
pub const FALLBACK_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Record identity: the first `_Result<digits>` in the body, else the timestamp.
pub fn resolve_query_name(body: &str, logged_at: NaiveDateTime) -> String {
    match RESULT_ID_RE.find(body) {
        Some(found) => found.as_str().to_string(),
        None => logged_at.format(FALLBACK_FORMAT).to_string(),
    }
}
