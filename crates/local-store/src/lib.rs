//! File-tree sink.
//!
//! ```text
//! plans/
//!   sales/
//!     _Result42_1.json
//!     2024-03-09_14-02-07_2.json
//! ```
//!
//! Files hold the raw plan body. The `.json` extension is conventional only;
//! nothing is validated or re-encoded.

use planlog_core::{PlanRecord, PlanSink, SinkError, WriteOutcome};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default root directory, relative to the working directory.
pub const DEFAULT_ROOT: &str = "plans";

pub struct FileTreeSink {
    root: PathBuf,
    /// Next file suffix. Starts at 1, bumps after every record written.
    counter: u64,
}

impl FileTreeSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            counter: 1,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the next record would be written to.
    pub fn plan_path(&self, record: &PlanRecord) -> PathBuf {
        self.root
            .join(path_component(&record.database))
            .join(format!("{}_{}.json", path_component(&record.query_name), self.counter))
    }
}

impl Default for FileTreeSink {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl PlanSink for FileTreeSink {
    fn name(&self) -> &str {
        "file-tree"
    }

    fn write(&mut self, record: &PlanRecord) -> Result<WriteOutcome, SinkError> {
        let path = self.plan_path(record);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, record.body.as_bytes()).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        self.counter += 1;
        info!("Wrote plan to {}", path.display());
        Ok(WriteOutcome::Written)
    }
}

/// Reduce a log-supplied name to one safe path component.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
