use thiserror::Error;

/// Errors raised by the lineage engine. Statement-level parse failures are
/// recovered inside the parser (the statement is skipped with a warning) and
/// never surface here.
#[derive(Debug, Error)]
pub enum LineageError {
    /// A table reference lacks the `schema.table` separator. Local to one
    /// reference; callers skip the entry and keep going.
    #[error("Malformed table reference `{0}`: missing `.` schema separator")]
    MalformedReference(String),

    /// A work item's target is not in `schema.table` form.
    #[error("Malformed target table `{0}`: expected `schema.table`")]
    MalformedTarget(String),

    /// The script analyzer (deterministic engine or external oracle) failed
    /// for one target. Fails that request only, never the batch.
    #[error("Script analyzer failed for target `{target}`: {reason}")]
    AnalyzerUnavailable { target: String, reason: String },
}
