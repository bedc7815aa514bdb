use thiserror::Error;
use uuid::Uuid;

/// Typed failures at the engine boundary.
///
/// Recoverable aggregation conditions (empty inputs, malformed weight
/// configs, out-of-range period indices) are expressed in return values and
/// never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No evaluation rule resolved for the course/grade pair. Callers must
    /// not substitute a default threshold.
    #[error("no evaluation rule applies to course {course_id}")]
    MissingRule { course_id: Uuid },

    #[error("unknown calculation type: {0}")]
    UnknownCalculationType(String),

    #[error("unknown academic period type: {0}")]
    UnknownPeriodType(String),

    #[error("unknown attendance status: {0}")]
    UnknownAttendanceStatus(String),

    #[error("unknown education level: {0}")]
    UnknownEducationLevel(String),
}
