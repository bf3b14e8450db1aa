/// Opaque job handle assigned at enqueue time.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Log backend timestamps are integer nanoseconds since the Unix epoch.
pub type UnixNanos = i64;
