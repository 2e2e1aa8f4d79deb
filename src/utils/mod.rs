/// Timestamp storage format helpers
pub mod datetime;
/// Input validation helpers
pub mod validation;
