/// Database connection management
pub mod connection;
/// Member, subscription and delivery records
pub mod models;
