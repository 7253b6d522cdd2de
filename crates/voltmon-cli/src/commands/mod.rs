pub mod monitor;
pub mod once;
