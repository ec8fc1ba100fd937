pub mod attendance;
pub mod config;
pub mod core;
pub mod events;
pub mod marks;
pub mod remarks;
pub mod reports;
pub mod students;
pub mod subjects;
