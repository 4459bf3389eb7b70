pub mod log;
pub mod plan;
pub mod profile;
