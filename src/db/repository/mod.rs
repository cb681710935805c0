pub mod mood;
pub mod patient;
pub mod professional;
