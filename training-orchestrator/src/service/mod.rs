pub mod autosave;
pub mod durable;
pub mod job;
pub mod worker;
