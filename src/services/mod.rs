pub mod generation;
pub mod registry;
pub mod retention;
pub mod scheduler;
pub mod uploads;
