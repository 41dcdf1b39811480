pub mod job;
pub mod request;
pub mod video;
