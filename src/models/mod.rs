pub mod life_event;
pub mod mood;
pub mod school;
pub mod student;
pub mod user;
