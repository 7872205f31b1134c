pub mod acquisition;
pub mod api;
pub mod generation;
pub mod synthesis;
pub mod workflow;
