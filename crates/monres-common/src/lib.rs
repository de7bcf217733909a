pub mod duration;
pub mod types;
