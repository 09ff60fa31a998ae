pub mod config;
pub mod error;
pub mod patch;
pub mod state;
