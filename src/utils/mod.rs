pub mod config;
pub mod serialize;
pub mod state;
