pub mod config;
pub mod error;
pub mod format;
pub mod state;
pub mod stream_info;
