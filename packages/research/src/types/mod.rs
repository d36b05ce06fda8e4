pub mod config;
pub mod request;
pub mod source;
pub mod state;
pub mod summary;
