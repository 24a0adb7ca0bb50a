pub mod analysis;
pub mod config;
pub mod error;
pub mod gemini;
pub mod render;
pub mod server;
pub mod session;
