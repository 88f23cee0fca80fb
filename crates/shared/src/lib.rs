pub mod config;
mod config_env;
pub mod dispatch;
pub mod fallback;
pub mod intake;
pub mod llm;
pub mod models;
pub mod progress;
pub mod relay;
pub mod session;
