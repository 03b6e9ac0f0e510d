mod app;
mod config;
mod gateway;

pub use app::run_native;
pub use config::Config;
pub use gateway::HttpGateway;
