pub mod client;
pub mod config;
pub mod monitor;
pub mod status;


pub use client::{ClientError, HttpServiceClient, RemoteServiceClient};
pub use config::{ClientConfig, ConfigError, Environment, MonitorConfig};
pub use monitor::ConnectivityMonitor;
pub use status::{ConnectionStatus, HealthResponse, MonitorPhase, ProbeStats};
