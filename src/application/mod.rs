// Application layer - use cases and the ports they depend on
pub mod agent;
pub mod display_port;
pub mod monitor_client;
