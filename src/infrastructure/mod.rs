// Infrastructure layer - configuration and I/O adapters
pub mod config;
pub mod fbink;
pub mod iotawatt;
pub mod renderer;
