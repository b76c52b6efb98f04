pub mod config;
pub mod files;
pub mod patterns;
pub mod producers;
pub mod runner;
pub mod tasks;
pub mod telemetry;
