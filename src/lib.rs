pub mod app;
pub mod client;
pub mod config;
pub mod detection;
pub mod overlay;
pub mod preview;
pub mod submit;
pub mod telemetry;

pub use app::DetectApp;
