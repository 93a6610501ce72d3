//! Rendering and delivery of the finished record.

pub mod generator;
pub mod webhook;

pub use generator::write_outputs;
pub use webhook::send_webhook;
