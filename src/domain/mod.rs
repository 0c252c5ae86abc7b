// Domain layer - Plain data and pure computations
pub mod analytics;
pub mod flow;
pub mod message;
pub mod telemetry;
