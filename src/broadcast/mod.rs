pub mod orchestrator;
pub mod transport;
