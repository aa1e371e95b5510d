pub mod payload;
pub mod queue;
pub mod sequencer;
