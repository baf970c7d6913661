//! Domain events and the stream envelope used to persist them.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
