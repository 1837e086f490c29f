pub mod backoff;
pub mod listener;
pub mod wire;

pub use backoff::ReconnectPolicy;
pub use listener::PushListener;
pub use wire::{DecodeOutcome, UpdateEvent};
