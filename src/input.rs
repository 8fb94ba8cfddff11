//! Button input: raw edges, the broker that turns them into actions, and the
//! keyboard simulator.

pub mod keyboard;
pub mod raw;
pub mod service;

pub use raw::{ButtonEvent, ButtonId, PressCoalescer};
pub use service::{Action, Bindings, InputBroker, InputTiming};
