//! Conversation layer: intent classification and event handling

pub mod handler;
pub mod intent;

pub use handler::{Assistant, InboundEvent, Reply};
pub use intent::{Intent, Selector, classify};
