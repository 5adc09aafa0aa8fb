//! Realtime synchronization of group chat and whiteboard.

pub mod chat;
pub mod store;
pub mod surface;
pub mod whiteboard;

pub use chat::GroupChat;
pub use store::{RealtimeStore, Snapshot, Subscription};
pub use whiteboard::Whiteboard;
