//! Push notification delivery
//!
//! The engine reports state changes as [`PushEvent`]s through an
//! [`EventSink`]. The production sink is the [`NotificationGateway`],
//! which fans events out to per-owner channels consumed by SSE handlers.

mod events;
mod gateway;

pub use events::PushEvent;
pub use gateway::{EventSink, NotificationGateway};
