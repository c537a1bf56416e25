//! Badge Awarder
//!
//! Asynchronous recognition of completed donations and purchases:
//!
//! - a bounded in-process event bus with a fire-and-forget publisher
//!   (a failed publish is logged and dropped, never surfaced to the
//!   request path)
//! - a consumer task that grants one-time threshold badges through the
//!   ledger's idempotent check-and-insert

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod awarder;
pub mod bus;
pub mod error;
pub mod types;

pub use awarder::{spawn_badge_awarder, BadgeAwarder, DONATION_BADGE_THRESHOLD};
pub use bus::{channel, EventPublisher, EventStream};
pub use error::{Error, Result};
pub use types::EconomyEvent;
