//! Client side of Petora Connect: a typed HTTP client and the view logic
//! (group chat, post card, checkout) as explicit state machines.
//!
//! Each view splits into a synchronous state type that owns every
//! decision, and a thin async driver that performs the round trips.

pub mod checkout;
pub mod config;
pub mod error;
pub mod group_chat;
pub mod http;
pub mod notice;
pub mod optimistic;
pub mod post_card;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use http::{HttpApi, PetoraApi};
pub use notice::{Notice, NoticeLevel};
pub use session::Viewer;
