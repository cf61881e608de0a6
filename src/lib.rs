//! Conversa - conversation data layer for a WhatsApp-backed inbox
//!
//! Implements the message cache, stale-while-revalidate contact lists,
//! cursor-based backward pagination, date grouping, and the
//! scroll-anchoring protocol that keeps the viewport steady while older
//! pages are prepended.

pub mod cache;
pub mod config;
pub mod error;
pub mod grouping;
pub mod model;
pub mod pagination;
pub mod scroll;
pub mod service;
pub mod staleness;
pub mod transport;

pub use error::{Error, Result};
