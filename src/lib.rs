//! Hearth - Self-hosted group chat server
//!
//! Text channels, 1:1 direct messages and voice presence behind a realtime
//! WebSocket gateway that keeps every connected device consistent with the
//! authoritative store.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
