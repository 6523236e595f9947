//! Adapters - infrastructure implementations of the ports.

pub mod http;
pub mod sqlite;
pub mod storage;
pub mod voice;
pub mod websocket;
