//! Domain layer - value objects and invariants, free of I/O.

pub mod chat;
pub mod foundation;
