//! Application services - use-cases shared by the HTTP surface.

pub mod maintenance;
pub mod moderation;

pub use maintenance::spawn_orphan_sweep;
pub use moderation::ModerationService;
