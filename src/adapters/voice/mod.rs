//! Voice adapters - signed grants for the external media server.

mod livekit;

pub use livekit::LiveKitTokenIssuer;
