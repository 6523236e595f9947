//! Storage adapters - attachment bytes on the local filesystem.

mod local_file_store;

pub use local_file_store::LocalFileStore;
