//! Read-only access to Apple DOS 3.3 disk images.

pub mod commands;
pub mod config;
pub mod error;
pub mod fs;
pub mod mount;

pub use error::Dos33Error;
pub use fs::dos33::Dos33Filesystem;
pub use fs::filesystem::Filesystem;
