pub mod dos33;
pub mod entry;
pub mod filesystem;

use std::path::Path;

use dos33::Dos33Filesystem;
use filesystem::Filesystem;

use crate::error::Dos33Error;

/// Open a disk image for browsing.
///
/// Only 140K DOS-order DOS 3.3 images are recognised; anything else fails
/// with [`Dos33Error::InvalidImageSize`] or a catalog error.
pub fn open_image(path: impl AsRef<Path>) -> Result<Box<dyn Filesystem>, Dos33Error> {
    Ok(Box::new(Dos33Filesystem::open(path)?))
}

/// Format a byte count as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;

    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
