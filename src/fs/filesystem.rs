use std::io::Write;
use std::sync::Arc;

use super::entry::{FileAttributes, FileEntry};
use crate::error::Dos33Error;

/// Read-only capability a host filesystem layer consumes.
///
/// All methods take `&self` so one volume can serve concurrent readers. There
/// is deliberately no mutation entry point.
pub trait Filesystem: Send + Sync {
    /// Files in listing order.
    fn list_entries(&self) -> Vec<FileEntry>;

    /// Type, nominal size and lock flag of a file.
    fn attributes(&self, name: &str) -> Result<FileAttributes, Dos33Error>;

    /// Read up to `length` bytes at `offset`, clamped to the file's data.
    fn read(&self, name: &str, offset: u64, length: usize) -> Result<Vec<u8>, Dos33Error>;

    /// Whole file contents.
    fn read_file(&self, name: &str) -> Result<Arc<[u8]>, Dos33Error>;

    /// Volume label, e.g. "DISK VOLUME 254".
    fn volume_label(&self) -> String;

    /// Filesystem type name (e.g., "DOS 3.3").
    fn fs_type(&self) -> &str;

    /// Allocation unit in bytes.
    fn block_size(&self) -> u32;

    /// Total filesystem size in bytes.
    fn total_size(&self) -> u64;

    /// Used space in bytes.
    fn used_size(&self) -> u64;

    /// Stream file data to a writer. Returns the number of bytes written.
    fn write_file_to(&self, name: &str, writer: &mut dyn Write) -> Result<u64, Dos33Error> {
        let data = self.read_file(name)?;
        writer.write_all(&data)?;
        Ok(data.len() as u64)
    }
}
