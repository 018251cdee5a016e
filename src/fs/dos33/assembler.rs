//! Whole-file assembly with a per-name compute-once cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::catalog::Directory;
use super::sector::{SectorStore, SECTOR_SIZE};
use super::tslist;
use crate::error::Dos33Error;
use crate::fs::entry::FileEntry;

type Slot = Arc<Mutex<Option<Arc<[u8]>>>>;

/// Materializes file contents on first request and keeps them for the life
/// of the decoder.
///
/// The outer lock only guards slot lookup. Each name has its own slot lock,
/// so concurrent first reads of one file walk its chain once while other
/// files proceed independently. Failed assemblies are not cached.
#[derive(Default)]
pub struct FileAssembler {
    cache: Mutex<HashMap<String, Slot>>,
}

impl FileAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(
        &self,
        store: &SectorStore,
        directory: &Directory,
        name: &str,
    ) -> Result<Arc<[u8]>, Dos33Error> {
        let entry = directory
            .get(name)
            .ok_or_else(|| Dos33Error::FileNotFound(name.to_string()))?;

        let slot = {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(cache.entry(name.to_string()).or_default())
        };

        let mut cached = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(data) = cached.as_ref() {
            return Ok(Arc::clone(data));
        }

        let data: Arc<[u8]> = assemble(store, entry)?.into();
        log::debug!("cached {} bytes for {:?}", data.len(), name);
        *cached = Some(Arc::clone(&data));
        Ok(data)
    }

    /// Number of files whose contents are currently cached.
    pub fn cached_files(&self) -> usize {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .values()
            .filter(|slot| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .count()
    }
}

/// Concatenate a file's data sectors in T/S list order.
pub fn assemble(store: &SectorStore, entry: &FileEntry) -> Result<Vec<u8>, Dos33Error> {
    let sectors = tslist::data_sectors(store, entry.location)?;
    let mut data = Vec::with_capacity(sectors.len() * SECTOR_SIZE);
    for address in sectors {
        data.extend_from_slice(store.read(address)?);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::dos33::catalog::read_catalog;
    use crate::fs::dos33::sector::SectorAddress;
    use crate::fs::dos33::test_image::{ImageBuilder, RawEntry};

    fn addr(track: u8, sector: u8) -> SectorAddress {
        SectorAddress::new(track, sector)
    }

    fn two_file_image() -> ImageBuilder {
        let mut image = ImageBuilder::new();
        image.catalog_sector(
            addr(17, 15),
            addr(0, 0),
            &[
                RawEntry::new("HELLO", addr(18, 15), 0x02, 3),
                RawEntry::new("BROKEN", addr(19, 15), 0x04, 2),
            ],
        );
        image.ts_list(addr(18, 15), addr(0, 0), 0, &[addr(18, 14), addr(18, 13)]);
        image.fill(addr(18, 14), 0x11);
        image.fill(addr(18, 13), 0x22);
        // Data pair with a sector number past the end of the track.
        image.ts_list(addr(19, 15), addr(0, 0), 0, &[addr(19, 20)]);
        image
    }

    #[test]
    fn test_assemble_concatenates_in_order() {
        let image = two_file_image();
        let store = image.store();
        let dir = read_catalog(&store, addr(17, 15)).unwrap();
        let data = assemble(&store, dir.get("HELLO").unwrap()).unwrap();
        assert_eq!(data.len(), 512);
        assert!(data[..256].iter().all(|&b| b == 0x11));
        assert!(data[256..].iter().all(|&b| b == 0x22));
    }

    #[test]
    fn test_bytes_are_memoized() {
        let image = two_file_image();
        let store = image.store();
        let dir = read_catalog(&store, addr(17, 15)).unwrap();
        let assembler = FileAssembler::new();

        assert_eq!(assembler.cached_files(), 0);
        let first = assembler.bytes(&store, &dir, "HELLO").unwrap();
        let second = assembler.bytes(&store, &dir, "HELLO").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(assembler.cached_files(), 1);
    }

    #[test]
    fn test_missing_file() {
        let image = two_file_image();
        let store = image.store();
        let dir = read_catalog(&store, addr(17, 15)).unwrap();
        let assembler = FileAssembler::new();
        assert!(matches!(
            assembler.bytes(&store, &dir, "NOPE"),
            Err(Dos33Error::FileNotFound(name)) if name == "NOPE"
        ));
    }

    #[test]
    fn test_bad_file_does_not_poison_others() {
        let image = two_file_image();
        let store = image.store();
        let dir = read_catalog(&store, addr(17, 15)).unwrap();
        let assembler = FileAssembler::new();

        assert!(matches!(
            assembler.bytes(&store, &dir, "BROKEN"),
            Err(Dos33Error::InvalidAddress {
                track: 19,
                sector: 20
            })
        ));
        assert_eq!(assembler.bytes(&store, &dir, "HELLO").unwrap().len(), 512);
        assert_eq!(assembler.cached_files(), 1);
    }

    #[test]
    fn test_concurrent_first_access_shares_one_result() {
        let image = two_file_image();
        let store = image.store();
        let dir = read_catalog(&store, addr(17, 15)).unwrap();
        let assembler = FileAssembler::new();

        let results: Vec<Arc<[u8]>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| assembler.bytes(&store, &dir, "HELLO").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for data in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], data));
        }
        assert_eq!(assembler.cached_files(), 1);
    }
}
