//! Apple DOS 3.3 disk image decoder.

pub mod assembler;
pub mod catalog;
pub mod sector;
pub mod tslist;

#[cfg(test)]
pub(crate) mod test_image;

use std::path::Path;
use std::sync::Arc;

use assembler::FileAssembler;
use catalog::{Directory, VolumeTableOfContents};
use sector::{SectorStore, SECTOR_SIZE, TOTAL_SECTORS};
use tslist::TrackSectorList;

use super::entry::{FileAttributes, FileEntry};
use super::filesystem::Filesystem;
use crate::error::Dos33Error;

/// Read-only view of a DOS 3.3 volume.
///
/// The catalog is decoded once when the image is opened; file contents are
/// assembled lazily and cached by name.
pub struct Dos33Filesystem {
    store: SectorStore,
    vtoc: VolumeTableOfContents,
    directory: Directory,
    assembler: FileAssembler,
}

impl Dos33Filesystem {
    /// Open a `.dsk` / `.do` image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Dos33Error> {
        let path = path.as_ref();
        log::info!("opening DOS 3.3 image {}", path.display());
        Self::from_store(SectorStore::open(path)?)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Dos33Error> {
        Self::from_store(SectorStore::new(data)?)
    }

    pub fn from_store(store: SectorStore) -> Result<Self, Dos33Error> {
        let vtoc = VolumeTableOfContents::read(&store)?;
        let directory = catalog::read_catalog(&store, vtoc.catalog)?;
        log::info!(
            "catalog at {} lists {} files",
            vtoc.catalog,
            directory.len()
        );
        Ok(Self {
            store,
            vtoc,
            directory,
            assembler: FileAssembler::new(),
        })
    }

    pub fn vtoc(&self) -> &VolumeTableOfContents {
        &self.vtoc
    }

    /// Catalog entries in catalog order.
    pub fn list_entries(&self) -> &[FileEntry] {
        self.directory.entries()
    }

    pub fn entry(&self, name: &str) -> Option<&FileEntry> {
        self.directory.get(name)
    }

    pub fn attributes(&self, name: &str) -> Result<FileAttributes, Dos33Error> {
        self.entry(name)
            .map(FileEntry::attributes)
            .ok_or_else(|| Dos33Error::FileNotFound(name.to_string()))
    }

    /// Complete contents of a file, assembled on first use.
    pub fn file_bytes(&self, name: &str) -> Result<Arc<[u8]>, Dos33Error> {
        self.assembler.bytes(&self.store, &self.directory, name)
    }

    /// Read up to `length` bytes at `offset`. Reads at or past the end of the
    /// data return an empty buffer; reads that overrun are shortened.
    pub fn read(&self, name: &str, offset: u64, length: usize) -> Result<Vec<u8>, Dos33Error> {
        let data = self.file_bytes(name)?;
        Ok(clamp(&data, offset, length).to_vec())
    }

    /// The T/S list sectors of a file, for diagnostics.
    pub fn chain(&self, name: &str) -> Result<Vec<TrackSectorList>, Dos33Error> {
        let entry = self
            .entry(name)
            .ok_or_else(|| Dos33Error::FileNotFound(name.to_string()))?;
        tslist::read_chain(&self.store, entry.location)
    }
}

fn clamp(data: &[u8], offset: u64, length: usize) -> &[u8] {
    let len = data.len() as u64;
    if offset >= len {
        return &[];
    }
    let start = offset as usize;
    let end = start.saturating_add(length).min(data.len());
    &data[start..end]
}

impl Filesystem for Dos33Filesystem {
    fn list_entries(&self) -> Vec<FileEntry> {
        Dos33Filesystem::list_entries(self).to_vec()
    }

    fn attributes(&self, name: &str) -> Result<FileAttributes, Dos33Error> {
        Dos33Filesystem::attributes(self, name)
    }

    fn read(&self, name: &str, offset: u64, length: usize) -> Result<Vec<u8>, Dos33Error> {
        Dos33Filesystem::read(self, name, offset, length)
    }

    fn read_file(&self, name: &str) -> Result<Arc<[u8]>, Dos33Error> {
        self.file_bytes(name)
    }

    fn volume_label(&self) -> String {
        format!("DISK VOLUME {:03}", self.vtoc.volume_number)
    }

    fn fs_type(&self) -> &str {
        "DOS 3.3"
    }

    fn block_size(&self) -> u32 {
        SECTOR_SIZE as u32
    }

    fn total_size(&self) -> u64 {
        TOTAL_SECTORS as u64 * SECTOR_SIZE as u64
    }

    fn used_size(&self) -> u64 {
        TOTAL_SECTORS.saturating_sub(self.vtoc.free_sectors) as u64 * SECTOR_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::dos33::sector::SectorAddress;
    use crate::fs::dos33::test_image::{ImageBuilder, RawEntry};
    use crate::fs::entry::FileType;

    fn addr(track: u8, sector: u8) -> SectorAddress {
        SectorAddress::new(track, sector)
    }

    // One Applesoft file "HELLO" whose T/S list at T18,S15 points at two data
    // sectors holding 0xAA and 0x55, plus a binary file whose T/S list loops.
    fn sample_image() -> ImageBuilder {
        let mut image = ImageBuilder::new();
        image.catalog_sector(
            addr(17, 15),
            addr(0, 0),
            &[
                RawEntry::new("HELLO", addr(18, 15), 0x02, 3),
                RawEntry::new("LOOPY", addr(20, 15), 0x84, 2),
            ],
        );
        image.ts_list(addr(18, 15), addr(0, 0), 0, &[addr(18, 14), addr(18, 13)]);
        image.fill(addr(18, 14), 0xAA);
        image.fill(addr(18, 13), 0x55);
        image.ts_list(addr(20, 15), addr(20, 15), 0, &[addr(20, 14)]);
        image
    }

    #[test]
    fn test_end_to_end_read() {
        let fs = Dos33Filesystem::from_bytes(sample_image().bytes()).unwrap();
        let data = fs.read("HELLO", 0, 512).unwrap();
        let mut expected = vec![0xAA; 256];
        expected.extend(vec![0x55; 256]);
        assert_eq!(data, expected);
    }

    #[test]
    fn test_read_clamps_range() {
        let fs = Dos33Filesystem::from_bytes(sample_image().bytes()).unwrap();
        assert!(fs.read("HELLO", 512, 10).unwrap().is_empty());
        assert!(fs.read("HELLO", 10_000, 10).unwrap().is_empty());
        assert!(fs.read("HELLO", u64::MAX, usize::MAX).unwrap().is_empty());

        let tail = fs.read("HELLO", 500, 100).unwrap();
        assert_eq!(tail.len(), 12);
        assert!(tail.iter().all(|&b| b == 0x55));

        let middle = fs.read("HELLO", 250, 10).unwrap();
        assert_eq!(&middle[..6], &[0xAA; 6]);
        assert_eq!(&middle[6..], &[0x55; 4]);

        assert!(fs.read("HELLO", 0, 0).unwrap().is_empty());
    }

    #[test]
    fn test_attributes_report_nominal_size() {
        let fs = Dos33Filesystem::from_bytes(sample_image().bytes()).unwrap();
        let attrs = fs.attributes("HELLO").unwrap();
        assert_eq!(attrs.file_type, FileType::ApplesoftBasic);
        // Three catalog sectors, including the T/S list, even though only
        // two data sectors are assembled.
        assert_eq!(attrs.size, 768);
        assert!(!attrs.locked);

        let loopy = fs.attributes("LOOPY").unwrap();
        assert_eq!(loopy.file_type, FileType::Binary);
        assert!(loopy.locked);

        assert!(matches!(
            fs.attributes("MISSING"),
            Err(Dos33Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_chain_only_fails_that_file() {
        let fs = Dos33Filesystem::from_bytes(sample_image().bytes()).unwrap();
        assert!(matches!(
            fs.read("LOOPY", 0, 10),
            Err(Dos33Error::CorruptChain {
                track: 20,
                sector: 15
            })
        ));
        assert_eq!(fs.read("HELLO", 0, 1).unwrap(), vec![0xAA]);
        assert_eq!(fs.list_entries().len(), 2);
    }

    #[test]
    fn test_corrupt_catalog_fails_open() {
        let mut image = sample_image();
        image.catalog_sector(addr(17, 15), addr(17, 15), &[]);
        assert!(matches!(
            Dos33Filesystem::from_bytes(image.bytes()),
            Err(Dos33Error::CorruptCatalog { .. })
        ));
    }

    #[test]
    fn test_wrong_size_fails_open() {
        let mut bytes = sample_image().bytes();
        bytes.push(0);
        assert!(matches!(
            Dos33Filesystem::from_bytes(bytes),
            Err(Dos33Error::InvalidImageSize {
                actual: 143_361,
                ..
            })
        ));
    }

    #[test]
    fn test_chain_diagnostics() {
        let fs = Dos33Filesystem::from_bytes(sample_image().bytes()).unwrap();
        let chain = fs.chain("HELLO").unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].address, addr(18, 15));
        assert_eq!(chain[0].data, vec![addr(18, 14), addr(18, 13)]);
    }

    #[test]
    fn test_filesystem_trait_summary() {
        let mut image = sample_image();
        image.mark_free(addr(30, 0)).mark_free(addr(30, 1));
        let fs = Dos33Filesystem::from_bytes(image.bytes()).unwrap();
        let fs: &dyn Filesystem = &fs;
        assert_eq!(fs.fs_type(), "DOS 3.3");
        assert_eq!(fs.volume_label(), "DISK VOLUME 254");
        assert_eq!(fs.block_size(), 256);
        assert_eq!(fs.total_size(), 143_360);
        assert_eq!(fs.used_size(), 558 * 256);
        let names: Vec<String> = fs.list_entries().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["HELLO", "LOOPY"]);
    }
}
