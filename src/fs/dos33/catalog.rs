//! Volume table of contents and catalog traversal.
//!
//! The VTOC lives at T17,S0 and points at the first catalog sector. Each
//! catalog sector links to the next through bytes 1–2 and holds seven 35-byte
//! file descriptive entries starting at offset 0x0B.

use std::collections::{HashMap, HashSet};

use byteorder::{ByteOrder, LittleEndian};

use super::sector::{SectorAddress, SectorStore, SECTORS_PER_TRACK, TRACKS};
use crate::error::Dos33Error;
use crate::fs::entry::{FileEntry, FileType};

pub const VTOC_ADDRESS: SectorAddress = SectorAddress::new(17, 0);
/// Catalog start used when the VTOC pointer is out of range.
pub const DEFAULT_CATALOG_ADDRESS: SectorAddress = SectorAddress::new(17, 15);

const ENTRIES_PER_SECTOR: usize = 7;
const ENTRY_OFFSET: usize = 0x0B;
const ENTRY_SIZE: usize = 0x23;
const NAME_LENGTH: usize = 30;
const DELETED_MARKER: u8 = 0xFF;
const BITMAP_OFFSET: usize = 0x38;

// ─────────────────────────────── VTOC ────────────────────────────────────────

/// Decoded volume table of contents.
///
/// Only `catalog` drives decoding; the other fields are reported as-is.
#[derive(Debug, Clone)]
pub struct VolumeTableOfContents {
    pub catalog: SectorAddress,
    pub dos_release: u8,
    pub volume_number: u8,
    pub max_ts_pairs: u8,
    pub tracks_per_disk: u8,
    pub sectors_per_track: u8,
    pub bytes_per_sector: u16,
    /// Free sectors according to the allocation bitmap.
    pub free_sectors: u32,
}

impl VolumeTableOfContents {
    pub fn parse(buf: &[u8]) -> Self {
        let recorded = SectorAddress::from_bytes(buf, 1);
        let catalog = if recorded.is_valid() {
            recorded
        } else {
            log::warn!(
                "VTOC catalog pointer {recorded} is out of range, using {DEFAULT_CATALOG_ADDRESS}"
            );
            DEFAULT_CATALOG_ADDRESS
        };

        Self {
            catalog,
            dos_release: buf[0x03],
            volume_number: buf[0x06],
            max_ts_pairs: buf[0x27],
            tracks_per_disk: buf[0x34],
            sectors_per_track: buf[0x35],
            bytes_per_sector: LittleEndian::read_u16(&buf[0x36..0x38]),
            free_sectors: count_free_sectors(buf),
        }
    }

    pub fn read(store: &SectorStore) -> Result<Self, Dos33Error> {
        let vtoc = Self::parse(store.read(VTOC_ADDRESS)?);
        log::debug!(
            "VTOC: catalog {}, DOS release {}, volume {}, {} free sectors",
            vtoc.catalog,
            vtoc.dos_release,
            vtoc.volume_number,
            vtoc.free_sectors
        );
        Ok(vtoc)
    }
}

/// Count free sectors in the VTOC bitmap.
///
/// Four bytes per track starting at 0x38; the first two bytes cover sectors
/// 15..8 and 7..0 (MSB first), a set bit meaning free.
fn count_free_sectors(buf: &[u8]) -> u32 {
    (0..TRACKS as usize)
        .map(|track| {
            let at = BITMAP_OFFSET + track * 4;
            let bits = ((buf[at] as u16) << 8) | buf[at + 1] as u16;
            (bits & (u16::MAX >> (16 - SECTORS_PER_TRACK as u32))).count_ones()
        })
        .sum()
}

// ─────────────────────────────── directory ───────────────────────────────────

/// Catalog contents keyed by file name, in catalog order.
///
/// DOS 3.3 does not enforce unique names. When a name repeats, the later
/// entry's metadata replaces the earlier one but keeps its listing position.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entries: Vec<FileEntry>,
    index: HashMap<String, usize>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the one it replaced.
    pub fn insert(&mut self, entry: FileEntry) -> Option<FileEntry> {
        match self.index.get(&entry.name) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot], entry)),
            None => {
                self.index.insert(entry.name.clone(), self.entries.len());
                self.entries.push(entry);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─────────────────────────────── entries ─────────────────────────────────────

/// Decode a catalog file name: clear the high bit of each byte, drop NULs
/// and trim surrounding spaces.
pub fn decode_name(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| b & 0x7F)
        .filter(|&b| b != 0)
        .map(|b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Decode one 35-byte file descriptive entry. Returns `None` for unused and
/// deleted slots and for entries whose name decodes to nothing.
pub fn decode_entry(raw: &[u8]) -> Option<FileEntry> {
    let first_track = raw[0];
    if first_track == 0 || first_track == DELETED_MARKER {
        return None;
    }

    let name = decode_name(&raw[3..3 + NAME_LENGTH]);
    if name.is_empty() {
        log::debug!("skipping catalog entry with blank name");
        return None;
    }

    Some(FileEntry {
        name,
        file_type: FileType::from_code(raw[2]),
        locked: raw[2] & 0x80 != 0,
        sector_count: LittleEndian::read_u16(&raw[33..35]),
        location: SectorAddress::new(first_track, raw[1]),
    })
}

// ─────────────────────────────── traversal ───────────────────────────────────

/// Walk the catalog chain from `start` and build the directory.
///
/// Traversal ends at a next-link whose track is 0. A link back to an already
/// visited sector is reported as [`Dos33Error::CorruptCatalog`].
pub fn read_catalog(store: &SectorStore, start: SectorAddress) -> Result<Directory, Dos33Error> {
    let mut directory = Directory::new();
    let mut visited = HashSet::new();
    let mut current = start;

    while current.track != 0 {
        if !visited.insert(current) {
            log::warn!("catalog cycle detected at {current}");
            return Err(Dos33Error::CorruptCatalog {
                track: current.track,
                sector: current.sector,
            });
        }

        let sector = store.read(current)?;
        log::debug!("reading catalog sector {current}");

        for i in 0..ENTRIES_PER_SECTOR {
            let eo = ENTRY_OFFSET + i * ENTRY_SIZE;
            let Some(entry) = decode_entry(&sector[eo..eo + ENTRY_SIZE]) else {
                continue;
            };
            if let Some(previous) = directory.insert(entry) {
                log::warn!(
                    "duplicate catalog name {:?}: entry at {} replaced by later entry",
                    previous.name,
                    previous.location
                );
            }
        }

        current = SectorAddress::from_bytes(sector, 1);
    }

    Ok(directory)
}
