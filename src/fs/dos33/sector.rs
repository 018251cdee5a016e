use std::fmt;
use std::path::Path;

use crate::error::Dos33Error;

pub const SECTOR_SIZE: usize = 256;
pub const SECTORS_PER_TRACK: u8 = 16;
pub const TRACKS: u8 = 35;
/// Total size of a 35-track, 16-sector DOS-order image (143,360 bytes).
pub const IMAGE_SIZE: usize = TRACKS as usize * SECTORS_PER_TRACK as usize * SECTOR_SIZE;
pub const TOTAL_SECTORS: u32 = TRACKS as u32 * SECTORS_PER_TRACK as u32;

/// A (track, sector) pair as stored on disk.
///
/// Values are taken verbatim from disk bytes and may be out of range; they
/// are only turned into byte offsets through [`SectorAddress::offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectorAddress {
    pub track: u8,
    pub sector: u8,
}

impl SectorAddress {
    pub const fn new(track: u8, sector: u8) -> Self {
        Self { track, sector }
    }

    /// Decode a two-byte (track, sector) pair at `offset` within a sector.
    pub fn from_bytes(buf: &[u8], offset: usize) -> Self {
        Self {
            track: buf[offset],
            sector: buf[offset + 1],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.track < TRACKS && self.sector < SECTORS_PER_TRACK
    }

    /// Byte offset of this sector within the image.
    pub fn offset(&self) -> Result<usize, Dos33Error> {
        if !self.is_valid() {
            return Err(Dos33Error::InvalidAddress {
                track: self.track,
                sector: self.sector,
            });
        }
        Ok((self.track as usize * SECTORS_PER_TRACK as usize + self.sector as usize) * SECTOR_SIZE)
    }
}

impl fmt::Display for SectorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}, S{}", self.track, self.sector)
    }
}

/// Immutable backing store for a DOS 3.3 image.
pub struct SectorStore {
    data: Vec<u8>,
}

impl SectorStore {
    /// Take ownership of raw image bytes. The length must be exactly
    /// [`IMAGE_SIZE`].
    pub fn new(data: Vec<u8>) -> Result<Self, Dos33Error> {
        if data.len() != IMAGE_SIZE {
            return Err(Dos33Error::InvalidImageSize {
                actual: data.len(),
                expected: IMAGE_SIZE,
            });
        }
        log::debug!("loaded {} byte DOS 3.3 image", data.len());
        Ok(Self { data })
    }

    /// Load an image file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Dos33Error> {
        let data = std::fs::read(path.as_ref())?;
        Self::new(data)
    }

    /// Return the 256 bytes of the sector at `address`.
    pub fn read(&self, address: SectorAddress) -> Result<&[u8], Dos33Error> {
        let offset = address.offset()?;
        self.data
            .get(offset..offset + SECTOR_SIZE)
            .ok_or(Dos33Error::TruncatedImage {
                track: address.track,
                sector: address.sector,
            })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
