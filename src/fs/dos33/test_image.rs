//! Synthetic DOS 3.3 images for unit tests.

use super::sector::{SectorAddress, SectorStore, IMAGE_SIZE, SECTOR_SIZE};

/// A catalog entry to be encoded into a catalog sector.
pub struct RawEntry {
    pub name: String,
    pub location: SectorAddress,
    pub type_byte: u8,
    pub sector_count: u16,
}

impl RawEntry {
    pub fn new(name: &str, location: SectorAddress, type_byte: u8, sector_count: u16) -> Self {
        Self {
            name: name.to_string(),
            location,
            type_byte,
            sector_count,
        }
    }

    /// Encode as a 35-byte entry: high-bit ASCII name padded with 0xA0.
    pub fn encode(&self) -> [u8; 35] {
        let mut raw = [0u8; 35];
        raw[0] = self.location.track;
        raw[1] = self.location.sector;
        raw[2] = self.type_byte;
        raw[3..33].fill(0xA0);
        for (i, b) in self.name.bytes().take(30).enumerate() {
            raw[3 + i] = b | 0x80;
        }
        raw[33..35].copy_from_slice(&self.sector_count.to_le_bytes());
        raw
    }
}

pub struct ImageBuilder {
    data: Vec<u8>,
}

impl ImageBuilder {
    /// Blank image with a VTOC pointing at T17,S15.
    pub fn new() -> Self {
        let mut builder = Self {
            data: vec![0u8; IMAGE_SIZE],
        };
        builder.vtoc(SectorAddress::new(17, 15));
        builder
    }

    fn sector_mut(&mut self, addr: SectorAddress) -> &mut [u8] {
        let offset = addr.offset().unwrap();
        &mut self.data[offset..offset + SECTOR_SIZE]
    }

    pub fn vtoc(&mut self, catalog: SectorAddress) -> &mut Self {
        let vtoc = self.sector_mut(SectorAddress::new(17, 0));
        vtoc[0x01] = catalog.track;
        vtoc[0x02] = catalog.sector;
        vtoc[0x03] = 3;
        vtoc[0x06] = 254;
        vtoc[0x27] = 122;
        vtoc[0x34] = 35;
        vtoc[0x35] = 16;
        vtoc[0x36] = 0x00;
        vtoc[0x37] = 0x01;
        self
    }

    pub fn mark_free(&mut self, addr: SectorAddress) -> &mut Self {
        let vtoc = self.sector_mut(SectorAddress::new(17, 0));
        let at = 0x38 + addr.track as usize * 4 + if addr.sector >= 8 { 0 } else { 1 };
        vtoc[at] |= 1 << (addr.sector % 8);
        self
    }

    pub fn catalog_sector(
        &mut self,
        addr: SectorAddress,
        next: SectorAddress,
        entries: &[RawEntry],
    ) -> &mut Self {
        assert!(entries.len() <= 7);
        let sector = self.sector_mut(addr);
        sector[1] = next.track;
        sector[2] = next.sector;
        for (i, entry) in entries.iter().enumerate() {
            let eo = 0x0B + i * 0x23;
            sector[eo..eo + 0x23].copy_from_slice(&entry.encode());
        }
        self
    }

    /// Write a T/S list sector. A zero-track terminator follows the pairs
    /// when there is room for one.
    pub fn ts_list(
        &mut self,
        addr: SectorAddress,
        next: SectorAddress,
        sector_offset: u16,
        pairs: &[SectorAddress],
    ) -> &mut Self {
        assert!(pairs.len() <= 122);
        let sector = self.sector_mut(addr);
        sector[1] = next.track;
        sector[2] = next.sector;
        sector[5..7].copy_from_slice(&sector_offset.to_le_bytes());
        for (i, pair) in pairs.iter().enumerate() {
            sector[0x0C + i * 2] = pair.track;
            sector[0x0C + i * 2 + 1] = pair.sector;
        }
        self
    }

    pub fn fill(&mut self, addr: SectorAddress, byte: u8) -> &mut Self {
        self.sector_mut(addr).fill(byte);
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn store(&self) -> SectorStore {
        SectorStore::new(self.bytes()).unwrap()
    }
}
