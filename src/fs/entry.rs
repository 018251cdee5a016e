use std::fmt;

use super::dos33::sector::{SectorAddress, SECTOR_SIZE};

/// DOS 3.3 file type, decoded from the low 7 bits of the catalog type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Text,
    IntegerBasic,
    ApplesoftBasic,
    Binary,
    SType,
    Relocatable,
    AType,
    BType,
    Unknown(u8),
}

impl FileType {
    pub fn from_code(code: u8) -> Self {
        match code & 0x7F {
            0x00 => FileType::Text,
            0x01 => FileType::IntegerBasic,
            0x02 => FileType::ApplesoftBasic,
            0x04 => FileType::Binary,
            0x08 => FileType::SType,
            0x10 => FileType::Relocatable,
            0x20 => FileType::AType,
            0x40 => FileType::BType,
            other => FileType::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            FileType::Text => 0x00,
            FileType::IntegerBasic => 0x01,
            FileType::ApplesoftBasic => 0x02,
            FileType::Binary => 0x04,
            FileType::SType => 0x08,
            FileType::Relocatable => 0x10,
            FileType::AType => 0x20,
            FileType::BType => 0x40,
            FileType::Unknown(code) => *code,
        }
    }

    /// The single letter DOS prints in a `CATALOG` listing.
    pub fn letter(&self) -> char {
        match self {
            FileType::Text => 'T',
            FileType::IntegerBasic => 'I',
            FileType::ApplesoftBasic => 'A',
            FileType::Binary => 'B',
            FileType::SType => 'S',
            FileType::Relocatable => 'R',
            FileType::AType => 'a',
            FileType::BType => 'b',
            FileType::Unknown(_) => '?',
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A file recorded in the volume catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub name: String,
    pub file_type: FileType,
    /// Set when the high bit of the catalog type byte is on.
    pub locked: bool,
    /// Length in sectors as recorded in the catalog, T/S list sectors included.
    pub sector_count: u16,
    /// First track/sector list sector.
    pub location: SectorAddress,
}

impl FileEntry {
    /// Nominal size in bytes (`sector_count × 256`). File-type headers that
    /// carry a logical length are not consulted.
    pub fn size(&self) -> u64 {
        self.sector_count as u64 * SECTOR_SIZE as u64
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes {
            file_type: self.file_type,
            size: self.size(),
            locked: self.locked,
        }
    }

    pub fn size_string(&self) -> String {
        super::format_size(self.size())
    }

    /// One line in the layout of the DOS `CATALOG` command, e.g.
    /// `*A 002 HELLO`.
    pub fn catalog_line(&self) -> String {
        format!(
            "{}{} {:03} {}",
            if self.locked { '*' } else { ' ' },
            self.file_type.letter(),
            self.sector_count % 1000,
            self.name
        )
    }
}

/// What the host filesystem layer needs to stat a file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileAttributes {
    pub file_type: FileType,
    pub size: u64,
    pub locked: bool,
}
