use thiserror::Error;

#[derive(Error, Debug)]
pub enum Dos33Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid disk image size: {actual} bytes (expected {expected})")]
    InvalidImageSize { actual: usize, expected: usize },

    #[error("Invalid sector address T{track},S{sector}")]
    InvalidAddress { track: u8, sector: u8 },

    #[error("Disk image truncated at T{track},S{sector}")]
    TruncatedImage { track: u8, sector: u8 },

    #[error("Catalog chain loops back to T{track},S{sector}")]
    CorruptCatalog { track: u8, sector: u8 },

    #[error("Track/sector list chain loops back to T{track},S{sector}")]
    CorruptChain { track: u8, sector: u8 },

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl Dos33Error {
    /// Errno the host filesystem layer should report for this error.
    pub fn errno(&self) -> i32 {
        match self {
            Dos33Error::FileNotFound(_) => libc::ENOENT,
            _ => libc::EIO,
        }
    }
}
