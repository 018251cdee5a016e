//! Track/sector list traversal.
//!
//! A file's catalog entry points at its first T/S list sector. Each T/S list
//! sector links to the next through bytes 1–2 and holds up to 122 data sector
//! pairs from offset 0x0C.

use std::collections::HashSet;

use byteorder::{ByteOrder, LittleEndian};

use super::sector::{SectorAddress, SectorStore};
use crate::error::Dos33Error;

const PAIRS_OFFSET: usize = 0x0C;
const MAX_PAIRS: usize = 122;

/// One decoded T/S list sector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSectorList {
    /// Where this list sector itself lives.
    pub address: SectorAddress,
    pub next: SectorAddress,
    /// File sector number of the first pair in this list.
    pub sector_offset: u16,
    /// Data sectors up to (not including) the first zero-track pair.
    pub data: Vec<SectorAddress>,
}

impl TrackSectorList {
    pub fn parse(address: SectorAddress, buf: &[u8]) -> Self {
        let data = (0..MAX_PAIRS)
            .map(|i| SectorAddress::from_bytes(buf, PAIRS_OFFSET + i * 2))
            .take_while(|pair| pair.track != 0)
            .collect();

        Self {
            address,
            next: SectorAddress::from_bytes(buf, 1),
            sector_offset: LittleEndian::read_u16(&buf[5..7]),
            data,
        }
    }
}

/// Read every T/S list sector of a file, in chain order.
///
/// A first address with track 0 yields an empty chain. A link back to an
/// already visited list sector fails with [`Dos33Error::CorruptChain`].
pub fn read_chain(
    store: &SectorStore,
    first: SectorAddress,
) -> Result<Vec<TrackSectorList>, Dos33Error> {
    let mut lists = Vec::new();
    let mut visited = HashSet::new();
    let mut current = first;

    while current.track != 0 {
        if !visited.insert(current) {
            log::warn!("T/S list cycle detected at {current}");
            return Err(Dos33Error::CorruptChain {
                track: current.track,
                sector: current.sector,
            });
        }

        let list = TrackSectorList::parse(current, store.read(current)?);
        log::debug!(
            "T/S list {current}: {} data sectors, next {}",
            list.data.len(),
            list.next
        );
        current = list.next;
        lists.push(list);
    }

    Ok(lists)
}

/// Ordered data sector addresses of a file.
pub fn data_sectors(
    store: &SectorStore,
    first: SectorAddress,
) -> Result<Vec<SectorAddress>, Dos33Error> {
    Ok(read_chain(store, first)?
        .into_iter()
        .flat_map(|list| list.data)
        .collect())
}
