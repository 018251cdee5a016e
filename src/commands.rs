//! Bodies of the `a2fs` subcommands, written against `io::Write` so they can
//! be driven from tests.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::fs::dos33::sector::TOTAL_SECTORS;
use crate::fs::dos33::Dos33Filesystem;
use crate::fs::filesystem::Filesystem;

/// Print the VTOC summary and every catalog entry.
pub fn inspect(fs: &Dos33Filesystem, chains: bool, out: &mut impl Write) -> Result<()> {
    let vtoc = fs.vtoc();
    writeln!(out, "VTOC found. First catalog sector: {}", vtoc.catalog)?;
    writeln!(
        out,
        "Volume {:03}, DOS release {}, {} of {} sectors free",
        vtoc.volume_number, vtoc.dos_release, vtoc.free_sectors, TOTAL_SECTORS
    )?;
    writeln!(
        out,
        "Recorded geometry: {} tracks, {} sectors per track, {} bytes per sector, \
         {} T/S pairs per list",
        vtoc.tracks_per_disk, vtoc.sectors_per_track, vtoc.bytes_per_sector, vtoc.max_ts_pairs
    )?;

    for entry in fs.list_entries() {
        writeln!(
            out,
            "File: {}, Type: {:02X}, Len: {}",
            entry.name,
            entry.file_type.code(),
            entry.sector_count
        )?;
        if !chains {
            continue;
        }
        match fs.chain(&entry.name) {
            Ok(lists) => {
                for list in lists {
                    writeln!(
                        out,
                        "  T/S list {} (sector offset {}): {} data sectors",
                        list.address,
                        list.sector_offset,
                        list.data.len()
                    )?;
                }
            }
            Err(e) => writeln!(out, "  T/S list error: {e}")?,
        }
    }
    Ok(())
}

/// Print file names, or a `CATALOG`-style listing when `long` is set.
pub fn list(fs: &dyn Filesystem, long: bool, out: &mut impl Write) -> Result<()> {
    if long {
        writeln!(out, "{} ({})", fs.volume_label(), fs.fs_type())?;
    }
    for entry in fs.list_entries() {
        if long {
            writeln!(out, "{:<40} {:>10}", entry.catalog_line(), entry.size_string())?;
        } else {
            writeln!(out, "{}", entry.name)?;
        }
    }
    Ok(())
}

/// Write a file (or a slice of it) to `out`.
pub fn cat(
    fs: &dyn Filesystem,
    name: &str,
    offset: u64,
    length: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let data = fs
        .read(name, offset, length.unwrap_or(usize::MAX))
        .with_context(|| format!("reading {name}"))?;
    out.write_all(&data)?;
    Ok(())
}

/// Copy every file into `dest`, creating it if needed. Returns the number of
/// files written.
///
/// Catalog names that map onto an already used host name get a numeric
/// suffix (`A_B`, `A_B.1`, ...).
pub fn extract(fs: &dyn Filesystem, dest: &Path) -> Result<usize> {
    std::fs::create_dir_all(dest)
        .with_context(|| format!("creating {}", dest.display()))?;

    let mut used = HashSet::new();
    let mut written = 0;
    for entry in fs.list_entries() {
        let host_name = unique_host_name(&entry.name, &mut used);
        if host_name != entry.name {
            log::debug!("extracting {} as {host_name}", entry.name);
        }
        let target: PathBuf = dest.join(host_name);
        let mut file = std::fs::File::create(&target)
            .with_context(|| format!("creating {}", target.display()))?;
        match fs.write_file_to(&entry.name, &mut file) {
            Ok(bytes) => {
                log::info!("extracted {} ({bytes} bytes)", entry.name);
                written += 1;
            }
            Err(e) => {
                log::warn!("skipping {}: {e}", entry.name);
                drop(file);
                if let Err(e) = std::fs::remove_file(&target) {
                    log::debug!("could not remove {}: {e}", target.display());
                }
            }
        }
    }
    Ok(written)
}

fn unique_host_name(name: &str, used: &mut HashSet<String>) -> String {
    let base = host_file_name(name);
    let mut candidate = base.clone();
    let mut suffix = 0;
    while !used.insert(candidate.clone()) {
        suffix += 1;
        candidate = format!("{base}.{suffix}");
    }
    candidate
}

/// Map a catalog name onto something the host accepts as a file name.
pub fn host_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\0' || c.is_control() { '_' } else { c })
        .collect();
    if cleaned == "." || cleaned == ".." {
        return cleaned.replace('.', "_");
    }
    cleaned
}
