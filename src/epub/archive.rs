//! ZIP archive loading.

use std::collections::HashMap;
use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::Result;

/// Read every file entry of a ZIP archive into memory, keyed by its path
/// inside the archive. Directory entries are skipped.
pub(crate) fn read_entries<R: Read + Seek>(reader: R) -> Result<HashMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = HashMap::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;
        entries.insert(file.name().to_string(), data);
    }

    Ok(entries)
}
