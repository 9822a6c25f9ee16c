use std::{
    fs,
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
};

use zip::{result::ZipError, ZipArchive};

use crate::error::{BrowserError, BrowserResult};

// Cap on the buffer pre-sized from an entry's declared size.
const MAX_PREALLOCATED_BYTES: u64 = 1024 * 1024;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// One record of a container as listed by the archive primitive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// An open archive handle. Callers open one per logical operation and drop
/// it when done; nothing holds a handle across operations.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<fs::File>>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> BrowserResult<Self> {
        let file = fs::File::open(path).map_err(|error| BrowserError::unreadable(path, error))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .map_err(|error| BrowserError::unreadable(path, error))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Entries in central-directory order.
    pub fn entries(&mut self) -> BrowserResult<Vec<ArchiveEntry>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(index)
                .map_err(|error| BrowserError::unreadable(&self.path, error))?;
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                size: file.size(),
                is_dir: file.is_dir(),
            });
        }
        Ok(entries)
    }

    pub fn contains(&self, entry_path: &str) -> bool {
        self.archive.index_for_name(entry_path).is_some()
    }

    /// Uncompressed size of an entry without reading its body.
    pub fn entry_size(&mut self, entry_path: &str) -> BrowserResult<u64> {
        match self.archive.by_name(entry_path) {
            Ok(file) => Ok(file.size()),
            Err(error) => Err(map_entry_error(entry_path, error)),
        }
    }

    pub fn read_entry(&mut self, entry_path: &str) -> BrowserResult<Vec<u8>> {
        let mut file = match self.archive.by_name(entry_path) {
            Ok(file) => file,
            Err(error) => return Err(map_entry_error(entry_path, error)),
        };
        let capacity = file.size().min(MAX_PREALLOCATED_BYTES) as usize;
        let mut buffer = Vec::with_capacity(capacity);
        file.read_to_end(&mut buffer)
            .map_err(|error| BrowserError::read(entry_path, error))?;
        Ok(buffer)
    }

    /// Streams an entry into `destination`, returning the bytes written.
    /// Archive-side failures are `ReadError`; failures creating or writing
    /// `destination` are `WorkspaceAllocationFailed`.
    pub fn extract_entry_to(&mut self, entry_path: &str, destination: &Path) -> BrowserResult<u64> {
        let mut file = match self.archive.by_name(entry_path) {
            Ok(file) => file,
            Err(error) => return Err(map_entry_error(entry_path, error)),
        };
        let mut target =
            fs::File::create(destination).map_err(BrowserError::WorkspaceAllocationFailed)?;
        let mut chunk = vec![0u8; COPY_BUFFER_BYTES];
        let mut written = 0u64;
        loop {
            let read = file
                .read(&mut chunk)
                .map_err(|error| BrowserError::read(entry_path, error))?;
            if read == 0 {
                break;
            }
            target
                .write_all(&chunk[..read])
                .map_err(BrowserError::WorkspaceAllocationFailed)?;
            written += read as u64;
        }
        target.flush().map_err(BrowserError::WorkspaceAllocationFailed)?;
        Ok(written)
    }
}

fn map_entry_error(entry_path: &str, error: ZipError) -> BrowserError {
    match error {
        ZipError::FileNotFound => BrowserError::EntryNotFound(entry_path.to_string()),
        other => BrowserError::read(entry_path, other),
    }
}

/// Opens `path` and lists its entries, closing the archive afterwards.
pub fn list_entries(path: &Path) -> BrowserResult<Vec<ArchiveEntry>> {
    ArchiveReader::open(path)?.entries()
}
