//! Read-only memory mapping of an archive on disk.

use std::fs;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::reader::Archive;
use crate::ModuleReader;

/// An archive file mapped into memory.
///
/// [`Archive`] borrows the mapped bytes, so the mapping stays alive for as
/// long as any archive or member decoded from it.
#[derive(Debug)]
pub struct ArchiveFile {
    path: PathBuf,
    data: Mmap,
}

impl ArchiveFile {
    /// Opens and maps the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<ArchiveFile> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path).map_err(|source| Error::FileOpen {
            path: path.clone(),
            source,
        })?;
        // The mapping is read-only. Modifying the file while it is mapped is
        // the caller's problem, as with any mapped input.
        let data = unsafe { Mmap::map(&file) }.map_err(|source| Error::MemoryMap {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), len = data.len(), "mapped archive");
        Ok(ArchiveFile { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Name used to identify members as `archive(member)`.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    /// Opens the archive and reads every member header.
    pub fn load<M: 'static>(&self, reader: &'static ModuleReader<M>) -> Result<Archive<'_, M>> {
        Archive::load(self.data(), self.name(), reader)
    }

    /// Opens the archive and reads only up to its first ordinary member.
    pub fn load_symbols<M: 'static>(
        &self,
        reader: &'static ModuleReader<M>,
    ) -> Result<Archive<'_, M>> {
        Archive::load_symbols(self.data(), self.name(), reader)
    }
}
