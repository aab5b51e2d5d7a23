//! Dedup ledger: the set of items already processed, persisted as an
//! append-only file with one canonical item URL per line.
//!
//! `mark` appends and syncs before returning, so a crash loses at most the
//! item in flight. Entries are never removed.

use crate::domain::ItemId;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Ledger I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LedgerError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

pub struct FileLedger {
    path: PathBuf,
    processed: HashSet<ItemId>,
    file: File,
}

impl FileLedger {
    /// Load the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LedgerError::io(&path, e))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| LedgerError::io(&path, e))?;

        let processed = read_entries(&mut file).map_err(|e| LedgerError::io(&path, e))?;
        terminate_last_line(&mut file).map_err(|e| LedgerError::io(&path, e))?;

        info!(
            "Loaded {} processed items from {}",
            processed.len(),
            path.display()
        );
        Ok(Self {
            path,
            processed,
            file,
        })
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.processed.contains(id)
    }

    /// Record `id` as processed. Returns `false` if it already was.
    pub fn mark(&mut self, id: &ItemId) -> LedgerResult<bool> {
        if self.processed.contains(id) {
            return Ok(false);
        }
        writeln!(self.file, "{}", id).map_err(|e| LedgerError::io(&self.path, e))?;
        self.file
            .sync_data()
            .map_err(|e| LedgerError::io(&self.path, e))?;
        self.processed.insert(id.clone());
        debug!("Marked {} as processed", id);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lines are canonicalized when they parse as URLs, so hand-written or
/// older entries still match.
fn read_entries(file: &mut File) -> io::Result<HashSet<ItemId>> {
    file.seek(SeekFrom::Start(0))?;
    let mut processed = HashSet::new();
    for line in BufReader::new(&*file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let id = ItemId::parse(line).unwrap_or_else(|_| ItemId::from_canonical(line));
        processed.insert(id);
    }
    Ok(processed)
}

/// A crash mid-append can leave the last line unterminated; the next entry
/// must not be glued onto it.
fn terminate_last_line(file: &mut File) -> io::Result<()> {
    let len = file.seek(SeekFrom::End(0))?;
    if len == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
        file.sync_data()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(url: &str) -> ItemId {
        ItemId::parse(url).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = FileLedger::load(dir.path().join("nested").join("links.txt")).unwrap();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_mark_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");

        let mut ledger = FileLedger::load(&path).unwrap();
        assert!(ledger.mark(&id("https://shop.example/p/1")).unwrap());
        assert!(!ledger.mark(&id("https://shop.example/p/1")).unwrap());
        drop(ledger);

        let reloaded = FileLedger::load(&path).unwrap();
        assert!(reloaded.contains(&id("https://shop.example/p/1")));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://shop.example/p/1\n"
        );
    }

    #[test]
    fn test_legacy_lines_are_canonicalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "https://shop.example/p/1/\n\n  https://shop.example/p/2#x  \n").unwrap();

        let ledger = FileLedger::load(&path).unwrap();

        assert!(ledger.contains(&id("https://shop.example/p/1")));
        assert!(ledger.contains(&id("https://shop.example/p/2")));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_unterminated_last_line_is_repaired() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "https://shop.example/p/1").unwrap();

        let mut ledger = FileLedger::load(&path).unwrap();
        ledger.mark(&id("https://shop.example/p/2")).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "https://shop.example/p/1\nhttps://shop.example/p/2\n"
        );
    }
}
