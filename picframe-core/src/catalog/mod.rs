//! picframe Catalog - lazily paged image listings
//!
//! This module lists the images in a directory one bounded page at a time.
//!
//! # Overview
//!
//! The catalog:
//! - Filters directory entries through a case-insensitive extension allow-list
//! - Returns pages sorted by full path (byte-wise)
//! - Keeps a resumable cursor between pages instead of the whole listing
//! - Reports `has_more` by peeking one entry past the page
//!
//! # Paging
//!
//! ```text
//! list(dir, 0, 3)      ──► [a.png, b.png, c.png]  page_start=0 has_more=true
//!        │ cursor (after c.png, peeked d.png)
//!        ▼
//! next_page(3)         ──► [d.png, e.png]         page_start=3 has_more=false
//!        │ cursor released
//!        ▼
//! next_page(3)         ──► Err(NoCursor)
//! ```

mod cursor;
mod error;
mod filter;
pub mod folders;

pub use cursor::DirectoryCursor;
#[cfg(test)]
pub(crate) use cursor::RESERVATION_LIMIT;
pub use error::CatalogError;
pub use filter::{ExtensionFilter, DEFAULT_EXTENSIONS};
pub use folders::discover_folders;

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One matching file, as the full path `base_path + "/" + name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogEntry(String);

impl CatalogEntry {
    pub(crate) fn join(base: &Path, name: &str) -> Self {
        let base = base.to_string_lossy();
        let trimmed = base.trim_end_matches('/');
        if trimmed.is_empty() && base.starts_with('/') {
            return Self(format!("/{name}"));
        }
        Self(format!("{trimmed}/{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// The final path component, used for the filename bar
    pub fn file_name(&self) -> &str {
        self.0.rsplit_once('/').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for CatalogEntry {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// One bounded, sorted batch of entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    /// Entries in ascending order, unique
    pub entries: Vec<CatalogEntry>,

    /// Position of the first entry within the full listing
    pub page_start: usize,

    /// Whether matching entries exist beyond this page
    pub has_more: bool,

    /// Number of entries actually filled
    pub last_page_size: usize,
}

impl CatalogPage {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CatalogEntry> {
        self.entries.get(idx)
    }
}

/// Paged listing of one directory at a time
///
/// Entries in the current page belong to the catalog until the next
/// `list`, `next_page` or `free` call replaces them.
#[derive(Debug, Default)]
pub struct Catalog {
    filter: ExtensionFilter,
    base_path: Option<PathBuf>,
    page: CatalogPage,
    cursor: Option<DirectoryCursor>,
}

impl Catalog {
    /// Create an empty catalog using `filter` for every listing
    pub fn new(filter: ExtensionFilter) -> Self {
        Self {
            filter,
            base_path: None,
            page: CatalogPage::default(),
            cursor: None,
        }
    }

    /// Start a fresh scan of `base_path` and return the page beginning at
    /// the `start_idx`-th matching entry.
    ///
    /// An empty directory yields an empty page, not an error.
    pub fn list(
        &mut self,
        base_path: impl AsRef<Path>,
        start_idx: usize,
        max_entries: usize,
    ) -> Result<&CatalogPage, CatalogError> {
        let base_path = base_path.as_ref();
        self.free();

        let mut cursor = DirectoryCursor::open(base_path)?;
        if start_idx > 0 {
            cursor.skip(&self.filter, start_idx)?;
        }
        let batch = cursor.advance(&self.filter, max_entries)?;

        debug!(
            "Listed {} entries from {} (start {}, has_more {})",
            batch.entries.len(),
            base_path.display(),
            start_idx,
            batch.has_more
        );

        self.base_path = Some(base_path.to_path_buf());
        Ok(self.install_page(start_idx, batch.entries, batch.has_more, cursor))
    }

    /// Continue the scan started by the last `list` call.
    ///
    /// Fails with [`CatalogError::NoCursor`] once the listing is exhausted.
    /// On a read error the current page and cursor are kept.
    pub fn next_page(&mut self, max_entries: usize) -> Result<&CatalogPage, CatalogError> {
        let mut cursor = self.cursor.take().ok_or(CatalogError::NoCursor)?;

        let batch = match cursor.advance(&self.filter, max_entries) {
            Ok(batch) => batch,
            Err(e) => {
                self.cursor = Some(cursor);
                return Err(e);
            }
        };

        let page_start = self.page.page_start + self.page.last_page_size;
        debug!(
            "Next page: {} entries at {} (has_more {})",
            batch.entries.len(),
            page_start,
            batch.has_more
        );

        Ok(self.install_page(page_start, batch.entries, batch.has_more, cursor))
    }

    /// Release all entries and the cursor. Calling it twice is a no-op.
    pub fn free(&mut self) {
        self.page = CatalogPage::default();
        self.cursor = None;
        self.base_path = None;
    }

    fn install_page(
        &mut self,
        page_start: usize,
        entries: Vec<CatalogEntry>,
        has_more: bool,
        cursor: DirectoryCursor,
    ) -> &CatalogPage {
        let last_page_size = entries.len();
        self.page = CatalogPage {
            entries,
            page_start,
            has_more,
            last_page_size,
        };
        // An exhausted cursor is released right away
        self.cursor = has_more.then_some(cursor);
        &self.page
    }

    pub fn page(&self) -> &CatalogPage {
        &self.page
    }

    pub fn entry(&self, idx: usize) -> Option<&CatalogEntry> {
        self.page.get(idx)
    }

    /// Directory of the current listing, if any
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn cursor(&self) -> Option<&DirectoryCursor> {
        self.cursor.as_ref()
    }

    pub fn filter(&self) -> &ExtensionFilter {
        &self.filter
    }

    pub fn is_empty(&self) -> bool {
        self.page.is_empty()
    }
}
