//! Resumable directory enumeration
//!
//! A cursor remembers the last name it handed out plus one name of lookahead.
//! Every page comes from a single pass over the directory that keeps only the
//! `max_entries + 1` smallest matching names past the resume marker, so memory
//! stays bounded by the page size and the result does not depend on the order
//! in which the platform returns directory entries.

use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{CatalogEntry, CatalogError, ExtensionFilter};

/// Names consumed per pass while skipping to a start offset
const SKIP_WINDOW: usize = 256;

#[cfg(test)]
thread_local! {
    /// Largest heap reservation that may succeed on this thread
    pub(crate) static RESERVATION_LIMIT: std::cell::Cell<usize> =
        const { std::cell::Cell::new(usize::MAX) };
}

/// Resumable position inside one directory scan
///
/// The cursor holds no OS handle between pages; the resume marker is the last
/// name returned, and the lookahead is the next match, peeked but not consumed.
#[derive(Debug, Clone)]
pub struct DirectoryCursor {
    dir: PathBuf,
    resume_after: Option<String>,
    lookahead: Option<CatalogEntry>,
}

/// One page worth of entries produced by [`DirectoryCursor::advance`]
#[derive(Debug)]
pub(crate) struct Batch {
    pub entries: Vec<CatalogEntry>,
    pub has_more: bool,
}

/// Raw result of a single directory pass
struct Window {
    names: Vec<String>,
    lookahead: Option<String>,
    /// The page was cut short because the full window could not be reserved
    truncated: bool,
}

impl DirectoryCursor {
    /// Open a cursor at the start of `dir`
    pub(crate) fn open(dir: &Path) -> Result<Self, CatalogError> {
        std::fs::read_dir(dir).map_err(|source| CatalogError::Open {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
            resume_after: None,
            lookahead: None,
        })
    }

    /// Directory this cursor enumerates
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// The next matching entry, without advancing the cursor
    pub fn peek_next(&self) -> Option<&CatalogEntry> {
        self.lookahead.as_ref()
    }

    /// Consume up to `count` matches without building a page.
    ///
    /// Returns how many entries were actually skipped; fewer than `count`
    /// means the directory ran out first.
    pub(crate) fn skip(
        &mut self,
        filter: &ExtensionFilter,
        count: usize,
    ) -> Result<usize, CatalogError> {
        let mut skipped = 0;
        while skipped < count {
            let want = (count - skipped).min(SKIP_WINDOW);
            let window = scan(&self.dir, filter, self.resume_after.as_deref(), want)?;
            let Some(last) = window.names.last().cloned() else {
                break;
            };
            skipped += window.names.len();
            self.resume_after = Some(last);
            if window.lookahead.is_none() && !window.truncated {
                break;
            }
        }

        self.lookahead = None;
        debug!(
            "Skipped {} of {} entries in {}",
            skipped,
            count,
            self.dir.display()
        );
        Ok(skipped)
    }

    /// Collect the next `max_entries` matches in ascending order.
    ///
    /// On error the cursor is left exactly where it was.
    pub(crate) fn advance(
        &mut self,
        filter: &ExtensionFilter,
        max_entries: usize,
    ) -> Result<Batch, CatalogError> {
        let window = scan(
            &self.dir,
            filter,
            self.resume_after.as_deref(),
            max_entries,
        )?;

        if let Some(last) = window.names.last() {
            self.resume_after = Some(last.clone());
        }
        self.lookahead = window
            .lookahead
            .as_deref()
            .map(|name| CatalogEntry::join(&self.dir, name));

        let has_more =
            self.lookahead.is_some() || (window.truncated && !window.names.is_empty());
        let entries = window
            .names
            .iter()
            .map(|name| CatalogEntry::join(&self.dir, name))
            .collect();

        Ok(Batch { entries, has_more })
    }
}

/// Single pass over `dir`: the `want` smallest matching names strictly after
/// `after`, plus one lookahead name when more exist.
fn scan(
    dir: &Path,
    filter: &ExtensionFilter,
    after: Option<&str>,
    want: usize,
) -> Result<Window, CatalogError> {
    let read_dir = std::fs::read_dir(dir).map_err(|source| CatalogError::Open {
        path: dir.to_path_buf(),
        source,
    })?;

    let wanted = want.saturating_add(1);
    let (mut heap, keep) = reserve_heap(wanted)?;
    let mut overflowed = false;

    for entry in read_dir {
        let entry = entry.map_err(|source| CatalogError::Read {
            path: dir.to_path_buf(),
            source,
        })?;

        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            debug!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };

        if !filter.matches(name) {
            continue;
        }
        if let Some(after) = after {
            if name <= after {
                continue;
            }
        }

        // Max-heap of the smallest names seen so far
        if heap.len() < keep {
            heap.push(name.to_owned());
        } else {
            overflowed = true;
            if let Some(mut largest) = heap.peek_mut() {
                if name < largest.as_str() {
                    *largest = name.to_owned();
                }
            }
        }
    }

    let mut names = heap.into_sorted_vec();
    let lookahead = if names.len() > want { names.pop() } else { None };

    Ok(Window {
        names,
        lookahead,
        truncated: keep < wanted && overflowed,
    })
}

/// Reserve room for `wanted` names, halving the request until it fits.
fn reserve_heap(wanted: usize) -> Result<(BinaryHeap<String>, usize), CatalogError> {
    let mut keep = wanted;
    loop {
        let mut heap = BinaryHeap::new();
        if try_reserve(&mut heap, keep) {
            if keep < wanted {
                warn!(
                    "Catalog page reduced from {} to {} entries after allocation failure",
                    wanted, keep
                );
            }
            return Ok((heap, keep));
        }
        if keep <= 1 {
            return Err(CatalogError::OutOfMemory);
        }
        keep /= 2;
    }
}

#[cfg(not(test))]
fn try_reserve(heap: &mut BinaryHeap<String>, additional: usize) -> bool {
    heap.try_reserve_exact(additional).is_ok()
}

#[cfg(test)]
fn try_reserve(heap: &mut BinaryHeap<String>, additional: usize) -> bool {
    additional <= RESERVATION_LIMIT.with(std::cell::Cell::get)
        && heap.try_reserve_exact(additional).is_ok()
}
