//! Buffer pool manager for page-level caching and I/O.
//!
//! The buffer pool sits between the storage layer and the executor, providing:
//! - LRU- or FIFO-based in-memory page cache, selectable per `Config`
//! - Per-session pin bookkeeping so a page being read by one cursor can
//!   never be evicted out from under it
//! - Lazy loading and eviction with automatic dirty page flushing
//! - A write-ahead hook (`BufferManagerObserver`) so the WAL can guarantee
//!   its own records are durable before the pages they describe hit disk
//! - File-per-table storage with sequential page IDs
//!
//! # Example
//!
//! ```no_run
//! use buffer::{Pager, FilePager};
//! use common::{TableId, PageId};
//!
//! let mut pager = FilePager::new("/tmp/db", 100);
//! let table = TableId(1);
//!
//! // Allocate a new page
//! let page_id = pager.allocate_page(table).unwrap();
//!
//! // Fetch and modify
//! {
//!     let page = pager.fetch_page(table, page_id).unwrap();
//!     page.data[0] = 42;
//! }
//!
//! // Flush to disk
//! pager.flush().unwrap();
//! ```


use common::{DbError, DbResult, PageCachePolicy, PageId, TableId};
use hashbrown::{HashMap, HashSet};
use lru::LruCache;
use std::{
    collections::VecDeque,
    fs::OpenOptions,
    io::{Read, Seek, SeekFrom, Write},
    num::NonZeroUsize,
    path::PathBuf,
};
use storage::{PAGE_SIZE, Page};

/// Identifies the session (client connection / execution context) a page
/// pin belongs to, so a crashed or reset session can release every page it
/// was holding in one call instead of leaking pins.
pub type SessionId = u64;

type PageKey = (TableId, PageId);

/// Hook invoked before dirty pages are written back to their table files.
///
/// The write-ahead-log invariant requires that a page's redo records be
/// fsynced before the page itself is overwritten on disk; the buffer
/// manager doesn't know about the WAL, so it calls out through this trait
/// instead of depending on the `wal` crate directly.
pub trait BufferManagerObserver: Send + Sync {
    fn before_write_dirty_pages(&self, pages: &[PageKey]) -> DbResult<()>;
}

/// No-op observer used when a caller doesn't need write-ahead coordination
/// (tests, or a pager backing a table with WAL disabled).
#[derive(Debug, Default)]
pub struct NoopObserver;

impl BufferManagerObserver for NoopObserver {
    fn before_write_dirty_pages(&self, _pages: &[PageKey]) -> DbResult<()> {
        Ok(())
    }
}

/// Abstraction for fetching, allocating, and flushing pages.
///
/// Implementors manage the lifecycle of pages, including:
/// - Loading pages from persistent storage into memory
/// - Evicting pages when the cache is full
/// - Tracking dirty pages and flushing them to disk
pub trait Pager {
    /// Fetch a page from the buffer pool or load it from disk.
    ///
    /// Returns a mutable reference to the page in the cache.
    /// Marks the page as recently used in the LRU policy.
    fn fetch_page(&mut self, table: TableId, pid: PageId) -> DbResult<&mut Page>;

    /// Allocate a new page for the given table.
    ///
    /// Assigns the next sequential `PageId` and returns it.
    /// The new page is initialized with zeros and marked as dirty.
    fn allocate_page(&mut self, table: TableId) -> DbResult<PageId>;

    /// Flush all dirty pages to disk.
    ///
    /// After flushing, all pages are marked as clean.
    fn flush(&mut self) -> DbResult<()>;

    /// Pin a page on behalf of `session`, preventing its eviction until
    /// every pin taken against it (across all sessions) is released.
    fn pin_page(&mut self, session: SessionId, table: TableId, pid: PageId) -> DbResult<()>;

    /// Release one pin taken by `session` against the given page.
    fn unpin_page(&mut self, session: SessionId, table: TableId, pid: PageId);

    /// Release every pin held by `session`, e.g. when its transaction ends
    /// or its connection drops.
    fn unpin_all_session_pages(&mut self, session: SessionId);
}

/// File-backed buffer pool with LRU or FIFO eviction and pin tracking.
///
/// Uses a file-per-table storage model with sequential page IDs. A page
/// with a non-zero pin count is never selected for eviction; if every
/// cached page is pinned when a new one must be loaded, `fetch_page`/
/// `allocate_page` return `DbError::Storage` rather than silently growing
/// past the configured capacity.
#[derive(Debug)]
pub struct FilePager {
    base_dir: PathBuf,
    max_pages: usize,
    policy: PageCachePolicy,
    storage: HashMap<PageKey, Page>,
    lru_order: LruCache<PageKey, ()>,
    fifo_order: VecDeque<PageKey>,
    dirty: HashMap<PageKey, bool>,
    pin_counts: HashMap<PageKey, u32>,
    session_pages: HashMap<SessionId, HashSet<PageKey>>,
    observer: Box<dyn BufferManagerObserver>,
    bytes_in_use: usize,
    byte_budget: usize,
}

impl FilePager {
    /// Create a new file-backed pager using the default LRU policy.
    ///
    /// # Arguments
    ///
    /// * `base_dir` - Directory for table files (format: `table_{id}.tbl`)
    /// * `max_pages` - Maximum number of pages to cache in memory
    ///
    /// # Panics
    ///
    /// Panics if `max_pages` is 0.
    pub fn new(base_dir: impl Into<PathBuf>, max_pages: usize) -> Self {
        Self::with_policy(base_dir, max_pages, PageCachePolicy::Lru)
    }

    /// Create a pager with an explicit eviction policy.
    pub fn with_policy(
        base_dir: impl Into<PathBuf>,
        max_pages: usize,
        policy: PageCachePolicy,
    ) -> Self {
        assert!(max_pages > 0, "max_pages must be > 0");
        Self {
            base_dir: base_dir.into(),
            max_pages,
            policy,
            storage: HashMap::new(),
            lru_order: LruCache::new(NonZeroUsize::new(max_pages).unwrap()),
            fifo_order: VecDeque::new(),
            dirty: HashMap::new(),
            pin_counts: HashMap::new(),
            session_pages: HashMap::new(),
            observer: Box::new(NoopObserver),
            bytes_in_use: 0,
            byte_budget: max_pages * PAGE_SIZE,
        }
    }

    /// Attach an observer that runs before dirty pages are written back.
    pub fn with_observer(mut self, observer: Box<dyn BufferManagerObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Reserve `bytes` against the pager's byte budget for an off-cache
    /// buffer (e.g. a sort-merge run buffer), failing if that would exceed
    /// the configured budget. Paired with `release_buffer`.
    pub fn alloc_buffer(&mut self, bytes: usize) -> DbResult<()> {
        if self.bytes_in_use + bytes > self.byte_budget {
            return Err(DbError::Storage(format!(
                "buffer budget exceeded: requested {bytes} bytes, {} available",
                self.byte_budget.saturating_sub(self.bytes_in_use)
            )));
        }
        self.bytes_in_use += bytes;
        Ok(())
    }

    /// Release a reservation made with `alloc_buffer`.
    pub fn release_buffer(&mut self, bytes: usize) {
        self.bytes_in_use = self.bytes_in_use.saturating_sub(bytes);
    }

    /// Get the file path for a table.
    fn table_path(&self, table: TableId) -> PathBuf {
        self.base_dir.join(format!("table_{}.tbl", table.0))
    }

    /// Load a page from disk, or create a new zero-initialized page if it doesn't exist.
    fn load_page(&self, table: TableId, pid: PageId) -> DbResult<Page> {
        let path = self.table_path(table);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DbError::Storage(format!("Failed to open table file: {}", e)))?;

        let offset = pid.0 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::Storage(format!("Failed to seek to page: {}", e)))?;

        let mut buf = vec![0u8; PAGE_SIZE];
        let n = file
            .read(&mut buf)
            .map_err(|e| DbError::Storage(format!("Failed to read page: {}", e)))?;

        if n == 0 {
            // Page doesn't exist yet, return zero-initialized page
            Ok(Page::new(pid.0))
        } else if n < PAGE_SIZE {
            // Partial page read - this shouldn't happen with proper page alignment
            Err(DbError::Storage(format!(
                "Partial page read: expected {} bytes, got {}",
                PAGE_SIZE, n
            )))
        } else {
            Ok(Page {
                id: pid.0,
                data: buf,
            })
        }
    }

    /// Write a page to disk, running the write-ahead observer hook first.
    fn write_page(&self, table: TableId, page: &Page) -> DbResult<()> {
        self.observer
            .before_write_dirty_pages(&[(table, PageId(page.id))])?;

        let path = self.table_path(table);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DbError::Storage(format!("Failed to open table file: {}", e)))?;

        let offset = page.id * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DbError::Storage(format!("Failed to seek to page: {}", e)))?;

        file.write_all(&page.data)
            .map_err(|e| DbError::Storage(format!("Failed to write page: {}", e)))?;

        Ok(())
    }

    fn is_pinned(&self, key: PageKey) -> bool {
        self.pin_counts.get(&key).copied().unwrap_or(0) > 0
    }

    /// Record a fresh cache entry in whichever order-tracking structures
    /// the active policy (and the other, kept warm in case of a runtime
    /// policy change) needs.
    fn note_inserted(&mut self, key: PageKey) {
        self.lru_order.push(key, ());
        self.fifo_order.push_back(key);
    }

    fn note_accessed(&mut self, key: PageKey) {
        if self.policy == PageCachePolicy::Lru {
            self.lru_order.promote(&key);
        }
    }

    fn note_removed(&mut self, key: PageKey) {
        self.lru_order.pop(&key);
        self.fifo_order.retain(|k| *k != key);
    }

    /// Pick the least-recently-used (or oldest, under FIFO) unpinned page,
    /// if any exists.
    fn eviction_candidate(&self) -> Option<PageKey> {
        match self.policy {
            PageCachePolicy::Lru => {
                // `lru`'s iterator runs most-recent to least-recent; the last
                // unpinned entry encountered is therefore the least recently used.
                self.lru_order
                    .iter()
                    .map(|(k, _)| *k)
                    .filter(|k| !self.is_pinned(*k))
                    .last()
            }
            PageCachePolicy::Fifo => self
                .fifo_order
                .iter()
                .copied()
                .find(|k| !self.is_pinned(*k)),
        }
    }

    /// Evict one page if the cache is full, flushing it first if dirty.
    /// Per spec.md §4.2, a buffer pool with no unpinned victim warns and
    /// does not abort the caller — the cache is simply allowed to grow
    /// past `max_pages` until a page is unpinned.
    fn evict_if_needed(&mut self) -> DbResult<()> {
        if self.storage.len() < self.max_pages {
            return Ok(());
        }

        let Some(key) = self.eviction_candidate() else {
            tracing::warn!(
                resident = self.storage.len(),
                max_pages = self.max_pages,
                "buffer pool exhausted: all resident pages are pinned, growing over budget"
            );
            return Ok(());
        };

        if self.dirty.remove(&key).is_some()
            && let Some(page) = self.storage.get(&key)
        {
            self.write_page(key.0, page)?;
        }
        self.storage.remove(&key);
        self.note_removed(key);

        Ok(())
    }
}

impl Pager for FilePager {
    fn fetch_page(&mut self, table: TableId, pid: PageId) -> DbResult<&mut Page> {
        let key = (table, pid);

        if self.storage.contains_key(&key) {
            self.note_accessed(key);
            return Ok(self.storage.get_mut(&key).unwrap());
        }

        // Page not in cache - load from disk
        let page = self.load_page(table, pid)?;

        // Evict a page if cache is full
        self.evict_if_needed()?;

        self.storage.insert(key, page);
        self.note_inserted(key);

        Ok(self.storage.get_mut(&key).unwrap())
    }

    fn allocate_page(&mut self, table: TableId) -> DbResult<PageId> {
        let path = self.table_path(table);

        // Determine next page ID from file size
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DbError::Storage(format!("Failed to open table file: {}", e)))?;

        let len = file
            .metadata()
            .map_err(|e| DbError::Storage(format!("Failed to read file metadata: {}", e)))?
            .len();

        let pid = PageId(len / PAGE_SIZE as u64);

        // Create new zero-initialized page
        let page = Page::new(pid.0);

        // Write page to disk immediately to extend the file
        self.write_page(table, &page)?;

        // Evict a page if cache is full
        self.evict_if_needed()?;

        let key = (table, pid);
        self.storage.insert(key, page);
        self.note_inserted(key);
        self.dirty.insert(key, true);

        Ok(pid)
    }

    fn flush(&mut self) -> DbResult<()> {
        let dirty_keys: Vec<_> = self.dirty.keys().copied().collect();
        if dirty_keys.is_empty() {
            return Ok(());
        }
        self.observer.before_write_dirty_pages(&dirty_keys)?;

        for key in dirty_keys {
            if let Some(page) = self.storage.get(&key) {
                let path = self.table_path(key.0);
                let mut file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&path)
                    .map_err(|e| DbError::Storage(format!("Failed to open table file: {}", e)))?;
                file.seek(SeekFrom::Start(page.id * PAGE_SIZE as u64))
                    .map_err(|e| DbError::Storage(format!("Failed to seek to page: {}", e)))?;
                file.write_all(&page.data)
                    .map_err(|e| DbError::Storage(format!("Failed to write page: {}", e)))?;
                self.dirty.remove(&key);
            }
        }

        Ok(())
    }

    fn pin_page(&mut self, session: SessionId, table: TableId, pid: PageId) -> DbResult<()> {
        let key = (table, pid);
        *self.pin_counts.entry(key).or_insert(0) += 1;
        self.session_pages.entry(session).or_default().insert(key);
        Ok(())
    }

    fn unpin_page(&mut self, session: SessionId, table: TableId, pid: PageId) {
        let key = (table, pid);
        if let Some(count) = self.pin_counts.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.pin_counts.remove(&key);
            }
        }
        if let Some(pages) = self.session_pages.get_mut(&session) {
            pages.remove(&key);
        }
    }

    fn unpin_all_session_pages(&mut self, session: SessionId) {
        if let Some(pages) = self.session_pages.remove(&session) {
            for key in pages {
                if let Some(count) = self.pin_counts.get_mut(&key) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.pin_counts.remove(&key);
                    }
                }
            }
        }
    }
}
