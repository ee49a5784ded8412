//! mmap-backed shared state store.
//!
//! The segment file `<dir>/<name>_<pid>` holds a [`ProcessMutex`] followed
//! by the [`SharedState`]. The creating process initializes the lock, owns
//! the file and removes it on drop. Children created with `fork()` inherit
//! the mapping; unrelated processes may [`SharedStateStore::attach`].

use crate::error::{ShmError, ShmResult};
use crate::lock::{CACHE_LINE_SIZE, ProcessMutex};
use crate::platform::{attach_segment_mmap, create_segment_mmap, get_current_pid};
use crate::state::SharedState;
use memmap2::MmapMut;
use static_assertions::const_assert_eq;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::{debug, info, warn};

#[repr(C)]
struct SegmentLayout {
    lock: ProcessMutex,
    state: SharedState,
}

/// Total size of the mapped segment in bytes.
pub const SEGMENT_SIZE: usize = std::mem::size_of::<SegmentLayout>();

const_assert_eq!(std::mem::align_of::<SegmentLayout>(), CACHE_LINE_SIZE);
const_assert_eq!(SEGMENT_SIZE % CACHE_LINE_SIZE, 0);

/// Handle to the mapped shared state.
pub struct SharedStateStore {
    _mmap: MmapMut,
    layout: NonNull<SegmentLayout>,
    path: PathBuf,
    /// Pid that created the segment; only it removes the file.
    owner_pid: Option<u32>,
}

// SAFETY: the mapping is MAP_SHARED memory that outlives every handle, and
// all access to `SharedState` goes through the process-shared mutex.
unsafe impl Send for SharedStateStore {}
unsafe impl Sync for SharedStateStore {}

/// Segment path for a base name and owner pid.
pub fn segment_path(dir: &Path, name: &str, pid: u32) -> PathBuf {
    dir.join(format!("{name}_{pid}"))
}

impl SharedStateStore {
    /// Create a zeroed segment owned by the calling process and initialize
    /// its lock.
    pub fn create(dir: &Path, name: &str) -> ShmResult<Self> {
        let pid = get_current_pid();
        let path = segment_path(dir, name, pid);
        let mut mmap = create_segment_mmap(&path, SEGMENT_SIZE)?;
        let layout = Self::layout_ptr(&mut mmap)?;

        // SAFETY: the segment was just created and nobody else has mapped it.
        unsafe { layout.as_ref().lock.init_in_place()? };

        info!(
            "Created shared state segment {} ({} bytes)",
            path.display(),
            SEGMENT_SIZE
        );

        Ok(Self {
            _mmap: mmap,
            layout,
            path,
            owner_pid: Some(pid),
        })
    }

    /// Attach to a segment created by another process.
    pub fn attach(path: &Path) -> ShmResult<Self> {
        let mut mmap = attach_segment_mmap(path, SEGMENT_SIZE)?;
        let layout = Self::layout_ptr(&mut mmap)?;
        debug!("Attached to shared state segment {}", path.display());

        Ok(Self {
            _mmap: mmap,
            layout,
            path: path.to_path_buf(),
            owner_pid: None,
        })
    }

    fn layout_ptr(mmap: &mut MmapMut) -> ShmResult<NonNull<SegmentLayout>> {
        let address = mmap.as_mut_ptr() as usize;
        if address % CACHE_LINE_SIZE != 0 {
            return Err(ShmError::AlignmentError {
                address,
                alignment: CACHE_LINE_SIZE,
            });
        }
        NonNull::new(mmap.as_mut_ptr().cast::<SegmentLayout>()).ok_or(ShmError::AlignmentError {
            address,
            alignment: CACHE_LINE_SIZE,
        })
    }

    /// Segment file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire the shared lock.
    ///
    /// The guard releases it on drop. Never hold it across network I/O.
    pub fn lock(&self) -> ShmResult<StateGuard<'_>> {
        let layout = self.layout.as_ptr();

        // SAFETY: the layout pointer is valid for the lifetime of the mapping.
        let lock = unsafe { &(*layout).lock };
        lock.lock()?;

        // SAFETY: the lock is held, so this is the only live reference.
        let state = unsafe { &mut (*layout).state };
        Ok(StateGuard { lock, state })
    }
}

impl Drop for SharedStateStore {
    fn drop(&mut self) {
        if self.owner_pid != Some(get_current_pid()) {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed shared state segment {}", self.path.display()),
            Err(e) => warn!(
                "Failed to remove shared state segment {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Exclusive access to the shared state while the lock is held.
pub struct StateGuard<'a> {
    lock: &'a ProcessMutex,
    state: &'a mut SharedState,
}

impl Deref for StateGuard<'_> {
    type Target = SharedState;

    fn deref(&self) -> &SharedState {
        self.state
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut SharedState {
        self.state
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        // SAFETY: the guard exists only while this thread holds the lock.
        unsafe { self.lock.unlock() };
    }
}
