//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Create (or reset) a file-backed shared mapping of `size` zeroed bytes.
///
/// The mapping is `MAP_SHARED`, so it stays shared with children created by
/// `fork()` and with any process that attaches to the same path.
pub fn create_segment_mmap(path: &Path, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .mode(0o600) // Owner read/write only
        .open(path)?;

    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().len(size).populate().map_mut(&file)? };

    Ok(mmap)
}

/// Attach to an existing segment, checking its size against `expected`.
pub fn attach_segment_mmap(path: &Path, expected: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;

    let actual = file.metadata()?.len();
    if actual != expected as u64 {
        return Err(ShmError::LayoutMismatch { expected, actual });
    }

    let mmap = unsafe { MmapOptions::new().len(expected).map_mut(&file)? };
    Ok(mmap)
}

/// Check if process is alive using kill(pid, 0)
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::Error::ESRCH) => false,
        Err(nix::Error::EPERM) => true, // exists, owned by someone else
        Err(_) => false,
    }
}

/// Get current process ID
pub fn get_current_pid() -> u32 {
    getpid().as_raw() as u32
}
