//! Process-shared robust mutex living inside the mapped segment.

use crate::error::{ShmError, ShmResult};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use tracing::warn;

/// Cache-line size the lock is aligned to.
pub const CACHE_LINE_SIZE: usize = 64;

/// A `pthread_mutex_t` configured `PTHREAD_PROCESS_SHARED` and
/// `PTHREAD_MUTEX_ROBUST`.
///
/// It must live in memory mapped by every participant; a copy of it is not a
/// lock.
#[repr(C, align(64))]
pub struct ProcessMutex {
    raw: UnsafeCell<libc::pthread_mutex_t>,
}

fn check(code: libc::c_int) -> ShmResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(ShmError::LockFailed { code })
    }
}

impl ProcessMutex {
    /// Initialize the mutex in place.
    ///
    /// # Safety
    ///
    /// No other thread or process may be using the mutex, and it must not
    /// be initialized a second time while anyone may still lock it.
    pub unsafe fn init_in_place(&self) -> ShmResult<()> {
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();
        check(unsafe { libc::pthread_mutexattr_init(attr.as_mut_ptr()) })?;
        let attr_ptr = attr.as_mut_ptr();

        let result = check(unsafe {
            libc::pthread_mutexattr_setpshared(attr_ptr, libc::PTHREAD_PROCESS_SHARED)
        })
        .and_then(|()| {
            check(unsafe { libc::pthread_mutexattr_setrobust(attr_ptr, libc::PTHREAD_MUTEX_ROBUST) })
        })
        .and_then(|()| check(unsafe { libc::pthread_mutex_init(self.raw.get(), attr_ptr) }));

        unsafe { libc::pthread_mutexattr_destroy(attr_ptr) };
        result
    }

    /// Block until the lock is held.
    ///
    /// If the previous owner died while holding it, the mutex is marked
    /// consistent and acquisition succeeds; the protected data may reflect
    /// a half-finished update.
    pub fn lock(&self) -> ShmResult<()> {
        match unsafe { libc::pthread_mutex_lock(self.raw.get()) } {
            0 => Ok(()),
            libc::EOWNERDEAD => {
                warn!("Previous lock owner died; recovering shared state lock");
                check(unsafe { libc::pthread_mutex_consistent(self.raw.get()) })
            }
            libc::ENOTRECOVERABLE => Err(ShmError::LockUnrecoverable),
            code => Err(ShmError::LockFailed { code }),
        }
    }

    /// Release the lock.
    ///
    /// # Safety
    ///
    /// The calling thread must currently hold the lock.
    pub unsafe fn unlock(&self) {
        unsafe { libc::pthread_mutex_unlock(self.raw.get()) };
    }
}
