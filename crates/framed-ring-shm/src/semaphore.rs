//! Named, host-wide semaphores used to arbitrate shared-memory segment
//! creation and to enforce a single live [`crate::SharedSegment`] writer.
//!
//! POSIX named semaphores are host-persistent by default: unlike a segment,
//! a semaphore is *not* unlinked when the last handle closes. That is
//! intentional here — see [`NamedSemaphore`]'s docs.

use std::ffi::CString;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// `sem_open` requires room for 4 bytes of implementation overhead beyond
/// `NAME_MAX`; the original source derives semaphore names from segment
/// names by appending a suffix (e.g. `"-writer"`), so callers must leave
/// this much headroom.
pub const MAX_NAME_LEN: usize = crate::segment::NAME_MAX - 4;

/// A host-wide mutex reached by name via `sem_open`.
///
/// `open` creates the semaphore with an initial value of 1 if it doesn't
/// exist yet, or attaches to it if it does. Acquisition
/// ([`NamedSemaphore::try_acquire`]) is always non-blocking: either it wins
/// the lock or it doesn't.
///
/// Each handle tracks whether *it* currently holds the semaphore. On drop,
/// a held semaphore is released before the handle is closed. The semaphore
/// name itself is never unlinked — named semaphores are meant to outlive
/// any one process the way a segment name is not, and recovering the
/// exclusion state after every process on the host is gone is an operator
/// decision, not this library's.
pub struct NamedSemaphore {
    sem: *mut libc::sem_t,
    name: String,
    holds: AtomicBool,
}

// SAFETY: POSIX named semaphores are designed for concurrent access from
// multiple processes; `sem_trywait`/`sem_post` are safe to call from any
// thread holding the pointer.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Creates the named semaphore with initial value 1 if absent, or
    /// attaches to the existing one.
    ///
    /// # Errors
    /// `InvalidName` if `name` is empty or exceeds [`MAX_NAME_LEN`].
    /// `SystemError` if the underlying `sem_open` call fails.
    pub fn open(name: &str) -> Result<Self> {
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidName {
                name: name.to_string(),
            });
        }

        let c_name =
            CString::new(name).map_err(|_| Error::InvalidName { name: name.to_string() })?;

        // SAFETY: c_name is a valid NUL-terminated string; O_CREAT|O_EXCL
        // atomically creates-or-fails, mode 0o600 is a valid permission
        // bitmask, and sem_open returns SEM_FAILED on error (checked below).
        let mut sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600u32,
                1u32,
            )
        };

        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                // SAFETY: attaching to an existing semaphore; no creation
                // flags needed.
                sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
            }
        }

        if sem == libc::SEM_FAILED {
            let err = io::Error::last_os_error();
            tracing::warn!(name, %err, "failed to open named semaphore");
            return Err(Error::SystemError { source: err });
        }

        tracing::debug!(name, "opened named semaphore");
        Ok(Self {
            sem,
            name: name.to_string(),
            holds: AtomicBool::new(false),
        })
    }

    /// Non-blocking down. Returns `true` and records ownership on success.
    pub fn try_acquire(&self) -> bool {
        // SAFETY: self.sem was returned by a successful sem_open and is
        // never replaced for the lifetime of this handle.
        let acquired = unsafe { libc::sem_trywait(self.sem) } == 0;
        if acquired {
            self.holds.store(true, Ordering::Release);
            tracing::debug!(name = %self.name, "acquired named semaphore");
        } else {
            tracing::debug!(name = %self.name, "named semaphore already held");
        }
        acquired
    }

    /// Up. Returns `true` on success and clears the ownership flag
    /// regardless (a failed `sem_post` still means this handle should stop
    /// acting as if it were holding the lock).
    pub fn release(&self) -> bool {
        // SAFETY: see try_acquire.
        let released = unsafe { libc::sem_post(self.sem) } == 0;
        self.holds.store(false, Ordering::Release);
        if released {
            tracing::debug!(name = %self.name, "released named semaphore");
        } else {
            let err = io::Error::last_os_error();
            tracing::warn!(name = %self.name, %err, "failed to release named semaphore");
        }
        released
    }

    /// Whether *this handle* currently holds the semaphore.
    pub fn holds_ownership(&self) -> bool {
        self.holds.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        if self.holds.load(Ordering::Acquire) && !self.release() {
            tracing::error!(name = %self.name, "failed to release semaphore on drop");
        }

        // SAFETY: self.sem is a valid sem_t* from a successful sem_open,
        // not yet closed.
        if unsafe { libc::sem_close(self.sem) } != 0 {
            let err = io::Error::last_os_error();
            tracing::warn!(name = %self.name, %err, "failed to close semaphore handle");
        }
    }
}
