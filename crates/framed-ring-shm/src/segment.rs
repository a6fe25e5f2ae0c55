//! Named, fixed-size, reference-counted POSIX shared memory segments.

use std::ffi::CString;
use std::fs::File;
use std::io;
#[cfg(unix)]
use std::os::fd::FromRawFd;
use std::sync::atomic::{AtomicI32, Ordering};

use memmap2::MmapMut;

use crate::semaphore::NamedSemaphore;
use crate::{Error, Result};

/// See "DESCRIPTION" at <https://man7.org/linux/man-pages/man3/shm_open.3.html>.
pub const NAME_MAX: usize = 255;

/// Arbitrary upper bound on a single segment's payload size (500 MiB).
pub const MAX_SEGMENT_BYTES: usize = 500 * 1024 * 1024;

/// Every cacheline-sensitive field in this crate and in `framed-ring-core`
/// is sized/padded against this constant so producer- and consumer-written
/// fields never share a line.
pub const CACHELINE_BYTES: usize = 64;

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > NAME_MAX {
        return Err(Error::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_size(requested: usize) -> Result<()> {
    if requested < 1 || requested > MAX_SEGMENT_BYTES {
        return Err(Error::InvalidSize {
            requested,
            max: MAX_SEGMENT_BYTES,
        });
    }
    Ok(())
}

/// A named, memory-mapped shared-memory region with an atomic reference
/// counter at offset 0. The payload — the part callers actually care about
/// — starts at offset [`CACHELINE_BYTES`] so the counter never shares a
/// cacheline with it.
///
/// `new` implements create-or-attach: if the named segment already exists
/// it is attached (after a size check); otherwise it is created, under the
/// protection of a per-name creation semaphore that serializes concurrent
/// creators. On drop, the reference counter is decremented; the segment
/// whose decrement observes the count transitioning 1 -> 0 unlinks the
/// name from the host namespace.
pub struct SharedSegment {
    mmap: MmapMut,
    name: String,
    total_size: usize,
    payload_size: usize,
    creation_sem: NamedSemaphore,
}

// SAFETY: the mapped region is shared across processes by design; the only
// mutable shared state — the ref counter — is accessed exclusively through
// atomic operations, and all other payload bytes are synchronized by the
// caller (the ring protocol in `framed-ring-core`).
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    /// Creates or attaches the named segment, sized to hold exactly
    /// `requested_size` payload bytes plus the [`CACHELINE_BYTES`] header.
    ///
    /// # Errors
    /// `InvalidName`/`InvalidSize` on bad arguments, `SizeMismatch` if a
    /// pre-existing segment's length doesn't match, `SystemError` for any
    /// underlying `shm_open`/`ftruncate`/`mmap` failure.
    pub fn new(name: &str, requested_size: usize) -> Result<Self> {
        validate_name(name)?;
        validate_size(requested_size)?;

        let total_size = requested_size + CACHELINE_BYTES;
        let creation_sem = NamedSemaphore::open(&creation_sem_name(name))?;

        let file = match open_existing(name, total_size)? {
            Some(file) => file,
            None => {
                create_exclusive(name, total_size, &creation_sem)?;
                open_existing(name, total_size)?.ok_or_else(|| {
                    let err = io::Error::last_os_error();
                    tracing::error!(name, %err, "segment vanished immediately after creation");
                    Error::SystemError { source: err }
                })?
            }
        };

        // SAFETY: file was just opened/created with the expected length;
        // MmapMut::map_mut requires the fd to support mmap (shm fds do).
        let mut mmap = unsafe { MmapMut::map_mut(&file) }.map_err(|source| {
            tracing::warn!(name, %source, "failed to mmap segment");
            Error::SystemError { source }
        })?;

        // SAFETY: the mapping is at least sizeof(i32) bytes (total_size is
        // always >= CACHELINE_BYTES >= 4) and 4-byte aligned — mmap returns
        // page-aligned memory.
        let counter = unsafe { &*(mmap.as_mut_ptr() as *const AtomicI32) };
        let prev = counter.fetch_add(1, Ordering::Release);
        tracing::debug!(name, ref_count = prev + 1, "attached to shared segment");

        Ok(Self {
            mmap,
            name: name.to_string(),
            total_size,
            payload_size: requested_size,
            creation_sem,
        })
    }

    fn ref_counter(&self) -> &AtomicI32 {
        // SAFETY: see constructor.
        unsafe { &*(self.mmap.as_ptr() as *const AtomicI32) }
    }

    /// Current value of the in-header reference counter.
    pub fn ref_count(&self) -> i32 {
        self.ref_counter().load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn payload_len(&self) -> usize {
        self.payload_size
    }

    /// Reinterprets the payload as `&T`. Returns `None` unless
    /// `size_of::<T>()` exactly matches the payload size.
    pub fn as_struct<T>(&self) -> Option<&T> {
        if std::mem::size_of::<T>() != self.payload_size {
            return None;
        }
        // SAFETY: size matches exactly; payload is at CACHELINE_BYTES and
        // the mapping is alive for the lifetime of `&self`.
        Some(unsafe { &*(self.payload_ptr() as *const T) })
    }

    /// Reinterprets the payload as a contiguous, mutable byte span.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.payload_size;
        // SAFETY: [CACHELINE_BYTES, CACHELINE_BYTES + payload_size) is
        // within the mapping by construction.
        unsafe { std::slice::from_raw_parts_mut(self.payload_ptr_mut(), len) }
    }

    /// Reinterprets the payload as a contiguous, read-only byte span.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.payload_size;
        // SAFETY: see as_bytes_mut.
        unsafe { std::slice::from_raw_parts(self.payload_ptr(), len) }
    }

    fn payload_ptr(&self) -> *const u8 {
        // SAFETY: CACHELINE_BYTES <= total_size always holds.
        unsafe { self.mmap.as_ptr().add(CACHELINE_BYTES) }
    }

    fn payload_ptr_mut(&mut self) -> *mut u8 {
        // SAFETY: see payload_ptr.
        unsafe { self.mmap.as_mut_ptr().add(CACHELINE_BYTES) }
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        let prev = self.ref_counter().fetch_sub(1, Ordering::Release);
        tracing::debug!(name = %self.name, ref_count = prev - 1, "detached from shared segment");

        if prev == 1 {
            if self.creation_sem.try_acquire() {
                unlink(&self.name);
                self.creation_sem.release();
            } else {
                tracing::warn!(
                    name = %self.name,
                    "could not acquire creation semaphore to unlink segment on last release"
                );
            }
        }
    }
}

fn creation_sem_name(segment_name: &str) -> String {
    format!("{segment_name}-create")
}

fn unlink(name: &str) {
    let Ok(c_name) = CString::new(name) else {
        return;
    };
    // SAFETY: c_name is NUL-terminated; shm_unlink on a nonexistent name is
    // harmless and its error is only logged, never propagated (destructors
    // must not fail).
    if unsafe { libc::shm_unlink(c_name.as_ptr()) } == -1 {
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(name, %err, "failed to unlink shared segment");
        }
    } else {
        tracing::debug!(name, "unlinked shared segment");
    }
}

/// Opens an existing segment read/write, validating its total length.
/// Returns `Ok(None)` if the segment does not exist yet.
fn open_existing(name: &str, expected_total: usize) -> Result<Option<File>> {
    let c_name = CString::new(name).map_err(|_| Error::InvalidName {
        name: name.to_string(),
    })?;

    // SAFETY: c_name is NUL-terminated; O_RDWR without O_CREAT is safe to
    // call speculatively and simply fails with ENOENT if absent.
    let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0o600) };
    if fd < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::NotFound {
            return Ok(None);
        }
        tracing::warn!(name, %err, "failed to open existing segment");
        return Err(Error::SystemError { source: err });
    }

    // SAFETY: fd is a valid, just-opened file descriptor that nothing else
    // owns yet; File takes ownership of closing it.
    let file = unsafe { File::from_raw_fd(fd) };

    let actual = file
        .metadata()
        .map_err(|source| Error::SystemError { source })?
        .len() as usize;
    if actual != expected_total {
        return Err(Error::SizeMismatch {
            name: name.to_string(),
            expected: expected_total,
            actual,
        });
    }

    Ok(Some(file))
}

/// Creates the segment exclusively and truncates it to `total_size`,
/// serialized by `creation_sem` so concurrent creators don't race on
/// `O_EXCL`. If another process wins the race, that's fine — the caller
/// re-opens afterwards regardless.
fn create_exclusive(name: &str, total_size: usize, creation_sem: &NamedSemaphore) -> Result<()> {
    if !creation_sem.try_acquire() {
        // Another process is creating this segment right now. Give it a
        // moment; the subsequent open_existing retry in `new` will pick it
        // up once it lands.
        return Ok(());
    }

    let result = (|| -> Result<()> {
        let c_name = CString::new(name).map_err(|_| Error::InvalidName {
            name: name.to_string(),
        })?;

        // SAFETY: c_name is NUL-terminated; O_CREAT|O_EXCL atomically
        // creates-or-fails with EEXIST, mode 0o600 is a valid permission
        // bitmask.
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                0o600,
            )
        };
        if fd < 0 {
            let err = io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EEXIST) {
                // Lost the creation race to another process — not our job
                // to truncate an existing segment.
                return Ok(());
            }
            tracing::warn!(name, %err, "failed to create segment");
            return Err(Error::SystemError { source: err });
        }

        // SAFETY: fd is a valid, freshly-created file descriptor.
        let file = unsafe { File::from_raw_fd(fd) };
        file.set_len(total_size as u64)
            .map_err(|source| Error::SystemError { source })?;
        tracing::debug!(name, total_size, "created shared segment");
        Ok(())
    })();

    creation_sem.release();
    result
}
