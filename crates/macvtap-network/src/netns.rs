//! Network namespace handles.
//!
//! Namespace membership is a property of the calling OS thread, not of the
//! process. [`NetNs::run`] switches the current thread only, so it must not be
//! used from code that can migrate between threads mid-closure.

use std::fs::File;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::{Path, PathBuf};

use rustix::thread::{LinkNameSpaceType, move_into_link_name_space};

use crate::link::Namespace;

/// Network namespace of the calling thread.
pub const CURRENT_THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// An open network namespace.
#[derive(Debug)]
pub struct NetNs {
    path: PathBuf,
    file: File,
}

impl NetNs {
    /// Open the namespace bound at `path` (e.g. `/var/run/netns/foo` or
    /// `/proc/<pid>/ns/net`).
    ///
    /// # Errors
    ///
    /// Fails if the path cannot be opened or is not a namespace file.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let stat = rustix::fs::fstatfs(&file)?;
        #[allow(clippy::unnecessary_cast, clippy::cast_possible_wrap)]
        let fs_type = stat.f_type as i64;
        if !is_namespace_fs(fs_type) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a network namespace", path.display()),
            ));
        }

        tracing::trace!(path = %path.display(), "Opened network namespace");
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Open the namespace the calling thread currently belongs to.
    ///
    /// # Errors
    ///
    /// Fails if `/proc` is not mounted.
    pub fn current() -> io::Result<Self> {
        Self::open(CURRENT_THREAD_NETNS)
    }

    /// Path the namespace was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the calling thread into this namespace.
    ///
    /// # Errors
    ///
    /// Fails without `CAP_SYS_ADMIN` or if the file is not a network namespace.
    pub fn enter(&self) -> io::Result<()> {
        move_into_link_name_space(self.file.as_fd(), Some(LinkNameSpaceType::Network))?;
        Ok(())
    }

    /// Run `f` with the calling thread inside this namespace, then switch back.
    ///
    /// # Errors
    ///
    /// Fails if the namespace cannot be entered or the original namespace
    /// cannot be restored.
    pub fn run<T>(&self, f: impl FnOnce() -> T) -> io::Result<T> {
        let origin = Self::current()?;
        self.enter()?;
        let restore = Restore {
            origin: Some(origin),
        };

        let value = f();
        restore.finish()?;
        Ok(value)
    }
}

impl Namespace for NetNs {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl AsFd for NetNs {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl AsRawFd for NetNs {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Namespace files live on nsfs, or on procfs for `/proc/<pid>/ns/net`.
#[allow(
    clippy::cast_lossless,
    clippy::cast_possible_wrap,
    clippy::unnecessary_cast
)]
fn is_namespace_fs(fs_type: i64) -> bool {
    fs_type == libc::NSFS_MAGIC as i64 || fs_type == libc::PROC_SUPER_MAGIC as i64
}

/// Switches the thread back to its original namespace, also on unwind.
struct Restore {
    origin: Option<NetNs>,
}

impl Restore {
    fn finish(mut self) -> io::Result<()> {
        match self.origin.take() {
            Some(origin) => origin.enter(),
            None => Ok(()),
        }
    }
}

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(origin) = self.origin.take() {
            if let Err(err) = origin.enter() {
                tracing::error!(path = %origin.path.display(), %err, "Failed to restore network namespace");
            }
        }
    }
}
