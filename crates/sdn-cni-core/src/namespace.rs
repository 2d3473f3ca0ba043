//! Network namespace scoping.
//!
//! Namespace membership is per thread. Work that must happen inside a
//! namespace runs through [`within`], which enters the namespace, runs the
//! block, and restores the previous namespace on every exit path.

use std::fs::File;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::sched::CloneFlags;

use sdn_cni_common::error::{CniError, Result};

/// Namespace file of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// A network namespace that blocks of work can be run inside.
pub trait NetNamespace {
    /// Path identifying the namespace, usable by child processes.
    fn path(&self) -> &Path;

    /// Runs `f` while the calling thread is attached to this namespace.
    ///
    /// Implementations must restore the previously attached namespace
    /// before returning, whether or not `f` succeeded.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or an error if entering or restoring the
    /// namespace fails.
    fn run(&self, f: &mut dyn FnMut() -> Result<()>) -> Result<()>;
}

/// Runs `f` inside `ns` and returns its value.
///
/// # Errors
///
/// Returns the error of `f`, or the namespace error if switching fails.
pub fn within<T>(ns: &dyn NetNamespace, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let mut f = Some(f);
    let mut value = None;
    ns.run(&mut || {
        if let Some(f) = f.take() {
            value = Some(f()?);
        }
        Ok(())
    })?;
    value.ok_or_else(|| CniError::Namespace {
        path: ns.path().to_path_buf(),
        source: std::io::Error::other("namespace block was not run"),
    })
}

/// A kernel network namespace held open by file descriptor.
#[derive(Debug)]
pub struct NetNs {
    file: File,
    path: PathBuf,
}

impl NetNs {
    /// Opens the namespace at `path`, e.g. `/var/run/netns/<name>` or
    /// `/proc/<pid>/ns/net`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CniError::Namespace {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Opens the namespace the calling thread is attached to.
    ///
    /// The returned path goes through this process's descriptor table, so
    /// it keeps naming the same namespace after the thread moves elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread's namespace file cannot be opened.
    pub fn current() -> Result<Self> {
        let file = File::open(THREAD_NETNS).map_err(|e| CniError::Namespace {
            path: PathBuf::from(THREAD_NETNS),
            source: e,
        })?;
        let path = PathBuf::from(format!(
            "/proc/{}/fd/{}",
            std::process::id(),
            file.as_raw_fd()
        ));
        Ok(Self { file, path })
    }

    fn attach(&self) -> Result<()> {
        nix::sched::setns(&self.file, CloneFlags::CLONE_NEWNET).map_err(|errno| {
            CniError::Namespace {
                path: self.path.clone(),
                source: std::io::Error::from(errno),
            }
        })
    }
}

impl NetNamespace for NetNs {
    fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, f: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        let guard = NsGuard::enter(self)?;
        let outcome = f();
        let restored = guard.restore();
        outcome.and(restored)
    }
}

/// Holds the namespace to return to while the thread is attached elsewhere.
struct NsGuard {
    previous: Option<NetNs>,
}

impl NsGuard {
    fn enter(target: &NetNs) -> Result<Self> {
        let previous = NetNs::current()?;
        target.attach()?;
        tracing::trace!(netns = %target.path.display(), "entered network namespace");
        Ok(Self {
            previous: Some(previous),
        })
    }

    fn restore(mut self) -> Result<()> {
        self.previous.take().map_or(Ok(()), |previous| previous.attach())
    }
}

impl Drop for NsGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = previous.attach() {
                tracing::error!(error = %e, "failed to restore network namespace");
            }
        }
    }
}
