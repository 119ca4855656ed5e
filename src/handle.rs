//! Lifecycle core shared by every handle type.
//!
//! A [`Handle`] owns one engine object. The pointer sits behind a read/write
//! lock: engine calls run under the read side, `close` takes the write side
//! to check and free. Handles other objects depend on also count their
//! dependents; registering happens under the read side so it cannot slip
//! past a concurrent close, releasing is a bare atomic decrement.

use crate::error::{Error, Result};
use std::{
    fmt,
    ptr::NonNull,
    sync::{
        PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
        atomic::{AtomicUsize, Ordering},
    },
};

/// An engine object type with a matching destructor.
pub(crate) trait Foreign {
    /// Name used in errors and log lines.
    const KIND: &'static str;

    /// # Safety
    /// `raw` came from the matching engine constructor and is not used
    /// afterwards.
    unsafe fn delete(raw: *mut Self);
}

pub(crate) struct Handle<T: Foreign> {
    raw: RwLock<Option<NonNull<T>>>,
    dependents: AtomicUsize,
}

// SAFETY: engine objects synchronise internally; the pointer itself is only
// freed under the write lock.
unsafe impl<T: Foreign + Sync> Send for Handle<T> {}
unsafe impl<T: Foreign + Sync> Sync for Handle<T> {}

impl<T: Foreign> Handle<T> {
    /// Takes ownership of a freshly created engine object.
    pub(crate) fn new(raw: *mut T) -> Result<Self> {
        let raw = NonNull::new(raw).ok_or(Error::CreationFailed(T::KIND))?;
        log::debug!("{} created", T::KIND);
        Ok(Self {
            raw: RwLock::new(Some(raw)),
            dependents: AtomicUsize::new(0),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<NonNull<T>>> {
        self.raw.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<NonNull<T>>> {
        self.raw.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the live object; it cannot be closed until `f` returns.
    pub(crate) fn with<R>(&self, f: impl FnOnce(*mut T) -> R) -> Result<R> {
        let guard = self.read();
        let raw = (*guard).ok_or(Error::InvalidState(T::KIND))?;
        Ok(f(raw.as_ptr()))
    }

    /// Like [`Handle::with`], but excludes every other caller. For engine
    /// objects that are not internally synchronised.
    pub(crate) fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> Result<R> {
        let guard = self.write();
        let raw = (*guard).ok_or(Error::InvalidState(T::KIND))?;
        Ok(f(raw.as_ptr()))
    }

    /// Like [`Handle::with`], but never waits. A close in progress counts as
    /// closed.
    pub(crate) fn try_with<R>(&self, f: impl FnOnce(*mut T) -> R) -> Result<R> {
        let guard = match self.raw.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(e)) => e.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(Error::InvalidState(T::KIND)),
        };
        let raw = (*guard).ok_or(Error::InvalidState(T::KIND))?;
        Ok(f(raw.as_ptr()))
    }

    /// Registers a dependent and returns the object it may use until it
    /// calls [`Handle::release`]. `None` once closed.
    pub(crate) fn register(&self) -> Option<*mut T> {
        let guard = self.read();
        let raw = (*guard)?;
        self.dependents.fetch_add(1, Ordering::AcqRel);
        Some(raw.as_ptr())
    }

    pub(crate) fn release(&self) {
        let prev = self.dependents.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "{} released more often than registered", T::KIND);
    }

    pub(crate) fn dependents(&self) -> usize {
        self.dependents.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.read().is_none()
    }

    /// Frees the object. `Ok(true)` if this call freed it, `Ok(false)` if it
    /// was already closed.
    pub(crate) fn close(&self) -> Result<bool> {
        let mut guard = self.write();
        let Some(raw) = *guard else {
            return Ok(false);
        };
        let count = self.dependents.load(Ordering::Acquire);
        if count > 0 {
            return Err(Error::StillReferenced {
                kind: T::KIND,
                count,
            });
        }
        *guard = None;
        // SAFETY: came from the engine constructor; nobody can reach it now.
        unsafe { T::delete(raw.as_ptr()) };
        log::debug!("{} closed", T::KIND);
        Ok(true)
    }

    /// Drop path: frees the object if the owner never closed it. Returns
    /// whether it did.
    pub(crate) fn release_on_drop(&mut self) -> bool {
        let raw = self
            .raw
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(raw) = raw else {
            return false;
        };
        if cfg!(debug_assertions) {
            log::warn!("{} dropped without close", T::KIND);
        }
        // SAFETY: as in `close`; `&mut self` rules out other users.
        unsafe { T::delete(raw.as_ptr()) };
        true
    }
}

impl<T: Foreign> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(T::KIND)
            .field("closed", &self.is_closed())
            .field("dependents", &self.dependents())
            .finish()
    }
}
