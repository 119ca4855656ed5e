//! Cache of setting names in the engine's string form.

use crate::error::{Error, Result};
use std::{
    collections::HashMap,
    ffi::{CStr, CString},
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

/// Maps setting names to NUL-terminated copies, shared by every [`Settings`]
/// attached to it.
///
/// Each distinct name is converted once and reused until the last attached
/// settings object closes, at which point the whole cache is flushed.
/// Interned strings are reference counted, so a flush never invalidates one
/// that is still in use.
///
/// [`Settings`]: crate::Settings
#[derive(Debug, Default)]
pub struct NameInterner {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    names: HashMap<String, Arc<CStr>>,
    live: usize,
}

impl NameInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide interner used by [`Settings::new`].
    ///
    /// [`Settings::new`]: crate::Settings::new
    pub fn global() -> Arc<NameInterner> {
        static GLOBAL: OnceLock<Arc<NameInterner>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(NameInterner::new())))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached C form of `name`, converting it on first use.
    pub fn intern(&self, name: &str) -> Result<Arc<CStr>> {
        let mut state = self.state();
        if let Some(cached) = state.names.get(name) {
            return Ok(Arc::clone(cached));
        }
        let converted: Arc<CStr> = CString::new(name)
            .map_err(|_| Error::InvalidArgument(format!("setting name {name:?} contains NUL")))?
            .into();
        state.names.insert(name.to_owned(), Arc::clone(&converted));
        Ok(converted)
    }

    pub(crate) fn attach(&self) {
        self.state().live += 1;
    }

    /// Drops one attached settings object; the last one out flushes.
    pub(crate) fn detach(&self) {
        let mut state = self.state();
        state.live = state.live.saturating_sub(1);
        if state.live == 0 && !state.names.is_empty() {
            log::debug!("flushing {} interned setting names", state.names.len());
            state.names.clear();
        }
    }

    /// Number of cached names.
    pub fn len(&self) -> usize {
        self.state().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of open settings objects attached to this interner.
    pub fn live_handles(&self) -> usize {
        self.state().live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_string() {
        let interner = NameInterner::new();
        let a = interner.intern("synth.gain").unwrap();
        let b = interner.intern("synth.gain").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.to_str().unwrap(), "synth.gain");
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn nul_is_rejected() {
        let interner = NameInterner::new();
        assert!(matches!(
            interner.intern("synth\0gain"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(interner.is_empty());
    }

    #[test]
    fn last_detach_flushes() {
        let interner = NameInterner::new();
        interner.attach();
        interner.attach();
        let kept = interner.intern("audio.driver").unwrap();

        interner.detach();
        assert_eq!(interner.len(), 1);
        interner.detach();
        assert!(interner.is_empty());
        assert_eq!(interner.live_handles(), 0);
        // Outstanding copies stay valid after the flush.
        assert_eq!(kept.to_str().unwrap(), "audio.driver");
    }
}
