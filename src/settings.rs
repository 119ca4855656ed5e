//! Settings handle: typed access to the engine's configuration table.

use crate::{
    error::{Error, Result},
    ffi::{self, FLUID_OK, RawSettings},
    handle::{Foreign, Handle},
    interner::NameInterner,
};
use std::{
    ffi::{CStr, CString, c_char},
    sync::Arc,
};

impl Foreign for RawSettings {
    const KIND: &'static str = "settings";

    unsafe fn delete(raw: *mut Self) {
        unsafe { ffi::delete_settings(raw) }
    }
}

/// Engine configuration. Every [`Synth`](crate::Synth) and driver created from
/// it counts as a dependent, and [`Settings::close`] refuses while any of them
/// is still open.
#[derive(Debug)]
pub struct Settings {
    handle: Handle<RawSettings>,
    interner: Arc<NameInterner>,
}

impl Settings {
    /// Creates settings with engine defaults, attached to the process-wide
    /// name interner.
    pub fn new() -> Result<Arc<Self>> {
        Self::with_interner(NameInterner::global())
    }

    pub fn with_interner(interner: Arc<NameInterner>) -> Result<Arc<Self>> {
        let handle = Handle::new(ffi::new_settings())?;
        interner.attach();
        Ok(Arc::new(Self { handle, interner }))
    }

    /// Runs an engine accessor with the interned form of `name`.
    fn call<R>(&self, name: &str, f: impl FnOnce(*mut RawSettings, *const c_char) -> R) -> Result<R> {
        self.handle.with(|raw| {
            let key = self.interner.intern(name)?;
            Ok(f(raw, key.as_ptr()))
        })?
    }

    pub fn set_int(&self, name: &str, value: i32) -> Result<()> {
        let status = self.call(name, |raw, key| unsafe { ffi::settings_setint(raw, key, value) })?;
        if status != FLUID_OK {
            return Err(Error::SetFailed(name.to_owned()));
        }
        Ok(())
    }

    pub fn set_num(&self, name: &str, value: f64) -> Result<()> {
        let status = self.call(name, |raw, key| unsafe { ffi::settings_setnum(raw, key, value) })?;
        if status != FLUID_OK {
            return Err(Error::SetFailed(name.to_owned()));
        }
        Ok(())
    }

    pub fn set_str(&self, name: &str, value: &str) -> Result<()> {
        let value = CString::new(value)
            .map_err(|_| Error::InvalidArgument(format!("value for {name:?} contains NUL")))?;
        let status = self.call(name, |raw, key| unsafe {
            ffi::settings_setstr(raw, key, value.as_ptr())
        })?;
        if status != FLUID_OK {
            return Err(Error::SetFailed(name.to_owned()));
        }
        Ok(())
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        let mut value = 0;
        let status = self.call(name, |raw, key| unsafe {
            ffi::settings_getint(raw, key, &mut value)
        })?;
        if status != FLUID_OK {
            return Err(Error::GetFailed(name.to_owned()));
        }
        Ok(value)
    }

    pub fn get_num(&self, name: &str) -> Result<f64> {
        let mut value = 0.0;
        let status = self.call(name, |raw, key| unsafe {
            ffi::settings_getnum(raw, key, &mut value)
        })?;
        if status != FLUID_OK {
            return Err(Error::GetFailed(name.to_owned()));
        }
        Ok(value)
    }

    /// Current value of a string setting.
    pub fn get_str(&self, name: &str) -> Result<String> {
        self.call(name, |raw, key| {
            let mut copy: *mut c_char = std::ptr::null_mut();
            if unsafe { ffi::settings_dupstr(raw, key, &mut copy) } != FLUID_OK || copy.is_null() {
                return None;
            }
            let value = unsafe { CStr::from_ptr(copy) }
                .to_string_lossy()
                .into_owned();
            unsafe { ffi::free_string(copy) };
            Some(value)
        })?
        .ok_or_else(|| Error::GetFailed(name.to_owned()))
    }

    pub fn get_str_default(&self, name: &str) -> Result<String> {
        self.call(name, |raw, key| {
            let mut default: *const c_char = std::ptr::null();
            if unsafe { ffi::settings_getstr_default(raw, key, &mut default) } != FLUID_OK
                || default.is_null()
            {
                return None;
            }
            // Owned by the settings object, which the read lock keeps alive.
            Some(
                unsafe { CStr::from_ptr(default) }
                    .to_string_lossy()
                    .into_owned(),
            )
        })?
        .ok_or_else(|| Error::GetFailed(name.to_owned()))
    }

    /// Values a string setting accepts, sorted and without duplicates.
    /// Free-form settings yield an empty list.
    pub fn get_options(&self, name: &str) -> Result<Vec<String>> {
        const SEPARATOR: &CStr = c", ";
        let joined = self.call(name, |raw, key| {
            let joined = unsafe { ffi::settings_option_concat(raw, key, SEPARATOR.as_ptr()) };
            if joined.is_null() {
                return None;
            }
            let text = unsafe { CStr::from_ptr(joined) }
                .to_string_lossy()
                .into_owned();
            unsafe { ffi::free_string(joined) };
            Some(text)
        })?;
        let joined = joined.ok_or_else(|| Error::QueryFailed(name.to_owned()))?;
        Ok(joined
            .split(", ")
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Frees the engine object. Fails while dependents are open; closing twice
    /// is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.handle.close()? {
            self.interner.detach();
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Number of open handles created from these settings.
    pub fn dependents(&self) -> usize {
        self.handle.dependents()
    }

    pub fn interner(&self) -> &Arc<NameInterner> {
        &self.interner
    }

    /// Registers a dependent; fails once closed.
    pub(crate) fn acquire(&self) -> Result<*mut RawSettings> {
        self.handle
            .register()
            .ok_or_else(|| Error::InvalidArgument("settings are closed".to_owned()))
    }

    pub(crate) fn release(&self) {
        self.handle.release();
    }
}

impl Drop for Settings {
    fn drop(&mut self) {
        if self.handle.release_on_drop() {
            self.interner.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Arc<Settings> {
        Settings::with_interner(Arc::new(NameInterner::new())).unwrap()
    }

    #[test]
    fn typed_round_trip() {
        let s = settings();
        s.set_int("synth.polyphony", 128).unwrap();
        assert_eq!(s.get_int("synth.polyphony").unwrap(), 128);
        s.set_num("synth.gain", 0.5).unwrap();
        assert_eq!(s.get_num("synth.gain").unwrap(), 0.5);
        s.set_str("player.timing-source", "system").unwrap();
        assert_eq!(s.get_str("player.timing-source").unwrap(), "system");
        assert_eq!(s.get_str_default("player.timing-source").unwrap(), "sample");
        s.close().unwrap();
    }

    #[test]
    fn engine_rejections_name_the_key() {
        let s = settings();
        assert!(matches!(
            s.set_int("synth.polyphony", 0),
            Err(Error::SetFailed(k)) if k == "synth.polyphony"
        ));
        assert!(matches!(
            s.get_int("no.such.key"),
            Err(Error::GetFailed(k)) if k == "no.such.key"
        ));
        assert!(matches!(
            s.get_options("synth.gain"),
            Err(Error::QueryFailed(_))
        ));
        s.close().unwrap();
    }

    #[test]
    fn options_are_split() {
        let s = settings();
        assert_eq!(
            s.get_options("audio.file.type").unwrap(),
            ["auto", "raw", "wav"]
        );
        assert!(s.get_options("audio.file.name").unwrap().is_empty());
        s.close().unwrap();
    }

    #[test]
    fn close_detaches_from_interner() {
        let interner = Arc::new(NameInterner::new());
        let s = Settings::with_interner(Arc::clone(&interner)).unwrap();
        s.get_int("synth.polyphony").unwrap();
        assert_eq!(interner.live_handles(), 1);
        assert_eq!(interner.len(), 1);

        s.close().unwrap();
        s.close().unwrap();
        assert_eq!(interner.live_handles(), 0);
        assert!(interner.is_empty());
        assert!(matches!(
            s.get_int("synth.polyphony"),
            Err(Error::InvalidState("settings"))
        ));
    }
}
