//! Typed settings table with defaults, ranges and option lists.

use super::{FLUID_FAILED, FLUID_OK, into_c_string, status, text};
use std::{
    collections::BTreeMap,
    ffi::{CString, c_char, c_double, c_int},
    sync::{Mutex, MutexGuard, PoisonError},
};

enum Value {
    Int {
        value: i32,
        min: i32,
        max: i32,
    },
    Num {
        value: f64,
        min: f64,
        max: f64,
    },
    Str {
        value: String,
        default: CString,
        options: Vec<String>,
    },
}

impl Value {
    fn int(default: i32, min: i32, max: i32) -> Self {
        Value::Int {
            value: default,
            min,
            max,
        }
    }

    fn num(default: f64, min: f64, max: f64) -> Self {
        Value::Num {
            value: default,
            min,
            max,
        }
    }

    fn str(default: &str, options: &[&str]) -> Self {
        Self::str_owned(
            default.to_owned(),
            options.iter().map(|o| (*o).to_owned()).collect(),
        )
    }

    fn str_owned(default: String, options: Vec<String>) -> Self {
        // Defaults are compile-time names or host names; neither holds NUL.
        let c_default = CString::new(default.clone()).unwrap_or_default();
        Value::Str {
            value: default,
            default: c_default,
            options,
        }
    }
}

pub struct RawSettings {
    table: Mutex<BTreeMap<&'static str, Value>>,
}

impl RawSettings {
    fn with_defaults() -> Self {
        let hosts: Vec<String> = cpal::available_hosts()
            .iter()
            .map(|id| id.name().to_lowercase())
            .collect();
        let default_host = hosts.first().cloned().unwrap_or_default();

        let midi_backend = if cfg!(target_os = "linux") {
            "alsa"
        } else if cfg!(target_os = "macos") {
            "coremidi"
        } else if cfg!(target_os = "windows") {
            "winmm"
        } else {
            "midir"
        };

        let mut table = BTreeMap::new();
        table.insert("synth.sample-rate", Value::num(44100.0, 8000.0, 96000.0));
        table.insert("synth.gain", Value::num(0.2, 0.0, 10.0));
        table.insert("synth.polyphony", Value::int(256, 1, 65535));
        table.insert("synth.midi-channels", Value::int(16, 16, 255));
        table.insert("synth.reverb.active", Value::int(1, 0, 1));
        table.insert("synth.chorus.active", Value::int(1, 0, 1));
        table.insert("synth.effects-groups", Value::int(1, 1, 1));
        table.insert("audio.driver", Value::str_owned(default_host, hosts));
        table.insert("audio.period-size", Value::int(64, 64, 8192));
        table.insert("audio.file.name", Value::str("fluidsynth.wav", &[]));
        table.insert("audio.file.type", Value::str("auto", &["auto", "raw", "wav"]));
        table.insert("audio.file.format", Value::str("s16", &["float", "s16"]));
        table.insert("midi.driver", Value::str(midi_backend, &[midi_backend]));
        table.insert("midi.portname", Value::str("", &[]));
        table.insert("midi.autoconnect", Value::int(0, 0, 1));
        table.insert(
            "player.timing-source",
            Value::str("sample", &["sample", "system"]),
        );
        table.insert("player.reset-synth", Value::int(1, 0, 1));

        Self {
            table: Mutex::new(table),
        }
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<&'static str, Value>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn int(&self, name: &str) -> Option<i32> {
        match self.table().get(name)? {
            Value::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn num(&self, name: &str) -> Option<f64> {
        match self.table().get(name)? {
            Value::Num { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn string(&self, name: &str) -> Option<String> {
        match self.table().get(name)? {
            Value::Str { value, .. } => Some(value.clone()),
            _ => None,
        }
    }

    fn set_int(&self, name: &str, new: i32) -> bool {
        match self.table().get_mut(name) {
            Some(Value::Int {
                value, min, max, ..
            }) if (*min..=*max).contains(&new) => {
                *value = new;
                true
            }
            _ => false,
        }
    }

    fn set_num(&self, name: &str, new: f64) -> bool {
        match self.table().get_mut(name) {
            Some(Value::Num {
                value, min, max, ..
            }) if new >= *min && new <= *max => {
                *value = new;
                true
            }
            _ => false,
        }
    }

    fn set_str(&self, name: &str, new: &str) -> bool {
        match self.table().get_mut(name) {
            Some(Value::Str { value, options, .. })
                if options.is_empty() || options.iter().any(|o| o == new) =>
            {
                *value = new.to_owned();
                true
            }
            _ => false,
        }
    }
}

pub fn new_settings() -> *mut RawSettings {
    Box::into_raw(Box::new(RawSettings::with_defaults()))
}

/// # Safety
/// `settings` is null or came from [`new_settings`] and was not deleted yet.
pub unsafe fn delete_settings(settings: *mut RawSettings) {
    if !settings.is_null() {
        drop(unsafe { Box::from_raw(settings) });
    }
}

/// Resolves the settings pointer and setting name shared by every accessor.
///
/// # Safety
/// Same contract as the public accessors.
unsafe fn resolve<'a>(
    settings: *mut RawSettings,
    name: *const c_char,
) -> Option<(&'a RawSettings, &'a str)> {
    let settings = unsafe { settings.as_ref() }?;
    let name = unsafe { text(name) }?;
    Some((settings, name))
}

/// # Safety
/// `settings` is a live settings object; `name` is a NUL-terminated string.
pub unsafe fn settings_setint(settings: *mut RawSettings, name: *const c_char, val: c_int) -> c_int {
    match unsafe { resolve(settings, name) } {
        Some((s, name)) => status(s.set_int(name, val)),
        None => FLUID_FAILED,
    }
}

/// # Safety
/// See [`settings_setint`].
pub unsafe fn settings_setnum(
    settings: *mut RawSettings,
    name: *const c_char,
    val: c_double,
) -> c_int {
    match unsafe { resolve(settings, name) } {
        Some((s, name)) => status(s.set_num(name, val)),
        None => FLUID_FAILED,
    }
}

/// # Safety
/// See [`settings_setint`]; `val` is a NUL-terminated string.
pub unsafe fn settings_setstr(
    settings: *mut RawSettings,
    name: *const c_char,
    val: *const c_char,
) -> c_int {
    let val = unsafe { text(val) };
    match (unsafe { resolve(settings, name) }, val) {
        (Some((s, name)), Some(val)) => status(s.set_str(name, val)),
        _ => FLUID_FAILED,
    }
}

/// # Safety
/// See [`settings_setint`]; `val` is valid for writes.
pub unsafe fn settings_getint(
    settings: *mut RawSettings,
    name: *const c_char,
    val: *mut c_int,
) -> c_int {
    let Some((s, name)) = (unsafe { resolve(settings, name) }) else {
        return FLUID_FAILED;
    };
    match (s.int(name), unsafe { val.as_mut() }) {
        (Some(v), Some(out)) => {
            *out = v;
            FLUID_OK
        }
        _ => FLUID_FAILED,
    }
}

/// # Safety
/// See [`settings_getint`].
pub unsafe fn settings_getnum(
    settings: *mut RawSettings,
    name: *const c_char,
    val: *mut c_double,
) -> c_int {
    let Some((s, name)) = (unsafe { resolve(settings, name) }) else {
        return FLUID_FAILED;
    };
    match (s.num(name), unsafe { val.as_mut() }) {
        (Some(v), Some(out)) => {
            *out = v;
            FLUID_OK
        }
        _ => FLUID_FAILED,
    }
}

/// Stores a pointer to the default string of `name` in `def`. The pointer
/// stays valid until the settings object is deleted.
///
/// # Safety
/// See [`settings_getint`].
pub unsafe fn settings_getstr_default(
    settings: *mut RawSettings,
    name: *const c_char,
    def: *mut *const c_char,
) -> c_int {
    let Some((s, name)) = (unsafe { resolve(settings, name) }) else {
        return FLUID_FAILED;
    };
    let Some(out) = (unsafe { def.as_mut() }) else {
        return FLUID_FAILED;
    };
    match s.table().get(name) {
        Some(Value::Str { default, .. }) => {
            // The CString's heap buffer does not move when the map rebalances.
            *out = default.as_ptr();
            FLUID_OK
        }
        _ => FLUID_FAILED,
    }
}

/// Stores a freshly allocated copy of the current string value in `copy`.
/// Free it with [`super::free_string`].
///
/// # Safety
/// See [`settings_getint`].
pub unsafe fn settings_dupstr(
    settings: *mut RawSettings,
    name: *const c_char,
    copy: *mut *mut c_char,
) -> c_int {
    let Some((s, name)) = (unsafe { resolve(settings, name) }) else {
        return FLUID_FAILED;
    };
    let Some(out) = (unsafe { copy.as_mut() }) else {
        return FLUID_FAILED;
    };
    match s.string(name).map(into_c_string) {
        Some(dup) if !dup.is_null() => {
            *out = dup;
            FLUID_OK
        }
        _ => FLUID_FAILED,
    }
}

/// Joins the options of a string setting with `separator`. Returns null for
/// unknown or non-string settings. Free the result with
/// [`super::free_string`].
///
/// # Safety
/// See [`settings_setint`]; `separator` is null or a NUL-terminated string.
pub unsafe fn settings_option_concat(
    settings: *mut RawSettings,
    name: *const c_char,
    separator: *const c_char,
) -> *mut c_char {
    let Some((s, name)) = (unsafe { resolve(settings, name) }) else {
        return std::ptr::null_mut();
    };
    let separator = unsafe { text(separator) }.unwrap_or(", ");
    match s.table().get(name) {
        Some(Value::Str { options, .. }) => {
            let mut sorted = options.clone();
            sorted.sort();
            sorted.dedup();
            into_c_string(sorted.join(separator))
        }
        _ => std::ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_and_types_are_enforced() {
        let s = RawSettings::with_defaults();
        assert!(s.set_int("synth.polyphony", 64));
        assert_eq!(s.int("synth.polyphony"), Some(64));
        assert!(!s.set_int("synth.polyphony", 0));
        assert!(!s.set_int("synth.gain", 1));
        assert!(!s.set_num("synth.gain", 11.0));
        assert!(!s.set_int("no.such.key", 1));
        assert_eq!(s.int("synth.polyphony"), Some(64));
    }

    #[test]
    fn string_options_restrict_values() {
        let s = RawSettings::with_defaults();
        assert!(s.set_str("player.timing-source", "system"));
        assert!(!s.set_str("player.timing-source", "sundial"));
        assert_eq!(s.string("player.timing-source").as_deref(), Some("system"));
        // Free-form string.
        assert!(s.set_str("audio.file.name", "/tmp/out.raw"));
    }

    #[test]
    fn option_concat_is_sorted() {
        let settings = new_settings();
        let name = CString::new("audio.file.type").unwrap();
        let sep = CString::new("|").unwrap();
        unsafe {
            let joined = settings_option_concat(settings, name.as_ptr(), sep.as_ptr());
            assert!(!joined.is_null());
            let owned = CString::from_raw(joined);
            assert_eq!(owned.to_str().unwrap(), "auto|raw|wav");
            delete_settings(settings);
        }
    }
}
