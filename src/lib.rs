//! Safe handles over a FluidSynth-style synthesis engine.
//!
//! The engine itself lives in [`ffi`]: a C-shaped surface of raw pointers and
//! integer status codes, backed by OxiSynth, CPAL, midir and hound. The
//! handles in this crate wrap those objects with an explicit lifecycle:
//!
//! * every handle can be closed exactly once; later calls fail with
//!   [`Error::InvalidState`] and closing again is a no-op;
//! * a handle other handles were created from counts them, and refuses to
//!   close while any is open ([`Error::StillReferenced`]);
//! * dropping a handle that was never closed frees its engine object.
//!
//! ```no_run
//! use oxifluid::{AudioDriver, Settings, Synth};
//!
//! # fn main() -> oxifluid::Result<()> {
//! let settings = Settings::new()?;
//! settings.set_num("synth.gain", 0.5)?;
//! let synth = Synth::new(&settings)?;
//! synth.load_soundfont("font.sf2", true)?;
//! let driver = AudioDriver::new(&settings, &synth)?;
//! synth.note_on(0, 60, 100)?;
//! // ...
//! driver.close()?;
//! synth.close()?;
//! settings.close()?;
//! # Ok(())
//! # }
//! ```

mod audio;
mod error;
pub mod ffi;
mod handle;
mod interner;
mod midi;
mod player;
mod renderer;
mod settings;
mod synth;

pub use audio::AudioDriver;
pub use error::{Error, Operation, Result};
pub use interner::NameInterner;
pub use midi::MidiDriver;
pub use player::{Player, PlayerStatus, TempoMode};
pub use renderer::FileRenderer;
pub use settings::Settings;
pub use synth::{ChorusMode, ChorusParam, FontId, FxGroup, ReverbParam, Synth, TuningId};
