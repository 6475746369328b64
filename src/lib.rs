//! Text-to-speech studio core.
//!
//! Turns text into audio files through a small set of synthesis models:
//! preset voices, cloning from a reference recording, voices designed from a
//! description and multi-speaker dialogue. On top of single generations sit a
//! saved voice library, an audiobook pipeline and a side-by-side comparison.
//!
//! Models themselves run behind [`services::engine::ModelLoader`]; the
//! bundled [`services::engine::RemoteLoader`] talks to a local inference
//! server over HTTP.

pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod utils;

pub use errors::{StudioError, StudioResult};
