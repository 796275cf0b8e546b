//! Script engines for uppm
//!
//! Two engines ship with uppm: [`CsupEngine`] for C#-script packs and
//! [`Ps1Engine`] for shell packs. Both extract metadata from their
//! delimiter style's header comment and delegate execution to an
//! external runtime command.

pub mod csup;
pub mod imports;
pub mod ps1;
pub mod runtime;

pub use csup::{CsupEngine, CSUP_EXTENSION};
pub use ps1::{Ps1Engine, PS1_EXTENSION};
pub use runtime::RuntimeCommand;
