//! Domain models for the drugx system.

mod adverse_event;
mod drug;
mod failure;
mod interaction;
mod report;

pub use adverse_event::*;
pub use drug::*;
pub use failure::*;
pub use interaction::*;
pub use report::*;
