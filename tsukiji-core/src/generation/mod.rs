//! Generation-based reclamation for lock-free readers.
//!
//! Readers pin the current [`Generation`] by holding a [`Guard`]. The single
//! writer advances the generation after every committed mutation and parks
//! superseded graph fragments on a [`HoldList`] tagged with the generation in
//! which they were replaced. A fragment is dropped only once
//! [`GenerationHandler::first_used_generation`] has moved past its tag, so no
//! guard that could still observe it remains alive.

mod handler;
mod hold;

pub use self::handler::{Generation, GenerationHandler, Guard};
pub use self::hold::{HoldList, Reclaimable};
