//! Story Engine: a narrative state engine for branching visual novels.
//!
//! Loads a validated catalog of scenes and characters, keeps per-session
//! player and NPC state, applies the effects of chosen options, and
//! resolves render-ready views for an external renderer.

pub mod core;
pub mod schema;

pub use crate::core::controller::{EngineError, RejectReason, StoryEngine, Turn};
pub use crate::core::state::Session;
pub use crate::schema::view::{PlayerIntent, ViewModel};
