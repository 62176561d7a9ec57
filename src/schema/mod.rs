//! Story data model: catalog records, mood rules, and the renderer contract.

pub mod character;
pub mod mood_rule;
pub mod scene;
pub mod view;
