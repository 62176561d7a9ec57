//! Engine core: catalog loading, session state, the write and read paths, and the controller.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod effects;
pub mod resolver;
pub mod state;
pub mod walk;
