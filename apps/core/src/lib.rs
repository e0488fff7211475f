//! Client core for the resume tailoring product.
//!
//! Owns the asynchronous job-polling and optimistic-edit state machines:
//! upload lifecycle, tailoring job poller, versioned edit session, and the
//! submission flow that ties them together. Everything remote goes through
//! the narrow service traits in [`services`]; the UI layer consumes the
//! observable state each component exposes.

pub mod app;
pub mod config;
pub mod editor;
pub mod errors;
pub mod models;
pub mod services;
pub mod submit;
pub mod tailoring;
pub mod upload;

pub use app::{init_tracing, TailorApp};
pub use config::Config;
