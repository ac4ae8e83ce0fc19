// src/session/mod.rs

//! Timed quiz sessions.
//!
//! [`machine::AttemptSession`] is the synchronous state machine,
//! [`handle::LiveSession`] pairs it with a cancellable countdown, and
//! [`registry::SessionRegistry`] keeps live sessions addressable by id.

pub mod countdown;
pub mod handle;
pub mod machine;
pub mod registry;

pub use handle::LiveSession;
pub use machine::{
    AttemptSession, FinalizeTrigger, SessionCommandError, SessionErrorKind, SessionState,
    SessionStatus, StatusKind,
};
pub use registry::SessionRegistry;
