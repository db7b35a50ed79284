//! HTTP front end for r.a.m.
//!
//! Note storage and schema migrations live in `ram-core`; this crate adds
//! the session and auth middleware, the `/notes` routes and the server
//! lifecycle.

pub mod api;

pub use ram_core::{db, models};
