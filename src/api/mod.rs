pub mod auth;
pub mod notes;
pub mod render;
pub mod response;
pub mod server;
pub mod session;

pub use server::{create_router, start, AppState, RunningServer, ServerConfig};
