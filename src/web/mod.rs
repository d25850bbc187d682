//! Web module - browser UI over the session state machine.
//!
//! GET `/` renders the whole page; every POST applies one session
//! action and redirects back.

mod routes;
mod server;
mod views;

pub use routes::{HealthResponse, Session, SESSION_COOKIE};
pub use server::*;
pub use views::page;
