//! Web form for running research
//!
//! `GET /` shows the ticker form, `POST /research` runs the crew and renders
//! the newsletter, `POST /api/research` returns the raw crew output as JSON.

pub mod markdown;
pub mod routes;
pub mod templates;

pub use routes::{AppState, EMPTY_TICKET_MESSAGE, router, serve};
