// handlers/mod.rs - one module per endpoint group
//
// Token handling is decided per route in app.rs: `dashboard`, `activity_logs`
// and the `me` / `create_user` auth endpoints sit behind `require_auth`;
// `upsert_user` reads a token only when the body names no user.
pub mod activity_logs;
pub mod auth;
pub mod dashboard;
pub mod financials;
pub mod patients;
pub mod public;
