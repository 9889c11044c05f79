pub mod app;
pub mod config;
pub mod error;
pub mod financials;
pub mod handlers;
pub mod managed;
pub mod middleware;
pub mod services;

pub use app::{app, AppState};
