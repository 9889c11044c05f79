// handlers/auth/mod.rs - clinic user records behind managed-service identities

pub mod create_user;
pub mod me;
pub mod upsert_user;

pub use create_user::create_user;
pub use me::me;
pub use upsert_user::upsert_user;

/// Treat `""` like an absent field
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
