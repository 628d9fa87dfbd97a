//! Database models (SQLx).

pub mod analysis;
pub mod password_reset;
pub mod subscription;
pub mod user;
