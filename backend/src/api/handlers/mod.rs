pub mod analyses;
pub mod auth;
pub mod billing;
pub mod health;
pub mod webhooks;
