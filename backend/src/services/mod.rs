//! Domain services and outbound provider clients.

pub mod ai_service;
pub mod analysis_service;
pub mod auth_service;
pub mod email_service;
pub mod metrics_service;
pub mod payment_service;
pub mod scheduler_service;
pub mod subscription_service;
