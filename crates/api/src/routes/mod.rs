pub mod games;
pub mod health;
pub mod sessions;
pub mod webhooks;
