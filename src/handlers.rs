pub mod alerts;
pub mod auth;
pub mod billing;
pub mod movements;
pub mod notifications;
pub mod products;
