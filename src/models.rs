pub mod alerts;
pub mod auth;
pub mod movement;
pub mod notification;
pub mod product;
pub mod subscription;
