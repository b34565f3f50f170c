pub mod alert_service;
pub mod auth;
pub mod billing;
pub mod movement_service;
pub mod product_service;
pub mod push;
pub mod storage;
