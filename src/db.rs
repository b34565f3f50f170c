pub mod user_repo;
pub use user_repo::UserRepository;
pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod movement_repo;
pub use movement_repo::MovementRepository;
pub mod subscription_repo;
pub use subscription_repo::SubscriptionRepository;
pub mod device_token_repo;
pub use device_token_repo::DeviceTokenRepository;
