//! User accounts and admin user management

pub mod handlers;
pub mod models;
pub mod service;

pub use models::{User, UserDto, UserRole};
pub use service::UserService;
