//! Business operations over the user store

mod user_service;

pub use user_service::UserService;
