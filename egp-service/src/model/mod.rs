//! Domain records and their transport shapes

mod user;

pub use user::{User, UserDto, UserId};
