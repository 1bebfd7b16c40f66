pub mod community;
pub mod user;
