pub mod chat;
pub mod community;
pub mod registration;
