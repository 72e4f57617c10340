pub mod origins;
pub mod user;
