pub mod account;
pub mod invitation;
pub mod member;
pub mod origin;
