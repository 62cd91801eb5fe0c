pub mod account;
pub mod admin;
pub mod post;
pub mod student;
pub mod user;
