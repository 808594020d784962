pub mod admin;
pub mod auth;
pub mod catalog;
pub mod rewards;
pub mod study;
pub mod users;
