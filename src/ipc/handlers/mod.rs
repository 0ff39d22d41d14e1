pub mod admin;
pub mod attendance;
pub mod auth;
pub mod classes;
pub mod core;
pub mod export;
