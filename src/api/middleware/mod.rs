// Middleware module - Session state and admin gate

pub mod auth;
pub mod session;
