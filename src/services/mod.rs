// Services module - Business logic

pub mod card_service;
pub mod password;
pub mod qr_generator;
pub mod scan_payload;
pub mod token;
