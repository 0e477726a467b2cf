//! HTTP request handlers

pub mod captcha;
pub mod chat;
pub mod health;
pub mod kv;
