// lib.rs - Exit-interview bot and transcript query service
pub mod bot;
pub mod channel;
pub mod completion_client;
pub mod config;
pub mod db;
pub mod handlers;
pub mod interview;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod store;
pub mod telegram_client;
