pub mod app;
pub mod chat;
pub mod client;
pub mod config;
pub mod handler;
pub mod tui;
pub mod ui;
