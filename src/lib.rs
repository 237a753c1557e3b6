pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod models;
pub mod rag;
pub mod session;
pub mod state;
