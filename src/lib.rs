//! Margin Notes Server Library
//!
//! This crate exposes the server's internals for integration testing.
//! The main server binary is in main.rs.
//!
//! # Modules
//!
//! - `chat`: Retrieval-augmented chat orchestration and delta framing
//! - `webhook`: Payment-provider webhook verification and event handling
//! - `db`: SQLite repositories for users, files and messages
//! - `billing`: Subscription plans and the derived subscription read-model

pub mod billing;
pub mod chat;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
pub mod webhook;
