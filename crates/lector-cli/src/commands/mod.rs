//! Command handlers

pub mod config;
pub mod document;
pub mod extract;
pub mod message;
pub mod status;
