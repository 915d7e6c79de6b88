//! Natural-language to SQL service in front of a vLLM completion backend.

pub mod client;
pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
