//! Songngu - a bilingual (English/Vietnamese) blog content service
//!
//! This library provides the content store, its SQL persistence and the
//! HTTP API on top of it.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
