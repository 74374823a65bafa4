//! Backend for the painting company's website: single-use review links,
//! customer reviews and the Google testimonials import.
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod testimonials;
