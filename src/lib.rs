pub mod analyzers;
pub mod config;
pub mod core;
pub mod service;
pub mod store;
pub mod web;
