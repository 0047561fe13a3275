//! Client for the docflow documentation backend: uploads a screen recording or
//! screenshot, follows processing and browses the generated documentation.

pub mod api;
pub mod backend;
pub mod clipboard;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod job;
pub mod notice;
pub mod render;
pub mod viewer;

#[cfg(test)]
mod testing;
