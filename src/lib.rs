//! Slideshow Video Generation Service
//!
//! Turns a directory of uploaded images, optional text overlays and an optional
//! background track into an MP4 slideshow. Jobs are rendered in the background
//! by a bounded worker pool and tracked in an in-memory registry.

pub mod app_state;
pub mod config;
pub mod models;
pub mod render;
pub mod routes;
pub mod services;
