//! Feedreader - A single-feed RSS/Atom reader widget
//!
//! This crate loads one feed at a time from a fixed registry, renders its
//! entries into a feed container and exposes a collapsible menu for
//! switching between feeds.

pub mod config;
pub mod fetcher;
pub mod loader;
pub mod menu;
pub mod registry;
pub mod render;
pub mod routes;
