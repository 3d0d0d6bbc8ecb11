//! Weather dashboard library
//!
//! Polls current conditions for a list of tracked cities plus a searched
//! city, renders them as text and writes a world map of the results.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod map;
pub mod refresh;
pub mod ui;
