#![forbid(unsafe_code)]

//! compat-session — legacy session loader.
//!
//! Library entry point for turning session files written by older tool
//! versions into the current [`CanonicalSession`](model::CanonicalSession)
//! shape. The binary (`main.rs`) is a thin CLI wrapper around this library.

pub mod chain;
pub mod discovery;
pub mod error;
pub mod loaders;
pub mod model;
pub mod raw;
