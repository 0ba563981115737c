//! keydiff-core: Core library for keydiff
//!
//! This crate drives independently written terminal key encoders through
//! the same key events and reports where their output diverges from the
//! kitty keyboard protocol reference.
//!
//! # Architecture
//!
//! ```text
//! Key Catalog → Matrix → Run Controller → Executor (reference, target)
//!                              ↓
//!                 Normalizer → Classifier → Artifacts
//! ```
//!
//! # Modules
//!
//! - `keys`: Key catalog with X11 keycodes
//! - `matrix`: Deterministic, resumable test matrix
//! - `target`: Target descriptors and registry
//! - `exec`: Tester invocation under a hard timeout
//! - `normalize`: Display form of raw output
//! - `classify`: Status policy, per-key aggregate and counters
//! - `report`: Results file, mismatch log and summary rendering
//! - `runner`: Run controller
//! - `config`: Configuration management
//! - `logging`: Structured logging setup
//!
//! # Safety
//!
//! This crate forbids unsafe code.

#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod error;
pub mod exec;
pub mod keys;
pub mod logging;
pub mod matrix;
pub mod normalize;
pub mod report;
pub mod runner;
pub mod target;

pub use error::{Error, Result};
