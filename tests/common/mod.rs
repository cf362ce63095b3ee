//! Common test utilities and helpers.
//!
//! This module provides shared functionality for all tests, including:
//! - Document builders writing real `.docx` / `.xlsx` packages
//! - Readers and assertions for produced documents

#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
