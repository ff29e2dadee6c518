//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Structured logging
//! - Text file I/O with open-mode flags

pub mod math;
pub mod logging;
pub mod file_io;
