//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod retry;
