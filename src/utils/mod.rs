//! Utility functions for URL safety, code generation and request handling.
//!
//! This module provides helper functions used across the application:
//!
//! - [`address_safety`] - Public-routability checks for hosts and IPs
//! - [`url_validator`] - SSRF-aware URL validation and reachability probing
//! - [`url_normalizer`] - URL normalization
//! - [`code_generator`] - Short identifier generation and validation
//! - [`client_ip`] - Client identity extraction from HTTP headers
//! - [`db_error`] - Database error classification

pub mod address_safety;
pub mod client_ip;
pub mod code_generator;
pub mod db_error;
pub mod url_normalizer;
pub mod url_validator;
