//! Core domain entities representing the business data model.
//!
//! Entities are plain data structures without business logic.
//!
//! # Entity Types
//!
//! - [`ShortenedUrl`] - A short identifier mapped to a normalized URL
//!
//! # Design Pattern
//!
//! Creation goes through a separate struct ([`NewShortenedUrl`]) so the store
//! never receives a click count from the caller.

pub mod shortened_url;

pub use shortened_url::{NewShortenedUrl, ShortenedUrl};
