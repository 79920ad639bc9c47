//! Reel Core
//!
//! Core types and abstractions for the Reel job scheduling system.
//!
//! This crate contains:
//! - Domain types: Core business entities (Job, Runner, etc.)
//! - DTOs: Data transfer objects exchanged with runner processes

pub mod domain;
pub mod dto;
