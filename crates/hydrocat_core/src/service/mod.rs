//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate catalog sources into caller-facing page APIs.
//! - Keep CLI/HTTP layers decoupled from storage details.

pub mod catalog_service;
