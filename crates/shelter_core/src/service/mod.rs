//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate collection calls into dashboard-level operations.
//! - Keep callers decoupled from storage details.

pub mod credential_service;
pub mod record_manager;
