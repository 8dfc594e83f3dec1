//! # Quill Core
//!
//! The domain layer of the Quill blog backend.
//! This crate contains pure business logic with zero infrastructure
//! dependencies: entities, the authorization policy, pagination, the
//! ports to external collaborators, and the application services.

pub mod authz;
pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod service;

pub use error::{DomainError, DomainResult};
