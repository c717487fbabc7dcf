//! Aegis Core Types and Traits
//!
//! This crate provides the fundamental types shared across the gateway:
//! - Provider trait abstraction and response types
//! - Core error types

pub mod error;
pub mod provider;

pub use error::{Error, Result};
pub use provider::{
    CompletionOptions, CompletionProvider, FinishReason, ProviderErrorKind, ProviderResponse,
};
