//! Cached, typed document-collection handles for host applications.
//!
//! This crate is the core of the docreg project and provides:
//!
//! - **Mapped types** ([`document`]) - Traits and descriptors for document types
//! - **Key inference** ([`key`]) - Finding each mapped type's primary key
//! - **Store backend abstraction** ([`backend`]) - The driver boundary and connectors
//! - **Configuration** ([`config`]) - Connection settings parsed from the host's configuration
//! - **Connection management** ([`connection`]) - The application's single database connection
//! - **Collection handles** ([`collection`]) - Typed access to one named collection
//! - **Collection registry** ([`registry`]) - One cached handle per collection and type
//! - **Lifecycle** ([`lifecycle`]) - Start and stop hooks for the host application
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docreg::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
//! pub struct User {
//!     #[key]
//!     pub email: String,
//!     pub name: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docreg_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod connection;
pub mod document;
pub mod error;
pub mod key;
pub mod lifecycle;
pub mod registry;
