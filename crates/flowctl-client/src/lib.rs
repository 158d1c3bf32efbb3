//! HTTP client SDK for the workflow admin service.
//!
//! This crate provides a typed client for the admin endpoints flowctl uses.
//!
//! # Example
//!
//! ```no_run
//! use flowctl_client::{AdminClient, Identifier, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = AdminClient::builder()
//!     .base_url("http://localhost:30080")
//!     .auth_token("secret")
//!     .build()?;
//!
//! let id = Identifier::new("demo", "development", "core.basic.hello", "v1");
//! let task = client.tasks().get(&id).await?;
//! println!("{} ({})", task.id, task.spec.template.task_type);
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Tasks / Workflows / Launch plans**: register, get, list versions, list names
//! - **Launch plans**: activation state
//! - **Projects**: list and get
//! - **Data proxy**: upload locations and artifact upload

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use api::ListQuery;
pub use client::{AdminClient, ClientBuilder};
pub use error::{Error, Result};
pub use types::*;
