//! Local single-node sandbox over a container runtime.
//!
//! The sandbox is one privileged container running the whole control plane.
//! This crate finds, starts, tears down and execs into it through the
//! [`ContainerRuntime`] trait; [`DockerCli`] drives the `docker` binary.
//!
//! # Example
//!
//! ```no_run
//! use flowctl_sandbox::{SandboxConfig, SandboxManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = SandboxManager::docker(SandboxConfig::default())?;
//!     match manager.get_sandbox().await? {
//!         Some(c) => println!("{} is {}", c.image, c.state),
//!         None => println!("no sandbox found"),
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod manager;
pub mod mock;
mod platform;
mod runtime;

pub use config::{
    ADMIN_PORT, DEFAULT_IMAGE, DEFAULT_SANDBOX_NAME, ImagePullPolicy, PortMapping, SandboxConfig,
};
pub use error::{SandboxError, SandboxResult};
pub use manager::{REMOVE_PROMPT, SandboxManager};
pub use platform::{Platform, RuntimeStatus};
pub use runtime::{CommandOutput, ContainerInfo, ContainerRuntime, DockerCli, parse_container_list};
