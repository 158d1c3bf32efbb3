//! Configuration for the flowctl command-line client.
//!
//! Client configuration is kubeconfig-style:
//! - Named connection contexts (admin endpoint + default project/domain + auth)
//! - `current-context` for default selection
//! - Bearer-token auth read from a file or an environment variable
//!
//! Command-line flags are layered on top of the file by [`resolve_target`].

pub mod client;
pub mod discovery;
pub mod error;

pub use client::{
    AuthConfig, ClientConfig, ClientDefaults, Context, SANDBOX_CONTEXT, client_config_path,
    load_client_config, save_client_config,
};
pub use discovery::{
    ADMIN_URL_ENV, CONFIG_DIR_ENV, ResolvedTarget, TargetOverrides, config_dir, logs_dir,
    resolve_target,
};
pub use error::{ConfigError, Result};
