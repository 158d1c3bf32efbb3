//! Container runtime detection.

use std::fmt;
use std::process::Command;

/// Host platforms with distinct install instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOS,
    Linux,
    Windows,
    Other,
}

impl Platform {
    /// Detect the current platform.
    pub fn detect() -> Self {
        #[cfg(target_os = "macos")]
        {
            Platform::MacOS
        }

        #[cfg(target_os = "linux")]
        {
            Platform::Linux
        }

        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            Platform::Other
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::MacOS => "macOS",
            Platform::Linux => "Linux",
            Platform::Windows => "Windows",
            Platform::Other => "Other",
        }
    }

    /// How to install the container runtime on this platform.
    pub fn install_hint(&self) -> &'static str {
        match self {
            Platform::MacOS | Platform::Windows => {
                "Install Docker Desktop: https://docs.docker.com/desktop/"
            }
            Platform::Linux => {
                "Install Docker Engine:\n\
                 \n\
                   Ubuntu/Debian: sudo apt-get install docker.io\n\
                   Fedora:        sudo dnf install moby-engine\n\
                   Arch:          sudo pacman -S docker\n\
                 \n\
                 then make sure the daemon is running: sudo systemctl start docker"
            }
            Platform::Other => "Install a Docker-compatible container runtime.",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Availability of the container runtime binary.
#[derive(Debug, Clone)]
pub enum RuntimeStatus {
    /// The runtime answered a version check.
    Available { binary: String, version: String },

    /// The runtime binary is missing or not working.
    Missing {
        platform: Platform,
        binary: String,
        install_hint: String,
    },
}

impl RuntimeStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, RuntimeStatus::Available { .. })
    }

    /// Get the install hint if the runtime is missing.
    pub fn install_hint(&self) -> Option<&str> {
        match self {
            RuntimeStatus::Missing { install_hint, .. } => Some(install_hint),
            RuntimeStatus::Available { .. } => None,
        }
    }

    /// Run `binary --version`.
    pub fn detect(binary: &str) -> Self {
        let output = Command::new(binary).arg("--version").output();

        match output {
            Ok(output) if output.status.success() => RuntimeStatus::Available {
                binary: binary.to_string(),
                version: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            },
            _ => {
                let platform = Platform::detect();
                RuntimeStatus::Missing {
                    platform,
                    binary: binary.to_string(),
                    install_hint: platform.install_hint().to_string(),
                }
            }
        }
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeStatus::Available { version, .. } => write!(f, "{version}"),
            RuntimeStatus::Missing {
                platform,
                binary,
                install_hint,
            } => write!(f, "{binary} not found on {platform}\n\n{install_hint}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detect() {
        let platform = Platform::detect();

        #[cfg(target_os = "macos")]
        assert_eq!(platform, Platform::MacOS);

        #[cfg(target_os = "linux")]
        assert_eq!(platform, Platform::Linux);

        let _ = platform;
    }

    #[test]
    fn test_missing_binary() {
        let status = RuntimeStatus::detect("flowctl-no-such-runtime-binary");
        assert!(!status.is_available());
        assert!(status.install_hint().is_some());
        assert!(status.to_string().contains("flowctl-no-such-runtime-binary"));
    }

    #[test]
    fn test_available_display() {
        let status = RuntimeStatus::Available {
            binary: "docker".to_string(),
            version: "Docker version 27.0.1".to_string(),
        };
        assert!(status.is_available());
        assert_eq!(status.to_string(), "Docker version 27.0.1");
    }
}
