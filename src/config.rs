//! Configuration loading

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct A2fsConfig {
    /// Default log filter when neither `-v` nor `RUST_LOG` is given.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Expected FUSE library location, checked and reported before mounting.
    ///
    /// This is diagnostic only: `fuser` links libfuse when a2fs is built, so
    /// the path never changes which library is loaded. Platform defaults are
    /// checked when unset.
    #[serde(default)]
    pub fuse_library: Option<PathBuf>,
    #[serde(default)]
    pub mount: MountConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MountConfig {
    #[serde(default)]
    pub allow_other: bool,
    #[serde(default = "default_auto_unmount")]
    pub auto_unmount: bool,
    #[serde(default = "default_fs_name")]
    pub fs_name: String,
}

fn default_auto_unmount() -> bool {
    true
}

fn default_fs_name() -> String {
    "a2fs".to_string()
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            allow_other: false,
            auto_unmount: default_auto_unmount(),
            fs_name: default_fs_name(),
        }
    }
}

#[cfg(target_os = "macos")]
const FUSE_LIBRARY_CANDIDATES: &[&str] = &[
    "/usr/local/lib/libfuse-t.dylib",
    "/opt/homebrew/lib/libfuse-t.dylib",
    "/usr/local/lib/libfuse.2.dylib",
    "/Library/Filesystems/macfuse.fs/Contents/Resources/lib/libfuse.2.dylib",
];

#[cfg(not(target_os = "macos"))]
const FUSE_LIBRARY_CANDIDATES: &[&str] = &[
    "/usr/lib/x86_64-linux-gnu/libfuse3.so.3",
    "/usr/lib/aarch64-linux-gnu/libfuse3.so.3",
    "/usr/lib64/libfuse3.so.3",
    "/usr/lib/libfuse3.so.3",
    "/usr/lib/x86_64-linux-gnu/libfuse.so.2",
    "/usr/lib/libfuse.so.2",
];

impl A2fsConfig {
    /// Get the user config directory path
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("a2fs"))
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        Self::user_config_dir().map(|dir| dir.join("config.json"))
    }

    /// Load configuration from config.json
    pub fn load() -> Self {
        // Try to load from user config directory first (highest priority)
        if let Some(user_config) = Self::user_config_path() {
            if let Ok(config) = Self::load_from_path(&user_config) {
                return config;
            }
        }

        // Try to load from current directory
        if let Ok(config) = Self::load_from_path("config.json") {
            return config;
        }

        // Try to load from executable directory
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                if let Ok(config) = Self::load_from_path(exe_dir.join("config.json")) {
                    return config;
                }
            }
        }

        Self::default()
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: A2fsConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Locate the FUSE library once at start-up, for the mount diagnostics.
    ///
    /// The configured path wins when it exists; otherwise the first existing
    /// platform default is returned.
    pub fn resolve_fuse_library(&self) -> Option<PathBuf> {
        let configured = self.fuse_library.iter().cloned();
        let defaults = FUSE_LIBRARY_CANDIDATES.iter().map(PathBuf::from);
        resolve_first_existing(configured.chain(defaults))
    }
}

fn resolve_first_existing(candidates: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|path| {
        let found = path.exists();
        if !found {
            log::debug!("no FUSE library at {}", path.display());
        }
        found
    })
}
