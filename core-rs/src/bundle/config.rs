/**
 * config.rs
 * Parser for bundle.yaml descriptors (YAML format)
 *
 * Format:
 * ```yaml
 * apiVersion: harness/v1
 * kind: Bundle
 * metadata:
 *   name: jetty-main
 *   kind: jetty
 *   version: 9.4.x
 * spec:
 *   workdir: work/jetty-main
 *   portEnv: BUNDLE_PORT
 *   env:
 *     JAVA_OPTS: -Xmx512m
 *   commands:
 *     prepare: { program: ./install.sh }
 *     start:   { program: ./bin/run.sh }
 *     stop:    { program: ./bin/shutdown.sh }
 * ```
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{HarnessError, Result};
use crate::process::CommandSpec;

/// bundle.yaml file structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    pub spec: BundleSpec,
}

/// Bundle metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Instance name (e.g., "jetty-main")
    pub name: String,

    /// Capability kind the running-instance registry filters on
    /// (e.g., "jetty", "postgres")
    pub kind: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Per-phase command table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PhaseCommands {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepare: Option<CommandSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<CommandSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<CommandSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CommandSpec>,
}

/// Bundle specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BundleSpec {
    /// Working directory the bundle is prepared into
    pub workdir: PathBuf,

    /// Environment variable carrying the reserved port to the process
    #[serde(default = "default_port_env")]
    pub port_env: String,

    /// Extra environment for every phase command
    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default)]
    pub commands: PhaseCommands,
}

fn default_port_env() -> String {
    crate::DEFAULT_PORT_ENV.to_string()
}

impl BundleConfig {
    /// Load a bundle descriptor from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to bundle.yaml
    ///
    /// # Errors
    ///
    /// `BundleNotFound` if the file does not exist, `Yaml` on malformed
    /// content, `Config` on failed validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(HarnessError::BundleNotFound(
                path.to_string_lossy().to_string(),
            ));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("Failed to read bundle.yaml: {}", e)))?;

        Self::from_str(&content)
    }

    /// Parse a bundle descriptor from a YAML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: BundleConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate descriptor structure
    ///
    /// Ensures:
    /// - apiVersion is "harness/v1"
    /// - kind is "Bundle"
    /// - metadata names and workdir are non-empty
    pub fn validate(&self) -> Result<()> {
        if self.api_version != crate::API_VERSION {
            return Err(HarnessError::Config(format!(
                "Invalid apiVersion: expected '{}', got '{}'",
                crate::API_VERSION,
                self.api_version
            )));
        }

        if self.kind != "Bundle" {
            return Err(HarnessError::Config(format!(
                "Invalid kind: expected 'Bundle', got '{}'",
                self.kind
            )));
        }

        if self.metadata.name.is_empty() {
            return Err(HarnessError::Config(
                "metadata.name cannot be empty".to_string(),
            ));
        }

        if self.metadata.kind.is_empty() {
            return Err(HarnessError::Config(
                "metadata.kind cannot be empty".to_string(),
            ));
        }

        if self.spec.workdir.as_os_str().is_empty() {
            return Err(HarnessError::Config(
                "spec.workdir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
