//! Script-driven bundle driver
//!
//! A complete `BundleDriver` built from a `bundle.yaml` descriptor: phase
//! commands run in the bundle's working directory, the start command is
//! launched detached with the reserved port exported through the
//! configured environment variable, and the reservation is cancelled when
//! the bundle stops.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bundle::config::BundleConfig;
use crate::errors::{HarnessError, Result};
use crate::lifecycle::BundleDriver;
use crate::port::PortRegistry;
use crate::process::{ProcessLauncher, ShellLauncher};

/// Bundle controlled through configured external commands
pub struct ScriptBundle {
    config: BundleConfig,
    launcher: Arc<dyn ProcessLauncher>,
    ports: Arc<PortRegistry>,
    port: Option<u16>,
    pid: Option<u32>,
}

impl ScriptBundle {
    /// Create a bundle backed by the default shell launcher
    ///
    /// # Arguments
    ///
    /// * `config` - Parsed bundle descriptor
    /// * `ports` - Shared reservation registry the bundle draws from
    pub fn new(config: BundleConfig, ports: Arc<PortRegistry>) -> Self {
        Self::with_launcher(config, ports, Arc::new(ShellLauncher::new()))
    }

    /// Create a bundle with an explicit launcher
    pub fn with_launcher(
        config: BundleConfig,
        ports: Arc<PortRegistry>,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        ScriptBundle {
            config,
            launcher,
            ports,
            port: None,
            pid: None,
        }
    }

    /// Port currently reserved for this bundle, if started
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Phase environment: descriptor env plus the reserved port, if any
    fn phase_env(&self) -> HashMap<String, String> {
        let mut env = self.config.spec.env.clone();
        if let Some(port) = self.port {
            env.insert(self.config.spec.port_env.clone(), port.to_string());
        }
        env
    }
}

impl BundleDriver for ScriptBundle {
    fn do_prepare(&mut self) -> Result<()> {
        let workdir = &self.config.spec.workdir;
        fs::create_dir_all(workdir)?;

        if let Some(command) = &self.config.spec.commands.prepare {
            self.launcher.run(workdir, command, &self.phase_env())?;
        }

        debug!(bundle = %self.config.metadata.name, workdir = %workdir.display(), "Bundle prepared");
        Ok(())
    }

    fn do_clean(&mut self) -> Result<()> {
        let workdir = &self.config.spec.workdir;

        if let Some(command) = &self.config.spec.commands.clean {
            if workdir.exists() {
                self.launcher.run(workdir, command, &self.phase_env())?;
            }
        } else if workdir.exists() {
            fs::remove_dir_all(workdir)?;
        }

        Ok(())
    }

    fn do_start(&mut self) -> Result<()> {
        // Re-running start on a live bundle is a no-op.
        if let Some(pid) = self.pid {
            if self.launcher.is_alive(pid) {
                debug!(bundle = %self.config.metadata.name, pid, "Bundle already running");
                return Ok(());
            }
        }

        let command = self.config.spec.commands.start.clone().ok_or_else(|| {
            HarnessError::Config(format!(
                "Bundle {} has no start command",
                self.config.metadata.name
            ))
        })?;

        let port = self.ports.reserve_port()?;

        let mut env = self.config.spec.env.clone();
        env.insert(self.config.spec.port_env.clone(), port.to_string());

        match self.launcher.launch(&self.config.spec.workdir, &command, &env) {
            Ok(pid) => {
                self.port = Some(port);
                self.pid = Some(pid);
                debug!(bundle = %self.config.metadata.name, pid, port, "Bundle started");
                Ok(())
            }
            Err(e) => {
                // The launch never happened; hand the port back.
                if let Err(cancel_err) = self.ports.cancel_port(port) {
                    warn!(port, error = %cancel_err, "Failed to return unused port");
                }
                Err(e)
            }
        }
    }

    fn do_stop(&mut self) -> Result<()> {
        // Nothing was started; re-running stop is a no-op.
        if self.pid.is_none() && self.port.is_none() {
            return Ok(());
        }

        if let Some(command) = &self.config.spec.commands.stop {
            self.launcher
                .run(&self.config.spec.workdir, command, &self.phase_env())?;
        }

        if let Some(pid) = self.pid {
            if self.launcher.is_alive(pid) {
                self.launcher.terminate(pid)?;
            }
        }
        self.pid = None;

        if let Some(port) = self.port.take() {
            self.ports.cancel_port(port)?;
            debug!(bundle = %self.config.metadata.name, port, "Bundle stopped, port returned");
        }

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.pid.map(|pid| self.launcher.is_alive(pid)).unwrap_or(false)
    }
}
