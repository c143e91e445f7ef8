//! Free-port probing against the operating system
//!
//! A probe is a point-in-time answer to "which port is free right now",
//! not a hold: the socket is released before the number is returned.
//! The registry layers reservation bookkeeping on top.

use std::net::TcpListener;

use crate::errors::{HarnessError, Result};

/// Source of free-port candidates
///
/// The default implementation asks the OS for an ephemeral port. Tests
/// inject deterministic sequences instead, so reservation logic can be
/// exercised without touching real sockets.
pub trait PortProbe: Send + Sync {
    /// Produce one candidate port believed to be free right now
    fn free_port(&self) -> Result<u16>;
}

/// OS-backed probe: bind to port 0, read the assigned number, release
pub struct OsPortProbe;

impl PortProbe for OsPortProbe {
    fn free_port(&self) -> Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .map_err(|e| HarnessError::Process(format!("Failed to probe for a free port: {}", e)))?;

        let port = listener
            .local_addr()
            .map_err(|e| HarnessError::Process(format!("Failed to read probed port: {}", e)))?
            .port();

        // Listener drops here; the port is free again at the OS level.
        Ok(port)
    }
}

/// Test if a specific port is currently bindable
///
/// # Arguments
/// * `port` - Port to test
///
/// # Returns
/// true if available, false if in use
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}
