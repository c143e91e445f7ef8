//! Process-wide port reservation registry
//!
//! Hands out ports that are free at the OS level, not already reserved,
//! and not covered by the blocked ranges/set. All decisions happen inside
//! one coarse critical section; port reservation is not a hot path.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::errors::{HarnessError, Result};
use crate::port::probe::{OsPortProbe, PortProbe};

/// Default bound on free-port probes per reservation attempt
pub const DEFAULT_RESERVE_ATTEMPTS: usize = 10;

/// Closed interval of blocked ports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedRange {
    pub low: u16,
    pub high: u16,
}

impl BlockedRange {
    /// Create a range, normalizing reversed bounds
    pub fn new(low: u16, high: u16) -> Self {
        if low <= high {
            BlockedRange { low, high }
        } else {
            BlockedRange { low: high, high: low }
        }
    }

    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.low && port <= self.high
    }

    /// Check if `[low, high]` overlaps or is adjacent to this range
    ///
    /// Connected ranges coalesce into their span on insertion.
    fn connected(&self, low: u16, high: u16) -> bool {
        self.low <= high.saturating_add(1) && low <= self.high.saturating_add(1)
    }
}

/// Mutable registry state, guarded by the registry's single mutex
struct RegistryState {
    /// Ports currently held by an un-cancelled reservation
    reserved: HashSet<u16>,

    /// Disjoint, non-adjacent blocked intervals, sorted by lower bound
    blocked_ranges: Vec<BlockedRange>,

    /// Individually blocked ports, independent of the ranges
    blocked_ports: HashSet<u16>,
}

impl RegistryState {
    fn is_blocked(&self, port: u16) -> bool {
        self.blocked_ports.contains(&port)
            || self.blocked_ranges.iter().any(|r| r.contains(port))
    }

    /// Insert a range, transitively merging every connected interval
    ///
    /// A chain of three pairwise-connected ranges collapses into one.
    fn insert_range(&mut self, range: BlockedRange) {
        let mut low = range.low;
        let mut high = range.high;

        // Absorb connected ranges into the growing span. Restart the scan
        // after each absorption: growing the span can connect it to ranges
        // already passed over.
        let mut i = 0;
        while i < self.blocked_ranges.len() {
            if self.blocked_ranges[i].connected(low, high) {
                let absorbed = self.blocked_ranges.remove(i);
                low = low.min(absorbed.low);
                high = high.max(absorbed.high);
                i = 0;
            } else {
                i += 1;
            }
        }

        self.blocked_ranges.push(BlockedRange { low, high });
        self.blocked_ranges.sort_by_key(|r| r.low);
    }
}

/// Port reservation registry
///
/// Process-wide shared state: create once, share by handle
/// (`Arc<PortRegistry>`), never torn down except at process exit.
///
/// # Example
///
/// ```no_run
/// use bundle_core::port::PortRegistry;
///
/// let registry = PortRegistry::new();
/// registry.add_blocked_range(1, 1023);
///
/// let port = registry.reserve_port().unwrap();
/// // ... hand the port to a bundle ...
/// registry.cancel_port(port).unwrap();
/// ```
pub struct PortRegistry {
    state: Mutex<RegistryState>,
    probe: Box<dyn PortProbe>,
    max_attempts: usize,
}

impl PortRegistry {
    /// Create a registry backed by the OS probe and the default retry bound
    pub fn new() -> Self {
        Self::with_probe(Box::new(OsPortProbe), DEFAULT_RESERVE_ATTEMPTS)
    }

    /// Create a registry with an explicit probe and retry bound
    ///
    /// # Arguments
    ///
    /// * `probe` - Source of free-port candidates
    /// * `max_attempts` - Bound on probes per `reserve_port` call
    pub fn with_probe(probe: Box<dyn PortProbe>, max_attempts: usize) -> Self {
        PortRegistry {
            state: Mutex::new(RegistryState {
                reserved: HashSet::new(),
                blocked_ranges: Vec::new(),
                blocked_ports: HashSet::new(),
            }),
            probe,
            max_attempts,
        }
    }

    /// Reserve a free port
    ///
    /// Probes the free-port source up to the retry bound. A candidate is
    /// accepted only if it is neither reserved nor blocked; acceptance
    /// inserts it into the reserved set in the same critical section as
    /// the check, so two callers can never be granted the same port.
    ///
    /// # Returns
    ///
    /// The reserved port number
    ///
    /// # Errors
    ///
    /// `ResourceExhausted` if no acceptable candidate was found within the
    /// retry bound. This is a hard error; the registry does not retry on
    /// the caller's behalf.
    pub fn reserve_port(&self) -> Result<u16> {
        let mut state = self.state.lock().unwrap();

        for attempt in 1..=self.max_attempts {
            let candidate = match self.probe.free_port() {
                Ok(port) => port,
                Err(e) => {
                    debug!(attempt, error = %e, "Free-port probe failed");
                    continue;
                }
            };

            if state.reserved.contains(&candidate) {
                debug!(attempt, port = candidate, "Probed port already reserved");
                continue;
            }

            if state.is_blocked(candidate) {
                debug!(attempt, port = candidate, "Probed port is blocked");
                continue;
            }

            state.reserved.insert(candidate);
            info!(port = candidate, attempt, "Reserved port");
            return Ok(candidate);
        }

        Err(HarnessError::ResourceExhausted(format!(
            "No free port found after {} attempts",
            self.max_attempts
        )))
    }

    /// Release a previously reserved port
    ///
    /// # Arguments
    ///
    /// * `port` - Port returned by an earlier `reserve_port`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the port is not currently held. This guards
    /// against double-release bugs.
    pub fn cancel_port(&self, port: u16) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if !state.reserved.remove(&port) {
            return Err(HarnessError::InvalidArgument(format!(
                "Port {} is not reserved",
                port
            )));
        }

        info!(port, "Cancelled port reservation");
        Ok(())
    }

    /// Block a closed interval of ports from future reservation
    ///
    /// Overlapping or adjacent intervals merge into their span, applied
    /// transitively. Reversed bounds are normalized. Ports already
    /// reserved stay valid until cancelled; blocking governs future
    /// grants only.
    pub fn add_blocked_range(&self, low: u16, high: u16) {
        let range = BlockedRange::new(low, high);
        let mut state = self.state.lock().unwrap();
        state.insert_range(range);
        debug!(low = range.low, high = range.high, "Added blocked range");
    }

    /// Block individual ports from future reservation
    pub fn add_blocked_ports<I>(&self, ports: I)
    where
        I: IntoIterator<Item = u16>,
    {
        let mut state = self.state.lock().unwrap();
        for port in ports {
            state.blocked_ports.insert(port);
            debug!(port, "Added blocked port");
        }
    }

    /// Check whether a port is covered by the blocked ranges or set
    pub fn is_blocked(&self, port: u16) -> bool {
        self.state.lock().unwrap().is_blocked(port)
    }

    /// Number of currently held reservations
    pub fn reserved_count(&self) -> usize {
        self.state.lock().unwrap().reserved.len()
    }

    /// Snapshot of the normalized blocked intervals
    pub fn blocked_ranges(&self) -> Vec<BlockedRange> {
        self.state.lock().unwrap().blocked_ranges.clone()
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}
