//! Bundle Lifecycle Integration Tests
//!
//! Drives bundle instances through the full prepare/start/stop/cleanup
//! flow against a shared port registry and the running-instance registry,
//! including concurrent lifecycles on independent instances.
//!
//! Uses a deterministic in-memory port probe - NO real sockets needed.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bundle_core::errors::Result;
use bundle_core::{
    BundleDriver, BundleInstance, HarnessError, LifecyclePhase, PortProbe, PortRegistry,
    RunningRegistry,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Probe handing out sequential candidates from a base
struct CountingProbe {
    base: u16,
    cursor: AtomicUsize,
}

impl CountingProbe {
    fn new(base: u16) -> Self {
        CountingProbe {
            base,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl PortProbe for CountingProbe {
    fn free_port(&self) -> Result<u16> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst) as u16;
        Ok(self.base + i)
    }
}

/// Driver that reserves a port on start and returns it on stop
struct PortHoldingBundle {
    ports: Arc<PortRegistry>,
    port: Option<u16>,
    fail_start: Arc<AtomicBool>,
}

impl PortHoldingBundle {
    fn new(ports: Arc<PortRegistry>) -> Self {
        PortHoldingBundle {
            ports,
            port: None,
            fail_start: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl BundleDriver for PortHoldingBundle {
    fn do_prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn do_clean(&mut self) -> Result<()> {
        Ok(())
    }

    fn do_start(&mut self) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(HarnessError::OperationFailed(
                "server refused to boot".to_string(),
            ));
        }
        if self.port.is_none() {
            self.port = Some(self.ports.reserve_port()?);
        }
        Ok(())
    }

    fn do_stop(&mut self) -> Result<()> {
        if let Some(port) = self.port.take() {
            self.ports.cancel_port(port)?;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.port.is_some()
    }
}

fn shared_ports(base: u16) -> Arc<PortRegistry> {
    Arc::new(PortRegistry::with_probe(
        Box::new(CountingProbe::new(base)),
        10,
    ))
}

#[test]
fn test_start_reserves_and_stop_returns_port() {
    init_tracing();
    let ports = shared_ports(9400);
    let instance = BundleInstance::new(
        "server-a",
        "generic",
        Box::new(PortHoldingBundle::new(Arc::clone(&ports))),
    );

    instance.start().unwrap();
    assert_eq!(instance.phase(), LifecyclePhase::Running);
    assert!(instance.is_running());
    assert_eq!(ports.reserved_count(), 1);

    instance.stop().unwrap();
    assert_eq!(instance.phase(), LifecyclePhase::Stopped);
    assert!(!instance.is_running());
    assert_eq!(ports.reserved_count(), 0);
}

#[test]
fn test_registry_tracks_instances_across_lifecycle() {
    let ports = shared_ports(9500);
    let registry = RunningRegistry::new();

    let jetty = Arc::new(BundleInstance::new(
        "jetty-main",
        "jetty",
        Box::new(PortHoldingBundle::new(Arc::clone(&ports))),
    ));
    let pg = Arc::new(BundleInstance::new(
        "pg-main",
        "postgres",
        Box::new(PortHoldingBundle::new(Arc::clone(&ports))),
    ));

    jetty.start().unwrap();
    registry.add(Arc::clone(&jetty));
    pg.start().unwrap();
    registry.add(Arc::clone(&pg));

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.list_by_kind("jetty").len(), 1);
    assert_eq!(
        registry.list_by(|i| i.is_running()).len(),
        2,
        "both instances should report running"
    );

    jetty.stop().unwrap();
    registry.remove(&jetty);

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.list_by_kind("jetty").len(), 0);
    assert_eq!(ports.reserved_count(), 1);

    pg.stop().unwrap();
    registry.remove(&pg);
    assert_eq!(ports.reserved_count(), 0);
}

#[test]
fn test_concurrent_lifecycles_do_not_share_ports() {
    init_tracing();
    let ports = shared_ports(9600);
    let registry = Arc::new(RunningRegistry::new());

    let mut threads = Vec::new();
    for i in 0..6 {
        let ports = Arc::clone(&ports);
        let registry = Arc::clone(&registry);
        threads.push(std::thread::spawn(move || {
            let instance = Arc::new(BundleInstance::new(
                format!("server-{}", i),
                "generic".to_string(),
                Box::new(PortHoldingBundle::new(ports)),
            ));

            instance.start().unwrap();
            registry.add(Arc::clone(&instance));
            instance
        }));
    }

    let instances: Vec<_> = threads.into_iter().map(|t| t.join().unwrap()).collect();

    // Every instance holds its own reservation.
    assert_eq!(ports.reserved_count(), 6);
    assert_eq!(registry.len(), 6);

    for instance in &instances {
        instance.stop().unwrap();
        registry.remove(instance);
    }

    assert_eq!(ports.reserved_count(), 0);
    assert!(registry.is_empty());
}

#[test]
fn test_failed_start_leaves_instance_restartable() {
    let ports = shared_ports(9700);
    let driver = PortHoldingBundle::new(Arc::clone(&ports));
    let fail_start = Arc::clone(&driver.fail_start);
    let instance = BundleInstance::new("flaky", "generic", Box::new(driver));

    fail_start.store(true, Ordering::SeqCst);
    let err = instance.start().unwrap_err();
    assert!(matches!(err, HarnessError::OperationFailed(_)));
    assert_eq!(instance.phase(), LifecyclePhase::Prepared);
    assert!(instance.handler().last_failure().is_some());
    assert_eq!(ports.reserved_count(), 0);

    // The same instance starts cleanly once the bundle recovers.
    fail_start.store(false, Ordering::SeqCst);
    instance.start().unwrap();
    assert_eq!(instance.phase(), LifecyclePhase::Running);
    assert_eq!(ports.reserved_count(), 1);

    instance.stop().unwrap();
}

#[test]
fn test_restart_cycle_reuses_registry_cleanly() {
    let ports = shared_ports(9800);
    let instance = BundleInstance::new(
        "restarter",
        "generic",
        Box::new(PortHoldingBundle::new(Arc::clone(&ports))),
    );

    for _ in 0..3 {
        instance.start().unwrap();
        assert_eq!(ports.reserved_count(), 1);
        instance.stop().unwrap();
        assert_eq!(ports.reserved_count(), 0);
    }
}

#[test]
fn test_cleanup_returns_instance_to_unprepared() {
    let ports = shared_ports(9900);
    let instance = BundleInstance::new(
        "resettable",
        "generic",
        Box::new(PortHoldingBundle::new(ports)),
    );

    instance.prepare().unwrap();
    assert_eq!(instance.phase(), LifecyclePhase::Prepared);

    instance.cleanup().unwrap();
    assert_eq!(instance.phase(), LifecyclePhase::Unprepared);
}

/// Driver recording primitive order, shared across two public calls
struct OrderedBundle {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl BundleDriver for OrderedBundle {
    fn do_prepare(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("prepare");
        Ok(())
    }

    fn do_clean(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("clean");
        Ok(())
    }

    fn do_start(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("start");
        Ok(())
    }

    fn do_stop(&mut self) -> Result<()> {
        self.calls.lock().unwrap().push("stop");
        Ok(())
    }

    fn is_running(&self) -> bool {
        false
    }
}

#[test]
fn test_full_session_primitive_order() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let instance = BundleInstance::new(
        "ordered",
        "generic",
        Box::new(OrderedBundle {
            calls: Arc::clone(&calls),
        }),
    );

    instance.start().unwrap();
    instance.stop().unwrap();
    instance.cleanup().unwrap();

    assert_eq!(
        *calls.lock().unwrap(),
        vec!["clean", "prepare", "start", "stop", "clean"]
    );
}
