//! Device node registration
//!
//! The registrar is the host's device registry (number region, character
//! device, class, node). Every step taken during bring-up is held by a
//! [`StepGuard`] that undoes exactly that step when dropped, so a failure
//! part way through releases what was acquired in reverse order.

use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Device number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for DevNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Host-side device registry
pub trait NodeRegistrar: Send + Sync {
    /// Reserve a device number region
    fn alloc_region(&self, name: &str) -> Result<DevNum>;
    fn release_region(&self, dev: DevNum);

    /// Register the character device for `dev`
    fn add_cdev(&self, dev: DevNum) -> Result<()>;
    fn del_cdev(&self, dev: DevNum);

    fn create_class(&self, class_name: &str) -> Result<()>;
    fn destroy_class(&self, class_name: &str);

    /// Create the addressable node
    fn create_node(&self, class_name: &str, dev: DevNum, name: &str) -> Result<()>;
    fn destroy_node(&self, class_name: &str, dev: DevNum);
}

#[derive(Debug)]
enum Held {
    Region,
    Cdev,
    Class(String),
    Node(String),
}

/// One acquired registration step, released on drop
pub struct StepGuard {
    registrar: Arc<dyn NodeRegistrar>,
    dev: DevNum,
    held: Held,
}

impl Drop for StepGuard {
    fn drop(&mut self) {
        match &self.held {
            Held::Node(class_name) => self.registrar.destroy_node(class_name, self.dev),
            Held::Class(class_name) => self.registrar.destroy_class(class_name),
            Held::Cdev => self.registrar.del_cdev(self.dev),
            Held::Region => self.registrar.release_region(self.dev),
        }
        log::debug!("released {:?} for {}", self.held, self.dev);
    }
}

/// All registration steps of a live device.
///
/// Fields drop top to bottom, the reverse of acquisition.
pub struct Registration {
    _node: StepGuard,
    _class: StepGuard,
    _cdev: StepGuard,
    _region: StepGuard,
    dev: DevNum,
}

impl Registration {
    /// Run every step in order, unwinding completed steps on failure
    pub fn register(
        registrar: Arc<dyn NodeRegistrar>,
        name: &str,
        class_name: &str,
    ) -> Result<Self> {
        let guard = |dev, held| StepGuard {
            registrar: Arc::clone(&registrar),
            dev,
            held,
        };

        let dev = registrar
            .alloc_region(name)
            .map_err(|e| step_failed(name, "request device number", e))?;
        let region = guard(dev, Held::Region);

        registrar
            .add_cdev(dev)
            .map_err(|e| step_failed(name, "character device creation", e))?;
        let cdev = guard(dev, Held::Cdev);

        registrar
            .create_class(class_name)
            .map_err(|e| step_failed(name, "device class creation", e))?;
        let class = guard(dev, Held::Class(class_name.to_string()));

        registrar
            .create_node(class_name, dev, name)
            .map_err(|e| step_failed(name, "device creation", e))?;
        let node = guard(dev, Held::Node(class_name.to_string()));

        log::info!("{}: registered as {}", name, dev);
        Ok(Self {
            _node: node,
            _class: class,
            _cdev: cdev,
            _region: region,
            dev,
        })
    }

    pub fn dev(&self) -> DevNum {
        self.dev
    }
}

fn step_failed(name: &str, step: &str, err: Error) -> Error {
    log::error!("{}: {} failed: {}", name, step, err);
    err
}

/// Registration step, for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrarStep {
    Region,
    Cdev,
    Class,
    Node,
}

#[derive(Default)]
struct RegistryState {
    next_major: u32,
    regions: HashSet<DevNum>,
    cdevs: HashSet<DevNum>,
    classes: HashSet<String>,
    nodes: HashMap<String, DevNum>,
    events: Vec<String>,
    fail_at: Option<RegistrarStep>,
}

impl RegistryState {
    fn check(&self, step: RegistrarStep, label: &'static str) -> Result<()> {
        if self.fail_at == Some(step) {
            return Err(Error::ResourceUnavailable {
                step: label,
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

/// In-process registrar that records every call
pub struct MemoryRegistrar {
    state: Mutex<RegistryState>,
}

/// First dynamically assigned major number
const FIRST_DYNAMIC_MAJOR: u32 = 240;

impl MemoryRegistrar {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                next_major: FIRST_DYNAMIC_MAJOR,
                ..RegistryState::default()
            }),
        }
    }

    /// Make `step` fail on its next and later calls
    pub fn fail_at(&self, step: RegistrarStep) {
        self.state.lock().fail_at = Some(step);
    }

    /// Calls made so far, in order
    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    /// Device number of a live node
    pub fn node(&self, name: &str) -> Option<DevNum> {
        self.state.lock().nodes.get(name).copied()
    }

    /// Whether nothing is registered
    pub fn is_clean(&self) -> bool {
        let state = self.state.lock();
        state.regions.is_empty()
            && state.cdevs.is_empty()
            && state.classes.is_empty()
            && state.nodes.is_empty()
    }
}

impl Default for MemoryRegistrar {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistrar for MemoryRegistrar {
    fn alloc_region(&self, name: &str) -> Result<DevNum> {
        let mut state = self.state.lock();
        state.check(RegistrarStep::Region, "alloc_region")?;
        let dev = DevNum {
            major: state.next_major,
            minor: 0,
        };
        state.next_major += 1;
        state.regions.insert(dev);
        state.events.push(format!("alloc_region {} {}", name, dev));
        Ok(dev)
    }

    fn release_region(&self, dev: DevNum) {
        let mut state = self.state.lock();
        state.regions.remove(&dev);
        state.events.push(format!("release_region {}", dev));
    }

    fn add_cdev(&self, dev: DevNum) -> Result<()> {
        let mut state = self.state.lock();
        state.check(RegistrarStep::Cdev, "cdev_add")?;
        state.cdevs.insert(dev);
        state.events.push(format!("add_cdev {}", dev));
        Ok(())
    }

    fn del_cdev(&self, dev: DevNum) {
        let mut state = self.state.lock();
        state.cdevs.remove(&dev);
        state.events.push(format!("del_cdev {}", dev));
    }

    fn create_class(&self, class_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.check(RegistrarStep::Class, "class_create")?;
        if !state.classes.insert(class_name.to_string()) {
            return Err(Error::ResourceUnavailable {
                step: "class_create",
                reason: format!("class {} exists", class_name),
            });
        }
        state.events.push(format!("create_class {}", class_name));
        Ok(())
    }

    fn destroy_class(&self, class_name: &str) {
        let mut state = self.state.lock();
        state.classes.remove(class_name);
        state.events.push(format!("destroy_class {}", class_name));
    }

    fn create_node(&self, class_name: &str, dev: DevNum, name: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.check(RegistrarStep::Node, "device_create")?;
        if state.nodes.contains_key(name) {
            return Err(Error::ResourceUnavailable {
                step: "device_create",
                reason: format!("node {} exists", name),
            });
        }
        state.nodes.insert(name.to_string(), dev);
        state
            .events
            .push(format!("create_node {} {} {}", class_name, dev, name));
        Ok(())
    }

    fn destroy_node(&self, class_name: &str, dev: DevNum) {
        let mut state = self.state.lock();
        state.nodes.retain(|_, d| *d != dev);
        state.events.push(format!("destroy_node {} {}", class_name, dev));
    }
}
