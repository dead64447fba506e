//! Device instance

use crate::channel::SyncChannel;
use crate::config::DeviceConfig;
use crate::mapping::{LogHooks, MappingExposer, MappingHooks, PageMapping};
use crate::ops::{ByteChannel, Mappable, ReadinessSource};
use crate::page::MappingPage;
use crate::readiness::PollFlags;
use crate::registrar::{DevNum, MemoryRegistrar, NodeRegistrar, Registration};
use crate::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A registered device with its byte channel and mappable page.
///
/// The channel and the page are separate memory: the channel is locked, the
/// page is not, and nothing orders accesses between the two.
pub struct Device {
    // Drop order: the page goes before the node is unregistered.
    exposer: MappingExposer,
    page: MappingPage,
    channel: SyncChannel,
    registration: Registration,
    config: DeviceConfig,
    open_handles: AtomicUsize,
}

impl Device {
    /// Bring up a device with logging mapping hooks
    pub fn create(config: DeviceConfig, registrar: Arc<dyn NodeRegistrar>) -> Result<Self> {
        Self::create_with_hooks(config, registrar, Arc::new(LogHooks))
    }

    /// Bring up a device on a private in-memory registrar
    pub fn standalone(config: DeviceConfig) -> Result<Self> {
        Self::create(config, Arc::new(MemoryRegistrar::new()))
    }

    /// Bring up a device.
    ///
    /// Registration steps run first, then the page is allocated. If any step
    /// fails, everything already acquired is released in reverse order.
    pub fn create_with_hooks(
        config: DeviceConfig,
        registrar: Arc<dyn NodeRegistrar>,
        hooks: Arc<dyn MappingHooks>,
    ) -> Result<Self> {
        config.validate()?;
        log::info!("{}: init", config.name);

        let registration = Registration::register(registrar, &config.name, &config.class_name)?;
        let page = MappingPage::allocate(
            &config.name,
            config.page_object.as_deref(),
            config.resolved_page_size(),
        )
        .map_err(|e| {
            log::error!("{}: page allocation failed: {}", config.name, e);
            e
        })?;

        let exposer = MappingExposer::new(&config.name, &page, hooks);
        let channel = SyncChannel::new(&config.name);
        log::info!("{}: device created", config.name);

        Ok(Self {
            exposer,
            page,
            channel,
            registration,
            config,
            open_handles: AtomicUsize::new(0),
        })
    }

    /// Open a handle. Always succeeds.
    pub fn open(&self) -> Result<()> {
        let n = self.open_handles.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("{}: open ({} handles)", self.config.name, n);
        Ok(())
    }

    /// Release a handle. Always succeeds.
    pub fn release(&self) -> Result<()> {
        let prev = self
            .open_handles
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        log::debug!(
            "{}: release ({} handles)",
            self.config.name,
            prev.saturating_sub(1)
        );
        Ok(())
    }

    /// Handles currently open
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn dev(&self) -> DevNum {
        self.registration.dev()
    }

    pub fn channel(&self) -> &SyncChannel {
        &self.channel
    }

    pub fn exposer(&self) -> &MappingExposer {
        &self.exposer
    }

    /// Size of the mappable page
    pub fn page_size(&self) -> usize {
        self.page.size()
    }

    /// Mappings of the page still alive
    pub fn active_mappings(&self) -> usize {
        self.page.active_mappings()
    }

    /// Raw copy of the first `len` page bytes
    pub fn page_snapshot(&self, len: usize) -> Vec<u8> {
        self.page.snapshot(len)
    }

    /// Tear the device down.
    ///
    /// Never refused: live mappings hold their own mapping of the page and
    /// remain usable after this returns.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        let active = self.page.active_mappings();
        if active > 0 {
            log::warn!(
                "{}: tearing down with {} mapping(s) still alive",
                self.config.name,
                active
            );
        }
        log::info!("{}: cleanup and exit", self.config.name);
    }
}

impl ByteChannel for Device {
    fn read(&self, dst: &mut [u8]) -> Result<usize> {
        self.channel.read(dst)
    }

    fn write(&self, src: &[u8]) -> usize {
        self.channel.write(src)
    }
}

impl ReadinessSource for Device {
    fn poll(&self) -> PollFlags {
        self.channel.poll()
    }
}

impl Mappable for Device {
    fn map(&self, span: usize) -> Result<PageMapping> {
        self.exposer.map(span)
    }
}
