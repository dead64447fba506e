//! khello - Character device with a locked byte channel and a zero-copy shared page

pub mod buffer;
pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod mapping;
pub mod ops;
pub mod page;
pub mod readiness;
pub mod registrar;
pub mod shm;

pub use buffer::{DataBuffer, CAPACITY, MAX_PAYLOAD};
pub use channel::SyncChannel;
pub use config::DeviceConfig;
pub use device::Device;
pub use error::{Error, Result};
pub use mapping::{LogHooks, MappingExposer, MappingHooks, MappingInfo, PageMapping};
pub use ops::{ByteChannel, Mappable, ReadinessSource};
pub use page::MappingPage;
pub use readiness::PollFlags;
pub use registrar::{DevNum, MemoryRegistrar, NodeRegistrar, RegistrarStep, Registration};
