//! Mapping client - write through one mapping, observe through another
//!
//! Usage:
//! ```bash
//! cargo run --example mmap_hello
//! ```

use khello_core::{Device, DeviceConfig, Mappable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device = Device::standalone(DeviceConfig::default())?;
    println!("Pagesize: {}", device.page_size());

    let mut writer = device.map(32)?;
    writer.as_mut_slice()[..5].copy_from_slice(b"haha\0");

    let reader = device.map(32)?;
    let end = reader.as_slice().iter().position(|&b| b == 0).unwrap_or(reader.len());
    println!(
        "Second mapping sees: {}",
        String::from_utf8_lossy(&reader.as_slice()[..end])
    );

    match device.map(device.page_size() + 1) {
        Ok(_) => println!("Oversize mapping unexpectedly succeeded"),
        Err(e) => println!("Oversize mapping rejected: {} (retryable: {})", e, e.is_retryable()),
    }

    Ok(())
}
