//! Byte channel client - write a message to a device, then read it back
//!
//! Usage:
//! ```bash
//! cargo run --example say_hello -- write something
//! cargo run --example say_hello -- read
//! ```

use khello_core::{ByteChannel, Device, DeviceConfig, CAPACITY};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let device = Device::standalone(DeviceConfig::default())?;
    let name = device.config().name.clone();
    device.open()?;

    match args.first().map(String::as_str) {
        Some("write") if args.len() >= 2 => {
            let msg = args[1..].join(" ");
            let n = device.write(msg.as_bytes());
            println!("WRITE to {}: {} ({} bytes kept)", name, msg, n);
            read_back(&device, &name)?;
        }
        Some("read") => read_back(&device, &name)?,
        _ => {
            println!("Incorrect args. Usage: say_hello read | say_hello write <msg>");
        }
    }

    device.release()?;
    Ok(())
}

fn read_back(device: &Device, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut buf = [0u8; CAPACITY];
    let n = device.read(&mut buf)?;
    println!("READ from {}: {}", name, String::from_utf8_lossy(&buf[..n]));
    Ok(())
}
