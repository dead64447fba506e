//! Device behaviour through its public access paths

use khello_core::{
    ByteChannel, Device, DeviceConfig, Error, Mappable, MappingPage, MemoryRegistrar, PollFlags,
    ReadinessSource, CAPACITY,
};
use std::sync::Arc;
use std::thread;

fn device() -> Device {
    Device::standalone(DeviceConfig::default()).unwrap()
}

fn read_all(device: &Device) -> Vec<u8> {
    let mut out = [0u8; CAPACITY];
    let n = device.read(&mut out).unwrap();
    out[..n].to_vec()
}

#[test]
fn test_later_write_replaces_earlier() {
    let device = device();
    device.write(b"first message, rather long");
    device.write(b"second");
    assert_eq!(read_all(&device), b"second");
}

#[test]
fn test_long_write_keeps_31_bytes() {
    let device = device();
    let msg: Vec<u8> = (b'a'..=b'z').chain(b'A'..=b'Z').collect();
    assert_eq!(device.write(&msg), 31);
    assert_eq!(read_all(&device), &msg[..31]);
}

#[test]
fn test_empty_write_reads_nothing() {
    let device = device();
    device.write(b"something");
    assert_eq!(device.write(b""), 0);
    assert!(read_all(&device).is_empty());
}

#[test]
fn test_round_trip() {
    let device = device();
    for msg in [&b"x"[..], b"hello", b"exactly thirty-one bytes long!!"] {
        assert_eq!(device.write(msg), msg.len());
        assert_eq!(read_all(&device), msg);
    }
}

#[test]
fn test_embedded_zero_is_stored_verbatim() {
    let device = device();
    device.write(b"ab\0cd");
    // the channel reports the full length; only text views stop at the zero
    assert_eq!(read_all(&device), b"ab\0cd");
}

#[test]
fn test_readiness_after_write() {
    let device = device();
    assert_eq!(device.poll(), PollFlags::OUT);

    device.write(b"ready");
    let flags = device.poll();
    assert!(flags.readable());
    assert!(flags.writable());

    let read_part = PollFlags::compute(device.channel().len(), true);
    let write_part = PollFlags::compute(0, device.channel().is_busy());
    assert_eq!(flags, read_part | write_part);
}

#[test]
fn test_copy_fault_leaves_buffer() {
    let device = device();
    device.write(b"twelve bytes");

    let mut small = [0u8; 4];
    let err = device.read(&mut small).unwrap_err();
    assert!(matches!(err, Error::CopyFault { needed: 12, available: 4 }));
    assert_eq!(read_all(&device), b"twelve bytes");
}

#[test]
fn test_oversize_map_leaves_page() {
    let device = device();
    let page_size = device.page_size();

    let mut view = device.map(16).unwrap();
    view.as_mut_slice()[..4].copy_from_slice(b"keep");
    let before = device.page_snapshot(page_size);

    let err = device.map(page_size + 1).err().unwrap();
    assert!(err.is_retryable());
    assert_eq!(device.page_snapshot(page_size), before);
    assert_eq!(device.active_mappings(), 1);
}

#[test]
fn test_write_through_one_mapping_seen_by_another() {
    let device = device();
    let mut writer = device.map(32).unwrap();
    let reader = device.map(device.page_size()).unwrap();
    assert_eq!(device.active_mappings(), 2);

    writer.as_mut_slice()[..5].copy_from_slice(b"haha\0");
    assert_eq!(&reader.as_slice()[..5], b"haha\0");

    // the byte channel is a separate region
    assert!(read_all(&device).is_empty());

    drop(writer);
    drop(reader);
    assert_eq!(device.active_mappings(), 0);
}

#[test]
fn test_mapping_outlives_device() {
    let device = device();
    let mut view = device.map(8).unwrap();
    device.shutdown();

    view.as_mut_slice().copy_from_slice(b"survives");
    assert_eq!(view.as_slice(), b"survives");
}

#[test]
fn test_concurrent_writes_never_interleave() {
    let a = [b'A'; 20];
    let b = [b'B'; 20];

    for _ in 0..50 {
        let device = Arc::new(device());
        let handles: Vec<_> = [a, b]
            .into_iter()
            .map(|msg| {
                let device = Arc::clone(&device);
                thread::spawn(move || {
                    for _ in 0..100 {
                        device.write(&msg);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let got = read_all(&device);
        assert!(got == a || got == b, "interleaved read: {:?}", got);
    }
}

#[test]
fn test_reads_during_writes_see_whole_messages() {
    let device = device();
    let a = [b'a'; 20];
    let b = [b'b'; 20];
    device.write(&a);

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..500 {
                device.write(if i % 2 == 0 { &b } else { &a });
            }
        });
        s.spawn(|| {
            for _ in 0..500 {
                let got = read_all(&device);
                assert!(got == a || got == b);
            }
        });
    });
}

#[test]
fn test_page_allocation_failure_unwinds_registration() {
    let taken = MappingPage::allocate("khello_taken", None, 4096).unwrap();
    let registrar = Arc::new(MemoryRegistrar::new());
    let config = DeviceConfig {
        page_object: Some(taken.object_name().to_string()),
        ..DeviceConfig::default()
    };

    let err = Device::create(config, registrar.clone()).err().unwrap();
    assert!(matches!(err, Error::AllocationFailure(_)));
    assert!(registrar.is_clean());
    assert_eq!(
        registrar.events(),
        vec![
            "alloc_region khello 240:0",
            "add_cdev 240:0",
            "create_class khello_class",
            "create_node khello_class 240:0 khello",
            "destroy_node khello_class 240:0",
            "destroy_class khello_class",
            "del_cdev 240:0",
            "release_region 240:0",
        ]
    );
}

#[test]
fn test_shutdown_unregisters_node() {
    let registrar = Arc::new(MemoryRegistrar::new());
    let device = Device::create(DeviceConfig::default(), registrar.clone()).unwrap();
    assert_eq!(registrar.node("khello"), Some(device.dev()));

    device.shutdown();
    assert!(registrar.is_clean());
}
