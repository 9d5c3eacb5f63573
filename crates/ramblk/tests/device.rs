//! End-to-end tests: bring-up, request submission through the host block
//! layer, and tear-down.

use ramblk::{RamDiskConfig, bring_up, lifecycle::BringUpStep, tear_down};
use ramblk_core::{
    HostError, HwQueueId, IoError, Request, RequestOp, Sector, Segment, TagSetConfig,
};
use ramblk_host::{BlockLayer, SubmitError};

fn submit(
    layer: &BlockLayer,
    name: &str,
    queue: u32,
    op: RequestOp,
    start: u64,
    bufs: Vec<&mut [u8]>,
) -> Result<(), SubmitError> {
    let segments = bufs.into_iter().map(Segment::new).collect();
    let mut req = Request::new(op, Sector::new(start), segments);
    layer.submit(name, HwQueueId::new(queue), &mut req)
}

#[test]
fn forty_mib_device_round_trip() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();
    assert_eq!(handle.device().capacity().sectors(), 81920);

    let mut data = [0xABu8; 4096];
    submit(&layer, "ramblk", 0, RequestOp::Write, 0, vec![&mut data]).unwrap();

    let mut out = [0u8; 4096];
    submit(&layer, "ramblk", 0, RequestOp::Read, 0, vec![&mut out]).unwrap();
    assert_eq!(out, [0xABu8; 4096]);

    tear_down(&layer, handle);
}

#[test]
fn write_overrunning_last_sector_fails() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();

    // Sector 81919 is the last one; a 1024-byte segment spills past it.
    let mut data = [1u8; 1024];
    let err = submit(&layer, "ramblk", 0, RequestOp::Write, 81919, vec![&mut data]).unwrap_err();
    assert!(matches!(err, SubmitError::Io(IoError::OutOfRange)));

    tear_down(&layer, handle);
}

#[test]
fn write_at_wrapping_start_sector_fails() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();

    // Sector (1 << 55) + 5 would wrap to sector 5's byte offset when
    // shifted; the request must fail, not alias an in-range sector.
    let mut data = [3u8; 512];
    let err = submit(
        &layer,
        "ramblk",
        0,
        RequestOp::Write,
        (1 << 55) + 5,
        vec![&mut data],
    )
    .unwrap_err();
    assert!(matches!(err, SubmitError::Io(IoError::OutOfRange)));

    let mut out = [0xFFu8; 512];
    submit(&layer, "ramblk", 0, RequestOp::Read, 5, vec![&mut out]).unwrap();
    assert_eq!(out, [0u8; 512]);

    tear_down(&layer, handle);
}

#[test]
fn scattered_read_is_contiguous_and_ordered() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();

    let mut data: Vec<u8> = (0..200).collect();
    submit(&layer, "ramblk", 0, RequestOp::Write, 0, vec![&mut data]).unwrap();

    let mut a = [0u8; 100];
    let mut b = [0u8; 100];
    submit(&layer, "ramblk", 0, RequestOp::Read, 0, vec![&mut a, &mut b]).unwrap();
    assert_eq!(a.to_vec(), (0..100).collect::<Vec<u8>>());
    assert_eq!(b.to_vec(), (100..200).collect::<Vec<u8>>());

    tear_down(&layer, handle);
}

#[test]
fn failed_request_leaves_device_usable() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();

    let mut bad = [9u8; 512];
    let err = submit(&layer, "ramblk", 0, RequestOp::Write, 81920, vec![&mut bad]).unwrap_err();
    assert!(matches!(err, SubmitError::Io(IoError::OutOfRange)));

    // The failure was scoped to that request.
    let mut data = [0x5Au8; 512];
    submit(&layer, "ramblk", 0, RequestOp::Write, 10, vec![&mut data]).unwrap();
    let mut out = [0u8; 512];
    submit(&layer, "ramblk", 0, RequestOp::Read, 10, vec![&mut out]).unwrap();
    assert_eq!(out, [0x5Au8; 512]);

    tear_down(&layer, handle);
}

#[test]
fn multi_queue_concurrent_disjoint_writes() {
    const QUEUES: u32 = 4;
    const CHUNK: usize = 65536;

    let layer = BlockLayer::new();
    let config = RamDiskConfig {
        capacity_mib: 8,
        tag_set: TagSetConfig {
            nr_hw_queues: QUEUES,
            ..TagSetConfig::default()
        },
        ..RamDiskConfig::default()
    };
    let handle = bring_up(&layer, &config).unwrap();

    let layer_ref = &layer;
    std::thread::scope(|s| {
        for q in 0..QUEUES {
            s.spawn(move || {
                // Each queue owns a disjoint 2 MiB region.
                let base_sector = u64::from(q) * 4096;
                let fill = 0x10 + q as u8;
                let mut data = vec![fill; CHUNK];
                submit(
                    layer_ref,
                    "ramblk",
                    q,
                    RequestOp::Write,
                    base_sector,
                    vec![&mut data],
                )
                .unwrap();

                let mut out = vec![0u8; CHUNK];
                submit(
                    layer_ref,
                    "ramblk",
                    q,
                    RequestOp::Read,
                    base_sector,
                    vec![&mut out],
                )
                .unwrap();
                assert_eq!(out, data);
            });
        }
    });

    // Every region is still intact after all queues finished.
    for q in 0..QUEUES {
        let fill = 0x10 + q as u8;
        let mut out = vec![0u8; CHUNK];
        submit(
            &layer,
            "ramblk",
            0,
            RequestOp::Read,
            u64::from(q) * 4096,
            vec![&mut out],
        )
        .unwrap();
        assert_eq!(out, vec![fill; CHUNK]);
    }

    tear_down(&layer, handle);
}

#[test]
fn duplicate_publish_fails_and_unwinds() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();
    let counts_before = layer.resource_counts();

    let err = bring_up(&layer, &RamDiskConfig::default()).unwrap_err();
    assert_eq!(err.step, BringUpStep::DiskPublished);
    assert_eq!(err.source, HostError::DuplicateName(String::from("ramblk")));

    // The failed attempt released everything it had acquired.
    assert_eq!(layer.resource_counts(), counts_before);

    tear_down(&layer, handle);
    assert!(layer.resource_counts().is_empty());
}

#[test]
fn tear_down_releases_every_resource() {
    let layer = BlockLayer::new();
    let handle = bring_up(&layer, &RamDiskConfig::default()).unwrap();

    let counts = layer.resource_counts();
    assert_eq!(counts.majors, 1);
    assert_eq!(counts.tag_sets, 1);
    assert_eq!(counts.disks, 1);
    assert_eq!(counts.minors, 1);
    assert_eq!(counts.published, 1);
    assert!(layer.is_published("ramblk"));

    tear_down(&layer, handle);
    assert!(layer.resource_counts().is_empty());
    assert!(!layer.is_published("ramblk"));
}

#[test]
fn two_devices_coexist_under_different_names() {
    let layer = BlockLayer::new();
    let first = bring_up(&layer, &RamDiskConfig::default()).unwrap();
    let second = bring_up(
        &layer,
        &RamDiskConfig {
            name: String::from("ramblk1"),
            capacity_mib: 1,
            ..RamDiskConfig::default()
        },
    )
    .unwrap();

    let mut data = [0x77u8; 512];
    submit(&layer, "ramblk1", 0, RequestOp::Write, 0, vec![&mut data]).unwrap();
    let mut out = [0u8; 512];
    submit(&layer, "ramblk", 0, RequestOp::Read, 0, vec![&mut out]).unwrap();
    // The write went to the other disk's store.
    assert_eq!(out, [0u8; 512]);

    tear_down(&layer, second);
    tear_down(&layer, first);
    assert!(layer.resource_counts().is_empty());
}
