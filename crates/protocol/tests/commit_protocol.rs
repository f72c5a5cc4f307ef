//! Commit protocol scenarios across the engine
//!
//! These mirror the documented writer/reader interactions: snapshot
//! isolation per read, no torn observations under concurrency, and full
//! independence of distinct checkpoints.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use syncpoint_core::{CheckpointName, CreationAttributes, SectionId, Version};
use syncpoint_durability::DurabilityMode;
use syncpoint_protocol::{SectionWrite, SyncEngine};

fn name(s: &str) -> CheckpointName {
    CheckpointName::new(s).unwrap()
}

fn open_engine(dir: &Path) -> SyncEngine {
    SyncEngine::open(dir, DurabilityMode::Always).unwrap()
}

#[test]
fn reader_attached_before_second_commit_observes_it_afterwards() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path());
    engine
        .open_or_create(&name("ckpt1"), CreationAttributes::default())
        .unwrap();
    let section = SectionId::from("11");

    engine
        .commit(&name("ckpt1"), vec![SectionWrite::new(section.clone(), b"A".to_vec())])
        .unwrap();

    // The "attached" reader performs its first read at version 1.
    let first = engine.read(&name("ckpt1"), &section).unwrap();
    assert_eq!(first.value, b"A");
    assert_eq!(first.version, Version::new(1));

    engine
        .commit(&name("ckpt1"), vec![SectionWrite::new(section.clone(), b"B".to_vec())])
        .unwrap();

    // Snapshot isolation per read, not per session: the same reader's
    // next read observes the writer's progress.
    let second = engine.read(&name("ckpt1"), &section).unwrap();
    assert_eq!(second.value, b"B");
    assert_eq!(second.version, Version::new(2));
}

#[test]
fn concurrent_readers_see_only_complete_commits() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(open_engine(dir.path()));
    engine
        .open_or_create(&name("ckpt1"), CreationAttributes::default())
        .unwrap();
    let section = SectionId::from("11");

    // Payload encodes its version so any mixing is detectable.
    let payload_for = |v: u64| vec![v as u8; 256];
    engine
        .commit(
            &name("ckpt1"),
            vec![SectionWrite::new(section.clone(), payload_for(1))],
        )
        .unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..3 {
        let engine = Arc::clone(&engine);
        let section = section.clone();
        let stop = Arc::clone(&stop);
        readers.push(thread::spawn(move || {
            let mut last = 0u64;
            while !stop.load(Ordering::Relaxed) {
                let got = engine.read(&name("ckpt1"), &section).unwrap();
                let v = got.version.as_u64();
                assert_eq!(got.value, vec![v as u8; 256]);
                assert!(v >= last);
                last = v;
            }
        }));
    }

    for v in 2..=100u64 {
        engine
            .commit(
                &name("ckpt1"),
                vec![SectionWrite::new(section.clone(), payload_for(v))],
            )
            .unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }

    let handle = engine.lookup(&name("ckpt1")).unwrap();
    assert_eq!(handle.state().current_version(), Version::new(100));
}

#[test]
fn checkpoints_commit_independently() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(open_engine(dir.path()));
    for n in ["left", "right"] {
        engine
            .open_or_create(&name(n), CreationAttributes::default())
            .unwrap();
    }

    let mut writers = Vec::new();
    for n in ["left", "right"] {
        let engine = Arc::clone(&engine);
        writers.push(thread::spawn(move || {
            for v in 1..=50u64 {
                let record = engine
                    .commit(
                        &name(n),
                        vec![SectionWrite::new(
                            SectionId::from("s"),
                            format!("{}-{}", n, v).into_bytes(),
                        )],
                    )
                    .unwrap();
                assert_eq!(record.version, Version::new(v));
            }
        }));
    }
    for handle in writers {
        handle.join().unwrap();
    }

    for n in ["left", "right"] {
        let got = engine.read(&name(n), &SectionId::from("s")).unwrap();
        assert_eq!(got.value, format!("{}-50", n).into_bytes());
    }
}

#[test]
fn multi_section_commit_publishes_one_version() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open_engine(dir.path());
    engine
        .open_or_create(&name("ckpt1"), CreationAttributes::default())
        .unwrap();

    let record = engine
        .commit(
            &name("ckpt1"),
            vec![
                SectionWrite::new(SectionId::from("a"), b"left".to_vec()),
                SectionWrite::new(SectionId::from("b"), b"right".to_vec()),
            ],
        )
        .unwrap();
    assert_eq!(record.version, Version::new(1));
    assert_eq!(record.sections.len(), 2);

    let a = engine.read(&name("ckpt1"), &SectionId::from("a")).unwrap();
    let b = engine.read(&name("ckpt1"), &SectionId::from("b")).unwrap();
    assert_eq!(a.version, Version::new(1));
    assert_eq!(b.version, Version::new(1));

    let handle = engine.lookup(&name("ckpt1")).unwrap();
    let updates = handle.state().updates_since(Version::ZERO);
    assert_eq!(updates.len(), 1);
    assert_eq!(
        updates[0].sections,
        vec![SectionId::from("a"), SectionId::from("b")]
    );
}
