//! Crash-replay scenarios at the durable layer
//!
//! A writer that dies mid-append leaves a torn frame at the log tail.
//! These tests assert the whole-file contract: replay surfaces only the
//! completed commits, the visible version is unchanged by the torn
//! frame, and a successor writer appends cleanly after truncation.

use std::io::Write;
use std::path::Path;

use syncpoint_core::{CheckpointName, CreationAttributes, SectionId, Timestamp, Version};
use syncpoint_durability::{
    recover_checkpoint, CheckpointLog, CheckpointMeta, CheckpointPaths, CommitFrame,
    DurabilityMode, LogHeader, SectionUpdate,
};

fn frame(version: u64, payload: &[u8]) -> CommitFrame {
    CommitFrame::new(
        Version::new(version),
        Timestamp::from_secs(version),
        vec![SectionUpdate::new(
            &SectionId::from("11"),
            payload.to_vec(),
            None,
        )],
    )
}

fn setup(data_dir: &Path, name: &str) -> (CheckpointPaths, CheckpointMeta) {
    let cname = CheckpointName::new(name).unwrap();
    let paths = CheckpointPaths::new(data_dir, &cname);
    std::fs::create_dir_all(&paths.dir).unwrap();
    let meta = CheckpointMeta::new(&cname, CreationAttributes::default());
    meta.write_to(&paths.meta()).unwrap();
    (paths, meta)
}

#[test]
fn crashed_writer_mid_commit_finalizes_as_aborted() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, meta) = setup(dir.path(), "ckpt1");

    let header = LogHeader::new(meta.uuid, meta.created_at());
    let mut log = CheckpointLog::create(&paths.log(), &header, DurabilityMode::Always).unwrap();
    log.append(&frame(1, b"A")).unwrap();
    log.append(&frame(2, b"B")).unwrap();
    drop(log);

    // The crash: version 3's frame stops half way through.
    let torn = frame(3, b"C").to_bytes().unwrap();
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(paths.log())
        .unwrap();
    file.write_all(&torn[..torn.len() / 2]).unwrap();
    drop(file);

    // Replay: version 3 never happened; the visible version is 2.
    let recovered = recover_checkpoint(&paths).unwrap();
    assert_eq!(recovered.frames.len(), 2);
    assert_eq!(recovered.final_version(), Version::new(2));
    assert!(recovered.truncated);
    assert_eq!(recovered.frames[1].updates[0].payload, b"B");

    // A successor writer reuses version 3 after the tail is truncated.
    let mut log = CheckpointLog::open_append(
        &paths.log(),
        meta.uuid,
        DurabilityMode::Always,
        recovered.valid_end,
    )
    .unwrap();
    log.append(&frame(3, b"C2")).unwrap();
    drop(log);

    let recovered = recover_checkpoint(&paths).unwrap();
    assert_eq!(recovered.final_version(), Version::new(3));
    assert!(!recovered.truncated);
    assert_eq!(recovered.frames[2].updates[0].payload, b"C2");
}

#[test]
fn replay_preserves_payloads_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, meta) = setup(dir.path(), "bytes");

    let payloads: Vec<Vec<u8>> = vec![
        b"Hello world!".to_vec(),
        vec![0u8, 255, 1, 254, 2],
        Vec::new(),
        vec![7u8; 4096],
    ];

    let header = LogHeader::new(meta.uuid, meta.created_at());
    let mut log = CheckpointLog::create(&paths.log(), &header, DurabilityMode::Standard).unwrap();
    for (i, payload) in payloads.iter().enumerate() {
        log.append(&frame(i as u64 + 1, payload)).unwrap();
    }
    log.sync().unwrap();
    drop(log);

    let recovered = recover_checkpoint(&paths).unwrap();
    assert_eq!(recovered.frames.len(), payloads.len());
    for (frame, payload) in recovered.frames.iter().zip(&payloads) {
        assert_eq!(&frame.updates[0].payload, payload);
    }
}

#[test]
fn multi_section_commit_replays_as_one_frame() {
    let dir = tempfile::tempdir().unwrap();
    let (paths, meta) = setup(dir.path(), "multi");

    let header = LogHeader::new(meta.uuid, meta.created_at());
    let mut log = CheckpointLog::create(&paths.log(), &header, DurabilityMode::Always).unwrap();
    log.append(&CommitFrame::new(
        Version::new(1),
        Timestamp::from_secs(1),
        vec![
            SectionUpdate::new(&SectionId::from("a"), b"left".to_vec(), None),
            SectionUpdate::new(&SectionId::from("b"), b"right".to_vec(), None),
        ],
    ))
    .unwrap();
    drop(log);

    let recovered = recover_checkpoint(&paths).unwrap();
    assert_eq!(recovered.frames.len(), 1);
    let updates = &recovered.frames[0].updates;
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[0].section(), SectionId::from("a"));
    assert_eq!(updates[1].payload, b"right");
}
