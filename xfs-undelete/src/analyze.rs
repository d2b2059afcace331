//! The analyzer stage (spec §4.10): turns accepted inode candidates into
//! work the writer can act on. Directory inodes are drained first and
//! continuously; the file queue is only drained once scanning has finished
//! on every allocation group ("unshackling", spec §4.8/§4.13), mirroring
//! `original_source/src/thrd_ctrl.c`'s `unshackle_analyzers`.

use crate::inode::InodeRecord;
use crate::job::{self, RecoveryJob};
use crate::queue::InodeQueue;
use crate::telemetry::AnalyzerCounters;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

/// A short-form directory recovered straight from a deleted inode's tail
/// (spec §4.5 step 1); written by the writer as a manifest rather than
/// copied as file bytes, since there is no data fork to copy.
#[derive(Debug, Clone)]
pub struct DirManifest {
	pub inode_id: u64,
	pub parent_ino: u64,
	pub entries: Vec<DirManifestEntry>,
}

#[derive(Debug, Clone)]
pub struct DirManifestEntry {
	pub name: Vec<u8>,
	pub file_type: u8,
	/// `None` for entries the directory itself records as deleted.
	pub inode: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum AnalyzedItem {
	Job(RecoveryJob),
	Manifest(DirManifest),
}

/// Classifies one accepted inode into either a recovery job or a directory
/// manifest. Returns `None` when neither the data fork nor a recovered
/// directory listing survived (§4.10: "failures here are logged and the
/// candidate is dropped, not retried").
pub fn analyze_one(record: &InodeRecord, block_size: u64) -> Option<AnalyzedItem> {
	if let Some(job) = job::from_inode(record, block_size) {
		return Some(AnalyzedItem::Job(job));
	}

	let dir = record.reconstructed.as_ref()?.local_dir.as_ref()?;
	let entries = dir
		.entries
		.iter()
		.map(|e| DirManifestEntry {
			name: e.name.clone(),
			file_type: e.file_type,
			inode: e.inode,
		})
		.collect();
	Some(AnalyzedItem::Manifest(DirManifest {
		inode_id: record.inode_id,
		parent_ino: dir.parent_ino,
		entries,
	}))
}

/// Drains the directory queue until empty, analyzing every entry and pushing
/// the result onto `out_queue`. Directories are always available to analyze
/// (they never wait on `scan_done`), matching the original's priority: the
/// directory tree is reconstructed before any file content is written.
pub fn drain_directories(
	dir_queue: &InodeQueue<(u64, InodeRecord)>,
	out_queue: &InodeQueue<AnalyzedItem>,
	block_size: u64,
	counters: &AnalyzerCounters,
) {
	while let Some((_inode_id, record)) = dir_queue.pop() {
		counters.analyzed.fetch_add(1, Ordering::Relaxed);
		match analyze_one(&record, block_size) {
			Some(AnalyzedItem::Manifest(m)) => {
				counters.dirents_found.fetch_add(m.entries.len() as u64, Ordering::Relaxed);
				out_queue.push(AnalyzedItem::Manifest(m));
			}
			Some(item) => out_queue.push(item),
			None => debug!("analyzer: directory inode yielded no manifest or job"),
		}
	}
}

/// Drains the file queue, gated by `scan_done`: while scanning is still in
/// progress on any allocation group, this returns immediately without
/// touching the queue, so the analyzer keeps up with the directory tree
/// first (spec §4.8's "unshackling").
pub fn drain_files(
	file_queue: &InodeQueue<(u64, InodeRecord)>,
	out_queue: &InodeQueue<AnalyzedItem>,
	block_size: u64,
	counters: &AnalyzerCounters,
	scan_done: &AtomicBool,
	stop: &AtomicBool,
) {
	if !scan_done.load(Ordering::Acquire) {
		return;
	}
	while let Some((_inode_id, record)) = file_queue.pop() {
		if stop.load(Ordering::Relaxed) {
			break;
		}
		counters.analyzed.fetch_add(1, Ordering::Relaxed);
		match analyze_one(&record, block_size) {
			Some(item) => {
				counters.files_forwarded.fetch_add(1, Ordering::Relaxed);
				out_queue.push(item);
			}
			None => debug!("analyzer: file inode yielded no recoverable job"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::extent::Extent;
	use crate::inode::{InodeClass, Timestamps};
	use crate::reconstruct::{reconstruct, BlockProbe, ForkKind};

	struct NeverDirectory;
	impl crate::reconstruct::BlockClassifier for NeverDirectory {
		fn classify(&self, _physical_block: u64) -> BlockProbe {
			BlockProbe::default()
		}
	}

	fn base_record(reconstructed: Option<crate::reconstruct::Reconstructed>) -> InodeRecord {
		InodeRecord {
			class: InodeClass::Deleted,
			version: 2,
			file_type: 0x8,
			file_mode: 0o644,
			uid: 0,
			gid: 0,
			num_links: 0,
			times: Timestamps::default(),
			file_size: 0,
			file_blocks: 0,
			ext_used: 0,
			xattr_off: 0,
			inode_id: 42,
			uuid: None,
			data_fork: ForkKind::Extents,
			xattr_fork: ForkKind::Extents,
			reconstructed,
		}
	}

	#[test]
	fn file_inode_becomes_a_job() {
		let r = crate::reconstruct::Reconstructed {
			data_extents: vec![Extent {
				unwritten: false,
				logical_offset: 0,
				physical_start: 100,
				length: 4,
			}],
			..Default::default()
		};
		let record = base_record(Some(r));
		match analyze_one(&record, 4096) {
			Some(AnalyzedItem::Job(job)) => assert_eq!(job.inode_id, 42),
			other => panic!("expected a job, got {other:?}"),
		}
	}

	#[test]
	fn local_directory_becomes_a_manifest() {
		let mut dir_bytes = vec![2u8, 0u8];
		dir_bytes.extend_from_slice(&100u32.to_be_bytes());
		for (name, ino) in [(&b"a"[..], 55u32), (b"b", 56)] {
			dir_bytes.push(name.len() as u8);
			dir_bytes.extend_from_slice(&0u16.to_be_bytes());
			dir_bytes.extend_from_slice(name);
			dir_bytes.push(1);
			dir_bytes.extend_from_slice(&ino.to_be_bytes());
		}
		let mut tail = vec![0u8; 64];
		tail[..dir_bytes.len()].copy_from_slice(&dir_bytes);
		let reconstructed = reconstruct(&tail, 10_000, u64::MAX, &NeverDirectory).unwrap();
		let record = base_record(Some(reconstructed));

		match analyze_one(&record, 4096) {
			Some(AnalyzedItem::Manifest(m)) => {
				assert_eq!(m.parent_ino, 100);
				assert_eq!(m.entries.len(), 2);
			}
			other => panic!("expected a manifest, got {other:?}"),
		}
	}

	#[test]
	fn files_wait_for_scan_done() {
		let dir_q: InodeQueue<(u64, InodeRecord)> = InodeQueue::new();
		let file_q: InodeQueue<(u64, InodeRecord)> = InodeQueue::new();
		let r = crate::reconstruct::Reconstructed {
			data_extents: vec![Extent {
				unwritten: false,
				logical_offset: 0,
				physical_start: 100,
				length: 4,
			}],
			..Default::default()
		};
		file_q.push((1, base_record(Some(r))));
		let out_q: InodeQueue<AnalyzedItem> = InodeQueue::new();
		let counters = AnalyzerCounters::default();
		let scan_done = AtomicBool::new(false);
		let stop = AtomicBool::new(false);

		drain_files(&file_q, &out_q, 4096, &counters, &scan_done, &stop);
		assert_eq!(file_q.len(), 1, "file queue must not drain before scan_done");

		scan_done.store(true, Ordering::Release);
		drain_files(&file_q, &out_q, 4096, &counters, &scan_done, &stop);
		assert!(file_q.is_empty());
		assert_eq!(out_q.len(), 1);

		let _ = dir_q;
	}
}
