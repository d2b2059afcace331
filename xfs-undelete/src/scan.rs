//! The scanner stage (spec §4.9): a linear, inode-sized walk of one
//! allocation group, feeding accepted candidates into the directory/file
//! queues. Grounded on `original_source/src/device.c`'s `O_RDONLY|O_NOFOLLOW`
//! open and `original_source/src/scanner.c`'s per-AG thread shape.

use crate::context::Context;
use crate::error::ReadErrors;
use crate::inode::{self, InodeClass};
use crate::queue::InodeQueue;
use crate::readat::ReadAt;
use crate::reconstruct::BlockClassifier;
use crate::telemetry::ScannerCounters;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};

/// Consecutive distinct-block read failures that abort a scanner (spec §4.9).
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 3;

/// The two destination queues a scanner feeds (spec §4.7): directory
/// candidates go to `dirs`, deleted-file candidates to `files`.
pub struct ScanQueues<'a> {
	pub dirs: &'a InodeQueue<(u64, crate::inode::InodeRecord)>,
	pub files: &'a InodeQueue<(u64, crate::inode::InodeRecord)>,
}

/// Scans allocation group `ag_index`, pushing accepted candidates onto
/// `queues`. Returns `Ok(())` when the AG is exhausted or `stop` was
/// observed; `Err(ReadErrors)` after three consecutive read failures on
/// distinct blocks.
pub fn scan_ag(
	dev: &(impl ReadAt + ?Sized),
	ctx: &Context,
	ag_index: u32,
	queues: &ScanQueues<'_>,
	classifier: &(impl BlockClassifier + ?Sized),
	counters: &ScannerCounters,
	stop: &AtomicBool,
) -> Result<(), ReadErrors> {
	let Some((start_block, end_block)) = ctx.ag_range(ag_index) else {
		return Ok(());
	};
	let sb = &ctx.superblocks[ag_index as usize];
	let block_size = ctx.block_size;
	let inode_size = sb.inode_size as u64;
	let mut consecutive_errors = 0u32;

	let mut block = start_block;
	'blocks: while block < end_block {
		if stop.load(Ordering::Relaxed) {
			break;
		}

		let mut buf = vec![0u8; block_size as usize];
		let offset = block * block_size;
		match dev.read_at(offset, &mut buf) {
			Ok(n) if n == buf.len() => {
				consecutive_errors = 0;
			}
			_ => {
				consecutive_errors += 1;
				warn!("scanner: short/failed read at block {block} in AG {ag_index}");
				if consecutive_errors >= MAX_CONSECUTIVE_READ_ERRORS {
					return Err(ReadErrors {
						ag: ag_index,
						count: consecutive_errors,
					});
				}
				block += 1;
				continue 'blocks;
			}
		}
		counters.sectors_scanned.fetch_add(1, Ordering::Relaxed);

		let mut window_off = 0usize;
		while (window_off as u64) + inode_size <= block_size {
			if stop.load(Ordering::Relaxed) {
				break 'blocks;
			}
			let window = &buf[window_off..window_off + inode_size as usize];
			let record = inode::read(
				window,
				&sb.uuid,
				ctx.total_blocks,
				ctx.total_blocks * block_size,
				block_size,
				classifier,
			);
			match record {
				Ok(Some(rec)) => {
					let inode_id = rec.inode_id;
					match rec.class {
						InodeClass::Directory => {
							counters.dirs_found.fetch_add(1, Ordering::Relaxed);
							queues.dirs.push((inode_id, rec));
						}
						InodeClass::Deleted => {
							counters.files_found.fetch_add(1, Ordering::Relaxed);
							queues.files.push((inode_id, rec));
						}
					}
				}
				Ok(None) => {}
				Err(e) => debug!("scanner: rejected candidate at block {block}: {e}"),
			}
			window_off += inode_size as usize;
		}

		block += 1;
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::reconstruct::BlockProbe;
	use crate::superblock::Superblock;

	struct NeverDirectory;
	impl BlockClassifier for NeverDirectory {
		fn classify(&self, _physical_block: u64) -> BlockProbe {
			BlockProbe::default()
		}
	}

	fn synthetic_sb_bytes(ag_blocks: u32, ag_count: u32, block_size: u32, inode_size: u16) -> Vec<u8> {
		let mut buf = vec![0u8; crate::superblock::SUPERBLOCK_SIZE];
		buf[0..4].copy_from_slice(crate::superblock::MAGIC);
		buf[4..8].copy_from_slice(&block_size.to_be_bytes());
		buf[84..88].copy_from_slice(&ag_blocks.to_be_bytes());
		buf[88..92].copy_from_slice(&ag_count.to_be_bytes());
		buf[102..104].copy_from_slice(&512u16.to_be_bytes());
		buf[104..106].copy_from_slice(&inode_size.to_be_bytes());
		buf
	}

	#[test]
	fn finds_a_directory_inode_in_a_block() {
		let block_size = 512u32;
		let inode_size = 256u16;
		let mut dev = synthetic_sb_bytes(4, 1, block_size, inode_size);
		dev.resize(block_size as usize * 4, 0);

		// Place a directory inode fingerprint at block 1, offset 0.
		let ino_off = block_size as usize;
		dev[ino_off..ino_off + 2].copy_from_slice(inode::MAGIC);
		dev[ino_off + 2..ino_off + 4].copy_from_slice(&((0x4u16) << 12 | 0o755).to_be_bytes());
		dev[ino_off + 6..ino_off + 8].copy_from_slice(&2u16.to_be_bytes());

		let sb = Superblock::read_primary(&dev).unwrap();
		let ctx = Context {
			source: "/dev/null".into(),
			target: "/tmp".into(),
			superblocks: std::sync::Arc::from(vec![sb].into_boxed_slice()),
			block_size: block_size as u64,
			ag_blocks: 4,
			total_blocks: 4,
			start_block: 0,
		};

		let dir_q = InodeQueue::new();
		let file_q = InodeQueue::new();
		let counters = ScannerCounters::default();
		let stop = AtomicBool::new(false);

		let queues = ScanQueues { dirs: &dir_q, files: &file_q };
		scan_ag(&dev, &ctx, 0, &queues, &NeverDirectory, &counters, &stop).unwrap();

		assert_eq!(dir_q.len(), 1);
		assert!(file_q.is_empty());
		assert_eq!(counters.dirs_found.load(Ordering::Relaxed), 1);
	}

	#[test]
	fn three_consecutive_short_reads_abort() {
		let block_size = 512u32;
		let sb_bytes = synthetic_sb_bytes(4, 1, block_size, 256);
		// Device is shorter than the AG, so every block read after the first
		// is short or fails.
		let dev = sb_bytes;
		let sb = Superblock::read_primary(&dev).unwrap();
		let ctx = Context {
			source: "/dev/null".into(),
			target: "/tmp".into(),
			superblocks: std::sync::Arc::from(vec![sb].into_boxed_slice()),
			block_size: block_size as u64,
			ag_blocks: 4,
			total_blocks: 4,
			start_block: 0,
		};
		let dir_q = InodeQueue::new();
		let file_q = InodeQueue::new();
		let counters = ScannerCounters::default();
		let stop = AtomicBool::new(false);

		let queues = ScanQueues { dirs: &dir_q, files: &file_q };
		let err = scan_ag(&dev, &ctx, 0, &queues, &NeverDirectory, &counters, &stop)
			.unwrap_err();
		assert_eq!(err.ag, 0);
		assert_eq!(err.count, MAX_CONSECUTIVE_READ_ERRORS);
	}
}
