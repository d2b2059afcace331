//! The engine context: geometry and superblocks shared, read-only, across
//! every worker (spec §5: "the superblock array is read-only after
//! initialization"). Replaces the original's process-wide globals
//! (`original_source/src/device.c`'s `superblocks`, `full_disk_size`,
//! `sb_ag_count`) with an explicit, owned value threaded through workers.

use crate::error::RecoveryError;
use crate::readat::ReadAt;
use crate::superblock::Superblock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Context {
	pub source: PathBuf,
	pub target: PathBuf,
	pub superblocks: Arc<[Superblock]>,
	pub block_size: u64,
	pub ag_blocks: u64,
	pub total_blocks: u64,
	pub start_block: u64,
}

impl Context {
	/// Reads every allocation group's superblock from `dev`, using AG 0's
	/// self-describing geometry to locate the rest (spec §4.2).
	pub fn load(
		dev: &impl ReadAt,
		source: &Path,
		target: &Path,
		start_block: u64,
	) -> Result<Self, RecoveryError> {
		let primary = Superblock::read_primary(dev)?;
		let ag_blocks = primary.ag_blocks as u64;
		let block_size = primary.block_size as u64;
		let ag_count = primary.ag_count;

		let mut superblocks = Vec::with_capacity(ag_count as usize);
		superblocks.push(primary);
		for ag in 1..ag_count {
			superblocks.push(Superblock::read(dev, ag, ag_blocks, block_size)?);
		}

		let total_blocks = ag_count as u64 * ag_blocks;

		Ok(Self {
			source: source.to_path_buf(),
			target: target.to_path_buf(),
			superblocks: Arc::from(superblocks.into_boxed_slice()),
			block_size,
			ag_blocks,
			total_blocks,
			start_block,
		})
	}

	/// The `[start_block, end_block)` range for allocation group `ag_index`,
	/// clamped to `start_block` when it falls inside this AG, and skipped
	/// entirely when `start_block` lies in a later AG (spec §4.9).
	pub fn ag_range(&self, ag_index: u32) -> Option<(u64, u64)> {
		let ag_start = ag_index as u64 * self.ag_blocks;
		let ag_end = ag_start + self.ag_blocks;
		if self.start_block >= ag_end {
			return None;
		}
		Some((ag_start.max(self.start_block), ag_end))
	}

	pub fn ag_count(&self) -> u32 {
		self.superblocks.len() as u32
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn synthetic_device(ag_blocks: u32, ag_count: u32, block_size: u32) -> Vec<u8> {
		let mut buf = vec![0u8; crate::superblock::SUPERBLOCK_SIZE];
		buf[0..4].copy_from_slice(crate::superblock::MAGIC);
		buf[4..8].copy_from_slice(&block_size.to_be_bytes());
		buf[84..88].copy_from_slice(&ag_blocks.to_be_bytes());
		buf[88..92].copy_from_slice(&ag_count.to_be_bytes());
		buf[102..104].copy_from_slice(&512u16.to_be_bytes());
		buf[104..106].copy_from_slice(&256u16.to_be_bytes());
		buf
	}

	#[test]
	fn loads_primary_geometry() {
		let dev = synthetic_device(1000, 1, 4096);
		let ctx = Context::load(&dev, Path::new("/dev/null"), Path::new("/tmp"), 0).unwrap();
		assert_eq!(ctx.ag_count(), 1);
		assert_eq!(ctx.total_blocks, 1000);
	}

	#[test]
	fn start_block_skips_earlier_ags() {
		let dev = synthetic_device(1000, 1, 4096);
		let ctx = Context::load(&dev, Path::new("/dev/null"), Path::new("/tmp"), 1500).unwrap();
		assert_eq!(ctx.ag_range(0), None);
	}
}
