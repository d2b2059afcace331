//! The recovery job (spec §3, §4.10) — what the analyzer hands to the writer.

use crate::extent::Extent;
use crate::inode::InodeRecord;
use crate::xattr::LocalXattrs;

#[derive(Debug, Clone)]
pub enum DataSource {
	Extents(Vec<Extent>),
	Local(Vec<u8>),
}

#[derive(Debug, Clone)]
pub enum XattrSource {
	None,
	Extents(Vec<Extent>),
	Local(LocalXattrs),
}

#[derive(Debug, Clone)]
pub struct RecoveryJob {
	pub inode_id: u64,
	pub is_directory: bool,
	pub data: DataSource,
	pub xattrs: XattrSource,
	/// Clamped to `block_count * block_size` (spec invariant 4).
	pub file_size: u64,
	pub block_count: u64,
}

/// Builds a recovery job from an already-classified inode record, clamping
/// the reported size to the block count (spec §4.10, invariant 4). Returns
/// `None` for directory-fork-kind-`Local` inodes whose directory entries
/// should be merged into a manifest rather than copied as file bytes —
/// those are handled directly by the analyzer from `InodeRecord::reconstructed`.
pub fn from_inode(record: &InodeRecord, block_size: u64) -> Option<RecoveryJob> {
	let reconstructed = record.reconstructed.as_ref();

	let data = if let Some(r) = reconstructed {
		if let Some(dir) = &r.local_dir {
			let _ = dir; // directory listings are written by the analyzer, not copied as a fork
			return None;
		}
		DataSource::Extents(r.data_extents.clone())
	} else {
		DataSource::Extents(Vec::new())
	};

	let xattrs = match reconstructed {
		Some(r) if r.local_xattr.is_some() => {
			XattrSource::Local(r.local_xattr.as_ref().unwrap().1.clone())
		}
		Some(r) if !r.xattr_extents.is_empty() => XattrSource::Extents(r.xattr_extents.clone()),
		_ => XattrSource::None,
	};

	let block_count = match &data {
		DataSource::Extents(exts) => exts.iter().map(|e| e.length).sum(),
		DataSource::Local(_) => 0,
	};
	let file_size = record.file_size.min(block_count * block_size);

	Some(RecoveryJob {
		inode_id: record.inode_id,
		is_directory: record.file_type == 0x4,
		data,
		xattrs,
		file_size,
		block_count,
	})
}
