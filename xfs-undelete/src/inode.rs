//! The inode core decoder (spec §3, §4.4).
//!
//! Distinguishes three kinds of candidate window: a deleted inode (recognized
//! by its zero/forced-value fingerprint), a live directory inode ("IN" magic
//! plus the directory type nibble), or neither. Deleted inodes are handed to
//! the forensic reconstructor before their remaining scalar fields are
//! copied; directory inodes skip reconstruction entirely.

use crate::byteorder::{get_u16, get_u32, get_u64, get_u8};
use crate::error::InodeError;
use crate::reconstruct::{reconstruct, BlockClassifier, ForkKind, Reconstructed};
use uuid::Uuid;

/// The two bytes every inode core begins with.
pub const MAGIC: &[u8; 2] = b"IN";

/// v1/v2 inode core size; v3 (v5 filesystems) extends this to 176 bytes.
pub const CORE_SIZE_V1V2: usize = 100;
pub const CORE_SIZE_V3: usize = 176;

const FT_DIR: u8 = 0x4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeClass {
	Deleted,
	Directory,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Timestamps {
	pub atime_ep: u32,
	pub atime_ns: u32,
	pub mtime_ep: u32,
	pub mtime_ns: u32,
	pub ctime_ep: u32,
	pub ctime_ns: u32,
	/// v3-only.
	pub btime_ep: u32,
	pub btime_ns: u32,
}

#[derive(Debug, Clone)]
pub struct InodeRecord {
	pub class: InodeClass,
	pub version: u8,
	pub file_type: u8,
	pub file_mode: u16,
	pub uid: u32,
	pub gid: u32,
	pub num_links: u64,
	pub times: Timestamps,
	pub file_size: u64,
	pub file_blocks: u64,
	pub ext_used: u32,
	pub xattr_off: u8,
	pub inode_id: u64,
	pub uuid: Option<Uuid>,
	pub data_fork: ForkKind,
	pub xattr_fork: ForkKind,
	pub reconstructed: Option<Reconstructed>,
}

/// Reads an inode core window and classifies it as deleted, directory, or
/// neither. `sb_uuid` is the owning AG's primary UUID (checked against the
/// inode's embedded UUID when `version > 2`); `total_blocks`/`device_bound`
/// feed the reconstructor's plausibility checks; `block_size` turns a
/// reconstructed extent block count into the reported byte size (spec §4.5:
/// "file-size = block-count × block-size as an upper bound").
pub fn read(
	window: &[u8],
	sb_uuid: &Uuid,
	total_blocks: u64,
	device_bound: u64,
	block_size: u64,
	classifier: &(impl BlockClassifier + ?Sized),
) -> Result<Option<InodeRecord>, InodeError> {
	if window.len() < 2 || &window[0..2] != MAGIC {
		return Ok(None);
	}

	let version = get_u8(window, 4).map_err(|_| InodeError::BadMagic)?;

	if version > 2 {
		let core_size = CORE_SIZE_V3.min(window.len());
		if core_size < CORE_SIZE_V3 {
			return Err(InodeError::BadMagic);
		}
		let embedded = Uuid::from_slice(&window[160..176]).map_err(|_| InodeError::BadMagic)?;
		if &embedded != sb_uuid {
			return Err(InodeError::UuidMismatch);
		}
	}

	let type_mode = get_u16(window, 2).map_err(|_| InodeError::BadMagic)?;
	let file_type_nibble = ((type_mode & 0xf000) >> 12) as u8;

	let num_links_v1 = get_u16(window, 6).map_err(|_| InodeError::BadMagic)?;
	let num_links_v2 = get_u32(window, 16).map_err(|_| InodeError::BadMagic)?;
	let file_size = get_u64(window, 56).map_err(|_| InodeError::BadMagic)?;
	let file_blocks = get_u64(window, 64).map_err(|_| InodeError::BadMagic)?;
	let ext_used = get_u32(window, 76).map_err(|_| InodeError::BadMagic)?;
	let xattr_off = get_u8(window, 82).map_err(|_| InodeError::BadMagic)?;

	let num_links = if version > 2 {
		num_links_v2 as u64
	} else {
		num_links_v1 as u64
	};

	let is_deleted_fingerprint = type_mode == 0
		&& num_links == 0
		&& file_size == 0
		&& file_blocks == 0
		&& ext_used == 0
		&& xattr_off == 0;
	let is_directory = file_type_nibble == FT_DIR;

	let class = if is_deleted_fingerprint {
		InodeClass::Deleted
	} else if is_directory {
		InodeClass::Directory
	} else {
		return Ok(None);
	};

	let inode_id = get_u64(window, 152).unwrap_or(0);
	let uuid = if version > 2 {
		Some(Uuid::from_slice(&window[160..176]).map_err(|_| InodeError::BadMagic)?)
	} else {
		None
	};

	let times = Timestamps {
		atime_ep: get_u32(window, 32).unwrap_or(0),
		atime_ns: get_u32(window, 36).unwrap_or(0),
		mtime_ep: get_u32(window, 40).unwrap_or(0),
		mtime_ns: get_u32(window, 44).unwrap_or(0),
		ctime_ep: get_u32(window, 48).unwrap_or(0),
		ctime_ns: get_u32(window, 52).unwrap_or(0),
		btime_ep: if version > 2 { get_u32(window, 144).unwrap_or(0) } else { 0 },
		btime_ns: if version > 2 { get_u32(window, 148).unwrap_or(0) } else { 0 },
	};
	let uid = get_u32(window, 8).unwrap_or(0);
	let gid = get_u32(window, 12).unwrap_or(0);

	let (data_fork, xattr_fork, reconstructed, file_type, out_file_size, out_file_blocks, out_ext_used) =
		match class {
			InodeClass::Deleted => {
				let core_size = if version > 2 { CORE_SIZE_V3 } else { CORE_SIZE_V1V2 };
				let tail = window.get(core_size..).unwrap_or(&[]);
				let r = reconstruct(tail, total_blocks, device_bound, classifier)?;
				let data_fork = r.data_fork;
				let xattr_fork = r.xattr_fork;
				let file_type = if r.is_directory { FT_DIR } else { file_type_nibble };
				let blocks: u64 = r.data_extents.iter().map(|e| e.length).sum();
				let size = blocks * block_size;
				let exts = r.data_extents.len() as u32;
				(data_fork, xattr_fork, Some(r), file_type, size, blocks, exts)
			}
			InodeClass::Directory => (
				ForkKind::Local,
				ForkKind::Extents,
				None,
				FT_DIR,
				file_size,
				file_blocks,
				ext_used,
			),
		};

	Ok(Some(InodeRecord {
		class,
		version,
		file_type,
		file_mode: type_mode & 0x0fff,
		uid,
		gid,
		num_links,
		times,
		file_size: out_file_size,
		file_blocks: out_file_blocks,
		ext_used: out_ext_used,
		xattr_off,
		inode_id,
		uuid,
		data_fork,
		xattr_fork,
		reconstructed,
	}))
}
