//! The per-allocation-group superblock (spec §3, §4.2).

use crate::byteorder::{get_u16, get_u32, get_u64, get_u8};
use crate::error::SuperblockError;
use crate::readat::ReadAt;
use uuid::Uuid;

/// The four magic bytes every XFS superblock begins with.
pub const MAGIC: &[u8; 4] = b"XFSB";

/// Number of leading bytes read from each AG's superblock copy.
pub const SUPERBLOCK_SIZE: usize = 271;

/// Feature bit (in `sb_features2`/`versionnum`) marking a v5 (CRC-enabled)
/// filesystem, whose inodes carry an embedded UUID that must match.
const XFS_SB_VERSION_5: u16 = 5;

#[derive(Debug, Clone)]
pub struct Superblock {
	pub uuid: Uuid,
	/// Secondary ("incompatibility") UUID, present on v5 filesystems.
	pub meta_uuid: Uuid,
	pub label: Option<String>,
	pub block_size: u32,
	/// Size of one allocation group, in blocks.
	pub ag_blocks: u32,
	pub ag_count: u32,
	pub sector_size: u16,
	pub inode_size: u16,
	pub version: u16,
	pub root_ino: u64,
}

impl Superblock {
	/// Reads the superblock for allocation group `ag_index`, given the
	/// geometry (`ag_blocks`, `block_size`) established by AG 0's own
	/// superblock (the caller reads AG 0 first with these set to `0` — see
	/// [`Self::read_primary`]).
	pub fn read(
		dev: &impl ReadAt,
		ag_index: u32,
		ag_blocks: u64,
		block_size: u64,
	) -> Result<Self, SuperblockError> {
		let ag_start = ag_index as u64 * ag_blocks * block_size;
		let mut buf = [0u8; SUPERBLOCK_SIZE];
		let n = dev
			.read_at(ag_start, &mut buf)
			.map_err(SuperblockError::SeekFailed)?;
		if n != SUPERBLOCK_SIZE {
			return Err(SuperblockError::ReadShort {
				got: n,
				want: SUPERBLOCK_SIZE,
			});
		}
		Self::parse(&buf)
	}

	/// Reads AG 0's superblock, which is self-describing (it carries its own
	/// `ag_blocks`/`block_size`) and is used to discover the geometry needed
	/// to locate every other AG.
	pub fn read_primary(dev: &impl ReadAt) -> Result<Self, SuperblockError> {
		let mut buf = [0u8; SUPERBLOCK_SIZE];
		let n = dev.read_at(0, &mut buf).map_err(SuperblockError::SeekFailed)?;
		if n != SUPERBLOCK_SIZE {
			return Err(SuperblockError::ReadShort {
				got: n,
				want: SUPERBLOCK_SIZE,
			});
		}
		Self::parse(&buf)
	}

	fn parse(buf: &[u8; SUPERBLOCK_SIZE]) -> Result<Self, SuperblockError> {
		if &buf[0..4] != MAGIC {
			return Err(SuperblockError::BadMagic);
		}

		let block_size = get_u32(buf, 4).map_err(|_| SuperblockError::BadMagic)?;
		// `root_ino` is not an XFS superblock field at offset 8 (that is
		// `total_blocks`, a u64) — the root inode lives at offset 56.
		let root_ino = get_u64(buf, 56).map_err(|_| SuperblockError::BadMagic)?;
		let ag_blocks = get_u32(buf, 84).map_err(|_| SuperblockError::BadMagic)?;
		let ag_count = get_u32(buf, 88).map_err(|_| SuperblockError::BadMagic)?;
		let version = get_u16(buf, 100).map_err(|_| SuperblockError::BadMagic)?;
		let sector_size = get_u16(buf, 102).map_err(|_| SuperblockError::BadMagic)?;
		let inode_size = get_u16(buf, 104).map_err(|_| SuperblockError::BadMagic)?;

		let uuid = Uuid::from_slice(&buf[32..48]).map_err(|_| SuperblockError::BadMagic)?;
		let meta_uuid = if version & 0xf >= XFS_SB_VERSION_5 && buf.len() >= 264 {
			Uuid::from_slice(&buf[248..264]).map_err(|_| SuperblockError::BadMagic)?
		} else {
			uuid
		};

		let label = {
			let raw = &buf[108..120];
			let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
			if end == 0 {
				None
			} else {
				Some(String::from_utf8_lossy(&raw[..end]).into_owned())
			}
		};
		let _ = get_u8(buf, 0); // touch the magic byte through the bounded accessor too

		Ok(Self {
			uuid,
			meta_uuid,
			label,
			block_size,
			ag_blocks,
			ag_count,
			sector_size,
			inode_size,
			version,
			root_ino,
		})
	}

	/// Whether this filesystem is v5 (CRC-enabled, per-inode UUID checked).
	pub fn is_v5(&self) -> bool {
		self.version & 0xf >= XFS_SB_VERSION_5
	}

	pub fn ag_size_bytes(&self) -> u64 {
		self.ag_blocks as u64 * self.block_size as u64
	}
}
