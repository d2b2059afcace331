//! Packed short-form directory decoder (spec §3, §4.6).

use crate::byteorder::{get_u16, get_u64, get_u8};
use thiserror::Error;

/// Marker written into the first two bytes of a deleted entry's inode
/// address field; the remaining two bytes of that field hold the length of
/// the gap the deletion left behind.
const DELETED_MARKER: u16 = 0xFFFF;

#[derive(Debug, Error)]
pub enum DirParseError {
	#[error("declared directory size {declared} exceeds the {available}-byte buffer")]
	TooLarge { declared: usize, available: usize },
	#[error("i8count ({i8count}) exceeds entry count ({count})")]
	TooManyWideEntries { i8count: u8, count: u8 },
	#[error("entry name contains unprintable bytes")]
	UnprintableName,
	#[error("parent inode address {parent} exceeds device bound {bound}")]
	ParentOutOfRange { parent: u64, bound: u64 },
	#[error(transparent)]
	Truncated(#[from] crate::error::DecodeError),
}

#[derive(Debug, Clone)]
pub struct DirEntry {
	pub name: Vec<u8>,
	pub file_type: u8,
	/// `None` when this entry carries the deletion marker.
	pub inode: Option<u64>,
	/// Gap length recorded in a deleted entry's address field, if deleted.
	pub deleted_gap: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct ShortFormDir {
	pub parent_ino: u64,
	pub entries: Vec<DirEntry>,
	/// Total on-disk size of the header plus all entries, in bytes — used to
	/// fast-forward the reconstructor's strip cursor (spec §4.5 step 1).
	pub byte_size: usize,
}

fn is_printable(name: &[u8]) -> bool {
	!name.is_empty() && name.iter().all(|&b| (0x20..0x7f).contains(&b))
}

impl ShortFormDir {
	/// Parses a packed short-form directory starting at the beginning of
	/// `buf`. `device_bound` is the largest address a parent-inode field may
	/// legitimately hold (spec invariant: "parent address ≤ total disk size
	/// in bytes").
	pub fn parse(buf: &[u8], device_bound: u64) -> Result<Self, DirParseError> {
		let count = get_u8(buf, 0)?;
		let i8count = get_u8(buf, 1)?;
		if i8count > count {
			return Err(DirParseError::TooManyWideEntries { i8count, count });
		}
		let addr_width = if i8count > 0 { 8 } else { 4 };
		let header_size = 2 + addr_width;

		let parent_ino = read_inode_addr(buf, 2, addr_width)?;
		if parent_ino > device_bound {
			return Err(DirParseError::ParentOutOfRange {
				parent: parent_ino,
				bound: device_bound,
			});
		}

		let mut cursor = header_size;
		let mut entries = Vec::with_capacity(count as usize);
		for _ in 0..count {
			let namelen = get_u8(buf, cursor)? as usize;
			// 2 reserved/offset bytes, not otherwise interpreted here.
			let _offset_tag = get_u16(buf, cursor + 1)?;
			let name_start = cursor + 3;
			let name_end = name_start + namelen;
			let name = buf
				.get(name_start..name_end)
				.ok_or(crate::error::DecodeError::InvalidRange {
					offset: name_start,
					width: namelen,
					len: buf.len(),
				})?
				.to_vec();

			let deletion_probe = get_u16(buf, name_end + 1)?;
			let is_deleted = deletion_probe == DELETED_MARKER;
			if !is_deleted && !is_printable(&name) {
				return Err(DirParseError::UnprintableName);
			}

			let file_type = get_u8(buf, name_end)?;
			let addr_start = name_end + 1;
			let (inode, deleted_gap) = if is_deleted {
				let gap = get_u16(buf, addr_start + 2)?;
				(None, Some(gap))
			} else {
				(Some(read_inode_addr(buf, addr_start, addr_width)?), None)
			};

			cursor = addr_start + addr_width;
			entries.push(DirEntry {
				name,
				file_type,
				inode,
				deleted_gap,
			});
		}

		Ok(Self {
			parent_ino,
			entries,
			byte_size: cursor,
		})
	}
}

fn read_inode_addr(buf: &[u8], offset: usize, width: usize) -> Result<u64, crate::error::DecodeError> {
	if width == 8 {
		get_u64(buf, offset)
	} else {
		Ok(get_u32_be(buf, offset)? as u64)
	}
}

fn get_u32_be(buf: &[u8], offset: usize) -> Result<u32, crate::error::DecodeError> {
	crate::byteorder::get_u32(buf, offset)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn push_entry(buf: &mut Vec<u8>, name: &[u8], file_type: u8, ino: u64, wide: bool) {
		buf.push(name.len() as u8);
		buf.extend_from_slice(&0u16.to_be_bytes());
		buf.extend_from_slice(name);
		buf.push(file_type);
		if wide {
			buf.extend_from_slice(&ino.to_be_bytes());
		} else {
			buf.extend_from_slice(&(ino as u32).to_be_bytes());
		}
	}

	fn push_deleted_entry(buf: &mut Vec<u8>, name: &[u8], gap: u16, wide: bool) {
		buf.push(name.len() as u8);
		buf.extend_from_slice(&0u16.to_be_bytes());
		buf.extend_from_slice(name);
		buf.push(0); // file_type, irrelevant for a deleted entry
		buf.extend_from_slice(&0xFFFFu16.to_be_bytes());
		buf.extend_from_slice(&gap.to_be_bytes());
		if wide {
			buf.extend_from_slice(&[0u8; 4]);
		}
	}

	// S5-style: 3 entries, narrow (4-byte) addresses.
	#[test]
	fn parses_three_entries() {
		let mut buf = vec![3u8, 0u8];
		buf.extend_from_slice(&100u32.to_be_bytes());
		push_entry(&mut buf, b"a.txt", 1, 55, false);
		push_entry(&mut buf, b"b.txt", 1, 56, false);
		push_entry(&mut buf, b"sub", 2, 57, false);

		let dir = ShortFormDir::parse(&buf, 1_000_000).unwrap();
		assert_eq!(dir.parent_ino, 100);
		assert_eq!(dir.entries.len(), 3);
		assert_eq!(dir.entries[2].name, b"sub");
		assert_eq!(dir.entries[2].inode, Some(57));
		assert_eq!(dir.byte_size, buf.len());
	}

	// Invariant 11 / boundary #11: a deleted entry is preserved, not rejected.
	#[test]
	fn deleted_entry_preserved() {
		let mut buf = vec![1u8, 0u8];
		buf.extend_from_slice(&100u32.to_be_bytes());
		push_deleted_entry(&mut buf, b"gone", 12, false);

		let dir = ShortFormDir::parse(&buf, 1_000_000).unwrap();
		assert_eq!(dir.entries.len(), 1);
		assert!(dir.entries[0].inode.is_none());
		assert_eq!(dir.entries[0].deleted_gap, Some(12));
	}

	// Boundary #12: declared size exceeding the buffer is rejected.
	#[test]
	fn truncated_entry_rejected() {
		let mut buf = vec![2u8, 0u8];
		buf.extend_from_slice(&100u32.to_be_bytes());
		push_entry(&mut buf, b"only", 1, 55, false);
		// second entry declared but bytes are missing

		assert!(ShortFormDir::parse(&buf, 1_000_000).is_err());
	}

	#[test]
	fn unprintable_name_rejected() {
		let mut buf = vec![1u8, 0u8];
		buf.extend_from_slice(&100u32.to_be_bytes());
		push_entry(&mut buf, &[0x01, 0x02], 1, 55, false);
		assert!(matches!(
			ShortFormDir::parse(&buf, 1_000_000),
			Err(DirParseError::UnprintableName)
		));
	}
}
