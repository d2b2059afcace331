//! Local extended-attribute block decoder (spec §3, §4.6).

use crate::byteorder::{get_u16, get_u8};
use thiserror::Error;

/// Per-block padding beyond which a candidate header is rejected outright
/// (mirrors the original's sanity check on an implausible padding byte).
const MAX_PADDING: u8 = 8;

#[derive(Debug, Error)]
pub enum XattrParseError {
	#[error("not a local xattr block: header size {size} outside 1..={available}")]
	NotAHeader { size: u16, available: usize },
	#[error("implausible padding byte {0} (> {MAX_PADDING})")]
	ImplausiblePadding(u8),
}

#[derive(Debug, Clone)]
pub struct XattrEntry {
	pub flags: u8,
	pub name: Vec<u8>,
	pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct LocalXattrs {
	pub entries: Vec<XattrEntry>,
}

/// Checks whether `buf` begins with a plausible local-xattr header, without
/// committing to parsing entries. Returns `(total_size, count, padding)` on
/// success; used by the reconstructor (§4.5 step 3) to probe candidate
/// offsets before accepting one.
pub fn probe_header(buf: &[u8]) -> Result<(u16, u8, u8), XattrParseError> {
	let size = get_u16(buf, 0).map_err(|_| XattrParseError::NotAHeader {
		size: 0,
		available: buf.len(),
	})?;
	if size == 0 || size as usize > buf.len() {
		return Err(XattrParseError::NotAHeader {
			size,
			available: buf.len(),
		});
	}
	let count = get_u8(buf, 2).map_err(|_| XattrParseError::NotAHeader {
		size,
		available: buf.len(),
	})?;
	let padding = get_u8(buf, 3).map_err(|_| XattrParseError::NotAHeader {
		size,
		available: buf.len(),
	})?;
	if padding > MAX_PADDING {
		return Err(XattrParseError::ImplausiblePadding(padding));
	}
	Ok((size, count, padding))
}

impl LocalXattrs {
	/// Parses a local xattr block: 4-byte header (total size, entry count,
	/// padding) followed by `count` entries. Stops cleanly — returning
	/// whatever entries were gathered so far, not an error — on the first
	/// zero-length name+value pair or an entry that would run past the
	/// declared total size, since both indicate a truncated/borrowed block
	/// rather than a malformed one.
	pub fn parse(buf: &[u8]) -> Result<Self, XattrParseError> {
		let (size, count, padding) = probe_header(buf)?;
		let size = size as usize;

		let mut entries = Vec::new();
		let mut offset = 4usize;
		for _ in 0..count {
			let Some(name_len) = buf.get(offset).copied() else {
				break;
			};
			let Some(val_len) = buf.get(offset + 1).copied() else {
				break;
			};
			if name_len == 0 && val_len == 0 {
				break;
			}
			let Some(&flags) = buf.get(offset + 2) else {
				break;
			};

			let name_start = offset + 3;
			let val_start = name_start + name_len as usize + padding as usize;
			let end_byte = val_start + val_len as usize; // exclusive

			if end_byte > size {
				break;
			}
			let Some(name) = buf.get(name_start..name_start + name_len as usize) else {
				break;
			};
			let Some(value) = buf.get(val_start..end_byte) else {
				break;
			};

			entries.push(XattrEntry {
				flags,
				name: name.to_vec(),
				value: value.to_vec(),
			});
			offset = end_byte;
		}

		Ok(Self { entries })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn build(count: u8, padding: u8, entries: &[(&[u8], &[u8], u8)]) -> Vec<u8> {
		let mut body = Vec::new();
		for (name, value, flags) in entries {
			body.push(name.len() as u8);
			body.push(value.len() as u8);
			body.push(*flags);
			body.extend_from_slice(name);
			body.extend(std::iter::repeat(0u8).take(padding as usize));
			body.extend_from_slice(value);
		}
		let total = 4 + body.len();
		let mut buf = Vec::with_capacity(total);
		buf.extend_from_slice(&(total as u16).to_be_bytes());
		buf.push(count);
		buf.push(padding);
		buf.extend_from_slice(&body);
		buf
	}

	#[test]
	fn parses_entries() {
		let buf = build(2, 0, &[(b"user.a", b"1", 0), (b"user.b", b"22", 0)]);
		let x = LocalXattrs::parse(&buf).unwrap();
		assert_eq!(x.entries.len(), 2);
		assert_eq!(x.entries[0].name, b"user.a");
		assert_eq!(x.entries[1].value, b"22");
	}

	#[test]
	fn stops_on_zero_length_pair() {
		let mut buf = build(1, 0, &[(b"", b"", 0)]);
		// declared count says 2 but only one (zero-length) entry follows
		buf[2] = 2;
		let x = LocalXattrs::parse(&buf).unwrap();
		assert!(x.entries.is_empty());
	}

	#[test]
	fn rejects_implausible_header() {
		let buf = [0u8, 0, 0, 0];
		assert!(probe_header(&buf).is_err());
	}

	#[test]
	fn honors_padding_between_name_and_value() {
		let buf = build(1, 4, &[(b"n", b"v", 7)]);
		let x = LocalXattrs::parse(&buf).unwrap();
		assert_eq!(x.entries[0].flags, 7);
		assert_eq!(x.entries[0].value, b"v");
	}
}
