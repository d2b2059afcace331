//! Big-endian field extraction at byte offsets, and the debug strip dump.
//!
//! Every on-disk XFS integer is big-endian (spec §4.1). Accessors read a
//! fixed-width field out of a borrowed buffer; bounds are the caller's
//! responsibility to have sized correctly, but a short buffer is reported as
//! `InvalidRange` rather than panicking.

use crate::error::DecodeError;

macro_rules! be_getter {
	($name:ident, $ty:ty, $width:expr) => {
		/// Reads a big-endian
		#[doc = stringify!($ty)]
		/// at `offset` within `buf`.
		pub fn $name(buf: &[u8], offset: usize) -> Result<$ty, DecodeError> {
			let end = offset + $width;
			let slice = buf
				.get(offset..end)
				.ok_or(DecodeError::InvalidRange {
					offset,
					width: $width,
					len: buf.len(),
				})?;
			let mut bytes = [0u8; $width];
			bytes.copy_from_slice(slice);
			Ok(<$ty>::from_be_bytes(bytes))
		}
	};
}

be_getter!(get_u8, u8, 1);
be_getter!(get_u16, u16, 2);
be_getter!(get_u32, u32, 4);
be_getter!(get_u64, u64, 8);

/// Renders a 16-byte strip as a single hex-dump line, in the style of
/// `hexdump -C`: offset, byte pairs, then an ASCII gutter. A no-op that
/// returns an empty string outside debug builds, matching the original's
/// `DUMP_STRIP` macro being compiled out in release.
#[cfg(debug_assertions)]
pub fn dump_strip(strip: &[u8]) -> String {
	let mut line = String::with_capacity(16 * 3 + 18);
	for b in strip {
		line.push_str(&format!("{b:02x} "));
	}
	line.push_str(" |");
	for &b in strip {
		let c = if (0x20..0x7f).contains(&b) { b as char } else { '.' };
		line.push(c);
	}
	line.push('|');
	line
}

#[cfg(not(debug_assertions))]
pub fn dump_strip(_strip: &[u8]) -> String {
	String::new()
}
