//! A positioned-read abstraction so the decoders in this crate run unchanged
//! against a real device file descriptor and against an in-memory buffer in
//! tests, without `unsafe` or temp files for the common case.

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

pub trait ReadAt {
	/// Reads into `buf`, returning the number of bytes actually read (which
	/// may be less than `buf.len()` near the end of the underlying medium).
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;
}

impl ReadAt for File {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
		FileExt::read_at(self, buf, offset)
	}
}

impl ReadAt for [u8] {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
		let offset = offset as usize;
		if offset >= self.len() {
			return Ok(0);
		}
		let n = buf.len().min(self.len() - offset);
		buf[..n].copy_from_slice(&self[offset..offset + n]);
		Ok(n)
	}
}

impl ReadAt for Vec<u8> {
	fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
		self.as_slice().read_at(offset, buf)
	}
}

/// Reads exactly `buf.len()` bytes at `offset`, failing with `UnexpectedEof`
/// on a short read (the scanner/analyzer/writer all need full fixed-size
/// records, never partial ones).
pub fn read_exact_at(src: &impl ReadAt, offset: u64, buf: &mut [u8]) -> io::Result<()> {
	let n = src.read_at(offset, buf)?;
	if n != buf.len() {
		return Err(io::Error::new(
			io::ErrorKind::UnexpectedEof,
			format!("short read: got {n} of {} bytes", buf.len()),
		));
	}
	Ok(())
}
