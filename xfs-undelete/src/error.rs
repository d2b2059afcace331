//! Error kinds, one variant family per component boundary (spec §7).

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the byte-order accessors (§4.1) and any decoder built on them.
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("field at offset {offset} (width {width}) falls outside a buffer of {len} bytes")]
	InvalidRange {
		offset: usize,
		width: usize,
		len: usize,
	},
}

/// Errors reading the per-AG superblock (§4.2).
#[derive(Debug, Error)]
pub enum SuperblockError {
	#[error("seek to allocation group failed: {0}")]
	SeekFailed(#[source] std::io::Error),
	#[error("short read of superblock: got {got} of {want} bytes")]
	ReadShort { got: usize, want: usize },
	#[error("bad superblock magic: expected \"XFSB\"")]
	BadMagic,
}

/// Errors from the inode core decoder (§4.4).
#[derive(Debug, Error)]
pub enum InodeError {
	#[error("not a recognizable inode image")]
	BadMagic,
	#[error("embedded filesystem UUID does not match this allocation group")]
	UuidMismatch,
	#[error("forensic reconstruction failed: {0}")]
	ReconstructFailed(#[from] ReconstructError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
}

/// Errors from the forensic reconstructor (§4.5).
#[derive(Debug, Error)]
pub enum ReconstructError {
	#[error("no recoverable data or xattr fork evidence survived in the inode tail")]
	NothingRecovered,
}

/// Fatal setup errors that abort the whole run (§7).
#[derive(Debug, Error)]
pub enum DeviceError {
	#[error("cannot open source device {path}: {source}")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("cannot remount {path} read-only: {source}")]
	Remount {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}

/// Per-AG scanner abort (§4.9): three consecutive read errors on distinct blocks.
#[derive(Debug, Error)]
#[error("allocation group {ag}: {count} consecutive read errors")]
pub struct ReadErrors {
	pub ag: u32,
	pub count: u32,
}

/// Per-job write failure (§4.11); the partial output is left in place.
#[derive(Debug, Error)]
#[error("writing job for inode {ino} failed: {source}")]
pub struct WriteError {
	pub ino: u64,
	#[source]
	pub source: std::io::Error,
}

/// Top-level error returned by `main`'s setup path (command line, device open,
/// target creation, superblock read). Per-inode and per-AG errors never reach
/// here: they are logged and swallowed by the stage that encountered them.
#[derive(Debug, Error)]
pub enum RecoveryError {
	#[error(transparent)]
	Device(#[from] DeviceError),
	#[error(transparent)]
	Superblock(#[from] SuperblockError),
	#[error("cannot create output directory {path}: {source}")]
	TargetCreate {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
}
