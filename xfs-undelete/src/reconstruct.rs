//! The forensic reconstructor (spec §4.5) — the heart of the system.
//!
//! Sweeps a deleted inode's tail region, 16 bytes ("a strip") at a time,
//! through the four-state machine `DATA -> GAP -> XATTR -> END` described in
//! the spec, classifying each non-zero strip as the start of a short-form
//! directory, an extent (data or xattr), a local xattr block, or noise.

use crate::dirent::ShortFormDir;
use crate::error::ReconstructError;
use crate::extent::Extent;
#[cfg(test)]
use crate::extent::EXTENT_SIZE;
use crate::xattr::LocalXattrs;
use log::debug;

const STRIP_SIZE: usize = 16;

/// The data (or xattr) fork kind, using the on-disk numeric encoding so a
/// forced value of `2` after deletion means "extents" without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ForkKind {
	Device = 0,
	Local = 1,
	#[default]
	Extents = 2,
	Btree = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Data,
	Gap,
	Xattr,
	End,
}

/// What a probe of the 32 bytes at a candidate extent's physical start found.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockProbe {
	pub is_directory_block: bool,
	pub is_xattr_local_head: bool,
}

/// Reads the 32-byte probe window for a physical block, via whatever device
/// access the caller (the inode decoder) already holds. Kept as a trait
/// object boundary so the reconstructor itself never touches a file
/// descriptor directly.
pub trait BlockClassifier {
	fn classify(&self, physical_block: u64) -> BlockProbe;
}

/// The production [`BlockClassifier`]: reads the probe window straight off
/// the source device. Holds an owned `Arc` rather than a borrow so it can be
/// shared across worker threads independently of the device handle's own
/// lifetime (spec §5: collaborators are handed to the pipeline as shared,
/// thread-safe handles).
pub struct DeviceClassifier<D: crate::readat::ReadAt + ?Sized> {
	pub dev: std::sync::Arc<D>,
	pub block_size: u64,
	pub device_bound: u64,
}

impl<D: crate::readat::ReadAt + ?Sized> BlockClassifier for DeviceClassifier<D> {
	fn classify(&self, physical_block: u64) -> BlockProbe {
		let mut buf = [0u8; 32];
		if self.dev.read_at(physical_block * self.block_size, &mut buf).is_err() {
			return BlockProbe::default();
		}
		BlockProbe {
			is_directory_block: crate::dirent::ShortFormDir::parse(&buf, self.device_bound).is_ok(),
			is_xattr_local_head: crate::xattr::probe_header(&buf).is_ok(),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct Reconstructed {
	pub data_fork: ForkKind,
	pub is_directory: bool,
	pub data_extents: Vec<Extent>,
	pub local_dir: Option<ShortFormDir>,
	pub xattr_fork: ForkKind,
	pub xattr_extents: Vec<Extent>,
	/// (offset in 8-byte units from the core end, decoded block).
	pub local_xattr: Option<(u16, LocalXattrs)>,
}

struct State {
	phase: Phase,
	result: Reconstructed,
	any_data_extent_probed: bool,
}

/// Runs the reconstructor over `tail`, the bytes following the inode core.
/// `total_blocks` bounds extent plausibility (spec invariant 1); `device_bound`
/// bounds a recognized short-form directory's parent address (spec invariant
/// in §3); `classifier` resolves the probe-the-target-block step of the
/// extent test (spec §4.5 step 2).
pub fn reconstruct(
	tail: &[u8],
	total_blocks: u64,
	device_bound: u64,
	classifier: &(impl BlockClassifier + ?Sized),
) -> Result<Reconstructed, ReconstructError> {
	let mut state = State {
		phase: Phase::Data,
		result: Reconstructed {
			data_fork: ForkKind::Extents,
			xattr_fork: ForkKind::Extents,
			..Default::default()
		},
		any_data_extent_probed: false,
	};

	let mut i = 0usize;
	while i + STRIP_SIZE <= tail.len() {
		let strip = &tail[i..i + STRIP_SIZE];
		let advance = process_strip(&mut state, strip, i, tail, total_blocks, device_bound, classifier);
		i += advance.max(1) * STRIP_SIZE;
	}

	let has_data = !state.result.data_extents.is_empty() || state.result.local_dir.is_some();
	if !has_data {
		return Err(ReconstructError::NothingRecovered);
	}

	if state.result.local_dir.is_some() {
		state.result.data_fork = ForkKind::Local;
	} else {
		state.result.data_fork = ForkKind::Extents;
	}
	if state.result.local_xattr.is_some() {
		state.result.xattr_fork = ForkKind::Local;
	} else if !state.result.xattr_extents.is_empty() {
		state.result.xattr_fork = ForkKind::Extents;
	}

	Ok(state.result)
}

/// Classifies one strip, returning how many strips to advance by (usually 1,
/// more when a short-form directory's declared size spans several strips).
fn process_strip(
	state: &mut State,
	strip: &[u8],
	strip_offset: usize,
	tail: &[u8],
	total_blocks: u64,
	device_bound: u64,
	classifier: &(impl BlockClassifier + ?Sized),
) -> usize {
	if strip.iter().all(|&b| b == 0) {
		state.phase = match state.phase {
			Phase::Data => Phase::Gap,
			Phase::Xattr => Phase::End,
			other => other,
		};
		return 1;
	}

	if state.phase == Phase::Gap {
		state.phase = Phase::Xattr;
	}

	// 1. Short-form directory test.
	if state.phase == Phase::Data
		&& state.result.local_dir.is_none()
		&& state.result.data_extents.is_empty()
	{
		if let Ok(dir) = ShortFormDir::parse(&tail[strip_offset..], device_bound) {
			let strips = dir.byte_size.div_ceil(STRIP_SIZE);
			state.result.is_directory = true;
			state.result.local_dir = Some(dir);
			state.phase = Phase::Gap;
			return strips;
		}
	}

	// 2. Extent test.
	if let Ok(extent) = Extent::decode(strip) {
		if extent.looks_plausible(total_blocks) {
			classify_extent(state, extent, classifier);
			return 1;
		}
	}

	// 3. Local xattr test.
	if matches!(state.phase, Phase::Data | Phase::Xattr)
		&& state.result.xattr_extents.is_empty()
		&& state.result.local_xattr.is_none()
	{
		for sub_offset in [0usize, 8] {
			if let Some(sub) = strip.get(sub_offset..) {
				if let Ok(xattrs) = LocalXattrs::parse(sub) {
					let units = ((strip_offset + sub_offset) / 8) as u16;
					state.result.local_xattr = Some((units, xattrs));
					state.phase = Phase::End;
					return 1;
				}
			}
		}
	}

	// 4. Unrecognized.
	debug!(
		"unrecognized strip at tail offset {strip_offset}: {}",
		crate::byteorder::dump_strip(strip)
	);
	1
}

fn classify_extent(state: &mut State, extent: Extent, classifier: &(impl BlockClassifier + ?Sized)) {
	if state.result.local_dir.is_some() {
		state.phase = Phase::Xattr;
		state.result.xattr_extents.push(extent);
		return;
	}
	if state.phase == Phase::Xattr {
		state.result.xattr_extents.push(extent);
		return;
	}
	if !state.result.data_extents.is_empty() {
		state.result.data_extents.push(extent);
		return;
	}

	// First uncategorized extent: disambiguate by probing its target block.
	if !state.any_data_extent_probed {
		state.any_data_extent_probed = true;
		let probe = classifier.classify(extent.physical_start);
		if probe.is_directory_block {
			state.result.is_directory = true;
			state.result.data_extents.push(extent);
		} else if probe.is_xattr_local_head {
			state.phase = Phase::Xattr;
			state.result.xattr_extents.push(extent);
		} else {
			state.result.data_extents.push(extent);
		}
	} else {
		state.result.data_extents.push(extent);
	}
}
