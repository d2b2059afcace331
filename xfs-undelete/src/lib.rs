//! Offline recovery tool for deleted inodes on an XFS volume.
//!
//! The core is a three-stage pipeline — scan, analyze, write — built on
//! decoders for the on-disk structures (superblock, inode core, packed
//! extents, short-form directories, local xattrs) and a forensic
//! reconstructor that recovers fork evidence from a deleted inode's tail.

pub mod analyze;
pub mod byteorder;
pub mod collaborators;
pub mod context;
pub mod dirent;
pub mod error;
pub mod extent;
pub mod inode;
pub mod job;
pub mod queue;
pub mod readat;
pub mod reconstruct;
pub mod scan;
pub mod schedule;
pub mod superblock;
pub mod telemetry;
pub mod write;
pub mod xattr;

use collaborators::{MediaProbe, MountInspector, PathCreator};
use error::{DeviceError, RecoveryError};
use reconstruct::DeviceClassifier;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::sync::Arc;
use telemetry::Summary;

/// Opens `path` read-only, refusing to follow a trailing symlink (the
/// original's `set_device()` opens the raw device node the same way).
fn open_source(path: &Path) -> Result<File, DeviceError> {
	OpenOptions::new()
		.read(true)
		.custom_flags(libc::O_NOFOLLOW)
		.open(path)
		.map_err(|source| DeviceError::Open {
			path: path.to_path_buf(),
			source,
		})
}

/// Runs the full recovery pipeline against `source`, writing recovered
/// files and manifests under `target` (spec §1, §6). If `source` is
/// currently mounted read-write, it is remounted read-only for the
/// duration of the run and restored afterward.
pub fn run(
	collaborators: &(impl MountInspector + MediaProbe + PathCreator),
	source: &Path,
	target: &Path,
	start_block: u64,
) -> Result<Summary, RecoveryError> {
	collaborators
		.create_all(target)
		.map_err(|source_err| RecoveryError::TargetCreate {
			path: target.to_path_buf(),
			source: source_err,
		})?;

	let _remount_guard = if let Some(mount) = collaborators
		.mount_status(source)
		.map_err(|e| RecoveryError::Device(DeviceError::Open {
			path: source.to_path_buf(),
			source: e,
		}))?
	{
		if mount.writable {
			Some(
				collaborators
					.remount_readonly(&mount.mount_point, mount.writable)
					.map_err(|e| RecoveryError::Device(DeviceError::Remount {
						path: mount.mount_point.clone(),
						source: e,
					}))?,
			)
		} else {
			None
		}
	} else {
		None
	};

	let dev = Arc::new(open_source(source)?);
	let ctx = context::Context::load(dev.as_ref(), source, target, start_block)?;

	let source_solid_state = !collaborators.is_rotational(source).unwrap_or(true);
	let target_solid_state = !collaborators.is_rotational(target).unwrap_or(true);
	let shape = schedule::plan(ctx.ag_count(), source_solid_state, target_solid_state);

	let classifier: Arc<dyn reconstruct::BlockClassifier + Send + Sync> = Arc::new(DeviceClassifier {
		dev: Arc::clone(&dev),
		block_size: ctx.block_size,
		device_bound: ctx.total_blocks * ctx.block_size,
	});
	let dev: Arc<dyn readat::ReadAt + Send + Sync> = dev;

	Ok(schedule::run(dev, &ctx, target, classifier, shape))
}
