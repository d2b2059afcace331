//! Mount-table inspection and read-only remounting.
//!
//! Adapted from the raw `libc::mount`/`libc::umount` calls the teacher's
//! `mount`/`umount` commands made directly; here the syscall itself is done
//! through `nix::mount`, and `/proc/mounts` is parsed instead of `/etc/mtab`
//! since the latter is not guaranteed to exist on a running system.

use nix::mount::{mount, MsFlags};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Where and how a device is currently mounted.
#[derive(Debug, Clone)]
pub struct MountInfo {
	pub mount_point: PathBuf,
	pub options: String,
	pub writable: bool,
}

/// Returns the mount entry for `device`, or `None` if it isn't mounted.
pub fn mount_status(device: &Path) -> io::Result<Option<MountInfo>> {
	let table = fs::read_to_string("/proc/mounts")?;
	let device_str = device.to_string_lossy();

	for line in table.lines() {
		let mut fields = line.split_whitespace();
		let (Some(src), Some(target), Some(_fstype), Some(options)) =
			(fields.next(), fields.next(), fields.next(), fields.next())
		else {
			continue;
		};
		if src != device_str {
			continue;
		}
		let writable = options.split(',').next() == Some("rw");
		return Ok(Some(MountInfo {
			mount_point: PathBuf::from(target),
			options: options.to_owned(),
			writable,
		}));
	}
	Ok(None)
}

/// A read-only remount that restores the previous mount options on drop.
pub struct RemountGuard {
	mount_point: PathBuf,
	was_writable: bool,
}

impl RemountGuard {
	/// Remounts `mount_point` read-only, recording whether it was writable so
	/// the original mode can be restored on teardown.
	pub fn remount_readonly(mount_point: &Path, was_writable: bool) -> io::Result<Self> {
		do_remount(mount_point, MsFlags::MS_RDONLY)?;
		Ok(Self {
			mount_point: mount_point.to_owned(),
			was_writable,
		})
	}
}

impl Drop for RemountGuard {
	fn drop(&mut self) {
		if self.was_writable {
			let _ = do_remount(&self.mount_point, MsFlags::empty());
		}
	}
}

fn do_remount(mount_point: &Path, extra: MsFlags) -> io::Result<()> {
	let flags = MsFlags::MS_REMOUNT | extra;
	mount(
		None::<&str>,
		mount_point,
		None::<&str>,
		flags,
		None::<&str>,
	)
	.map_err(|errno| io::Error::from_raw_os_error(errno as i32))
}
