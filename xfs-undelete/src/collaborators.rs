//! Narrow collaborator traits (spec §6) that let the core consult the host
//! OS without owning the details itself — concrete implementations live in
//! the `utils` crate, mirroring the teacher's split between `utils` (host
//! facilities) and the tool-specific crates that consume it.

use std::io;
use std::path::Path;

pub struct MountInfo {
	pub mount_point: std::path::PathBuf,
	pub writable: bool,
}

/// Marker for an active read-only remount; restores the prior mount mode
/// when dropped. Boxed so `MountInspector` can return one without naming
/// `utils::mount::RemountGuard` in this crate's public surface.
pub trait RemountGuard {}
impl RemountGuard for utils::mount::RemountGuard {}

/// Mount-table inspection and read-only remounting.
pub trait MountInspector {
	fn mount_status(&self, device: &Path) -> io::Result<Option<MountInfo>>;
	fn remount_readonly(
		&self,
		mount_point: &Path,
		was_writable: bool,
	) -> io::Result<Box<dyn RemountGuard>>;
}

/// Rotational vs solid-state media detection (spec §4.8 scheduling policy).
pub trait MediaProbe {
	fn is_rotational(&self, device: &Path) -> io::Result<bool>;
}

/// Output directory creation.
pub trait PathCreator {
	fn create_all(&self, path: &Path) -> io::Result<()>;
}

/// The default collaborator set, backed by `utils`.
pub struct HostCollaborators;

impl MountInspector for HostCollaborators {
	fn mount_status(&self, device: &Path) -> io::Result<Option<MountInfo>> {
		Ok(utils::mount::mount_status(device)?.map(|m| MountInfo {
			mount_point: m.mount_point,
			writable: m.writable,
		}))
	}

	fn remount_readonly(
		&self,
		mount_point: &Path,
		was_writable: bool,
	) -> io::Result<Box<dyn RemountGuard>> {
		let guard = utils::mount::RemountGuard::remount_readonly(mount_point, was_writable)?;
		Ok(Box::new(guard))
	}
}

impl MediaProbe for HostCollaborators {
	fn is_rotational(&self, device: &Path) -> io::Result<bool> {
		utils::media::is_rotational(device)
	}
}

impl PathCreator for HostCollaborators {
	fn create_all(&self, path: &Path) -> io::Result<()> {
		utils::pathutil::create_all(path)
	}
}
