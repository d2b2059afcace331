//! Probes whether a block device is backed by rotational or solid-state media.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns `true` if the device at `path` sits on rotational media, `false` for
/// solid-state. Defaults to `true` (the conservative, sequential-friendly choice)
/// when the `/sys` rotational attribute cannot be read, e.g. for a loopback file
/// used in tests.
pub fn is_rotational(path: &Path) -> io::Result<bool> {
	let Some(queue_dir) = sys_block_queue_dir(path) else {
		return Ok(true);
	};
	match fs::read_to_string(queue_dir.join("rotational")) {
		Ok(s) => Ok(s.trim() != "0"),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
		Err(e) => Err(e),
	}
}

/// Resolves `/sys/block/<disk>/queue` for a device node such as `/dev/sda3` or
/// `/dev/nvme0n1p2`, stripping the partition suffix to reach the parent disk.
fn sys_block_queue_dir(path: &Path) -> Option<PathBuf> {
	let name = path.file_name()?.to_str()?;
	let disk = strip_partition_suffix(name);
	let dir = PathBuf::from("/sys/block").join(disk).join("queue");
	dir.is_dir().then_some(dir)
}

fn strip_partition_suffix(name: &str) -> String {
	if let Some(base) = name.strip_prefix("nvme") {
		// nvme0n1p3 -> nvme0n1
		if let Some(p_idx) = base.rfind('p') {
			if base[p_idx + 1..].bytes().all(|b| b.is_ascii_digit()) && !base[p_idx + 1..].is_empty()
			{
				return format!("nvme{}", &base[..p_idx]);
			}
		}
		return format!("nvme{base}");
	}
	// sda3 -> sda, vdb12 -> vdb
	let trim = name.trim_end_matches(|c: char| c.is_ascii_digit());
	trim.to_string()
}
