//! Output path creation.

use std::io;
use std::path::Path;

/// Creates `path` and all missing parent components, matching `mkdir -p`.
pub fn create_all(path: &Path) -> io::Result<()> {
	std::fs::create_dir_all(path)
}
