//! Offline recovery of deleted inodes on an XFS volume.
//!
//! `xfs-undelete [-s START_BLOCK] <device> <output-dir>` scans `device` for
//! deleted file and directory inodes and writes whatever can be recovered
//! into `output-dir`. The device is never written to; if it is currently
//! mounted read-write it is remounted read-only for the run and restored
//! afterward.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use xfs_undelete::collaborators::HostCollaborators;

#[derive(Parser)]
#[command(name = "xfs-undelete", version, about)]
struct Args {
	/// Block device or image to scan.
	device: PathBuf,

	/// Directory recovered files and manifests are written into.
	output_dir: PathBuf,

	/// Resume a prior run starting at this block, skipping every allocation
	/// group entirely before it.
	#[arg(short = 's', long = "start-block", default_value_t = 0)]
	start_block: u64,
}

fn main() -> ExitCode {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	log::info!(" -> Scanning device  : {}", args.device.display());
	log::info!(" -> into directory   : {}", args.output_dir.display());
	log::info!(" -> starting at block: {}", args.start_block);

	let collaborators = HostCollaborators;
	match xfs_undelete::run(&collaborators, &args.device, &args.output_dir, args.start_block) {
		Ok(summary) => {
			let scanned = utils::util::ByteSize::from_sectors_count(summary.sectors_scanned);
			log::info!(
				"done: {scanned} scanned, {} directory inodes, {} file inodes, {} files written",
				summary.dirs_found,
				summary.files_found,
				summary.files_written,
			);
			ExitCode::SUCCESS
		}
		Err(e) => {
			log::error!("{e}");
			ExitCode::FAILURE
		}
	}
}
