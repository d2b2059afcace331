//! Per-worker progress counters (spec §4.8, §4.12), summed by the monitor
//! twice a second. One instance lives in each worker's thread data, mirroring
//! `original_source/src/scanner.h`/`analyzer.h`'s `_Atomic(uint64_t)` fields.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ScannerCounters {
	pub sectors_scanned: AtomicU64,
	pub dirs_found: AtomicU64,
	pub files_found: AtomicU64,
}

#[derive(Default)]
pub struct AnalyzerCounters {
	pub analyzed: AtomicU64,
	pub dirents_found: AtomicU64,
	pub files_forwarded: AtomicU64,
}

#[derive(Default)]
pub struct WriterCounters {
	pub undeleted: AtomicU64,
}

fn load(c: &AtomicU64) -> u64 {
	c.load(Ordering::Relaxed)
}

/// Sums a slice of per-worker counter sets into the final run summary (spec
/// §7: "a final summary — sectors scanned, directory inodes found, file
/// inodes found, files written").
#[derive(Debug, Default, Clone, Copy)]
pub struct Summary {
	pub sectors_scanned: u64,
	pub dirs_found: u64,
	pub files_found: u64,
	pub analyzed: u64,
	pub dirents_found: u64,
	pub files_written: u64,
}

pub fn summarize(
	scanners: &[ScannerCounters],
	analyzers: &[AnalyzerCounters],
	writers: &[WriterCounters],
) -> Summary {
	let mut s = Summary::default();
	for c in scanners {
		s.sectors_scanned += load(&c.sectors_scanned);
		s.dirs_found += load(&c.dirs_found);
		s.files_found += load(&c.files_found);
	}
	for c in analyzers {
		s.analyzed += load(&c.analyzed);
		s.dirents_found += load(&c.dirents_found);
	}
	for c in writers {
		s.files_written += load(&c.undeleted);
	}
	s
}
