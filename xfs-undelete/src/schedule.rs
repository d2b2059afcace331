//! The pipeline scheduler (spec §4.8): wires scanner, analyzer, and writer
//! workers together and picks a scheduling shape based on whether the
//! source/target media are rotational. Thread lifecycle (start-on-hold,
//! wake, cooperative stop, join) is grounded on
//! `original_source/src/thrd_ctrl.c`'s `_Atomic(bool) do_start/do_stop` pair
//! guarded by a `mtx_t sleep_lock`/`cnd_t wakeup_call`, generalized here into
//! one shared [`WakeGate`] plus a shared stop flag rather than per-thread
//! copies, since every worker in this port waits on the same two signals.

use crate::analyze::{self, AnalyzedItem};
use crate::context::Context;
use crate::inode::InodeRecord;
use crate::queue::InodeQueue;
use crate::readat::ReadAt;
use crate::reconstruct::BlockClassifier;
use crate::scan;
use crate::telemetry::{summarize, AnalyzerCounters, ScannerCounters, Summary, WriterCounters};
use crate::write;
use log::info;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

/// How often the idle loops in analyzer/writer workers poll an empty queue,
/// and how often the monitor thread emits a progress line (spec §4.8: "write
/// progress twice per second").
const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MONITOR_INTERVAL: Duration = Duration::from_millis(500);

/// Shared start/stop signal every worker thread waits on before it does any
/// work, and checks cooperatively while it runs.
pub struct WakeGate {
	started: Mutex<bool>,
	cv: Condvar,
	stop: AtomicBool,
}

impl Default for WakeGate {
	fn default() -> Self {
		Self {
			started: Mutex::new(false),
			cv: Condvar::new(),
			stop: AtomicBool::new(false),
		}
	}
}

impl WakeGate {
	pub fn new() -> Self {
		Self::default()
	}

	/// Releases every thread waiting in [`Self::wait_for_start`].
	pub fn wake(&self) {
		*self.started.lock().unwrap() = true;
		self.cv.notify_all();
	}

	pub fn wait_for_start(&self) {
		let mut started = self.started.lock().unwrap();
		while !*started {
			started = self.cv.wait(started).unwrap();
		}
	}

	/// Requests every worker end as soon as it next checks (spec §4.8's
	/// `end_threads`: "wake all threads up, stop and then join them").
	pub fn request_stop(&self) {
		self.stop.store(true, Ordering::Relaxed);
		self.wake();
	}

	pub fn should_stop(&self) -> bool {
		self.stop.load(Ordering::Relaxed)
	}
}

/// Scheduling shape: how many scanner/analyzer/writer threads to run (spec
/// §4.8). Solid-state source media runs one scanner and one analyzer per AG
/// concurrently; a rotational source runs a single scanner that processes
/// every AG in order, to preserve head-seek locality, with a single
/// corresponding analyzer. The writer side follows the target's media class
/// independently of the source's: one writer per AG on solid-state target
/// storage, a single writer draining every queue otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineShape {
	pub scanner_threads: usize,
	pub analyzer_threads: usize,
	pub writer_threads: usize,
}

pub fn plan(ag_count: u32, source_solid_state: bool, target_solid_state: bool) -> PipelineShape {
	let ag_count = (ag_count as usize).max(1);
	let (scanner_threads, analyzer_threads) = if source_solid_state {
		(ag_count, ag_count)
	} else {
		(1, 1)
	};
	let writer_threads = if target_solid_state { ag_count } else { 1 };
	PipelineShape {
		scanner_threads,
		analyzer_threads,
		writer_threads,
	}
}

/// Runs the full scan/analyze/write pipeline to completion and returns the
/// aggregated counters (spec §7: "a final summary").
#[allow(clippy::too_many_arguments)]
pub fn run(
	dev: Arc<dyn ReadAt + Send + Sync>,
	ctx: &Context,
	target: &Path,
	classifier: Arc<dyn BlockClassifier + Send + Sync>,
	shape: PipelineShape,
) -> Summary {
	let dir_queue: InodeQueue<(u64, InodeRecord)> = InodeQueue::new();
	let file_queue: InodeQueue<(u64, InodeRecord)> = InodeQueue::new();
	let out_queue: InodeQueue<AnalyzedItem> = InodeQueue::new();

	let scanner_counters: Vec<ScannerCounters> =
		(0..shape.scanner_threads).map(|_| ScannerCounters::default()).collect();
	let analyzer_counters: Vec<AnalyzerCounters> =
		(0..shape.analyzer_threads).map(|_| AnalyzerCounters::default()).collect();
	let writer_counters: Vec<WriterCounters> =
		(0..shape.writer_threads).map(|_| WriterCounters::default()).collect();

	let gate = WakeGate::new();
	let scanners_remaining = AtomicUsize::new(shape.scanner_threads);
	let scan_done = AtomicBool::new(false);
	let analyzers_remaining = AtomicUsize::new(shape.analyzer_threads);
	let analysis_done = AtomicBool::new(false);

	thread::scope(|scope| {
		// Scanners: each thread owns a round-robin slice of allocation groups.
		for (worker_idx, counters) in scanner_counters.iter().enumerate() {
			let dev = Arc::clone(&dev);
			let classifier = Arc::clone(&classifier);
			let queues = scan::ScanQueues {
				dirs: &dir_queue,
				files: &file_queue,
			};
			let gate = &gate;
			let scanners_remaining = &scanners_remaining;
			let scan_done = &scan_done;
			scope.spawn(move || {
				gate.wait_for_start();
				let mut ag = worker_idx as u32;
				while ag < ctx.ag_count() {
					if gate.should_stop() {
						break;
					}
					if let Err(e) = scan::scan_ag(
						dev.as_ref(),
						ctx,
						ag,
						&queues,
						classifier.as_ref(),
						counters,
						&gate.stop,
					) {
						log::warn!("scanner {worker_idx}: {e}");
					}
					ag += shape.scanner_threads as u32;
				}
				if scanners_remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
					scan_done.store(true, Ordering::Release);
				}
			});
		}

		// Analyzers: directories first and continuously, files once every
		// scanner has finished (the "unshackling" gate).
		for counters in &analyzer_counters {
			let dir_queue = &dir_queue;
			let file_queue = &file_queue;
			let out_queue = &out_queue;
			let gate = &gate;
			let scan_done = &scan_done;
			let analyzers_remaining = &analyzers_remaining;
			let analysis_done = &analysis_done;
			let block_size = ctx.block_size;
			scope.spawn(move || {
				gate.wait_for_start();
				loop {
					analyze::drain_directories(dir_queue, out_queue, block_size, counters);
					analyze::drain_files(
						file_queue,
						out_queue,
						block_size,
						counters,
						scan_done,
						&gate.stop,
					);
					if gate.should_stop() {
						break;
					}
					let fully_drained =
						scan_done.load(Ordering::Acquire) && dir_queue.is_empty() && file_queue.is_empty();
					if fully_drained {
						break;
					}
					thread::sleep(POLL_INTERVAL);
				}
				if analyzers_remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
					analysis_done.store(true, Ordering::Release);
				}
			});
		}

		// Writers: drain the output queue until every analyzer has finished
		// and it is empty.
		for counters in &writer_counters {
			let dev = Arc::clone(&dev);
			let out_queue = &out_queue;
			let gate = &gate;
			let analysis_done = &analysis_done;
			let block_size = ctx.block_size;
			scope.spawn(move || {
				gate.wait_for_start();
				loop {
					match out_queue.pop() {
						Some(item) => {
							if let Err(e) = write::write_item(dev.as_ref(), target, &item, block_size, counters) {
								log::warn!("writer: {e}");
							}
						}
						None => {
							if gate.should_stop() || (analysis_done.load(Ordering::Acquire) && out_queue.is_empty()) {
								break;
							}
							thread::sleep(POLL_INTERVAL);
						}
					}
				}
			});
		}

		// Monitor: emits a progress line twice a second until the writers
		// have drained everything (spec §4.8 `monitor_threads`).
		scope.spawn(|| {
			gate.wait_for_start();
			loop {
				let summary = summarize(&scanner_counters, &analyzer_counters, &writer_counters);
				info!(
					"progress: {} sectors scanned, {} dirs, {} files, {} written",
					summary.sectors_scanned, summary.dirs_found, summary.files_found, summary.files_written
				);
				if gate.should_stop() || (analysis_done.load(Ordering::Acquire) && out_queue.is_empty()) {
					break;
				}
				thread::sleep(MONITOR_INTERVAL);
			}
		});

		gate.wake();
	});

	summarize(&scanner_counters, &analyzer_counters, &writer_counters)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::extent::Extent;
	use crate::reconstruct::BlockProbe;
	use tempfile::tempdir;

	struct NeverDirectory;
	impl BlockClassifier for NeverDirectory {
		fn classify(&self, _physical_block: u64) -> BlockProbe {
			BlockProbe::default()
		}
	}

	#[test]
	fn plan_serializes_scan_on_rotational_source() {
		let shape = plan(4, false, true);
		assert_eq!(
			shape,
			PipelineShape {
				scanner_threads: 1,
				analyzer_threads: 1,
				writer_threads: 4
			}
		);
	}

	#[test]
	fn plan_parallelizes_scan_on_solid_state_source() {
		let shape = plan(8, true, false);
		assert_eq!(shape.scanner_threads, 8);
		assert_eq!(shape.analyzer_threads, 8);
		assert_eq!(shape.writer_threads, 1);
	}

	fn synthetic_device(block_size: u32, ag_blocks: u32, inode_size: u16) -> Vec<u8> {
		let mut buf = vec![0u8; crate::superblock::SUPERBLOCK_SIZE];
		buf[0..4].copy_from_slice(crate::superblock::MAGIC);
		buf[4..8].copy_from_slice(&block_size.to_be_bytes());
		buf[84..88].copy_from_slice(&ag_blocks.to_be_bytes());
		buf[88..92].copy_from_slice(&1u32.to_be_bytes());
		buf[102..104].copy_from_slice(&512u16.to_be_bytes());
		buf[104..106].copy_from_slice(&inode_size.to_be_bytes());
		buf.resize(block_size as usize * ag_blocks as usize, 0);
		buf
	}

	#[test]
	fn end_to_end_recovers_one_deleted_file() {
		let block_size = 512u32;
		let inode_size = 256u16;
		let mut dev = synthetic_device(block_size, 8, inode_size);

		let ino_off = block_size as usize; // block 1
		dev[ino_off..ino_off + 2].copy_from_slice(crate::inode::MAGIC);
		let extent = Extent {
			unwritten: false,
			logical_offset: 0,
			physical_start: 4,
			length: 1,
		};
		let tail_off = ino_off + crate::inode::CORE_SIZE_V1V2;
		dev[tail_off..tail_off + 16].copy_from_slice(&extent.encode());

		let data_block_off = 4 * block_size as usize;
		dev[data_block_off] = 0xAB;

		let ctx = Context::load(&dev, Path::new("/dev/null"), Path::new("/tmp"), 0).unwrap();
		let target = tempdir().unwrap();
		let shape = PipelineShape {
			scanner_threads: 1,
			analyzer_threads: 1,
			writer_threads: 1,
		};

		let summary = run(
			Arc::new(dev),
			&ctx,
			target.path(),
			Arc::new(NeverDirectory),
			shape,
		);

		assert_eq!(summary.files_written, 1);
		let entries: Vec<_> = std::fs::read_dir(target.path()).unwrap().collect();
		assert_eq!(entries.len(), 1);
	}
}
