//! Thread-safe dual FIFO inode queue (spec §4.7), one instance for directory
//! inodes and one for file inodes. Producers are scanners, consumers are
//! analyzers; `pop` never blocks, matching
//! `original_source/src/inode_queue.c`'s lock-protected linked list, ported
//! to `VecDeque<T>` behind a single `Mutex` per queue.

use std::collections::VecDeque;
use std::sync::Mutex;

pub struct InodeQueue<T> {
	items: Mutex<VecDeque<T>>,
}

impl<T> Default for InodeQueue<T> {
	fn default() -> Self {
		Self {
			items: Mutex::new(VecDeque::new()),
		}
	}
}

impl<T> InodeQueue<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pushes an inode onto the tail of the queue (FIFO producer side).
	pub fn push(&self, item: T) {
		self.items.lock().unwrap().push_back(item);
	}

	/// Pops the head of the queue, or `None` if empty. Never blocks; callers
	/// wait on external progress signals instead (spec §4.7).
	pub fn pop(&self) -> Option<T> {
		self.items.lock().unwrap().pop_front()
	}

	pub fn is_empty(&self) -> bool {
		self.items.lock().unwrap().is_empty()
	}

	pub fn len(&self) -> usize {
		self.items.lock().unwrap().len()
	}

	/// Drains all residual inodes during teardown.
	pub fn clear(&self) {
		self.items.lock().unwrap().clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fifo_order() {
		let q: InodeQueue<u64> = InodeQueue::new();
		q.push(1);
		q.push(2);
		q.push(3);
		assert_eq!(q.pop(), Some(1));
		assert_eq!(q.pop(), Some(2));
		assert_eq!(q.pop(), Some(3));
		assert_eq!(q.pop(), None);
	}

	#[test]
	fn pop_empty_is_absent_not_blocking() {
		let q: InodeQueue<u64> = InodeQueue::new();
		assert_eq!(q.pop(), None);
	}

	#[test]
	fn clear_drains_residual_items() {
		let q: InodeQueue<u64> = InodeQueue::new();
		q.push(1);
		q.push(2);
		q.clear();
		assert!(q.is_empty());
		assert_eq!(q.pop(), None);
	}

	#[test]
	fn concurrent_push_pop_preserves_total_count() {
		use std::sync::Arc;
		use std::thread;

		let q: Arc<InodeQueue<u64>> = Arc::new(InodeQueue::new());
		let producers: Vec<_> = (0..4)
			.map(|t| {
				let q = Arc::clone(&q);
				thread::spawn(move || {
					for i in 0..100 {
						q.push(t * 100 + i);
					}
				})
			})
			.collect();
		for p in producers {
			p.join().unwrap();
		}
		assert_eq!(q.len(), 400);
		let mut popped = 0;
		while q.pop().is_some() {
			popped += 1;
		}
		assert_eq!(popped, 400);
	}
}
