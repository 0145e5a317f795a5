//! Bounded free list of reusable scratch buffers.
//!
//! The pool preallocates nothing. [`BufferPool::acquire`] pops an idle buffer or builds a fresh
//! one, and [`BufferPool::release`] resets the buffer and keeps it only while fewer than
//! `capacity` buffers are idle. `capacity` is therefore a retention bound, not a limit on
//! concurrent borrowers. Prefer [`BufferPool::lease`], whose guard returns the buffer on every
//! exit path.

// std
use std::{
	ops::{Deref, DerefMut},
	sync::atomic::{AtomicU64, Ordering},
};
// self
use crate::{_prelude::*, obs};

/// Idle buffers retained by default; tune to the expected request concurrency.
pub const DEFAULT_POOL_CAPACITY: usize = 16;

/// Initial capacity of buffers built by [`BufferPool::with_capacity`].
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024;

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Values that can be cleared for reuse without giving up their allocation.
pub trait Reusable {
	/// Resets the value to its empty state.
	fn reset(&mut self);
}
impl Reusable for Vec<u8> {
	fn reset(&mut self) {
		self.clear();
	}
}
impl Reusable for String {
	fn reset(&mut self) {
		self.clear();
	}
}

/// Thread-safe free list of [`Reusable`] buffers.
pub struct BufferPool<T = Vec<u8>>
where
	T: Reusable,
{
	idle: Mutex<Vec<T>>,
	factory: Factory<T>,
	capacity: usize,
	metrics: PoolMetrics,
}
impl<T> BufferPool<T>
where
	T: Reusable,
{
	/// Creates an empty pool that builds buffers with `factory` and retains up to `capacity`
	/// idle ones.
	pub fn new(factory: impl 'static + Send + Sync + Fn() -> T, capacity: usize) -> Self {
		Self {
			idle: Mutex::new(Vec::with_capacity(capacity)),
			factory: Box::new(factory),
			capacity,
			metrics: PoolMetrics::default(),
		}
	}

	/// Takes an idle buffer, or builds a new one when none is idle.
	pub fn acquire(&self) -> T {
		let reused = self.idle.lock().pop();

		match reused {
			Some(buffer) => {
				self.metrics.reused.fetch_add(1, Ordering::Relaxed);

				buffer
			},
			None => {
				self.metrics.created.fetch_add(1, Ordering::Relaxed);

				(self.factory)()
			},
		}
	}

	/// Resets `buffer` and returns it to the idle set, dropping it when the set is full.
	pub fn release(&self, mut buffer: T) {
		buffer.reset();

		let overflow = {
			let mut idle = self.idle.lock();

			if idle.len() < self.capacity {
				idle.push(buffer);

				None
			} else {
				Some(buffer)
			}
		};

		if overflow.is_some() {
			self.metrics.discarded.fetch_add(1, Ordering::Relaxed);
			obs::pool_overflow(self.capacity);
		}
	}

	/// Borrows a buffer for the lifetime of the returned guard.
	pub fn lease(&self) -> PooledBuffer<'_, T> {
		PooledBuffer { pool: self, buffer: Some(self.acquire()) }
	}

	/// Number of idle buffers currently retained.
	pub fn idle_len(&self) -> usize {
		self.idle.lock().len()
	}

	/// Maximum number of idle buffers retained.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Allocation counters for this pool.
	pub fn metrics(&self) -> &PoolMetrics {
		&self.metrics
	}
}
impl BufferPool<Vec<u8>> {
	/// Byte-buffer pool whose fresh buffers start with [`DEFAULT_BUFFER_SIZE`] bytes reserved.
	pub fn with_capacity(capacity: usize) -> Self {
		Self::new(|| Vec::with_capacity(DEFAULT_BUFFER_SIZE), capacity)
	}
}
impl Default for BufferPool<Vec<u8>> {
	fn default() -> Self {
		Self::with_capacity(DEFAULT_POOL_CAPACITY)
	}
}
impl<T> Debug for BufferPool<T>
where
	T: Reusable,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BufferPool")
			.field("capacity", &self.capacity)
			.field("idle", &self.idle_len())
			.field("metrics", &self.metrics)
			.finish()
	}
}

/// Scoped borrow of a pooled buffer; dropping the guard releases the buffer.
pub struct PooledBuffer<'a, T>
where
	T: Reusable,
{
	pool: &'a BufferPool<T>,
	buffer: Option<T>,
}
impl<T> PooledBuffer<'_, T>
where
	T: Reusable,
{
	/// Detaches the buffer from the pool; it will not be returned on drop.
	pub fn detach(mut self) -> T {
		// `buffer` is only `None` after `detach` or `drop`, both of which consume the guard.
		self.buffer.take().unwrap_or_else(|| (self.pool.factory)())
	}
}
impl<T> Deref for PooledBuffer<'_, T>
where
	T: Reusable,
{
	type Target = T;

	fn deref(&self) -> &Self::Target {
		match &self.buffer {
			Some(buffer) => buffer,
			None => unreachable!("Pooled buffer accessed after release."),
		}
	}
}
impl<T> DerefMut for PooledBuffer<'_, T>
where
	T: Reusable,
{
	fn deref_mut(&mut self) -> &mut Self::Target {
		match &mut self.buffer {
			Some(buffer) => buffer,
			None => unreachable!("Pooled buffer accessed after release."),
		}
	}
}
impl<T> Drop for PooledBuffer<'_, T>
where
	T: Reusable,
{
	fn drop(&mut self) {
		if let Some(buffer) = self.buffer.take() {
			self.pool.release(buffer);
		}
	}
}
impl<T> Debug for PooledBuffer<'_, T>
where
	T: Reusable + Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PooledBuffer").field(&self.buffer).finish()
	}
}

/// Thread-safe allocation counters for a [`BufferPool`].
#[derive(Debug, Default)]
pub struct PoolMetrics {
	created: AtomicU64,
	reused: AtomicU64,
	discarded: AtomicU64,
}
impl PoolMetrics {
	/// Buffers built by the factory because no idle buffer was available.
	pub fn created(&self) -> u64 {
		self.created.load(Ordering::Relaxed)
	}

	/// Acquisitions served from the idle set.
	pub fn reused(&self) -> u64 {
		self.reused.load(Ordering::Relaxed)
	}

	/// Releases dropped because the idle set was full.
	pub fn discarded(&self) -> u64 {
		self.discarded.load(Ordering::Relaxed)
	}
}
