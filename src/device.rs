//! Device context, capabilities and RAII memory handles
//!
//! The context replaces the global device accessor found in older
//! harnesses: it is constructed once per run and passed by reference
//! into the gate and the orchestrator. The crate does not bootstrap a
//! real platform; [`DeviceContext`] models an accelerator with a
//! bookkeeping allocator, which is exactly what the orchestration,
//! gating and release-on-every-path logic need to be verified against.
//! A production backend implements the same surface over real handles.

use crate::element::Element;
use crate::error::{Result, VerificarError};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Queried device capability flags and memory limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCaps {
    /// Device name for messages
    pub name: String,
    /// Native double-precision arithmetic support
    pub supports_f64: bool,
    /// Largest single allocation the device accepts, in bytes
    pub max_alloc_bytes: usize,
    /// Total device memory available to this run, in bytes
    pub total_mem_bytes: usize,
    /// Number of command queues the device exposes
    pub num_queues: usize,
}

impl Default for DeviceCaps {
    fn default() -> Self {
        Self {
            name: "verificar-mock".to_string(),
            supports_f64: true,
            max_alloc_bytes: 256 * 1024 * 1024,
            total_mem_bytes: 1024 * 1024 * 1024,
            num_queues: 1,
        }
    }
}

/// Access intent declared when mirroring a host buffer on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemIntent {
    /// Device reads only
    ReadOnly,
    /// Device reads and writes
    ReadWrite,
    /// Device writes only
    WriteOnly,
}

/// Opaque command queue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueId(pub usize);

/// Shared allocator bookkeeping behind the context
#[derive(Debug, Default)]
struct AllocTracker {
    live_count: AtomicUsize,
    live_bytes: AtomicUsize,
    /// Remaining successful allocations before injected failure
    /// (negative means no injection)
    allocs_until_failure: AtomicIsize,
    fail_sync: AtomicBool,
}

/// Per-run device context
///
/// Owns the capability record and the allocation tracker. Cloneable so
/// the gate, orchestrator and engines can share it; the tracker is
/// reference-counted.
#[derive(Debug, Clone)]
pub struct DeviceContext {
    caps: DeviceCaps,
    tracker: Arc<AllocTracker>,
}

impl DeviceContext {
    /// Create a context for a device with the given capabilities
    #[must_use]
    pub fn new(caps: DeviceCaps) -> Self {
        let tracker = AllocTracker {
            allocs_until_failure: AtomicIsize::new(-1),
            ..AllocTracker::default()
        };
        Self {
            caps,
            tracker: Arc::new(tracker),
        }
    }

    /// Capability flags and memory limits
    #[must_use]
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// All queue handles the device exposes
    #[must_use]
    pub fn queues(&self) -> Vec<QueueId> {
        (0..self.caps.num_queues).map(QueueId).collect()
    }

    /// Number of live device allocations (leak detection in tests)
    #[must_use]
    pub fn live_allocations(&self) -> usize {
        self.tracker.live_count.load(Ordering::SeqCst)
    }

    /// Bytes currently allocated on the device
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.tracker.live_bytes.load(Ordering::SeqCst)
    }

    /// Make the next `n`-th allocation request return no handle
    ///
    /// Models a platform whose reported limits were optimistic: the
    /// pre-check passes but buffer creation still fails.
    pub fn fail_allocations_after(&self, n: usize) {
        self.tracker
            .allocs_until_failure
            .store(n as isize, Ordering::SeqCst);
    }

    /// Make queue synchronization report an error status
    pub fn inject_sync_failure(&self) {
        self.tracker.fail_sync.store(true, Ordering::SeqCst);
    }

    /// Mirror a host buffer on the device
    ///
    /// Returns `None` instead of erroring when the device cannot
    /// satisfy the request; callers translate that into a skip, never
    /// a failure.
    #[must_use]
    pub fn create_buffer<T: Element>(
        &self,
        host: &[T],
        intent: MemIntent,
    ) -> Option<DeviceBuffer<T>> {
        let bytes = host.len() * T::size_of();
        if bytes > self.caps.max_alloc_bytes {
            return None;
        }
        let budget = self.tracker.allocs_until_failure.load(Ordering::SeqCst);
        if budget >= 0 {
            self.tracker
                .allocs_until_failure
                .store(budget - 1, Ordering::SeqCst);
            if budget == 0 {
                return None;
            }
        }
        if self.tracker.live_bytes.load(Ordering::SeqCst) + bytes > self.caps.total_mem_bytes {
            return None;
        }
        self.tracker.live_count.fetch_add(1, Ordering::SeqCst);
        self.tracker.live_bytes.fetch_add(bytes, Ordering::SeqCst);
        Some(DeviceBuffer {
            data: Mutex::new(host.to_vec()),
            intent,
            bytes,
            tracker: Arc::clone(&self.tracker),
        })
    }

    /// Synchronous transfer of host data into an existing buffer
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::GpuError`] on a size mismatch.
    pub fn write_buffer<T: Element>(&self, buf: &DeviceBuffer<T>, host: &[T]) -> Result<()> {
        let mut data = buf.lock();
        if data.len() != host.len() {
            return Err(VerificarError::GpuError {
                reason: format!(
                    "write_buffer size mismatch: device {} vs host {}",
                    data.len(),
                    host.len()
                ),
            });
        }
        data.copy_from_slice(host);
        Ok(())
    }

    /// Synchronous read-back of device data into a host buffer
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::GpuError`] on a size mismatch.
    pub fn read_back<T: Element>(&self, buf: &DeviceBuffer<T>, host: &mut [T]) -> Result<()> {
        let data = buf.lock();
        if data.len() != host.len() {
            return Err(VerificarError::GpuError {
                reason: format!(
                    "read_back size mismatch: device {} vs host {}",
                    data.len(),
                    host.len()
                ),
            });
        }
        host.copy_from_slice(&data);
        Ok(())
    }

    /// Block until every listed queue has drained
    ///
    /// # Errors
    ///
    /// Returns [`VerificarError::GpuError`] naming the call when the
    /// wait reports an error status.
    pub fn sync_all_queues(&self, queues: &[QueueId]) -> Result<()> {
        if self.tracker.fail_sync.load(Ordering::SeqCst) {
            return Err(VerificarError::GpuError {
                reason: format!("sync_all_queues failed across {} queue(s)", queues.len()),
            });
        }
        Ok(())
    }
}

/// RAII handle for device memory mirroring one host buffer
///
/// Dropping the handle returns the allocation to the tracker on every
/// exit path, normal or not.
#[derive(Debug)]
pub struct DeviceBuffer<T: Element> {
    data: Mutex<Vec<T>>,
    intent: MemIntent,
    bytes: usize,
    tracker: Arc<AllocTracker>,
}

impl<T: Element> DeviceBuffer<T> {
    /// Declared access intent
    #[must_use]
    pub fn intent(&self) -> MemIntent {
        self.intent
    }

    /// Allocation size in bytes
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// Element count
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the buffer holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the backing storage, recovering from poison
    ///
    /// Engines use this to read operands and write results; host code
    /// goes through [`DeviceContext::write_buffer`] / `read_back`.
    pub fn lock(&self) -> MutexGuard<'_, Vec<T>> {
        self.data
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<T: Element> Drop for DeviceBuffer<T> {
    fn drop(&mut self) {
        self.tracker.live_count.fetch_sub(1, Ordering::SeqCst);
        self.tracker.live_bytes.fetch_sub(self.bytes, Ordering::SeqCst);
    }
}
