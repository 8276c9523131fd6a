//! Device buffer allocation, transfer, and accounting.
//!
//! Every allocation made through [`GpuContext`] is counted by an
//! [`AllocationTracker`]; a [`DeviceBuffer`] decrements the count when
//! dropped, so release is guaranteed on all exit paths including failures.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use super::context::{DeviceError, GpuContext};

/// Shared counter of live device allocations.
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug, Default)]
struct TrackerInner {
    live: AtomicUsize,
    live_bytes: AtomicU64,
}

impl AllocationTracker {
    fn acquire(&self, bytes: u64) {
        self.inner.live.fetch_add(1, Ordering::Relaxed);
        self.inner.live_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn release(&self, bytes: u64) {
        self.inner.live.fetch_sub(1, Ordering::Relaxed);
        self.inner.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
    }

    /// Number of buffers currently alive.
    pub fn live(&self) -> usize {
        self.inner.live.load(Ordering::Relaxed)
    }

    /// Total bytes currently allocated.
    pub fn live_bytes(&self) -> u64 {
        self.inner.live_bytes.load(Ordering::Relaxed)
    }
}

/// An exclusively owned GPU buffer, destroyed and untracked on drop.
#[derive(Debug)]
pub struct DeviceBuffer {
    raw: wgpu::Buffer,
    size: u64,
    tracker: AllocationTracker,
}

impl DeviceBuffer {
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.tracker.release(self.size);
        self.raw.destroy();
    }
}

impl GpuContext {
    /// Allocates a device buffer. Allocation exhaustion is caught with an
    /// out-of-memory error scope and reported as a non-retryable error.
    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<DeviceBuffer, DeviceError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let raw = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        if pollster::block_on(self.device.pop_error_scope()).is_some() {
            raw.destroy();
            return Err(DeviceError::OutOfMemory { bytes: size });
        }

        let tracker = self.tracker();
        tracker.acquire(size);
        Ok(DeviceBuffer {
            raw,
            size,
            tracker,
        })
    }

    /// Allocates a device buffer and uploads `contents` into it.
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> Result<DeviceBuffer, DeviceError> {
        let buf = self.create_buffer(
            label,
            contents.len() as u64,
            usage | wgpu::BufferUsages::COPY_DST,
        )?;
        self.queue.write_buffer(buf.raw(), 0, contents);
        Ok(buf)
    }

    /// Copies a device buffer back to host memory, blocking until mapped.
    ///
    /// Allocates a transient MAP_READ staging buffer; both it and `src` are
    /// untracked when their owners drop, whether this returns Ok or Err.
    pub fn read_back(&self, src: &DeviceBuffer) -> Result<Vec<u8>, DeviceError> {
        let readback = self.create_buffer(
            "readback",
            src.size(),
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        )?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback-encoder"),
            });
        encoder.copy_buffer_to_buffer(src.raw(), 0, readback.raw(), 0, src.size());
        self.queue.submit(Some(encoder.finish()));

        let slice = readback.raw().slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx.send(r);
        });
        // Block until the mapping is ready.
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| DeviceError::Readback(e.to_string()))?
            .map_err(|e| DeviceError::Readback(e.to_string()))?;

        let data = slice.get_mapped_range();
        let out = data.to_vec();
        drop(data);
        readback.raw().unmap();
        Ok(out)
    }
}
