use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Single-occupancy guard for one class of in-flight operation.
///
/// The session owns the slot; a front-end may hold a clone of the `Arc` to
/// read progress or to keep new requests out while it works.
#[derive(Debug)]
pub struct OperationSlot {
    name: &'static str,
    busy: AtomicBool,
    started: Mutex<Option<Instant>>,
}

impl OperationSlot {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            busy: AtomicBool::new(false),
            started: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.started
            .lock()
            .ok()
            .and_then(|started| started.map(|at| at.elapsed()))
    }

    /// `None` while another holder has the slot.
    pub fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        Some(SlotGuard {
            slot: Arc::clone(self),
        })
    }
}

/// Releases the slot on drop.
#[derive(Debug)]
pub struct SlotGuard {
    slot: Arc<OperationSlot>,
}

impl SlotGuard {
    pub fn elapsed(&self) -> Duration {
        self.slot.elapsed().unwrap_or_default()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Ok(mut started) = self.slot.started.lock() {
            *started = None;
        }
        self.slot.busy.store(false, Ordering::Release);
    }
}
