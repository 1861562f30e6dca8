use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    version: u64,
}

/// Single-slot, overwrite-on-publish hand-off between one producer thread and
/// any number of readers. Not a queue: a reader only ever sees the newest
/// value, tagged with a version that grows by one per publish.
///
/// Keep `T` cheap to clone (an `Arc` or a small `Copy` record); the lock is
/// only held for the swap.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Mutex<Slot<T>>,
    first: Condvar,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Latest<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                version: 0,
            }),
            first: Condvar::new(),
        }
    }

    // Poisoning is ignored: the slot only ever holds a complete value.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the held value and returns its version.
    pub fn publish(&self, value: T) -> u64 {
        let version = {
            let mut slot = self.lock();
            slot.value = Some(value);
            slot.version += 1;
            slot.version
        };
        self.first.notify_all();
        version
    }

    /// Version of the held value; 0 until the first publish.
    pub fn version(&self) -> u64 {
        self.lock().version
    }
}

impl<T: Clone> Latest<T> {
    /// Newest value and its version, without waiting.
    pub fn latest(&self) -> Option<(u64, T)> {
        let slot = self.lock();
        slot.value.clone().map(|v| (slot.version, v))
    }

    /// Newest value only if it is newer than `seen`.
    pub fn newer_than(&self, seen: u64) -> Option<(u64, T)> {
        let slot = self.lock();
        if slot.version <= seen {
            return None;
        }
        slot.value.clone().map(|v| (slot.version, v))
    }

    /// Blocks up to `timeout` for the first value to appear.
    pub fn wait_first(&self, timeout: Duration) -> Option<(u64, T)> {
        let guard = self.lock();
        let (slot, _) = self
            .first
            .wait_timeout_while(guard, timeout, |s| s.value.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        slot.value.clone().map(|v| (slot.version, v))
    }
}

#[cfg(test)]
mod tests {
    use super::Latest;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn empty_until_first_publish() {
        let mb: Latest<u32> = Latest::new();
        assert_eq!(mb.latest(), None);
        assert_eq!(mb.version(), 0);
    }

    #[test]
    fn publish_overwrites_and_bumps_version() {
        let mb = Latest::new();
        assert_eq!(mb.publish("a"), 1);
        assert_eq!(mb.publish("b"), 2);
        assert_eq!(mb.latest(), Some((2, "b")));
    }

    #[test]
    fn repeated_reads_are_identical() {
        let mb = Latest::new();
        mb.publish(7_u8);
        assert_eq!(mb.latest(), mb.latest());
        assert_eq!(mb.newer_than(0), Some((1, 7)));
        assert_eq!(mb.newer_than(1), None);
    }

    #[test]
    fn wait_first_is_bounded() {
        let mb: Latest<u8> = Latest::new();
        assert_eq!(mb.wait_first(Duration::from_millis(20)), None);
    }

    #[test]
    fn wait_first_wakes_on_publish_from_another_thread() {
        let mb = Arc::new(Latest::new());
        let producer = Arc::clone(&mb);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.publish(42_u32);
        });
        assert_eq!(mb.wait_first(Duration::from_secs(5)), Some((1, 42)));
        handle.join().unwrap();
    }
}
