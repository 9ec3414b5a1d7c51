//! Ownership transfer between execution contexts.
//!
//! A [`Handoff`] carries a value from the thread that created it to the home
//! context. The home context takes the value out with [`Handoff::claim`].
//! If the handoff is dropped unclaimed (the receiver is gone, or refused the
//! value) the value is released on the [`ReleaseContext`] it was created with,
//! never on whichever thread happened to drop the message.

use std::any::Any;
use std::sync::mpsc;
use std::thread;

type Parcel = Box<dyn Any + Send>;

/// Designated context on which orphaned handoff values are dropped.
///
/// Backed by a dedicated thread that lives until every clone is dropped.
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    tx: mpsc::Sender<Parcel>,
    thread_name: String,
}

impl ReleaseContext {
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let thread_name = name.into();
        let (tx, rx) = mpsc::channel::<Parcel>();
        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                for parcel in rx {
                    drop(parcel);
                }
            })?;
        Ok(Self { tx, thread_name })
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Drop `value` on the release thread.
    pub fn release<T: Send + 'static>(&self, value: T) {
        if let Err(mpsc::SendError(parcel)) = self.tx.send(Box::new(value)) {
            log::warn!(
                "release context {} is gone, dropping value in place",
                self.thread_name
            );
            drop(parcel);
        }
    }
}

/// Single-owner box moved across contexts.
#[derive(Debug)]
pub struct Handoff<T: Send + 'static> {
    value: Option<T>,
    fallback: ReleaseContext,
}

impl<T: Send + 'static> Handoff<T> {
    pub fn new(value: T, fallback: ReleaseContext) -> Self {
        Self {
            value: Some(value),
            fallback,
        }
    }

    /// Take ownership on the receiving context.
    pub fn claim(mut self) -> T {
        self.value
            .take()
            .expect("handoff value is present until claimed or dropped")
    }

    /// Refuse the value; it is dropped on the fallback context.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Send + 'static> Drop for Handoff<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.fallback.release(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    struct Tracked(Arc<Mutex<Vec<Option<String>>>>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            let name = thread::current().name().map(str::to_string);
            self.0.lock().unwrap().push(name);
        }
    }

    fn wait_for(drops: &Arc<Mutex<Vec<Option<String>>>>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while drops.lock().unwrap().len() < count && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_claimed_value_is_not_released() {
        let drops = Arc::new(Mutex::new(Vec::new()));
        let ctx = ReleaseContext::spawn("test-release-claim").unwrap();
        let handoff = Handoff::new(Tracked(drops.clone()), ctx);

        let value = handoff.claim();
        assert!(drops.lock().unwrap().is_empty());
        drop(value);
        assert_eq!(drops.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_unclaimed_value_released_on_fallback_thread() {
        let drops = Arc::new(Mutex::new(Vec::new()));
        let ctx = ReleaseContext::spawn("test-release-fallback").unwrap();
        let handoff = Handoff::new(Tracked(drops.clone()), ctx);

        thread::spawn(move || handoff.release()).join().unwrap();
        wait_for(&drops, 1);

        let drops = drops.lock().unwrap();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].as_deref(), Some("test-release-fallback"));
    }
}
