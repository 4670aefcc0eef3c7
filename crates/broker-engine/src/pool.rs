//! Background activities started by plugin entry points.

use std::future::Future;
use std::sync::Mutex;

use tokio::task::JoinHandle;

/// Tracks background activities of one job so they can all be joined before
/// the job's `Finished` event is delivered.
#[derive(Default)]
pub(crate) struct TaskPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start a background activity.
    pub(crate) fn start<F>(&self, activity: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.lock().unwrap().push(tokio::spawn(activity));
    }

    /// Join every activity started so far, including ones started while
    /// waiting. Panicked activities are treated as completed.
    pub(crate) async fn wait_all(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> =
                std::mem::take(&mut *self.handles.lock().unwrap());
            if drained.is_empty() {
                return;
            }
            for handle in drained {
                let _ = handle.await;
            }
        }
    }
}
