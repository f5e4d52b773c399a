use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::model::ConfigNotification;

/// Lifecycle of a held long-poll request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderState {
    Pending,
    Completed,
    TimedOut,
    Cancelled,
}

struct HolderInner {
    state: HolderState,
    sender: Option<oneshot::Sender<Vec<ConfigNotification>>>,
}

/// One suspended long-poll request.
///
/// Leaves `Pending` exactly once; whichever of completion, timeout or
/// cancellation gets there first wins and the others report `false`.
pub struct DeferredNotification {
    id: u64,
    /// Watch key → namespace as the client requested it
    watch_keys: HashMap<String, String>,
    inner: Mutex<HolderInner>,
    deregistered: AtomicBool,
}

impl std::fmt::Debug for DeferredNotification {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("DeferredNotification")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("watch_keys", &self.watch_keys)
            .finish()
    }
}

impl DeferredNotification {
    pub(crate) fn new(
        id: u64,
        watch_keys: HashMap<String, String>,
    ) -> (Self, oneshot::Receiver<Vec<ConfigNotification>>) {
        let (sender, receiver) = oneshot::channel();
        let holder = Self {
            id,
            watch_keys,
            inner: Mutex::new(HolderInner {
                state: HolderState::Pending,
                sender: Some(sender),
            }),
            deregistered: AtomicBool::new(false),
        };
        (holder, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn watch_keys(&self) -> impl Iterator<Item = &str> {
        self.watch_keys.keys().map(String::as_str)
    }

    /// Namespace the client asked for that `watch_key` was assembled from
    pub fn namespace_for(
        &self,
        watch_key: &str,
    ) -> Option<&str> {
        self.watch_keys.get(watch_key).map(String::as_str)
    }

    pub fn state(&self) -> HolderState {
        self.inner.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.state() == HolderState::Pending
    }

    /// Answers the request with `notifications`
    pub fn complete(
        &self,
        notifications: Vec<ConfigNotification>,
    ) -> bool {
        self.transition(HolderState::Completed, Some(notifications))
    }

    pub(crate) fn time_out(&self) -> bool {
        self.transition(HolderState::TimedOut, None)
    }

    pub(crate) fn cancel(&self) -> bool {
        self.transition(HolderState::Cancelled, None)
    }

    /// True the first time only
    pub(crate) fn mark_deregistered(&self) -> bool {
        !self.deregistered.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn is_deregistered(&self) -> bool {
        self.deregistered.load(Ordering::Acquire)
    }

    fn transition(
        &self,
        to: HolderState,
        result: Option<Vec<ConfigNotification>>,
    ) -> bool {
        let sender = {
            let mut inner = self.inner.lock();
            if inner.state != HolderState::Pending {
                return false;
            }
            inner.state = to;
            inner.sender.take()
        };

        if let (Some(sender), Some(result)) = (sender, result) {
            // receiver gone means the request was dropped in the meantime
            let _ = sender.send(result);
        }
        true
    }
}
