//! External resource tracking (icon images, dash images, 3-D models).
//!
//! Resources are requested by name while compiling and delivered by the host.
//! Lookups return a [`ResourceStatus`] instead of blocking. A failed load is
//! retried up to a fixed number of attempts, then the resource is skipped for
//! the rest of the session.

use std::collections::BTreeMap;
use std::fmt;

/// Kinds of externally loaded resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Image,
    DashImage,
    Model,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Image => "image",
            ResourceKind::DashImage => "dash-image",
            ResourceKind::Model => "model",
        }
    }
}

/// Opaque handle to one requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(pub u32);

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Result of looking up a resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceStatus<T> {
    Ready(T),
    Pending(ResourceHandle),
    Skipped(String),
}

impl<T> ResourceStatus<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResourceStatus::Ready(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResourceStatus<U> {
        match self {
            ResourceStatus::Ready(v) => ResourceStatus::Ready(f(v)),
            ResourceStatus::Pending(h) => ResourceStatus::Pending(h),
            ResourceStatus::Skipped(reason) => ResourceStatus::Skipped(reason),
        }
    }
}

/// A load the host should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub handle: ResourceHandle,
    pub kind: ResourceKind,
    pub name: String,
    /// 1-based attempt number.
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LoadState {
    Requested,
    Loaded,
    Failed(String),
}

#[derive(Debug, Clone)]
struct Entry {
    kind: ResourceKind,
    name: String,
    state: LoadState,
    attempts: u32,
}

/// Bookkeeping of requested resources and their load state.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    entries: Vec<Entry>,
    by_name: BTreeMap<(ResourceKind, String), ResourceHandle>,
    queue: Vec<ResourceRequest>,
    max_attempts: u32,
}

impl ResourceTracker {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn handle(&self, kind: ResourceKind, name: &str) -> Option<ResourceHandle> {
        self.by_name.get(&(kind, name.to_string())).copied()
    }

    /// Handle for `name`, queueing a first load request if it is new.
    pub fn request(&mut self, kind: ResourceKind, name: &str) -> ResourceHandle {
        if let Some(handle) = self.handle(kind, name) {
            return handle;
        }
        let handle = ResourceHandle(self.entries.len() as u32);
        self.entries.push(Entry {
            kind,
            name: name.to_string(),
            state: LoadState::Requested,
            attempts: 1,
        });
        self.by_name.insert((kind, name.to_string()), handle);
        self.queue.push(ResourceRequest {
            handle,
            kind,
            name: name.to_string(),
            attempt: 1,
        });
        handle
    }

    pub(crate) fn state(&self, handle: ResourceHandle) -> Option<&LoadState> {
        self.entries.get(handle.0 as usize).map(|e| &e.state)
    }

    /// A resource is settled once it is loaded or permanently failed.
    pub fn is_settled(&self, handle: ResourceHandle) -> bool {
        !matches!(self.state(handle), Some(LoadState::Requested))
    }

    pub fn kind(&self, handle: ResourceHandle) -> Option<ResourceKind> {
        self.entries.get(handle.0 as usize).map(|e| e.kind)
    }

    pub fn name(&self, handle: ResourceHandle) -> Option<&str> {
        self.entries.get(handle.0 as usize).map(|e| e.name.as_str())
    }

    pub(crate) fn mark_loaded(&mut self, handle: ResourceHandle) -> bool {
        match self.entries.get_mut(handle.0 as usize) {
            Some(entry) => {
                entry.state = LoadState::Loaded;
                true
            }
            None => false,
        }
    }

    /// Record a failed load. Returns true when the resource is given up on.
    pub fn mark_failed(&mut self, handle: ResourceHandle, reason: &str) -> bool {
        let max_attempts = self.max_attempts;
        let Some(entry) = self.entries.get_mut(handle.0 as usize) else {
            return false;
        };
        if entry.state != LoadState::Requested {
            return matches!(entry.state, LoadState::Failed(_));
        }
        if entry.attempts >= max_attempts {
            log::warn!(
                "Skipping {} '{}' after {} failed attempts: {}",
                entry.kind.as_str(),
                entry.name,
                entry.attempts,
                reason
            );
            entry.state = LoadState::Failed(reason.to_string());
            return true;
        }
        entry.attempts += 1;
        self.queue.push(ResourceRequest {
            handle,
            kind: entry.kind,
            name: entry.name.clone(),
            attempt: entry.attempts,
        });
        false
    }

    /// Drain loads the host has not been asked for yet.
    pub fn take_requests(&mut self) -> Vec<ResourceRequest> {
        std::mem::take(&mut self.queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_deduplicated() {
        let mut tracker = ResourceTracker::new(3);
        let a = tracker.request(ResourceKind::Image, "pin");
        let b = tracker.request(ResourceKind::Image, "pin");
        let c = tracker.request(ResourceKind::Model, "pin");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(tracker.take_requests().len(), 2);
        assert!(tracker.take_requests().is_empty());
    }

    #[test]
    fn test_bounded_retry_then_skip() {
        let mut tracker = ResourceTracker::new(2);
        let handle = tracker.request(ResourceKind::Image, "broken");
        tracker.take_requests();

        assert!(!tracker.mark_failed(handle, "404"));
        assert!(!tracker.is_settled(handle));
        let retry = tracker.take_requests();
        assert_eq!(retry.len(), 1);
        assert_eq!(retry[0].attempt, 2);

        assert!(tracker.mark_failed(handle, "404"));
        assert!(tracker.is_settled(handle));
        assert!(tracker.take_requests().is_empty());
    }

    #[test]
    fn test_status_map() {
        let status: ResourceStatus<u32> = ResourceStatus::Ready(2);
        assert_eq!(status.map(|v| v * 2), ResourceStatus::Ready(4));
        let pending: ResourceStatus<u32> = ResourceStatus::Pending(ResourceHandle(1));
        assert!(!pending.map(|v| v + 1).is_ready());
    }
}
