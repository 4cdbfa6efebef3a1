//! In-memory event queue keyed by correlation id.
//!
//! The queue is the only state shared between the host's request threads
//! and the flusher. Hold time under its lock is bounded by map bookkeeping;
//! no I/O ever happens while it is held.

use std::collections::HashMap;

use parking_lot::Mutex;

use supergood_core::{Event, Request, Response};

/// Size-bounded map of in-flight events.
pub(crate) struct EventQueue {
    inner: Mutex<QueueInner>,
    max_bytes: usize,
}

struct QueueInner {
    events: HashMap<String, Event>,
    approx_bytes: usize,
}

impl EventQueue {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: HashMap::new(),
                approx_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Inserts a request record under its correlation id.
    ///
    /// Returns false when the insertion would push the queue past its byte
    /// cap; the event is dropped entirely and the paired
    /// [`log_response`](Self::log_response) becomes a no-op.
    pub fn log_request(&self, id: String, request: Request, endpoint_id: String) -> bool {
        let event = Event::new(request, endpoint_id);
        let size = event.approx_size();
        let mut inner = self.inner.lock();
        if inner.approx_bytes + size > self.max_bytes {
            tracing::warn!(
                id = %id,
                queue_bytes = inner.approx_bytes,
                max_bytes = self.max_bytes,
                "event queue over capacity, dropping event"
            );
            return false;
        }
        inner.approx_bytes += size;
        inner.events.insert(id, event);
        true
    }

    /// Attaches the response to its request and stamps the duration.
    /// Silently discards responses whose id is no longer present.
    pub fn log_response(&self, id: &str, mut response: Response) {
        let mut inner = self.inner.lock();
        let Some(event) = inner.events.get_mut(id) else {
            return;
        };
        response.duration = (response.responded_at - event.request.requested_at).num_milliseconds();
        let before = event.approx_size();
        event.response = Some(response);
        let after = event.approx_size();
        inner.approx_bytes += after.saturating_sub(before);
    }

    /// Removes completed events from the queue; with `force`, removes all
    /// of them, response or not.
    pub fn drain(&self, force: bool) -> Vec<Event> {
        let mut inner = self.inner.lock();
        let drained: Vec<Event> = if force {
            inner.events.drain().map(|(_, event)| event).collect()
        } else {
            let ready: Vec<String> = inner
                .events
                .iter()
                .filter(|(_, event)| event.response.is_some())
                .map(|(id, _)| id.clone())
                .collect();
            ready
                .iter()
                .filter_map(|id| inner.events.remove(id))
                .collect()
        };
        let removed: usize = drained.iter().map(Event::approx_size).sum();
        inner.approx_bytes = inner.approx_bytes.saturating_sub(removed);
        drained
    }

    /// Number of events currently queued.
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    fn request(id: &str, body: Option<serde_json::Value>) -> Request {
        Request::new(
            id,
            "GET",
            "https://example.com/a",
            "/a",
            "",
            StdHashMap::new(),
            body,
        )
    }

    fn response(status: u16) -> Response {
        Response::new(status, "200 OK", StdHashMap::new(), None)
    }

    #[test]
    fn request_then_response_pairs_up() {
        let queue = EventQueue::new(1_000_000);
        assert!(queue.log_request("a".to_string(), request("a", None), "ep".to_string()));
        queue.log_response("a", response(200));

        let drained = queue.drain(false);
        assert_eq!(drained.len(), 1);
        let event = &drained[0];
        assert_eq!(event.metadata.endpoint_id, "ep");
        let resp = event.response.as_ref().unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.duration >= 0);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn response_for_unknown_id_is_discarded() {
        let queue = EventQueue::new(1_000_000);
        queue.log_response("ghost", response(200));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn normal_drain_skips_incomplete_events() {
        let queue = EventQueue::new(1_000_000);
        queue.log_request("done".to_string(), request("done", None), String::new());
        queue.log_request("pending".to_string(), request("pending", None), String::new());
        queue.log_response("done", response(200));

        let drained = queue.drain(false);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].request.id, "done");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn forced_drain_takes_everything() {
        let queue = EventQueue::new(1_000_000);
        queue.log_request("pending".to_string(), request("pending", None), String::new());

        let drained = queue.drain(true);
        assert_eq!(drained.len(), 1);
        assert!(drained[0].response.is_none());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn over_capacity_insert_is_dropped() {
        let queue = EventQueue::new(200);
        let big_body = serde_json::json!({"data": "x".repeat(500)});
        assert!(!queue.log_request(
            "big".to_string(),
            request("big", Some(big_body)),
            String::new()
        ));
        assert_eq!(queue.len(), 0);

        // The paired response is a no-op; the id never surfaces again.
        queue.log_response("big", response(200));
        assert!(queue.drain(true).is_empty());
    }

    #[test]
    fn drop_does_not_evict_existing_events() {
        let queue = EventQueue::new(300);
        assert!(queue.log_request("small".to_string(), request("small", None), String::new()));
        let big_body = serde_json::json!({"data": "x".repeat(500)});
        assert!(!queue.log_request(
            "big".to_string(),
            request("big", Some(big_body)),
            String::new()
        ));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn an_event_leaves_the_queue_exactly_once() {
        let queue = EventQueue::new(1_000_000);
        queue.log_request("a".to_string(), request("a", None), String::new());
        queue.log_response("a", response(200));

        assert_eq!(queue.drain(false).len(), 1);
        assert!(queue.drain(false).is_empty());
        assert!(queue.drain(true).is_empty());
    }
}
