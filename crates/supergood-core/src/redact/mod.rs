//! Redaction engine.
//!
//! Redaction runs over events the flusher has already removed from the
//! queue, so the engine mutates values it exclusively owns. Two modes,
//! chosen by the cache's force-redact-all flag:
//!
//! - **path-directed**: each sensitive key with action REDACT names a slot
//!   to zero;
//! - **force-redact-all**: every leaf is zeroed except the rule's
//!   ALLOW-listed paths.
//!
//! Both modes record one [`RedactedKeyMeta`](crate::event::RedactedKeyMeta)
//! entry per zeroed slot (canonical path, approximate byte length, kind).
//! Redaction never grows a body, and metadata is additive-only. Events with
//! no matched endpoint rule carry no sensitive-key set and pass through
//! untouched.

mod all;
mod format;
mod path;

use crate::cache::{KeyAction, PolicyCache};
use crate::domain;
use crate::error::RedactError;
use crate::event::Event;

/// Redacts a batch of events in place against the current policy snapshot.
///
/// Per-key failures are collected and returned; each event is still
/// uploaded with whatever redactions succeeded.
pub fn redact_events(events: &mut [Event], cache: &PolicyCache) -> Vec<RedactError> {
    let mut errors = Vec::new();
    for event in events.iter_mut() {
        let domain = domain::registrable_domain(&event.request.url);
        let rules = cache.get(&domain);
        if rules.is_empty() {
            continue;
        }
        let Some(rule) = rules.get(&event.metadata.endpoint_id).cloned() else {
            continue;
        };

        if cache.is_force_redact_all() {
            all::apply(event, &rule.sensitive_keys);
        } else {
            for key in &rule.sensitive_keys {
                if key.action != KeyAction::Redact {
                    continue;
                }
                if let Err(err) = path::apply(event, &key.key_path) {
                    errors.push(err);
                }
            }
        }
    }
    errors
}
