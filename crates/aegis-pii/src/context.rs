//! Per-request sensitive-value context
//!
//! Owns the reversible token map and the detection log for one request.
//! Created at request entry, dropped at request exit; never shared across
//! requests. The audit sink reads it asynchronously, so the interior maps
//! are lock-guarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

/// What the audit sink persists: token metadata, never the original value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvDetection {
    pub kind: String,
    pub token: String,
    pub original_length: usize,
    pub detected_at: DateTime<Utc>,
    /// Present only when the audit level asks for positions.
    pub position: Option<(usize, usize)>,
}

/// Request-scoped container mapping tokens back to original values.
pub struct SvContext {
    request_id: Uuid,
    created_at: DateTime<Utc>,
    token_map: RwLock<HashMap<String, String>>,
    detections: RwLock<Vec<SvDetection>>,
    sequence: AtomicU64,
}

impl SvContext {
    pub fn new(request_id: Uuid) -> Self {
        Self {
            request_id,
            created_at: Utc::now(),
            token_map: RwLock::new(HashMap::new()),
            detections: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Record a token substitution. Appends the detection record whose
    /// `original_length` mirrors the replaced value.
    pub fn add_mapping(
        &self,
        token: String,
        original: String,
        kind: &str,
        position: Option<(usize, usize)>,
    ) {
        let detection = SvDetection {
            kind: kind.to_string(),
            token: token.clone(),
            original_length: original.len(),
            detected_at: Utc::now(),
            position,
        };
        self.token_map
            .write()
            .expect("token map lock poisoned")
            .insert(token, original);
        self.detections
            .write()
            .expect("detection log lock poisoned")
            .push(detection);
    }

    pub fn original_value(&self, token: &str) -> Option<String> {
        self.token_map
            .read()
            .expect("token map lock poisoned")
            .get(token)
            .cloned()
    }

    pub fn detections(&self) -> Vec<SvDetection> {
        self.detections
            .read()
            .expect("detection log lock poisoned")
            .clone()
    }

    pub fn detection_count(&self) -> usize {
        self.detections
            .read()
            .expect("detection log lock poisoned")
            .len()
    }

    pub fn has_detections(&self) -> bool {
        self.detection_count() > 0
    }

    /// Monotonic counter for sequential token ids (1, 2, 3, ...).
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// True when a candidate string appears among the stored originals.
    /// Used by tests to assert the non-leak invariant.
    pub fn contains_original(&self, candidate: &str) -> bool {
        self.token_map
            .read()
            .expect("token map lock poisoned")
            .values()
            .any(|v| v == candidate)
    }
}

impl std::fmt::Debug for SvContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvContext")
            .field("request_id", &self.request_id)
            .field("detections", &self.detection_count())
            .finish()
    }
}
