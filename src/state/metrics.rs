use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use chrono::Utc;
use serde::Serialize;

/// Tracks metrics for the Flux state engine
#[derive(Clone)]
pub struct MetricsTracker {
    /// Total events processed (lifetime counter)
    total_events: Arc<AtomicU64>,

    /// Event timestamps for rate calculation (sliding 5-second window)
    event_timestamps: Arc<RwLock<VecDeque<i64>>>,

    /// Active publishers (source -> last_seen_timestamp_ms)
    active_publishers: Arc<RwLock<HashMap<String, i64>>>,

    /// WebSocket connection count
    websocket_connections: Arc<AtomicU64>,
}

impl MetricsTracker {
    /// Create new metrics tracker
    pub fn new() -> Self {
        Self {
            total_events: Arc::new(AtomicU64::new(0)),
            event_timestamps: Arc::new(RwLock::new(VecDeque::new())),
            active_publishers: Arc::new(RwLock::new(HashMap::new())),
            websocket_connections: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record an event (call from StateEngine.process_event)
    pub fn record_event(&self, source: &str) {
        // Increment total counter
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let now = Utc::now().timestamp_millis();

        // Update sliding window for rate calculation
        {
            let mut timestamps = self.event_timestamps.write().unwrap();
            timestamps.push_back(now);

            // Prune old timestamps (keep last 5 seconds)
            while let Some(&oldest) = timestamps.front() {
                if now - oldest > 5000 {
                    timestamps.pop_front();
                } else {
                    break;
                }
            }
        }

        // Update active publishers
        {
            let mut publishers = self.active_publishers.write().unwrap();
            publishers.insert(source.to_string(), now);
        }
    }

    /// Get current event rate (events per second over last 5 seconds)
    pub fn get_event_rate(&self) -> f64 {
        let timestamps = self.event_timestamps.read().unwrap();
        timestamps.len() as f64 / 5.0
    }

    /// Get count of active publishers (published within window)
    pub fn get_active_publisher_count(&self, window_seconds: i64) -> usize {
        let now = Utc::now().timestamp_millis();
        let threshold = now - (window_seconds * 1000);

        let publishers = self.active_publishers.read().unwrap();
        publishers
            .values()
            .filter(|&&last_seen| last_seen > threshold)
            .count()
    }

    /// Increment WebSocket connection count
    pub fn increment_ws_connection(&self) {
        self.websocket_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement WebSocket connection count
    pub fn decrement_ws_connection(&self) {
        self.websocket_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get current WebSocket connection count
    pub fn get_ws_connection_count(&self) -> u64 {
        self.websocket_connections.load(Ordering::Relaxed)
    }

    /// Get total events processed
    pub fn get_total_events(&self) -> u64 {
        self.total_events.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn get_snapshot(&self, publisher_window_seconds: i64) -> MetricsSnapshot {
        MetricsSnapshot {
            total_events: self.get_total_events(),
            event_rate: self.get_event_rate(),
            active_publishers: self.get_active_publisher_count(publisher_window_seconds),
            websocket_connections: self.get_ws_connection_count(),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub total_events: u64,
    pub event_rate: f64,
    pub active_publishers: usize,
    pub websocket_connections: u64,
}
