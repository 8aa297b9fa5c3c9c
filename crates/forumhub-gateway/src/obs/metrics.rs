//! Minimal metrics registry for the presence gateway.
//!
//! Counter/gauge/histogram vectors with dynamic labels backed by `DashMap`.
//! Label sets are sorted before use as keys so rendering is deterministic
//! per series. Histogram buckets are fixed in microseconds.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, key: &LabelKey) -> String {
    if key.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{}}}", render_labels(key))
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let _ = writeln!(out, "{} {}", series(name, r.key()), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge\n{name} {}", self.get());
    }
}

// 100us, 500us, 1ms, 5ms, 10ms, 50ms
const BUCKETS_MICROS: [u64; 6] = [100, 500, 1_000, 5_000, 10_000, 50_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; 6],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration (cumulative buckets, microsecond scale).
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(label_key(labels)).or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (i, &b) in BUCKETS_MICROS.iter().enumerate() {
            if micros <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let labels = render_labels(r.key());
            let prefix = if labels.is_empty() { String::new() } else { format!("{labels},") };
            let hist = r.value();

            for (i, le) in BUCKETS_MICROS.iter().enumerate() {
                let n = hist.buckets[i].load(Ordering::Relaxed);
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {n}");
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), r.key()), hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{} {count}", series(&format!("{name}_count"), r.key()));
        }
    }
}

/// Values read from the registries at scrape time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceSnapshot {
    pub forums_tracked: usize,
    pub topics_active: usize,
    pub connections_located: usize,
    pub sessions_registered: usize,
    pub egress_dropped_full: u64,
    pub egress_dropped_closed: u64,
}

impl PresenceSnapshot {
    fn render(&self, out: &mut String) {
        let gauges = [
            ("forumhub_forums_tracked", self.forums_tracked as u64),
            ("forumhub_topics_active", self.topics_active as u64),
            ("forumhub_connections_located", self.connections_located as u64),
            ("forumhub_sessions_registered", self.sessions_registered as u64),
        ];
        for (name, v) in gauges {
            let _ = writeln!(out, "# TYPE {name} gauge\n{name} {v}");
        }
        let _ = writeln!(out, "# TYPE forumhub_egress_dropped_total counter");
        let _ = writeln!(out, "forumhub_egress_dropped_total{{reason=\"queue_full\"}} {}", self.egress_dropped_full);
        let _ = writeln!(out, "forumhub_egress_dropped_total{{reason=\"closed\"}} {}", self.egress_dropped_closed);
    }
}

#[derive(Default)]
pub struct GatewayMetrics {
    pub ws_upgrades: CounterVec,
    pub ws_active_sessions: Gauge,
    pub presence_events: CounterVec,
    pub presence_errors: CounterVec,
    pub decode_errors: CounterVec,
    pub event_duration: HistogramVec,
}

impl GatewayMetrics {
    /// Prometheus text for the live metrics plus a scrape-time snapshot.
    pub fn render(&self, snapshot: &PresenceSnapshot) -> String {
        let mut out = String::new();
        self.ws_upgrades.render("forumhub_ws_upgrades_total", &mut out);
        self.ws_active_sessions.render("forumhub_ws_sessions_active", &mut out);
        self.presence_events.render("forumhub_presence_events_total", &mut out);
        self.presence_errors.render("forumhub_presence_errors_total", &mut out);
        self.decode_errors.render("forumhub_decode_errors_total", &mut out);
        self.event_duration.render("forumhub_presence_event_duration_micros", &mut out);
        snapshot.render(&mut out);
        out
    }
}
