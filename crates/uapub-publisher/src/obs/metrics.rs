//! Labelled metric families for the publisher.
//!
//! Families are `DashMap`s keyed by sorted label pairs so rendering order is
//! stable per label set. Durations are recorded in microseconds against fixed
//! buckets.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
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

    /// Current value, 0 for a label set never touched.
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let _ = writeln!(out, "{name}{{{}}} {}", render_labels(r.key()), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn dec(&self, labels: &[(&str, &str)]) {
        self.add(labels, -1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        self.map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |g| g.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} gauge");
        for r in self.map.iter() {
            let _ = writeln!(out, "{name}{{{}}} {}", render_labels(r.key()), r.value().load(Ordering::Relaxed));
        }
    }
}

// 10us .. 100ms; encoding a typical network message sits in the low buckets.
const BUCKETS_MICROS: [u64; 8] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 100_000];

#[derive(Default)]
struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    /// Observe a duration into cumulative microsecond buckets.
    pub fn observe(&self, labels: &[(&str, &str)], duration: Duration) {
        let hist = self.map.entry(label_key(labels)).or_insert_with(AtomicHistogram::default);
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (bucket, &le) in hist.buckets.iter().zip(BUCKETS_MICROS.iter()) {
            if micros <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn count(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |h| h.count.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let labels = render_labels(r.key());
            let prefix = if labels.is_empty() { String::new() } else { format!("{labels},") };
            let hist = r.value();
            for (bucket, le) in hist.buckets.iter().zip(BUCKETS_MICROS) {
                let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"{le}\"}} {}", bucket.load(Ordering::Relaxed));
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{{prefix}le=\"+Inf\"}} {count}");
            let _ = writeln!(out, "{name}_sum{{{labels}}} {}", hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{name}_count{{{labels}}} {count}");
        }
    }
}

#[derive(Default)]
pub struct PublisherMetrics {
    pub messages_published: CounterVec,
    pub bytes_sent: CounterVec,
    pub encode_errors: CounterVec,
    pub send_errors: CounterVec,
    pub sample_errors: CounterVec,
    pub groups_running: GaugeVec,
    pub encode_duration: HistogramVec, // microseconds
    draining: AtomicBool,
}

impl PublisherMetrics {
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition of every family plus caller-provided lines.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.messages_published.render("uapub_messages_published_total", &mut out);
        self.bytes_sent.render("uapub_bytes_sent_total", &mut out);
        self.encode_errors.render("uapub_encode_errors_total", &mut out);
        self.send_errors.render("uapub_send_errors_total", &mut out);
        self.sample_errors.render("uapub_sample_errors_total", &mut out);
        self.groups_running.render("uapub_writer_groups_running", &mut out);
        self.encode_duration.render("uapub_encode_duration_micros", &mut out);

        let _ = writeln!(out, "# TYPE uapub_draining gauge\nuapub_draining {}", u8::from(self.is_draining()));
        for (k, v) in extra {
            let _ = writeln!(out, "{k} {v}");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_order_insensitive() {
        let c = CounterVec::default();
        c.inc(&[("group", "a"), ("code", "DECODE")]);
        c.add(&[("code", "DECODE"), ("group", "a")], 2);
        assert_eq!(c.get(&[("group", "a"), ("code", "DECODE")]), 3);
        assert_eq!(c.get(&[("group", "b")]), 0);
    }

    #[test]
    fn histogram_buckets_are_cumulative() {
        let m = PublisherMetrics::default();
        m.encode_duration.observe(&[("group", "g")], Duration::from_micros(40));
        m.encode_duration.observe(&[("group", "g")], Duration::from_millis(2));
        let text = m.render(&[]);
        assert!(text.contains(r#"uapub_encode_duration_micros_bucket{group="g",le="50"} 1"#), "{text}");
        assert!(text.contains(r#"uapub_encode_duration_micros_bucket{group="g",le="5000"} 2"#), "{text}");
        assert!(text.contains(r#"uapub_encode_duration_micros_count{group="g"} 2"#), "{text}");
    }

    #[test]
    fn render_escapes_and_reports_draining() {
        let m = PublisherMetrics::default();
        m.messages_published.inc(&[("group", "line \"a\"")]);
        m.set_draining();
        let text = m.render(&[("uapub_writer_groups", 2)]);
        assert!(text.contains(r#"uapub_messages_published_total{group="line \"a\""} 1"#), "{text}");
        assert!(text.contains("uapub_draining 1"));
        assert!(text.ends_with("uapub_writer_groups 2\n"));
    }
}
