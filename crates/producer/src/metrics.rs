use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

/// Producer-side instruments. They are no-ops unless a meter provider was
/// installed by `common::TelemetryGuard`.
pub struct ProducerMetrics {
    pub frames_published: Counter<u64>,
    pub detections_truncated: Counter<u64>,
    pub queue_full_waits: Counter<u64>,
    pub occupancy: Histogram<u64>,
}

impl ProducerMetrics {
    pub fn new(capacity: u32) -> Self {
        let meter = global::meter("producer");
        let occupancy_buckets: Vec<f64> = (0..=capacity).map(f64::from).collect();

        Self {
            frames_published: meter
                .u64_counter("frames_published_total")
                .with_description("Frames written into the shared queue")
                .build(),
            detections_truncated: meter
                .u64_counter("detections_truncated_total")
                .with_description("Detections dropped because a frame exceeded the slot's capacity")
                .build(),
            queue_full_waits: meter
                .u64_counter("queue_full_waits_total")
                .with_description("Publish attempts that timed out on a full queue")
                .build(),
            occupancy: meter
                .u64_histogram("queue_occupancy_slots")
                .with_description("Filled slots observed after each publish")
                .with_boundaries(occupancy_buckets)
                .build(),
        }
    }
}
