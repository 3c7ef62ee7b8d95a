use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};

/// Consumer-side instruments, no-ops without a meter provider.
pub struct ConsumerMetrics {
    pub frames_consumed: Counter<u64>,
    pub detections: Counter<u64>,
    pub sequence_gaps: Counter<u64>,
    pub occupancy: Histogram<u64>,
}

impl ConsumerMetrics {
    pub fn new(capacity: u32) -> Self {
        let meter = global::meter("consumer");
        let occupancy_buckets: Vec<f64> = (0..=capacity).map(f64::from).collect();

        Self {
            frames_consumed: meter
                .u64_counter("frames_consumed_total")
                .with_description("Frames read from the shared queue")
                .build(),
            detections: meter
                .u64_counter("detections_received_total")
                .with_description("Detections carried by consumed frames")
                .build(),
            sequence_gaps: meter
                .u64_counter("frame_sequence_anomalies_total")
                .with_description("Frames whose id did not follow the previous one")
                .build(),
            occupancy: meter
                .u64_histogram("queue_occupancy_slots")
                .with_description("Filled slots left after each consume")
                .with_boundaries(occupancy_buckets)
                .build(),
        }
    }
}
