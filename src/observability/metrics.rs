use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub queue_depth: IntGauge,
    pub enqueued_total: IntCounterVec,
    pub sync_operations_total: IntCounterVec,
    pub operation_retries_total: IntCounter,
    pub drain_passes_total: IntCounterVec,
    pub negotiation_outcomes_total: IntCounterVec,
    pub cache_reads_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let queue_depth = IntGauge::new("queue_depth", "Operations currently in the offline queue")
            .expect("valid queue_depth metric");

        let enqueued_total = IntCounterVec::new(
            Opts::new("enqueued_total", "Offline operations enqueued by type"),
            &["type"],
        )
        .expect("valid enqueued_total metric");

        let sync_operations_total = IntCounterVec::new(
            Opts::new(
                "sync_operations_total",
                "Queued operations executed during drain passes by outcome",
            ),
            &["type", "outcome"],
        )
        .expect("valid sync_operations_total metric");

        let operation_retries_total = IntCounter::new(
            "operation_retries_total",
            "Retry attempts beyond the first try during drain passes",
        )
        .expect("valid operation_retries_total metric");

        let drain_passes_total = IntCounterVec::new(
            Opts::new("drain_passes_total", "Drain passes by outcome"),
            &["outcome"],
        )
        .expect("valid drain_passes_total metric");

        let negotiation_outcomes_total = IntCounterVec::new(
            Opts::new(
                "negotiation_outcomes_total",
                "Driver negotiation sessions by final outcome",
            ),
            &["outcome"],
        )
        .expect("valid negotiation_outcomes_total metric");

        let cache_reads_total = IntCounterVec::new(
            Opts::new("cache_reads_total", "Trip list reads by source"),
            &["source"],
        )
        .expect("valid cache_reads_total metric");

        registry
            .register(Box::new(queue_depth.clone()))
            .expect("register queue_depth");
        registry
            .register(Box::new(enqueued_total.clone()))
            .expect("register enqueued_total");
        registry
            .register(Box::new(sync_operations_total.clone()))
            .expect("register sync_operations_total");
        registry
            .register(Box::new(operation_retries_total.clone()))
            .expect("register operation_retries_total");
        registry
            .register(Box::new(drain_passes_total.clone()))
            .expect("register drain_passes_total");
        registry
            .register(Box::new(negotiation_outcomes_total.clone()))
            .expect("register negotiation_outcomes_total");
        registry
            .register(Box::new(cache_reads_total.clone()))
            .expect("register cache_reads_total");

        Self {
            registry,
            queue_depth,
            enqueued_total,
            sync_operations_total,
            operation_retries_total,
            drain_passes_total,
            negotiation_outcomes_total,
            cache_reads_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
