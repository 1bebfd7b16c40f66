use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub registrations_total: IntCounterVec,
    pub community_memberships_total: IntCounter,
    pub messages_posted_total: IntCounter,
    pub store_operation_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let registrations_total = IntCounterVec::new(
            Opts::new("registrations_total", "Registered users by role"),
            &["role"],
        )
        .expect("valid registrations_total metric");

        let community_memberships_total = IntCounter::new(
            "community_memberships_total",
            "Farmer memberships added to communities",
        )
        .expect("valid community_memberships_total metric");

        let messages_posted_total =
            IntCounter::new("messages_posted_total", "Chat messages posted to communities")
                .expect("valid messages_posted_total metric");

        let store_operation_seconds = HistogramVec::new(
            HistogramOpts::new(
                "store_operation_seconds",
                "Latency of record store loads and saves in seconds",
            ),
            &["collection", "op"],
        )
        .expect("valid store_operation_seconds metric");

        registry
            .register(Box::new(registrations_total.clone()))
            .expect("register registrations_total");
        registry
            .register(Box::new(community_memberships_total.clone()))
            .expect("register community_memberships_total");
        registry
            .register(Box::new(messages_posted_total.clone()))
            .expect("register messages_posted_total");
        registry
            .register(Box::new(store_operation_seconds.clone()))
            .expect("register store_operation_seconds");

        Self {
            registry,
            registrations_total,
            community_memberships_total,
            messages_posted_total,
            store_operation_seconds,
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
