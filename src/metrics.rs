use prometheus::{IntCounter, IntGauge, Opts, Registry};

/// Four counters — `data_hit`, `data_miss`, `dir_hit`, `dir_miss` — and one
/// gauge — `idle_writers`. Registered against a per-store
/// [`Registry`] rather than the implicit global default, so multiple
/// stores in one process (as in tests) do not collide on metric names.
pub struct StoreMetrics {
    pub data_hit: IntCounter,
    pub data_miss: IntCounter,
    pub dir_hit: IntCounter,
    pub dir_miss: IntCounter,
    pub idle_writers: IntGauge,
}

impl StoreMetrics {
    pub fn new(registry: &Registry) -> Self {
        let data_hit = IntCounter::with_opts(Opts::new(
            "data_hit",
            "Number of data cache hits on get_subject/get_buffer",
        ))
        .expect("static metric options are well-formed");
        let data_miss = IntCounter::with_opts(Opts::new(
            "data_miss",
            "Number of data cache misses falling back to the filesystem backend",
        ))
        .expect("static metric options are well-formed");
        let dir_hit = IntCounter::with_opts(Opts::new(
            "dir_hit",
            "Number of full directory listings served from cache",
        ))
        .expect("static metric options are well-formed");
        let dir_miss = IntCounter::with_opts(Opts::new(
            "dir_miss",
            "Number of directory listings that fell back to the filesystem backend",
        ))
        .expect("static metric options are well-formed");
        let idle_writers = IntGauge::with_opts(Opts::new(
            "idle_writers",
            "Number of writer-pool workers currently idle",
        ))
        .expect("static metric options are well-formed");

        for collector in [
            Box::new(data_hit.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(data_miss.clone()),
            Box::new(dir_hit.clone()),
            Box::new(dir_miss.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric names are unique within a fresh registry");
        }
        registry
            .register(Box::new(idle_writers.clone()))
            .expect("metric names are unique within a fresh registry");

        StoreMetrics {
            data_hit,
            data_miss,
            dir_hit,
            dir_miss,
            idle_writers,
        }
    }
}
