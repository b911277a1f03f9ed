use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;


lazy_static::lazy_static! {
    pub static ref PROGRESS: Gauge<f64, AtomicU64> = Default::default();
    pub static ref LAST_BLOCK: Gauge = Default::default();
    pub static ref STAGED_ENTITIES: Counter = Default::default();
    pub static ref SKIPPED_RECORDS: Counter = Default::default();
}


pub fn register_metrics(registry: &mut Registry) {
    registry.register(
        "domstake_progress_blocks_per_second",
        "Overall block processing speed",
        PROGRESS.clone()
    );
    registry.register(
        "domstake_last_block",
        "Last processed block",
        LAST_BLOCK.clone()
    );
    registry.register(
        "domstake_staged_entities",
        "Number of entities flushed to the store",
        STAGED_ENTITIES.clone()
    );
    registry.register(
        "domstake_skipped_records",
        "Number of chain records skipped because they could not be parsed",
        SKIPPED_RECORDS.clone()
    );
}
