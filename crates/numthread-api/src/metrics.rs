use lazy_static::lazy_static;
use numthread_core::OperationType;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = {
        let registry = Registry::new();
        registry.register(Box::new(USERS_REGISTERED_TOTAL.clone())).unwrap();
        registry.register(Box::new(LOGINS_TOTAL.clone())).unwrap();
        registry.register(Box::new(DISCUSSIONS_CREATED_TOTAL.clone())).unwrap();
        registry.register(Box::new(OPERATIONS_CREATED_TOTAL.clone())).unwrap();
        registry
    };

    pub static ref USERS_REGISTERED_TOTAL: IntCounter = IntCounter::with_opts(Opts::new(
        "numthread_users_registered_total",
        "Total number of registered users"
    ))
    .unwrap();

    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("numthread_logins_total", "Login attempts by outcome"),
        &["outcome"]
    )
    .unwrap();

    pub static ref DISCUSSIONS_CREATED_TOTAL: IntCounter = IntCounter::with_opts(Opts::new(
        "numthread_discussions_created_total",
        "Total number of discussions started"
    ))
    .unwrap();

    pub static ref OPERATIONS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("numthread_operations_created_total", "Operations created by type"),
        &["operation"]
    )
    .unwrap();
}

/// Registers every family and seeds each label value at zero, so a scrape
/// before any traffic already lists all series.
pub fn register_metrics() {
    lazy_static::initialize(&REGISTRY);
    for outcome in ["success", "failure"] {
        LOGINS_TOTAL.with_label_values(&[outcome]).inc_by(0);
    }
    for operation in OperationType::ALL {
        OPERATIONS_CREATED_TOTAL
            .with_label_values(&[operation.as_str()])
            .inc_by(0);
    }
}

pub fn record_login(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    LOGINS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
