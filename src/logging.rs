use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber honoring `RUST_LOG`. Intended for
/// binaries and examples embedding the driver; a no-op when a subscriber
/// is already set.
pub fn init() {
    let filter = EnvFilter::from_default_env();
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
pub fn init_for_tests() {
    use std::sync::Once;

    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter =
            EnvFilter::from_default_env().add_directive("ch_native=debug".parse().expect("filter"));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
