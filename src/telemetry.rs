//! Tracing setup.
//!
//! The crate itself only emits through `tracing`; embedders pick their own
//! subscriber. `init` is a convenience for binaries and examples.

use tracing::Level;
use tracing_subscriber::EnvFilter;

pub fn is_test_env() -> bool {
    std::env::var_os("FEDICACHE_TESTING").is_some()
        || std::env::var_os("RUST_TEST_THREADS").is_some()
}

fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install a global fmt subscriber filtered by verbosity, overridable via
/// the `FEDICACHE_LOG` env var. Safe to call more than once; later calls
/// lose and are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(verbosity).into())
        .with_env_var("FEDICACHE_LOG")
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_from_verbosity(0), Level::WARN);
        assert_eq!(level_from_verbosity(1), Level::INFO);
        assert_eq!(level_from_verbosity(2), Level::DEBUG);
        assert_eq!(level_from_verbosity(9), Level::TRACE);
    }
}
