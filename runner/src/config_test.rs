use crate::{
    config::{ConfigErrors, ConnectionConfig, RunnerConfig},
    database::simulated::DEFAULT_TUPLE_COST_US,
    suite::context::DEFAULT_TOLERANCE,
};
use std::time::Duration;

#[test]
pub fn empty_config_uses_defaults() {
    let config = RunnerConfig::parse("{}").unwrap();

    assert_eq!(config, RunnerConfig::default());
    assert_eq!(config.settle_delay(), Duration::ZERO);
    assert!(!config.preflight_checks());
    assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
}

#[test]
pub fn parses_postgres_connection() {
    let config = RunnerConfig::parse(
        "
db:
  postgres:
    dsn: host=localhost user=postgres
    extension: null
settle_delay: 500
tolerance: 2.5
filter: test_0[12]*
",
    )
    .unwrap();

    assert_eq!(
        config.connection,
        ConnectionConfig::Postgres {
            dsn: "host=localhost user=postgres".to_owned(),
            extension: None,
            view: "pg_stat_usage".to_owned(),
            reset_function: "pg_stat_usage_reset".to_owned(),
        }
    );
    assert_eq!(config.settle_delay(), Duration::from_millis(500));
    assert_eq!(config.tolerance, 2.5);

    let filter = config.compile_filter().unwrap();
    assert!(filter.is_match("test_01_simple_function"));
    assert!(!filter.is_match("test_03_repeated_nested_calls"));
}

#[test]
pub fn parses_simulated_connection() {
    let config = RunnerConfig::parse("connection:\n  simulated:\n    call_overhead_us: 5\n")
        .unwrap();

    assert_eq!(
        config.connection,
        ConnectionConfig::Simulated {
            call_overhead_us: 5,
            tuple_cost_us: DEFAULT_TUPLE_COST_US,
        }
    );
}

#[test]
pub fn rejects_unknown_fields() {
    assert!(matches!(
        RunnerConfig::parse("settle: 5"),
        Err(ConfigErrors::InvalidYaml(_))
    ));
}

#[test]
pub fn preflight_flags_bad_values() {
    let config = RunnerConfig {
        tolerance: -1.0,
        filter: "test_[".to_owned(),
        ..RunnerConfig::default()
    };

    assert!(config.preflight_checks());
}
