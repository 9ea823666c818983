use super::*;
use serial_test::serial;
use std::path::{Path, PathBuf};

const MINIMAL: &str = r#"
GENERAL:
  FBI_INDEX: fbi
  STAC_INDEX: stac
ELASTICSEARCH:
  SESSION_KWARGS:
    hosts: localhost:9200
GENERATOR:
  generator: asset
  collection_descriptions:
    root_directory: /tmp/descriptions
  outputs:
    - method: json_file
      filepath: /tmp/out.json
"#;

fn sample(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

#[test]
fn test_minimal_config_applies_defaults() {
    let settings = Settings::from_yaml_str(MINIMAL).unwrap();

    assert_eq!(settings.general.max_slices, 10);
    assert_eq!(settings.general.start_slice, 0);
    assert_eq!(settings.general.effective_end_slice(), 10);
    assert_eq!(settings.general.search_size, 10_000);
    assert_eq!(settings.general.search_per_chunk, 10);
    assert_eq!(settings.general.parallel_slices, 1);
    assert_eq!(settings.general.pit_keep_alive.as_str(), "5m");
    assert_eq!(settings.logging.level, "INFO");
    assert!(settings.rabbit.is_none());
    assert_eq!(settings.elasticsearch.session.hosts, vec!["localhost:9200"]);
    assert!(settings.elasticsearch.session.verify_certs);
}

#[test]
fn test_stocktake_section_is_accepted_for_general() {
    let yaml = MINIMAL.replace("GENERAL:", "STOCKTAKE:");
    let settings = Settings::from_yaml_str(&yaml).unwrap();
    assert_eq!(settings.general.fbi_index, "fbi");
}

#[test]
fn test_missing_required_key_is_reported() {
    let yaml = MINIMAL.replace("  STAC_INDEX: stac\n", "");
    match Settings::from_yaml_str(&yaml) {
        Err(ConfigError::Missing { key }) => assert!(key.ends_with("STAC_INDEX"), "got {key}"),
        other => panic!("expected missing key error, got {other:?}"),
    }
}

#[test]
fn test_malformed_yaml_is_a_parse_error() {
    let result = Settings::from_yaml_str("GENERAL: [unterminated");
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
}

#[test]
fn test_end_slice_is_exclusive_and_clamped() {
    let yaml = MINIMAL.replace(
        "  STAC_INDEX: stac\n",
        "  STAC_INDEX: stac\n  MAX_SLICES: 3\n  END_SLICE: 7\n",
    );
    let settings = Settings::from_yaml_str(&yaml).unwrap();
    assert_eq!(settings.general.effective_end_slice(), 3);
}

#[test]
fn test_empty_slice_range_is_rejected() {
    let yaml = MINIMAL.replace(
        "  STAC_INDEX: stac\n",
        "  STAC_INDEX: stac\n  START_SLICE: 2\n  END_SLICE: 2\n",
    );
    assert!(matches!(
        Settings::from_yaml_str(&yaml),
        Err(ConfigError::Invalid { key, .. }) if key == "GENERAL.START_SLICE"
    ));
}

#[test]
fn test_zero_search_size_is_rejected() {
    let yaml = MINIMAL.replace(
        "  STAC_INDEX: stac\n",
        "  STAC_INDEX: stac\n  SEARCH_SIZE: 0\n",
    );
    assert!(matches!(
        Settings::from_yaml_str(&yaml),
        Err(ConfigError::Invalid { key, .. }) if key == "GENERAL.SEARCH_SIZE"
    ));
}

#[test]
fn test_keep_alive_must_be_a_time_value() {
    let yaml = MINIMAL.replace(
        "  STAC_INDEX: stac\n",
        "  STAC_INDEX: stac\n  PIT_KEEP_ALIVE: five minutes\n",
    );
    assert!(Settings::from_yaml_str(&yaml).is_err());
}

#[test]
fn test_keep_alive_units() {
    for value in ["90s", "5m", "1h", "250ms"] {
        let keep_alive = KeepAlive::try_from(value.to_string()).unwrap();
        assert_eq!(keep_alive.as_str(), value);
    }
    assert!(KeepAlive::try_from("5 minutes".to_string()).is_err());
}

#[test]
fn test_file_output_requires_filepath() {
    let yaml = MINIMAL.replace("      filepath: /tmp/out.json\n", "");
    match Settings::from_yaml_str(&yaml) {
        Err(ConfigError::Missing { key }) => assert_eq!(key, "GENERATOR.outputs[0].filepath"),
        other => panic!("expected missing filepath, got {other:?}"),
    }
}

#[test]
fn test_rabbit_output_requires_rabbit_section() {
    let yaml = MINIMAL.replace(
        "      filepath: /tmp/out.json\n",
        "      filepath: /tmp/out.json\n    - method: rabbit_mq\n",
    );
    assert!(matches!(
        Settings::from_yaml_str(&yaml),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_unknown_generator_mode_is_rejected() {
    let yaml = MINIMAL.replace("generator: asset", "generator: item");
    assert!(Settings::from_yaml_str(&yaml).is_err());
}

#[test]
fn test_base_urls_take_scheme_from_use_ssl() {
    let yaml = MINIMAL.replace(
        "    hosts: localhost:9200\n",
        "    hosts: [\"es1:9200\", \"http://es2:9200/\"]\n    use_ssl: true\n",
    );
    let settings = Settings::from_yaml_str(&yaml).unwrap();
    assert_eq!(
        settings.elasticsearch.session.base_urls(),
        vec!["https://es1:9200", "http://es2:9200"]
    );
}

#[test]
fn test_default_sample_loads_with_all_sections() {
    let settings = Settings::load(&sample(".stac_stocktake.yml")).unwrap();

    assert_eq!(settings.general.fbi_index, "fbi-2022");
    assert_eq!(settings.general.state_index.as_deref(), Some("stac-stocktake-state"));
    assert_eq!(settings.logging.level, "INFO");
    let rabbit = settings.rabbit.as_ref().expect("RABBIT section");
    assert_eq!(rabbit.session.exchange.kind, ExchangeType::Fanout);
    assert!(rabbit.session.exchange.options.durable);
    assert_eq!(rabbit.routing_key, "stac.stocktake");
    assert!(settings.elasticsearch.session.use_ssl);
    assert_eq!(settings.generator.generator, GeneratorMode::Asset);
    assert_eq!(settings.generator.outputs.len(), 2);
}

#[test]
fn test_lotus_sample_loads_with_all_sections() {
    let settings = Settings::load(&sample(".stac_stocktake_lotus.yml")).unwrap();

    assert_eq!(settings.general.start_slice, 0);
    assert_eq!(settings.general.effective_end_slice(), 1);
    assert_eq!(settings.general.max_slices, 3);
    assert_eq!(
        settings.general.data_directory(),
        PathBuf::from("/work/stac-stocktake/data")
    );
    assert_eq!(settings.logging.format.as_deref(), Some("ext"));
    assert!(settings.rabbit.is_some());
    assert_eq!(settings.elasticsearch.session.timeout, 60.0);
    let methods: Vec<_> = settings.generator.outputs.iter().map(|o| o.method).collect();
    assert_eq!(methods, vec![OutputMethod::JsonFile, OutputMethod::TextFile]);
}

#[test]
fn test_redacted_masks_password() {
    let settings = Settings::load(&sample(".stac_stocktake.yml")).unwrap();
    let yaml = settings.redacted().to_yaml().unwrap();
    assert!(!yaml.contains("change-me"));
    assert!(yaml.contains("********"));
}

#[test]
fn test_load_missing_file_is_not_found() {
    let result = Settings::load(Path::new("/nonexistent/stocktake.yml"));
    assert!(matches!(result, Err(ConfigError::NotFound { .. })));
}

#[test]
#[serial]
fn test_discovery_prefers_explicit_then_env() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.yml");
    let from_env = dir.path().join("env.yml");
    std::fs::write(&explicit, MINIMAL).unwrap();
    std::fs::write(&from_env, MINIMAL).unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &from_env);
    assert_eq!(discover_config_path(Some(&explicit)).unwrap(), explicit);
    assert_eq!(discover_config_path(None).unwrap(), from_env);

    std::env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.yml"));
    assert!(matches!(
        discover_config_path(None),
        Err(ConfigError::NotFound { .. })
    ));
    std::env::remove_var(CONFIG_ENV_VAR);
}
