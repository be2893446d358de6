use meshstat::config::{Config, NodeRole};

#[test]
fn test_default_config_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");
    let path = path.to_str().expect("utf-8 path");

    tokio_test::block_on(async {
        Config::create_default(path).await.expect("write default config");
        let loaded = Config::load(path).await.expect("load config");
        assert_eq!(loaded.node.role, NodeRole::Repeater);
        assert_eq!(loaded.reporting.arc_interval_secs, 3600);
        assert_eq!(loaded.reporting.keep_alive_interval_secs, 300);
        assert!(loaded.web.enabled);
    });
}

#[test]
fn test_role_parses_lowercase() {
    let toml = r#"
        [node]
        hostname = "gw-1"
        ip = "10.0.0.2"
        node_id = 0
        parent_id = 0
        role = "gateway"
        power_level = "low"

        [reporting]
        arc_interval_secs = 60
        keep_alive_interval_secs = 30
        temperature_interval_secs = 120
        indicator_interval_ms = 50

        [sensor]
        enabled = true

        [web]
        enabled = false
        bind = ""

        [logging]
        level = "debug"
    "#;
    let config: Config = toml::from_str(toml).expect("parse");
    assert_eq!(config.node.role, NodeRole::Gateway);
    assert!(config.sensor.enabled);
    assert!(config.validate().is_ok(), "disabled web may leave bind empty");
}

#[test]
fn test_zero_interval_rejected() {
    let mut config = Config::default();
    config.reporting.arc_interval_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_enabled_web_requires_bind() {
    let mut config = Config::default();
    config.web.bind = String::new();
    assert!(config.validate().is_err());
}
