//! Tests for configuration loading

use std::io::Write;
use std::net::SocketAddr;

use geoshort::config::Config;
use geoshort::service::CosmosSettings;
use serial_test::serial;

const ENV_VARS: &[&str] = &[
    "GEOSHORT_PROJECT",
    "GEOSHORT_STACK",
    "GEOSHORT_LOCATIONS",
    "GEOSHORT_NOTIFY_EMAILS",
    "GEOSHORT_LOG_FORMAT",
    "PORT",
    "FUNCTIONS_CUSTOMHANDLER_PORT",
    "ENDPOINT",
    "MASTER_KEY",
    "DATABASE",
    "COLLECTION",
    "LOCATION",
];

fn clear_env() {
    for name in ENV_VARS {
        std::env::remove_var(name);
    }
}

#[test]
fn test_config_file_exists() {
    let config_path = std::path::Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_manifest_profiles() {
    let manifest: toml::Table = std::fs::read_to_string("Cargo.toml")
        .unwrap()
        .parse()
        .unwrap();
    let profiles: Vec<&str> = manifest["profile"]
        .as_table()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(profiles, ["dev", "release"]);
}

#[test]
fn test_config_toml_parses() {
    let config = Config::from_file(std::path::Path::new("config.toml"))
        .expect("config.toml should parse");
    config.validate().expect("config.toml should be valid");

    assert_eq!(config.deployment.locations.as_deref(), Some("westus,eastus"));
    assert_eq!(config.deployment.regions().unwrap().primary(), "westus");
    assert_eq!(config.service.bind_address, SocketAddr::from(([0, 0, 0, 0], 80)));
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[deployment]
locations = "northeurope,westeurope"
notify_emails = ["ops@example.com"]

[service]
max_retries = 5
"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.deployment.project, "geoshort");
    assert_eq!(config.deployment.regions().unwrap().primary(), "northeurope");
    assert_eq!(config.deployment.notify_emails, ["ops@example.com"]);
    assert_eq!(config.service.max_retries, 5);
    assert_eq!(config.service.request_timeout_secs, 10);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_logging_section_applies() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[logging]\nlevel = \"trace\"\nformat = \"json\"\n").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.logging.filter_directive(false), "geoshort=trace,warn");
}

#[test]
fn test_invalid_file_values_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[deployment]\nlocations = \"westus,westus\"\n").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("GEOSHORT_STACK", "prod");
    std::env::set_var("GEOSHORT_LOCATIONS", "eastus,westus,southeastasia");
    std::env::set_var("GEOSHORT_NOTIFY_EMAILS", "a@example.com, b@example.com");
    std::env::set_var("FUNCTIONS_CUSTOMHANDLER_PORT", "7071");
    std::env::set_var("PORT", "8080");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.deployment.stack, "prod");
    assert_eq!(config.deployment.regions().unwrap().len(), 3);
    assert_eq!(
        config.deployment.notify_emails,
        ["a@example.com", "b@example.com"]
    );
    // the function host port wins over PORT
    assert_eq!(config.service.bind_address.port(), 7071);
}

#[test]
#[serial]
fn test_from_env_requires_locations_to_plan() {
    clear_env();

    let config = Config::from_env().unwrap();

    assert!(config.deployment.locations.is_none());
    // serving does not need a region list
    assert!(config.validate().is_ok());
    let err = config.deployment.regions().unwrap_err();
    assert!(err.to_string().contains("GEOSHORT_LOCATIONS"));
    assert!(geoshort::deploy::declare(&config.deployment).is_err());
}

#[test]
#[serial]
fn test_from_env_bad_port() {
    clear_env();
    std::env::set_var("PORT", "eighty");

    let result = Config::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cosmos_settings_from_env() {
    clear_env();
    assert!(CosmosSettings::from_env().unwrap().is_none());

    std::env::set_var("ENDPOINT", "https://cosmos-aci.documents.azure.com:443/");
    std::env::set_var("MASTER_KEY", "c2VjcmV0");
    std::env::set_var("DATABASE", "aci-db");
    std::env::set_var("COLLECTION", "aci-items");
    std::env::set_var("LOCATION", "eastus");

    let settings = CosmosSettings::from_env().unwrap().unwrap();
    assert_eq!(settings.database, "aci-db");
    assert_eq!(settings.location.as_deref(), Some("eastus"));
    assert!(!format!("{settings:?}").contains("c2VjcmV0"));

    std::env::remove_var("COLLECTION");
    assert!(CosmosSettings::from_env().is_err());

    clear_env();
}
