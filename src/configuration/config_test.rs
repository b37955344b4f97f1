use std::fs;

use anyhow::Result;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

#[test]
fn it_serializes_to_valid_toml() {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>();
    assert!(doc.is_ok());

    assert!(res.contains("api-url = \"http://localhost:32122\""));
    assert!(res.contains("health-check-timeout = 1000"));
    assert!(res.contains("request-timeout = 310000"));
    assert!(res.contains("# model = \"\""));
    assert!(res.contains("# auth-file = \"\""));
    assert!(!res.contains("config-file"));
}

#[test]
fn it_documents_every_key_with_its_help() {
    let res = Config::serialize_default(cli::build());

    assert!(res.starts_with("# Problem bank API URL."));
    assert!(!res.contains("[default:"));
}

async fn load_with(toml: &str, args: Vec<&str>) -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, toml)?;

    let mut argv = vec!["probank", "-c", config_path.to_str().unwrap_or_default()];
    argv.extend(args);
    argv.push("whoami");

    let matches = cli::build().try_get_matches_from(argv)?;
    return Config::load(cli::build(), vec![&matches]).await;
}

// Config is process wide, so every load scenario runs in this one test.
#[tokio::test]
async fn it_loads_config_in_order_of_precedence() -> Result<()> {
    load_with("", vec![]).await?;
    assert_eq!(Config::get(ConfigKey::RequestTimeout), "310000");
    assert_eq!(Config::get(ConfigKey::Model), "");

    load_with(
        "api-url = \"http://bank.internal\"\nmodel = \"glm-4\"\nrequest-timeout = 5000\n",
        vec![],
    )
    .await?;
    assert_eq!(Config::get(ConfigKey::ApiURL), "http://bank.internal");
    assert_eq!(Config::get(ConfigKey::Model), "glm-4");
    assert_eq!(Config::get(ConfigKey::RequestTimeout), "5000");
    assert_eq!(Config::get(ConfigKey::HealthCheckTimeout), "1000");

    load_with(
        "api-url = \"http://bank.internal\"\n",
        vec!["--api-url", "http://override:8080"],
    )
    .await?;
    assert_eq!(Config::get(ConfigKey::ApiURL), "http://override:8080");

    assert!(load_with("request-timeout = -1\n", vec![]).await.is_err());
    assert!(load_with("model = true\n", vec![]).await.is_err());
    assert!(load_with("health-check-timeout = \"soon\"\n", vec![]).await.is_err());
    assert!(load_with("not valid toml", vec![]).await.is_err());

    return Ok(());
}
