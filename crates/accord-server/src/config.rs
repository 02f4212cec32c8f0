//! Server configuration, loaded from `config.toml` and `ACCORD_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  /// Absolute prefix baked into every `_links` href.
  #[serde(default = "default_base_url")]
  pub base_url:          String,
  #[serde(default = "default_database_path")]
  pub database_path:     PathBuf,
  /// Overrides the store's default read timeout when set.
  pub read_timeout_secs: Option<u64>,
}

impl ServerConfig {
  pub fn read_timeout(&self) -> Option<Duration> {
    self.read_timeout_secs.map(Duration::from_secs)
  }
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  9292
}

fn default_base_url() -> String {
  "http://localhost:9292".to_string()
}

fn default_database_path() -> PathBuf {
  PathBuf::from("accord.sqlite3")
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn an_empty_source_yields_the_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9292);
    assert_eq!(cfg.base_url, "http://localhost:9292");
    assert_eq!(cfg.database_path, PathBuf::from("accord.sqlite3"));
    assert!(cfg.read_timeout().is_none());
  }

  #[test]
  fn explicit_values_override_the_defaults() {
    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from_str(
        r#"
          host = "0.0.0.0"
          port = 8080
          base_url = "https://broker.example"
          database_path = "/var/lib/accord/broker.sqlite3"
          read_timeout_secs = 5
        "#,
        config::FileFormat::Toml,
      ))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.base_url, "https://broker.example");
    assert_eq!(cfg.read_timeout(), Some(Duration::from_secs(5)));
  }
}
