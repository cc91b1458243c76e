use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blog")]
#[command(about = "Runs the blog service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the blog over HTTP (default)
    Serve,
    /// Drop every table and apply the migrations again
    InitDb,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".blog")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct App {
    database: String,
    port: u16,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub turso_url: Option<String>,
    #[serde(default)]
    pub turso_auth_token: Option<String>,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_seconds: u64,
}

/// Sessions may last at most ten years.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

fn default_session_ttl() -> i64 {
    24 * 7
}

fn default_sync_interval() -> u64 {
    60
}

impl Default for App {
    fn default() -> Self {
        App {
            database: "blog.sqlite".to_string(),
            port: 5000,
            session_ttl_hours: default_session_ttl(),
            turso_url: None,
            turso_auth_token: None,
            sync_interval_seconds: default_sync_interval(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            anyhow::bail!(
                "app.session_ttl_hours must be between 1 and {}, got {}",
                MAX_SESSION_TTL_HOURS,
                self.session_ttl_hours
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        config.app.validate()?;
        Ok(config)
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!(var = var_name, "environment variable not found");
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_keys() {
        let cfg = Config::from_yaml("app:\n  database: test.sqlite\n  port: 8080\n").unwrap();
        assert_eq!(cfg.app.get_db(), "test.sqlite");
        assert_eq!(cfg.app.get_port(), 8080);
        assert_eq!(cfg.app.session_ttl_hours, 168);
        assert_eq!(cfg.app.sync_interval_seconds, 60);
        assert!(cfg.app.turso_url.is_none());
    }

    #[test]
    fn substitutes_default_when_variable_is_unset() {
        let yaml = "app:\n  database: ${BLOG_TEST_UNSET_DB:-fallback.sqlite}\n  port: 5000\n";
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.app.get_db(), "fallback.sqlite");
    }

    #[test]
    fn substitutes_variable_from_environment() {
        // SAFETY: the variable name is unique to this test.
        unsafe { env::set_var("BLOG_TEST_PORT", "7070") };
        let cfg = Config::from_yaml("app:\n  database: a.sqlite\n  port: ${BLOG_TEST_PORT}\n").unwrap();
        assert_eq!(cfg.app.get_port(), 7070);
    }

    #[test]
    fn rejects_out_of_range_session_ttl() {
        for ttl in ["0", "-5", "9223372036854775807"] {
            let yaml = format!("app:\n  database: a.sqlite\n  port: 5000\n  session_ttl_hours: {ttl}\n");
            let err = Config::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("session_ttl_hours"), "{err}");
        }

        let yaml = format!("app:\n  database: a.sqlite\n  port: 5000\n  session_ttl_hours: {MAX_SESSION_TTL_HOURS}\n");
        assert!(Config::from_yaml(&yaml).is_ok());
    }

    #[test]
    fn parses_subcommand() {
        let cli = Cli::parse_from(["blog", "--config", "/tmp/c.yaml", "init-db"]);
        assert_eq!(cli.config_path.as_deref(), Some("/tmp/c.yaml"));
        assert_eq!(cli.command, Some(Command::InitDb));

        let cli = Cli::parse_from(["blog"]);
        assert_eq!(cli.command, None);
    }
}
