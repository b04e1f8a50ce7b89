use anyhow::{Context, Result};
use clap::Args;
use std::env;
use std::path::PathBuf;

const DEFAULT_URL: &str = "http://localhost:9090";
const DEFAULT_DATA_DIR: &str = "./.objbrowser";
const DEFAULT_DOWNLOAD_DIR: &str = ".";

/// Connection and storage settings of the object browser.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub base_url: String,
    pub session_token: Option<String>,
    pub anonymous: bool,
    pub data_dir: PathBuf,
    pub download_dir: PathBuf,
}

/// Global flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Console base URL (overrides OBJBROWSER_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Session token sent as the `token` cookie (overrides OBJBROWSER_TOKEN)
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Browse as an anonymous user (overrides OBJBROWSER_ANONYMOUS)
    #[arg(long, global = true)]
    pub anonymous: bool,

    /// Directory for local state such as license consent (overrides OBJBROWSER_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Where downloaded files are written (overrides OBJBROWSER_DOWNLOAD_DIR)
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("parsing {} value `{}`", name, other),
    }
}

impl ConsoleConfig {
    /// Merge CLI flags over the process environment.
    pub fn from_env_and_args(args: &ConnectionArgs) -> Result<Self> {
        Self::merge(args, |key| env::var(key).ok())
    }

    /// Merge CLI flags over variables looked up through `lookup`.
    pub fn merge<F>(args: &ConnectionArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Environment fallback ---
        let env_url = lookup("OBJBROWSER_URL").unwrap_or_else(|| DEFAULT_URL.into());
        let env_token = lookup("OBJBROWSER_TOKEN").filter(|t| !t.is_empty());
        let env_anonymous = match lookup("OBJBROWSER_ANONYMOUS") {
            Some(value) => parse_flag("OBJBROWSER_ANONYMOUS", &value)
                .context("reading OBJBROWSER_ANONYMOUS")?,
            None => false,
        };
        let env_data_dir = lookup("OBJBROWSER_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let env_download_dir =
            lookup("OBJBROWSER_DOWNLOAD_DIR").unwrap_or_else(|| DEFAULT_DOWNLOAD_DIR.into());

        // --- Merge ---
        let base_url = args.url.clone().unwrap_or(env_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            anyhow::bail!("console URL `{}` must start with http:// or https://", base_url);
        }

        Ok(Self {
            base_url,
            session_token: args.token.clone().or(env_token),
            anonymous: args.anonymous || env_anonymous,
            data_dir: args.data_dir.clone().unwrap_or_else(|| env_data_dir.into()),
            download_dir: args
                .download_dir
                .clone()
                .unwrap_or_else(|| env_download_dir.into()),
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("objbrowser.db")
    }
}
