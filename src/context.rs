//! CLI Context - services handed to every subcommand
//!
//! Holds the environment overrides captured at startup, the settings store,
//! the prompter and the output writer. Subcommands receive it explicitly
//! instead of reaching for ambient state, which keeps them testable with
//! in-memory fakes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

use crate::api_client::SocketSdk;
use crate::constants::{
    DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_API_KEY, ENV_API_PROXY, ENV_SHADOW_DIR,
};
use crate::errors::CliError;
use crate::output::{OutputWriter, ProgressIndicator, Prompter, TerminalPrompter};
use crate::settings::{FileSettings, SettingsKey, SettingsStore};

/// Environment overrides, read once at startup
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub api_proxy: Option<String>,
    pub shadow_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Capture overrides from the process environment; empty values are ignored
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: var(ENV_API_KEY),
            api_base_url: var(ENV_API_BASE_URL),
            api_proxy: var(ENV_API_PROXY),
            shadow_dir: var(ENV_SHADOW_DIR).map(PathBuf::from),
        }
    }
}

/// Context shared by all subcommands of one invocation
pub struct CommandContext {
    /// Environment overrides
    pub config: CliConfig,

    /// Persisted settings (credentials, enforced organizations)
    pub settings: Box<dyn SettingsStore>,

    /// Interactive input
    pub prompter: Box<dyn Prompter>,

    /// Output writer
    pub output: OutputWriter,
}

impl CommandContext {
    pub fn new(
        config: CliConfig,
        settings: Box<dyn SettingsStore>,
        prompter: Box<dyn Prompter>,
        output: OutputWriter,
    ) -> Self {
        Self {
            config,
            settings,
            prompter,
            output,
        }
    }

    /// Context backed by the real environment, settings file and terminal
    pub fn from_environment() -> Result<Self> {
        let settings = FileSettings::open_default()?;
        tracing::debug!("Using settings at {:?}", settings.path());

        Ok(Self::new(
            CliConfig::from_env(),
            Box::new(settings),
            Box::new(TerminalPrompter),
            OutputWriter::new(false),
        ))
    }

    /// API key: environment first, then stored settings
    pub fn api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| self.settings.get_string(SettingsKey::ApiKey))
    }

    /// API base URL: environment, stored settings, then the default
    pub fn api_base_url(&self) -> String {
        self.config
            .api_base_url
            .clone()
            .or_else(|| self.settings.get_string(SettingsKey::ApiBaseUrl))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    /// Proxy for API calls: environment, then stored settings
    pub fn api_proxy(&self) -> Option<String> {
        self.config
            .api_proxy
            .clone()
            .or_else(|| self.settings.get_string(SettingsKey::ApiProxy))
    }

    /// Build an API client from the resolved credentials
    ///
    /// Fails with an authentication error when no API key is available.
    pub fn setup_sdk(&self) -> Result<SocketSdk> {
        let api_key = self.api_key().ok_or_else(CliError::unauthenticated)?;
        SocketSdk::new(&self.api_base_url(), api_key, self.api_proxy().as_deref())
    }

    /// Organization ids whose policies are enforced
    pub fn enforced_orgs(&self) -> Vec<String> {
        self.settings.get_strings(SettingsKey::EnforcedOrg)
    }

    /// Store the outcome of a successful login
    pub fn store_login(
        &mut self,
        api_key: &str,
        enforced_orgs: &[String],
        api_base_url: Option<&str>,
        api_proxy: Option<&str>,
    ) -> Result<()> {
        self.settings
            .set(SettingsKey::ApiKey, Some(json!(api_key)))
            .context("Failed to store API key")?;
        self.settings
            .set(SettingsKey::EnforcedOrg, Some(json!(enforced_orgs)))?;
        self.settings
            .set(SettingsKey::ApiBaseUrl, api_base_url.map(|u| json!(u)))?;
        self.settings
            .set(SettingsKey::ApiProxy, api_proxy.map(|p| json!(p)))?;
        Ok(())
    }

    /// Forget everything stored by `login`
    pub fn clear_login(&mut self) -> Result<()> {
        for key in [
            SettingsKey::ApiKey,
            SettingsKey::EnforcedOrg,
            SettingsKey::ApiBaseUrl,
            SettingsKey::ApiProxy,
        ] {
            self.settings
                .set(key, None)
                .context("Failed to clear stored credentials")?;
        }
        Ok(())
    }

    /// Start a spinner (hidden in quiet mode)
    pub fn progress(&self, message: &str) -> ProgressIndicator {
        if self.output.is_quiet() {
            ProgressIndicator::hidden()
        } else {
            ProgressIndicator::spinner(message)
        }
    }

    /// Directory holding the shadow package-manager executables
    pub fn shadow_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.config.shadow_dir {
            return Ok(dir.clone());
        }
        let exe = std::env::current_exe().context("Failed to locate the socket executable")?;
        exe.parent()
            .map(|p| p.to_path_buf())
            .context("The socket executable has no parent directory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;

    #[test]
    fn test_env_key_beats_stored_key() -> Result<()> {
        let mut ctx = test_context();
        ctx.settings
            .set(SettingsKey::ApiKey, Some(json!("stored")))?;
        assert_eq!(ctx.api_key(), Some("stored".into()));

        ctx.config.api_key = Some("from-env".into());
        assert_eq!(ctx.api_key(), Some("from-env".into()));
        Ok(())
    }

    #[test]
    fn test_base_url_resolution() -> Result<()> {
        let mut ctx = test_context();
        assert_eq!(ctx.api_base_url(), DEFAULT_API_BASE_URL);

        ctx.settings
            .set(SettingsKey::ApiBaseUrl, Some(json!("http://stored/")))?;
        assert_eq!(ctx.api_base_url(), "http://stored/");

        ctx.config.api_base_url = Some("http://env/".into());
        assert_eq!(ctx.api_base_url(), "http://env/");
        Ok(())
    }

    #[test]
    fn test_setup_sdk_without_key_is_auth_error() {
        let ctx = test_context();
        let err = ctx.setup_sdk().err().expect("expected an error");
        assert!(err.downcast_ref::<CliError>().is_some_and(CliError::is_auth));
    }

    #[test]
    fn test_store_and_clear_login() -> Result<()> {
        let mut ctx = test_context();
        ctx.store_login("sk-test", &["org-1".to_string()], Some("http://x/"), None)?;
        assert_eq!(ctx.api_key(), Some("sk-test".into()));
        assert_eq!(ctx.enforced_orgs(), vec!["org-1"]);
        assert_eq!(ctx.api_base_url(), "http://x/");

        ctx.clear_login()?;
        assert_eq!(ctx.api_key(), None);
        assert!(ctx.enforced_orgs().is_empty());
        assert_eq!(ctx.api_base_url(), DEFAULT_API_BASE_URL);
        Ok(())
    }

    #[test]
    fn test_shadow_dir_override() -> Result<()> {
        let mut ctx = test_context();
        ctx.config.shadow_dir = Some(PathBuf::from("/opt/socket/shadow"));
        assert_eq!(ctx.shadow_dir()?, PathBuf::from("/opt/socket/shadow"));
        Ok(())
    }
}
