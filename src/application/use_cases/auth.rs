use anyhow::{Context, Result};

use crate::api_call::handle_api_call;
use crate::api_client::{Organization, SocketSdk};
use crate::context::CommandContext;
use crate::errors::CliError;

pub struct LoginRequest {
    pub api_key: String,
    pub api_base_url: Option<String>,
    pub api_proxy: Option<String>,
}

pub struct LoginOutcome {
    pub organizations: Vec<Organization>,
    pub enforced_orgs: Vec<String>,
}

pub struct LoginUseCase;

impl LoginUseCase {
    /// Verify the key, pick enforced organizations and persist the result
    pub async fn execute(ctx: &mut CommandContext, request: LoginRequest) -> Result<LoginOutcome> {
        let base_url = request
            .api_base_url
            .clone()
            .unwrap_or_else(|| ctx.api_base_url());
        let proxy = request.api_proxy.clone().or_else(|| ctx.api_proxy());
        let sdk = SocketSdk::new(&base_url, request.api_key.clone(), proxy.as_deref())?;

        let progress = ctx.progress("Verifying API key...");
        let outcome =
            handle_api_call(sdk.get_organizations(), &progress, "verifying API key").await;

        let organizations = match outcome.into_result() {
            Ok(response) => response.into_sorted(),
            Err(e) => {
                tracing::debug!("API key verification failed: {}", e);
                return Err(CliError::auth("Invalid API key").into());
            }
        };
        progress.succeed("API key verified");

        let enforced_orgs = if organizations.is_empty() {
            Vec::new()
        } else {
            let names: Vec<String> = organizations.iter().map(|o| o.name.clone()).collect();
            let selected = ctx
                .prompter
                .multi_select(
                    "Which organizations' policies should Socket enforce system-wide?",
                    &names,
                )
                .context("Failed to read organization selection")?;
            selected
                .into_iter()
                .filter_map(|i| organizations.get(i).map(|o| o.id.clone()))
                .collect()
        };

        ctx.store_login(
            &request.api_key,
            &enforced_orgs,
            request.api_base_url.as_deref(),
            request.api_proxy.as_deref(),
        )?;

        Ok(LoginOutcome {
            organizations,
            enforced_orgs,
        })
    }
}

pub struct LogoutUseCase;

impl LogoutUseCase {
    pub fn execute(ctx: &mut CommandContext) -> Result<()> {
        ctx.clear_login()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SettingsKey, SettingsStore};
    use crate::testing::{FakePrompter, context_with_prompter};
    use serde_json::json;

    const TWO_ORGS: &str = r#"{"organizations":{
        "o2":{"id":"o2","name":"Zeta","plan":"free"},
        "o1":{"id":"o1","name":"Acme","plan":"team"}}}"#;

    fn request(server: &mockito::Server) -> LoginRequest {
        LoginRequest {
            api_key: "sk-test".into(),
            api_base_url: Some(server.url()),
            api_proxy: None,
        }
    }

    #[tokio::test]
    async fn test_login_offers_org_names_and_stores_selection() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/organizations")
            .with_status(200)
            .with_body(TWO_ORGS)
            .create_async()
            .await;

        let prompter = FakePrompter {
            selection: vec![1],
            ..Default::default()
        };
        let log = prompter.log.clone();
        let mut ctx = context_with_prompter(prompter);

        let outcome = LoginUseCase::execute(&mut ctx, request(&server)).await?;

        assert_eq!(log.borrow().offered_items, vec!["Acme", "Zeta"]);
        assert_eq!(outcome.enforced_orgs, vec!["o2"]);
        assert_eq!(ctx.api_key(), Some("sk-test".into()));
        assert_eq!(ctx.enforced_orgs(), vec!["o2"]);
        assert_eq!(
            ctx.settings.get_string(SettingsKey::ApiBaseUrl),
            Some(server.url())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_login_with_no_selection_stores_empty_enforced_orgs() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/organizations")
            .with_status(200)
            .with_body(TWO_ORGS)
            .create_async()
            .await;

        let mut ctx = context_with_prompter(FakePrompter::default());
        let outcome = LoginUseCase::execute(&mut ctx, request(&server)).await?;

        assert_eq!(outcome.organizations.len(), 2);
        assert!(outcome.enforced_orgs.is_empty());
        assert_eq!(ctx.api_key(), Some("sk-test".into()));
        assert!(ctx.enforced_orgs().is_empty());
        assert_eq!(SettingsKey::EnforcedOrg.as_str(), "enforcedOrg");
        assert_eq!(ctx.settings.get(SettingsKey::EnforcedOrg), Some(json!([])));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_key_is_auth_error_and_nothing_stored() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/organizations")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid token"}}"#)
            .create_async()
            .await;

        let mut ctx = context_with_prompter(FakePrompter::default());
        let err = match LoginUseCase::execute(&mut ctx, request(&server)).await {
            Ok(_) => panic!("login should fail"),
            Err(e) => e,
        };

        let cli_err = err.downcast_ref::<CliError>().expect("typed error");
        assert!(cli_err.is_auth());
        assert_eq!(cli_err.to_string(), "Invalid API key");
        assert_eq!(ctx.api_key(), None);
        Ok(())
    }

    #[test]
    fn test_logout_clears_credentials() -> Result<()> {
        let mut ctx = context_with_prompter(FakePrompter::default());
        ctx.store_login("sk-test", &["o1".to_string()], None, None)?;

        LogoutUseCase::execute(&mut ctx)?;
        assert_eq!(ctx.api_key(), None);
        assert!(ctx.enforced_orgs().is_empty());
        Ok(())
    }
}
