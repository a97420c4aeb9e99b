pub mod auth;
pub mod dashboard;
pub mod meals;
pub mod notifications;
pub mod products;
pub mod reports;
pub mod servings;
pub mod users;
pub mod watch;

use std::sync::Arc;

use crate::cli::config::get_config_dir;
use crate::cli::utils::confirm_on_terminal;
use crate::config::config;
use crate::context::AppContext;
use crate::screens::Confirm;
use crate::session::{FileCredentialStore, Principal};

/// Build the client context over the credential file in the config directory
pub(crate) fn open_context() -> anyhow::Result<AppContext> {
    let dir = get_config_dir()?;
    let store = Arc::new(FileCredentialStore::in_dir(&dir));
    Ok(AppContext::new(config().clone(), store)?)
}

/// Restore the persisted session or fail with a sign-in hint
pub(crate) async fn require_session(ctx: &AppContext) -> anyhow::Result<Principal> {
    ctx.session()
        .restore()
        .await
        .ok_or_else(|| anyhow::anyhow!("Not signed in. Use 'kitchen auth login <username>' first"))
}

/// Delete confirmation: `--yes` skips the prompt
pub(crate) struct CliConfirm {
    pub assume_yes: bool,
}

impl Confirm for CliConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.assume_yes || confirm_on_terminal(prompt)
    }
}
