mod common;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use common::{MockBackend, PASSWORD, USERNAME};
use kitchen_client::channel::ConnectionState;
use kitchen_client::models::RoleTag;
use kitchen_client::session::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
use kitchen_client::AppContext;

#[tokio::test]
async fn login_persists_credential_and_logout_removes_it() -> Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let ctx = AppContext::new(backend.config(), store.clone())?;

    let principal = ctx.login(USERNAME, PASSWORD).await?;
    assert_eq!(principal.role, RoleTag::Admin);
    assert!(store.path().exists());
    assert!(ctx.session().is_authenticated().await);

    backend.wait_for_sockets(1, Duration::from_secs(5)).await?;
    assert_eq!(backend.ws_tokens.lock().unwrap().as_slice(), &[backend.token.clone()]);

    ctx.logout().await;
    assert_eq!(backend.hits("logout"), 1);
    assert!(!store.path().exists());
    assert!(!ctx.session().is_authenticated().await);
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    assert!(ctx.cache().is_empty().await);
    backend.wait_for_sockets(0, Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn wrong_password_shows_server_detail() -> Result<()> {
    let backend = MockBackend::start().await?;
    let store = Arc::new(MemoryCredentialStore::new());
    let ctx = AppContext::new(backend.config(), store.clone())?;

    let notice = ctx.login(USERNAME, "wrong").await.unwrap_err();
    assert_eq!(notice.description, "Incorrect username or password");
    assert!(store.load()?.is_none());
    assert!(!ctx.session().is_loading());
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    Ok(())
}

#[tokio::test]
async fn restore_with_persisted_credential_starts_channel() -> Result<()> {
    let backend = MockBackend::start().await?;
    let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
        backend.token.clone(),
        "bearer",
    )));
    let ctx = AppContext::new(backend.config(), store)?;

    let principal = ctx.bootstrap().await.expect("session restored");
    assert_eq!(principal.username, USERNAME);
    backend.wait_for_sockets(1, Duration::from_secs(5)).await?;

    ctx.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn expired_credential_is_dropped_silently() -> Result<()> {
    let backend = MockBackend::start().await?;
    let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
        common::token_expiring_in(-60),
        "bearer",
    )));
    let ctx = AppContext::new(backend.config(), store.clone())?;

    assert!(ctx.bootstrap().await.is_none());
    assert_eq!(backend.hits("me"), 0);
    assert!(store.load()?.is_none());
    assert!(!ctx.session().is_loading());
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    Ok(())
}

#[tokio::test]
async fn rejected_credential_mid_session_signs_out() -> Result<()> {
    let backend = MockBackend::start().await?;
    let store = Arc::new(MemoryCredentialStore::new());
    let ctx = AppContext::new(backend.config(), store.clone())?;
    ctx.login(USERNAME, PASSWORD).await?;
    backend.wait_for_sockets(1, Duration::from_secs(5)).await?;

    backend.revoked.store(true, std::sync::atomic::Ordering::SeqCst);
    let screen = kitchen_client::screens::ProductsScreen::new(&ctx);
    let notice = screen.list(&Default::default()).await.unwrap_err();

    assert_eq!(notice.code.as_deref(), Some("AUTH_ERROR"));
    assert!(!ctx.session().is_authenticated().await);
    assert!(store.load()?.is_none());
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    backend.wait_for_sockets(0, Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn failed_login_over_live_session_tears_down_channel() -> Result<()> {
    let backend = MockBackend::start().await?;
    let store = Arc::new(MemoryCredentialStore::new());
    let ctx = AppContext::new(backend.config(), store.clone())?;
    ctx.login(USERNAME, PASSWORD).await?;
    backend.wait_for_sockets(1, Duration::from_secs(5)).await?;
    kitchen_client::screens::ProductsScreen::new(&ctx).list(&Default::default()).await?;

    let notice = ctx.login(USERNAME, "wrong").await.unwrap_err();
    assert_eq!(notice.description, "Incorrect username or password");
    assert!(!ctx.session().is_authenticated().await);
    assert!(!ctx.session().tokens().is_present().await);
    assert!(store.load()?.is_none());
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    assert!(ctx.cache().is_empty().await);
    backend.wait_for_sockets(0, Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn logout_clears_locally_when_server_fails() -> Result<()> {
    let backend = MockBackend::start().await?;
    let dir = tempfile::tempdir()?;
    let store = Arc::new(FileCredentialStore::in_dir(dir.path()));
    let ctx = AppContext::new(backend.config(), store.clone())?;
    ctx.login(USERNAME, PASSWORD).await?;
    backend.wait_for_sockets(1, Duration::from_secs(5)).await?;

    backend.fail_logout.store(true, std::sync::atomic::Ordering::SeqCst);
    ctx.logout().await;

    assert_eq!(backend.hits("logout"), 1);
    assert!(!store.path().exists());
    assert!(ctx.session().principal().await.is_none());
    assert!(!ctx.session().tokens().is_present().await);
    assert_eq!(ctx.channel().state(), ConnectionState::Idle);
    backend.wait_for_sockets(0, Duration::from_secs(5)).await?;
    Ok(())
}
