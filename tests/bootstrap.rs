//! End-to-end startup scenarios against a bound server.

use std::process::Command;

use axum::{routing::get, Router};
use portal_server::config::{Environment, PLACEHOLDER_PUBLISHABLE_KEY};
use portal_server::features::{Feature, FeatureContext, FeatureError, FeatureRegistry};
use portal_server::lifecycle::startup::RegistrationOutcome;
use portal_server::security::secret::DEVELOPMENT_SECRET;
use portal_server::security::SecretError;
use portal_server::{App, AppConfig, StartupError};
use serde_json::{json, Value};

mod common;

/// Stands in for a chat module that blows up while loading.
struct BrokenChat;

impl Feature for BrokenChat {
    fn name(&self) -> &'static str {
        "chat"
    }

    fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
        panic!("chat transport failed to load");
    }
}

/// Its first route is new; its second collides with a core page.
struct HalfBuilt;

impl Feature for HalfBuilt {
    fn name(&self) -> &'static str {
        "half-built"
    }

    fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
        Ok(Router::new()
            .route("/half/first", get(|| async { "first" }))
            .route("/payments/example", get(|| async { "hijacked" })))
    }
}

fn dev_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = Environment::Development;
    config.auth.secret = Some(DEVELOPMENT_SECRET.into());
    config
}

#[tokio::test]
async fn test_production_default_secret_aborts_before_bind() {
    let mut config = AppConfig::default();
    config.environment = Environment::Production;
    config.auth.secret = Some(DEVELOPMENT_SECRET.into());

    let result = App::builder(config).build();
    assert!(matches!(
        result,
        Err(StartupError::InsecureSecret(SecretError::InsecureDefault))
    ));
}

#[test]
fn test_binary_exits_non_zero_on_insecure_production_secret() {
    let output = Command::new(env!("CARGO_BIN_EXE_portal-server"))
        .current_dir(std::env::temp_dir())
        .env("APP_ENV", "production")
        .env("JWT_SECRET_KEY", "change-me")
        .env("BIND_ADDRESS", "127.0.0.1:0")
        .env_remove("PORTAL_CONFIG")
        .output()
        .expect("failed to run portal-server");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Listening for connections"));
}

#[tokio::test]
async fn test_development_default_secret_serves_index() {
    let server = common::spawn_server(dev_config(), FeatureRegistry::builtin()).await;
    let client = common::client();

    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let html = res.text().await.unwrap();
    assert!(html.contains("Welcome to the portal"));
    assert!(server.report.attempts.iter().all(|a| a.outcome == RegistrationOutcome::Registered));
}

#[tokio::test]
async fn test_failing_chat_leaves_other_features_reachable() {
    let registry = FeatureRegistry::builtin().replace(BrokenChat);
    let server = common::spawn_server(dev_config(), registry).await;
    let client = common::client();

    let chat = server.report.attempts.iter().find(|a| a.feature == "chat").unwrap();
    assert_eq!(chat.outcome, RegistrationOutcome::Failed);

    assert_eq!(client.get(server.url("/")).send().await.unwrap().status(), 200);
    assert_eq!(
        client.get(server.url("/chat/rooms/general/messages")).send().await.unwrap().status(),
        404
    );

    let res = client
        .post(server.url("/orgs"))
        .json(&json!({ "name": "Acme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = client
        .post(server.url("/review/items"))
        .json(&json!({ "content": "draft", "submitted_by": "bot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    assert_eq!(client.get(server.url("/payments/config")).send().await.unwrap().status(), 200);
    assert_eq!(
        client.get(server.url("/observability/metrics")).send().await.unwrap().status(),
        200
    );

    let res = client.get(server.url("/auth/session")).send().await.unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_failed_feature_leaves_no_partial_routes() {
    let registry = FeatureRegistry::builtin().with(HalfBuilt);
    let server = common::spawn_server(dev_config(), registry).await;
    let client = common::client();

    let attempt = server.report.attempts.iter().find(|a| a.feature == "half-built").unwrap();
    assert_eq!(attempt.outcome, RegistrationOutcome::Failed);

    let res = client.get(server.url("/half/first")).send().await.unwrap();
    assert_eq!(res.status(), 404);

    let res = client.get(server.url("/payments/example")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let html = res.text().await.unwrap();
    assert!(html.contains(PLACEHOLDER_PUBLISHABLE_KEY));
    assert!(!html.contains("hijacked"));
}

#[tokio::test]
async fn test_payments_example_uses_placeholder_key() {
    let server = common::spawn_server(dev_config(), FeatureRegistry::builtin()).await;

    let res = common::client()
        .get(server.url("/payments/example"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.text().await.unwrap().contains(PLACEHOLDER_PUBLISHABLE_KEY));
}

#[tokio::test]
async fn test_translation_available_without_features() {
    let mut config = dev_config();
    config.i18n.locale = Some("es_ES.UTF-8".into());
    let server = common::spawn_server(config, FeatureRegistry::new()).await;
    let client = common::client();

    let index = client.get(server.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(index.contains("Bienvenido al portal"));

    let payments = client
        .get(server.url("/payments/example"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(payments.contains("Clave publicable"));
}

#[tokio::test]
async fn test_admin_reports_registrations() {
    let mut config = dev_config();
    config.admin.api_key = Some("admin-key".into());
    config.features.disabled = vec!["review".into()];
    let server = common::spawn_server(config, FeatureRegistry::builtin()).await;
    let client = common::client();

    let res = client.get(server.url("/admin/features")).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let features: Value = client
        .get(server.url("/admin/features"))
        .bearer_auth("admin-key")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let review = features
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["feature"] == "review")
        .unwrap();
    assert_eq!(review["outcome"], "disabled");

    let status: Value = client
        .get(server.url("/admin/status"))
        .bearer_auth("admin-key")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["secret"]["status"], "insecure");
    assert_eq!(status["environment"], "development");
}

#[tokio::test]
async fn test_dev_token_round_trip() {
    let server = common::spawn_server(dev_config(), FeatureRegistry::builtin()).await;
    let client = common::client();

    let issued: Value = client
        .post(server.url("/auth/token"))
        .json(&json!({ "subject": "alice" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = issued["token"].as_str().unwrap();

    let session: Value = client
        .get(server.url("/auth/session"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["subject"], "alice");
}

#[tokio::test]
async fn test_production_with_strong_secret_serves() {
    let mut config = AppConfig::default();
    config.environment = Environment::Production;
    config.auth.secret = Some(common::STRONG_SECRET.into());
    let server = common::spawn_server(config, FeatureRegistry::builtin()).await;
    let client = common::client();

    assert_eq!(client.get(server.url("/")).send().await.unwrap().status(), 200);
    // Token issuance is development-only.
    let res = client
        .post(server.url("/auth/token"))
        .json(&json!({ "subject": "alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
