//! Startup orchestration.
//!
//! # Responsibilities
//! - Enforce the signing secret policy before anything becomes reachable
//! - Register the core pages and the template context contributors
//! - Probe and register every optional feature in a fixed order
//! - Produce an immutable [`App`] plus a [`StartupReport`]
//!
//! # Design Decisions
//! - Exactly one error escapes: an insecure secret in production
//! - Each feature is isolated: errors and panics skip that feature only
//! - Registration is atomic per feature: a unit is merged into a clone of
//!   the router and committed only when the whole merge succeeded
//! - Core routes are registered before features, so a feature that collides
//!   with them is the one that gets skipped

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};

use crate::admin;
use crate::config::AppConfig;
use crate::features::{Feature, FeatureContext, FeatureError, FeatureRegistry};
use crate::http::pages::{self, PageState};
use crate::i18n::Localizer;
use crate::observability::metrics;
use crate::security::{JwtSecretValidator, SecretError, SecretValidator};
use crate::templates::{Renderer, TranslationContributor};

/// Fatal startup failure. The process must exit without binding.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("refusing to start in production: {0}")]
    InsecureSecret(#[source] SecretError),
}

/// Bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPhase {
    Uninitialized,
    RegisteringRoutes,
    Ready,
    Aborted,
}

/// Result of the secret check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SecretCheck {
    Configured,
    /// Insecure secret outside production; a warning was logged.
    Insecure,
    /// The validator failed outside production; ignored.
    CheckFailed(String),
    /// No validator configured.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationOutcome {
    Registered,
    /// Listed in `features.disabled`; never probed.
    Disabled,
    Failed,
}

impl RegistrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationOutcome::Registered => "registered",
            RegistrationOutcome::Disabled => "disabled",
            RegistrationOutcome::Failed => "failed",
        }
    }
}

/// Outcome of one feature registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationAttempt {
    pub feature: String,
    pub outcome: RegistrationOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RegistrationAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == RegistrationOutcome::Registered
    }
}

/// Everything the bootstrap decided, for logs and the admin API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupReport {
    pub environment: String,
    pub secret: SecretCheck,
    pub context_contributors: Vec<String>,
    pub attempts: Vec<RegistrationAttempt>,
}

impl StartupReport {
    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.attempts
            .iter()
            .filter(|a| a.succeeded())
            .map(|a| a.feature.as_str())
    }

    pub fn attempt(&self, feature: &str) -> Option<&RegistrationAttempt> {
        self.attempts.iter().find(|a| a.feature == feature)
    }
}

/// The composed application: routes, shared rendering context and report.
#[derive(Clone)]
pub struct App {
    router: Router,
    config: Arc<AppConfig>,
    renderer: Arc<Renderer>,
    report: Arc<StartupReport>,
}

impl App {
    pub fn builder(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn report(&self) -> &StartupReport {
        &self.report
    }

    /// The routing table without server middleware.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("environment", &self.config.environment)
            .field("report", &self.report)
            .finish()
    }
}

/// Builds an [`App`] from configuration and pluggable collaborators.
#[must_use = "builders do nothing unless you call .build()"]
pub struct AppBuilder {
    config: AppConfig,
    validator: Option<Box<dyn SecretValidator>>,
    localizer: Option<Arc<Localizer>>,
    registry: FeatureRegistry,
    metrics: Option<PrometheusHandle>,
}

impl AppBuilder {
    /// Defaults: JWT secret validator and localizer from `config`, all
    /// built-in features, no metrics recorder.
    pub fn new(config: AppConfig) -> Self {
        let validator = JwtSecretValidator::from_config(&config.auth);
        Self {
            config,
            validator: Some(Box::new(validator)),
            localizer: None,
            registry: FeatureRegistry::builtin(),
            metrics: None,
        }
    }

    pub fn secret_validator<V: SecretValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    pub fn without_secret_validator(mut self) -> Self {
        self.validator = None;
        self
    }

    pub fn localizer(mut self, localizer: Localizer) -> Self {
        self.localizer = Some(Arc::new(localizer));
        self
    }

    pub fn features(mut self, registry: FeatureRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }

    /// Run the bootstrap.
    ///
    /// # Errors
    /// Only [`StartupError::InsecureSecret`], in production. Feature failures
    /// are recorded in the report instead.
    pub fn build(self) -> Result<App, StartupError> {
        let AppBuilder {
            config,
            validator,
            localizer,
            registry,
            metrics: metrics_handle,
        } = self;

        tracing::info!(
            phase = ?BootstrapPhase::Uninitialized,
            environment = %config.environment,
            "Bootstrap starting"
        );

        // 1. Secret policy
        let secret = check_secret(validator.as_deref(), config.environment.is_production())
            .inspect_err(|e| {
                tracing::error!(phase = ?BootstrapPhase::Aborted, error = %e, "Bootstrap aborted");
            })?;

        tracing::info!(phase = ?BootstrapPhase::RegisteringRoutes, "Registering routes");

        // 2. Template context
        let localizer =
            localizer.unwrap_or_else(|| Arc::new(Localizer::from_config(&config.i18n)));
        tracing::debug!(locale = localizer.default_locale(), "Localizer ready");
        let renderer =
            Arc::new(Renderer::new().with_contributor(Arc::new(TranslationContributor::new(localizer))));
        let config = Arc::new(config);

        // 3. Core pages
        let page_state = PageState {
            config: config.clone(),
            renderer: renderer.clone(),
        };
        let mut router = Router::new()
            .route("/", get(pages::index))
            .route("/payments/example", get(pages::payments_example))
            .with_state(page_state);

        // 4. Features
        for name in config
            .features
            .disabled
            .iter()
            .filter(|d| !registry.names().iter().any(|n| n.eq_ignore_ascii_case(d)))
        {
            tracing::warn!(feature = %name, "Unknown feature in disabled list");
        }

        let ctx = FeatureContext {
            config: config.clone(),
            renderer: renderer.clone(),
            metrics: metrics_handle,
        };
        let attempts: Vec<_> = registry
            .iter()
            .map(|feature| attempt_registration(&mut router, feature, &ctx))
            .collect();

        let report = Arc::new(StartupReport {
            environment: config.environment.to_string(),
            secret,
            context_contributors: renderer
                .contributor_names()
                .into_iter()
                .map(String::from)
                .collect(),
            attempts,
        });

        // 5. Admin API
        if let Some(key) = config.admin.api_key.as_deref() {
            let admin_router = admin::setup_admin_router(key, report.clone());
            match try_merge(&router, admin_router) {
                Ok(merged) => router = merged,
                Err(e) => tracing::error!(error = %e, "Admin API not mounted"),
            }
        }

        tracing::info!(
            phase = ?BootstrapPhase::Ready,
            registered = ?report.registered().collect::<Vec<_>>(),
            "Bootstrap complete"
        );

        Ok(App {
            router,
            config,
            renderer,
            report,
        })
    }
}

/// Printed by a binary built without the `server` cargo feature.
pub const SERVER_DISABLED_MESSAGE: &str = "portal-server was built without the `server` feature. \
     Rebuild with `cargo build --features server` to run the web server.";

/// Build the application with the built-in collaborators.
pub fn initialize(
    config: AppConfig,
    metrics: Option<PrometheusHandle>,
) -> Result<App, StartupError> {
    AppBuilder::new(config).metrics(metrics).build()
}

fn check_secret(
    validator: Option<&dyn SecretValidator>,
    strict: bool,
) -> Result<SecretCheck, StartupError> {
    let Some(validator) = validator else {
        tracing::debug!("No secret validator configured");
        return Ok(SecretCheck::Skipped);
    };

    if strict {
        return match validator.ensure_secret_configured(true) {
            Ok(true) => Ok(SecretCheck::Configured),
            // A strict validator answering `false` is still insecure.
            Ok(false) => Err(StartupError::InsecureSecret(SecretError::InsecureDefault)),
            Err(e) => Err(StartupError::InsecureSecret(e)),
        };
    }

    match validator.ensure_secret_configured(false) {
        Ok(true) => Ok(SecretCheck::Configured),
        Ok(false) => {
            tracing::warn!(
                secret_status = "insecure",
                "JWT secret is using default value; set JWT_SECRET_KEY for production."
            );
            Ok(SecretCheck::Insecure)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Secret check failed outside production; ignoring");
            Ok(SecretCheck::CheckFailed(e.to_string()))
        }
    }
}

fn attempt_registration(
    router: &mut Router,
    feature: &dyn Feature,
    ctx: &FeatureContext,
) -> RegistrationAttempt {
    let name = feature.name();

    if ctx.config.features.is_disabled(name) {
        tracing::info!(feature = name, "Feature disabled by configuration");
        metrics::record_registration(name, RegistrationOutcome::Disabled.as_str());
        return RegistrationAttempt {
            feature: name.to_string(),
            outcome: RegistrationOutcome::Disabled,
            error: None,
        };
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| feature.routes(ctx)))
        .map_err(|payload| FeatureError::Panicked(panic_message(payload.as_ref())))
        .and_then(|unit| unit)
        .and_then(|unit| try_merge(router, unit));

    let attempt = match result {
        Ok(merged) => {
            *router = merged;
            tracing::info!(feature = name, "Feature registered");
            RegistrationAttempt {
                feature: name.to_string(),
                outcome: RegistrationOutcome::Registered,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(feature = name, error = %e, "Feature skipped");
            RegistrationAttempt {
                feature: name.to_string(),
                outcome: RegistrationOutcome::Failed,
                error: Some(e.to_string()),
            }
        }
    };
    metrics::record_registration(name, attempt.outcome.as_str());
    attempt
}

/// Merge `unit` into a copy of `router`. Overlapping routes make axum
/// panic; that panic is returned as an error and `router` is untouched.
fn try_merge(router: &Router, unit: Router) -> Result<Router, FeatureError> {
    let base = router.clone();
    panic::catch_unwind(AssertUnwindSafe(move || base.merge(unit)))
        .map_err(|payload| FeatureError::Panicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::features::FeatureRegistry;
    use crate::security::secret::DEVELOPMENT_SECRET;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    const STRONG: &str = "0123456789abcdef0123456789abcdef";

    fn config(env: Environment, secret: Option<&str>) -> AppConfig {
        let mut config = AppConfig::default();
        config.environment = env;
        config.auth.secret = secret.map(String::from);
        config
    }

    async fn status(app: &App, uri: &str) -> StatusCode {
        app.router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    struct Failing(&'static str);

    impl Feature for Failing {
        fn name(&self) -> &'static str {
            self.0
        }

        fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
            Err(FeatureError::Unavailable("module not installed".into()))
        }
    }

    struct Panicking(&'static str);

    impl Feature for Panicking {
        fn name(&self) -> &'static str {
            self.0
        }

        fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
            panic!("import blew up");
        }
    }

    /// Claims `/orgs` plus a path of its own.
    struct Colliding;

    impl Feature for Colliding {
        fn name(&self) -> &'static str {
            "colliding"
        }

        fn routes(&self, _ctx: &FeatureContext) -> Result<Router, FeatureError> {
            Ok(Router::new()
                .route("/colliding/own", get(|| async { "own" }))
                .route("/orgs", get(|| async { "stolen" })))
        }
    }

    struct Broken;

    impl SecretValidator for Broken {
        fn ensure_secret_configured(&self, _strict: bool) -> Result<bool, SecretError> {
            Err(SecretError::Check("vault unreachable".into()))
        }
    }

    /// Counts WARN events that carry a `secret_status` field.
    #[derive(Clone, Default)]
    struct SecretWarnings(Arc<AtomicUsize>);

    struct HasField(bool);

    impl Visit for HasField {
        fn record_debug(&mut self, field: &Field, _value: &dyn fmt::Debug) {
            if field.name() == "secret_status" {
                self.0 = true;
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for SecretWarnings {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut visitor = HasField(false);
            event.record(&mut visitor);
            if *event.metadata().level() == tracing::Level::WARN && visitor.0 {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn build_counting_warnings(builder: AppBuilder) -> (Result<App, StartupError>, usize) {
        let counter = SecretWarnings::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let result = tracing::subscriber::with_default(subscriber, || builder.build());
        (result, counter.0.load(Ordering::SeqCst))
    }

    #[test]
    fn test_production_default_secret_aborts() {
        let result = App::builder(config(Environment::Production, Some(DEVELOPMENT_SECRET))).build();
        assert!(matches!(
            result,
            Err(StartupError::InsecureSecret(SecretError::InsecureDefault))
        ));

        let result = App::builder(config(Environment::Production, None)).build();
        assert!(matches!(result, Err(StartupError::InsecureSecret(SecretError::Missing))));
    }

    #[test]
    fn test_production_strong_secret_starts() {
        let app = App::builder(config(Environment::Production, Some(STRONG)))
            .build()
            .unwrap();
        assert_eq!(app.report().secret, SecretCheck::Configured);
    }

    #[tokio::test]
    async fn test_non_production_default_secret_warns_once() {
        for env in [
            Environment::Development,
            Environment::Other("staging".into()),
            Environment::Other("test".into()),
        ] {
            let (result, warnings) =
                build_counting_warnings(App::builder(config(env, Some(DEVELOPMENT_SECRET))));
            let app = result.unwrap();
            assert_eq!(warnings, 1);
            assert_eq!(app.report().secret, SecretCheck::Insecure);
            assert_eq!(status(&app, "/").await, StatusCode::OK);
        }
    }

    #[test]
    fn test_configured_secret_does_not_warn() {
        let (result, warnings) =
            build_counting_warnings(App::builder(config(Environment::Development, Some(STRONG))));
        assert!(result.is_ok());
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_validator_failure_swallowed_outside_production() {
        let app = App::builder(config(Environment::Development, None))
            .secret_validator(Broken)
            .build()
            .unwrap();
        assert!(matches!(app.report().secret, SecretCheck::CheckFailed(_)));

        let result = App::builder(config(Environment::Production, Some(STRONG)))
            .secret_validator(Broken)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_no_validator_skips_check() {
        let app = App::builder(config(Environment::Production, None))
            .without_secret_validator()
            .build()
            .unwrap();
        assert_eq!(app.report().secret, SecretCheck::Skipped);
    }

    #[tokio::test]
    async fn test_each_feature_failure_is_isolated() {
        let builtin = FeatureRegistry::builtin().names();
        for failing in builtin.iter().copied() {
            let registry = FeatureRegistry::builtin().replace(Failing(failing));
            let app = App::builder(config(Environment::Development, None))
                .features(registry)
                .metrics(Some(metrics::detached_handle().unwrap()))
                .build()
                .unwrap();

            let report = app.report();
            assert_eq!(report.attempts.len(), builtin.len());
            for attempt in &report.attempts {
                assert_eq!(attempt.succeeded(), attempt.feature != failing, "{attempt:?}");
            }
            assert_eq!(status(&app, "/").await, StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_panicking_feature_is_skipped() {
        let registry = FeatureRegistry::builtin().replace(Panicking("chat"));
        let app = App::builder(config(Environment::Development, None))
            .features(registry)
            .build()
            .unwrap();

        let chat = app.report().attempt("chat").unwrap();
        assert_eq!(chat.outcome, RegistrationOutcome::Failed);
        assert!(chat.error.as_deref().unwrap().contains("import blew up"));

        assert_eq!(status(&app, "/chat/rooms/general/messages").await, StatusCode::NOT_FOUND);
        assert_eq!(status(&app, "/orgs").await, StatusCode::OK);
        assert_eq!(status(&app, "/review/items").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_colliding_feature_registers_nothing() {
        let registry = FeatureRegistry::builtin().with(Colliding);
        let app = App::builder(config(Environment::Development, None))
            .features(registry)
            .build()
            .unwrap();

        assert_eq!(
            app.report().attempt("colliding").unwrap().outcome,
            RegistrationOutcome::Failed
        );
        assert_eq!(status(&app, "/colliding/own").await, StatusCode::NOT_FOUND);
        assert_eq!(status(&app, "/orgs").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_disabled_features_are_not_probed() {
        let mut cfg = config(Environment::Development, None);
        cfg.features.disabled = vec!["Chat".into(), "nonexistent".into()];
        let registry = FeatureRegistry::builtin().replace(Panicking("chat"));
        let app = App::builder(cfg).features(registry).build().unwrap();

        let chat = app.report().attempt("chat").unwrap();
        assert_eq!(chat.outcome, RegistrationOutcome::Disabled);
        assert!(chat.error.is_none());
    }

    #[tokio::test]
    async fn test_pages_render_with_no_features() {
        let app = App::builder(config(Environment::Development, None))
            .features(FeatureRegistry::new())
            .build()
            .unwrap();

        assert_eq!(app.report().context_contributors, vec!["i18n"]);
        assert_eq!(status(&app, "/").await, StatusCode::OK);
        assert_eq!(status(&app, "/payments/example").await, StatusCode::OK);
        assert!(app.renderer().context("any.html").has_helper("t"));
    }

    #[test]
    fn test_server_disabled_message_names_the_feature() {
        assert!(SERVER_DISABLED_MESSAGE.contains("--features server"));
        assert!(!SERVER_DISABLED_MESSAGE.contains('\n'));
    }

    #[tokio::test]
    async fn test_admin_mounted_only_with_key() {
        let app = App::builder(config(Environment::Development, None)).build().unwrap();
        assert_eq!(status(&app, "/admin/status").await, StatusCode::NOT_FOUND);

        let mut cfg = config(Environment::Development, None);
        cfg.admin.api_key = Some("admin-key".into());
        let app = App::builder(cfg).build().unwrap();
        assert_eq!(status(&app, "/admin/status").await, StatusCode::UNAUTHORIZED);
    }
}
