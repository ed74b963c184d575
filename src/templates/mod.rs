//! Server-side page rendering.
//!
//! # Data Flow
//! ```text
//! handler
//!     → Renderer::render(page)
//!         → every ContextContributor adds helpers to a fresh TemplateContext
//!         → Template::render(ctx) builds escaped HTML
//!     → Html<String>
//! ```
//!
//! # Design Decisions
//! - Pages are plain Rust types; user-controlled values are HTML-escaped
//! - Contributors run on every render, so helpers are present on every page
//!   no matter which features registered

pub mod pages;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::i18n::Localizer;

pub use pages::{IndexPage, PaymentsExamplePage};

/// Name under which the translation helper is exposed.
pub const TRANSLATE_HELPER: &str = "t";

/// A helper callable from templates: `(key, locale) -> text`.
pub type Helper = Arc<dyn Fn(&str, Option<&str>) -> String + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template '{template}' requires helper '{helper}'")]
    MissingHelper {
        template: &'static str,
        helper: &'static str,
    },
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Template render failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Template render failed").into_response()
    }
}

/// Values and helpers visible to a single render.
#[derive(Default, Clone)]
pub struct TemplateContext {
    template: &'static str,
    helpers: HashMap<&'static str, Helper>,
}

impl TemplateContext {
    pub fn insert_helper(&mut self, name: &'static str, helper: Helper) {
        self.helpers.insert(name, helper);
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Invoke a helper by name.
    pub fn call(
        &self,
        name: &'static str,
        key: &str,
        locale: Option<&str>,
    ) -> Result<String, RenderError> {
        let helper = self.helpers.get(name).ok_or(RenderError::MissingHelper {
            template: self.template,
            helper: name,
        })?;
        Ok(helper(key, locale))
    }

    /// Translate and HTML-escape `key` in the default locale.
    pub fn t(&self, key: &str) -> Result<String, RenderError> {
        self.call(TRANSLATE_HELPER, key, None)
            .map(|text| htmlescape::encode_minimal(&text))
    }
}

impl fmt::Debug for TemplateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateContext")
            .field("template", &self.template)
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Adds shared helpers to every template context.
pub trait ContextContributor: Send + Sync {
    fn name(&self) -> &'static str;
    fn contribute(&self, ctx: &mut TemplateContext);
}

/// Exposes [`Localizer::t`] as the `t` helper.
pub struct TranslationContributor {
    localizer: Arc<Localizer>,
}

impl TranslationContributor {
    pub fn new(localizer: Arc<Localizer>) -> Self {
        Self { localizer }
    }
}

impl ContextContributor for TranslationContributor {
    fn name(&self) -> &'static str {
        "i18n"
    }

    fn contribute(&self, ctx: &mut TemplateContext) {
        let localizer = self.localizer.clone();
        ctx.insert_helper(
            TRANSLATE_HELPER,
            Arc::new(move |key, locale| localizer.t(key, locale)),
        );
    }
}

/// A renderable page.
pub trait Template {
    const NAME: &'static str;

    fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError>;
}

/// Renders pages with the registered context contributors.
#[derive(Clone, Default)]
pub struct Renderer {
    contributors: Vec<Arc<dyn ContextContributor>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contributor(mut self, contributor: Arc<dyn ContextContributor>) -> Self {
        tracing::debug!(contributor = contributor.name(), "Template context contributor registered");
        self.contributors.push(contributor);
        self
    }

    pub fn contributor_names(&self) -> Vec<&'static str> {
        self.contributors.iter().map(|c| c.name()).collect()
    }

    /// Fresh context for `template` with every contributor applied.
    pub fn context(&self, template: &'static str) -> TemplateContext {
        let mut ctx = TemplateContext {
            template,
            ..TemplateContext::default()
        };
        for contributor in &self.contributors {
            contributor.contribute(&mut ctx);
        }
        ctx
    }

    pub fn render<T: Template>(&self, page: &T) -> Result<Html<String>, RenderError> {
        let ctx = self.context(T::NAME);
        page.render(&ctx).map(Html)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("contributors", &self.contributor_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_helper_injected() {
        let renderer = Renderer::new()
            .with_contributor(Arc::new(TranslationContributor::new(Arc::new(Localizer::new(Some("es"))))));
        let ctx = renderer.context("test.html");

        assert!(ctx.has_helper(TRANSLATE_HELPER));
        assert_eq!(ctx.t("index.title").unwrap(), "Bienvenido");
        assert_eq!(ctx.call(TRANSLATE_HELPER, "index.title", Some("en")).unwrap(), "Welcome");
    }

    #[test]
    fn test_missing_helper_is_error() {
        let ctx = Renderer::new().context("bare.html");
        let err = ctx.t("index.title").unwrap_err();
        assert!(err.to_string().contains("bare.html"));
    }
}
