//! Handlers for the core HTML pages.

use std::sync::Arc;

use axum::{extract::State, response::Html};

use crate::config::AppConfig;
use crate::templates::{IndexPage, PaymentsExamplePage, RenderError, Renderer};

/// State shared by the core page handlers.
#[derive(Clone)]
pub struct PageState {
    pub config: Arc<AppConfig>,
    pub renderer: Arc<Renderer>,
}

/// `GET /`
pub async fn index(State(state): State<PageState>) -> Result<Html<String>, RenderError> {
    state.renderer.render(&IndexPage)
}

/// `GET /payments/example`
pub async fn payments_example(
    State(state): State<PageState>,
) -> Result<Html<String>, RenderError> {
    let page = PaymentsExamplePage {
        publishable_key: state
            .config
            .payments
            .publishable_key_or_placeholder()
            .to_string(),
    };
    state.renderer.render(&page)
}
