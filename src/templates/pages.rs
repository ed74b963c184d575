//! Pages served by the core application.

use htmlescape::encode_minimal as escape_html;

use crate::config::PLACEHOLDER_PUBLISHABLE_KEY;
use crate::templates::{RenderError, Template, TemplateContext};

fn layout(ctx: &TemplateContext, title: &str, body: &str) -> Result<String, RenderError> {
    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\" />\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n<title>{title} | {site}</title>\n</head>\n<body>\n<main>\n{body}\n</main>\n<footer>{footer}</footer>\n</body>\n</html>\n",
        title = title,
        site = ctx.t("site.name")?,
        body = body,
        footer = ctx.t("site.footer")?,
    ))
}

/// Landing page (`index.html`). Takes no parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexPage;

impl Template for IndexPage {
    const NAME: &'static str = "index.html";

    fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError> {
        let body = format!(
            "<h1>{heading}</h1>\n<p>{intro}</p>",
            heading = ctx.t("index.heading")?,
            intro = ctx.t("index.intro")?,
        );
        layout(ctx, &ctx.t("index.title")?, &body)
    }
}

/// Payments demo page (`stripe_example.html`).
#[derive(Debug, Clone)]
pub struct PaymentsExamplePage {
    pub publishable_key: String,
}

impl Template for PaymentsExamplePage {
    const NAME: &'static str = "stripe_example.html";

    fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError> {
        let notice = if self.publishable_key == PLACEHOLDER_PUBLISHABLE_KEY {
            format!("<p class=\"notice\">{}</p>", ctx.t("payments.placeholder_notice")?)
        } else {
            String::new()
        };
        let body = format!(
            "<h1>{heading}</h1>\n<p>{label}: <code id=\"publishable-key\">{key}</code></p>\n{notice}\n<script>window.STRIPE_PUBLISHABLE_KEY = \"{key}\";</script>",
            heading = ctx.t("payments.heading")?,
            label = ctx.t("payments.key_label")?,
            key = escape_html(&self.publishable_key),
            notice = notice,
        );
        layout(ctx, &ctx.t("payments.title")?, &body)
    }
}
