//! Template rendering of [`RenderPayload`]s into [`Notification`]s.
//!
//! [`HandlebarsRenderer`] ships with one built-in template per channel
//! (`telegram`, `email`, `webhook`). A template directory can override or
//! add templates: every `*.hbs` file is registered under its file stem.

use std::path::{Path, PathBuf};

use alertproxy_core::notification::{Notification, RenderPayload};
use handlebars::{handlebars_helper, Handlebars};

const BUILTIN_TEMPLATES: [(&str, &str); 3] = [
    ("telegram", include_str!("../templates/telegram.hbs")),
    ("email", include_str!("../templates/email.hbs")),
    ("webhook", include_str!("../templates/webhook.hbs")),
];

const TEMPLATE_EXTENSION: &str = "hbs";

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid template {name}: {message}")]
    Parse { name: String, message: String },

    #[error("Template {0} is not registered")]
    NotFound(String),

    #[error("Rendering template {name} failed: {message}")]
    Render { name: String, message: String },
}

// ---------------------------------------------------------------------------
// TemplateRenderer
// ---------------------------------------------------------------------------

/// Renders a payload with a named template. Rendering is local and
/// synchronous; an error means the template itself is defective.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template_name: &str, payload: &RenderPayload)
        -> Result<Notification, TemplateError>;
}

// ---------------------------------------------------------------------------
// HandlebarsRenderer
// ---------------------------------------------------------------------------

handlebars_helper!(html: |text: str| escape_html(text));

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

pub struct HandlebarsRenderer {
    registry: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// A renderer with only the built-in templates.
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        // Bodies are plain text; escaping is opt-in through the `html` helper.
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_helper("html", Box::new(html));

        let mut renderer = Self { registry };
        for (name, source) in BUILTIN_TEMPLATES {
            renderer.register_template(name, source)?;
        }
        Ok(renderer)
    }

    /// Built-in templates overridden by every `*.hbs` file in `dir`.
    pub fn with_template_dir(dir: &Path) -> Result<Self, TemplateError> {
        let mut renderer = Self::new()?;
        let io_err = |source| TemplateError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut loaded = 0usize;
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
                path: path.clone(),
                source,
            })?;
            renderer.register_template(name, &source)?;
            loaded += 1;
        }

        tracing::info!(dir = %dir.display(), loaded, "Loaded notification templates");
        Ok(renderer)
    }

    pub fn register_template(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.registry
            .register_template_string(name, source)
            .map_err(|e| TemplateError::Parse {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(
        &self,
        template_name: &str,
        payload: &RenderPayload,
    ) -> Result<Notification, TemplateError> {
        if !self.registry.has_template(template_name) {
            return Err(TemplateError::NotFound(template_name.to_string()));
        }
        let body = self
            .registry
            .render(template_name, payload)
            .map_err(|e| TemplateError::Render {
                name: template_name.to_string(),
                message: e.to_string(),
            })?;

        Ok(Notification {
            title: payload.title.clone(),
            body: body.trim().to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
