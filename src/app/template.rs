//! Subject and body templates, compiled once at startup.
//!
//! Templates are minijinja sources rendered against `{ Form: FormValues }`.
//! The body file extension picks the variant: `.txt` renders verbatim,
//! `.html` escapes interpolated form values.

use std::ffi::OsStr;
use std::path::Path;

use minijinja::{context, AutoEscape, Environment};

use crate::app::{domain::FormValues, error::ConfigError};

const TEMPLATE_NAME: &str = "template";

/// A compiled template. The variant is fixed at compile time.
#[derive(Debug)]
pub enum Template {
    PlainText(Environment<'static>),
    Markup(Environment<'static>),
}

impl Template {
    /// Compile a template that renders values verbatim.
    pub fn plain_text(name: &str, source: impl Into<String>) -> Result<Self, ConfigError> {
        compile(name, source.into(), AutoEscape::None).map(Template::PlainText)
    }

    /// Compile a template that HTML-escapes interpolated values.
    pub fn markup(name: &str, source: impl Into<String>) -> Result<Self, ConfigError> {
        compile(name, source.into(), AutoEscape::Html).map(Template::Markup)
    }

    pub fn is_markup(&self) -> bool {
        matches!(self, Template::Markup(_))
    }

    /// Render against the submitted form. Output is written into `out` as it is
    /// produced, so whatever was rendered before a failure stays in `out`.
    pub fn render(&self, form: &FormValues, out: &mut Vec<u8>) -> Result<(), minijinja::Error> {
        let env = match self {
            Template::PlainText(env) | Template::Markup(env) => env,
        };
        env.get_template(TEMPLATE_NAME)?
            .render_captured_to(context! { Form => form }, &mut *out)?;
        Ok(())
    }
}

fn compile(
    name: &str,
    source: String,
    escape: AutoEscape,
) -> Result<Environment<'static>, ConfigError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(move |_| escape.clone());
    env.add_template_owned(TEMPLATE_NAME, source)
        .map_err(|err| ConfigError::TemplateParse {
            name: name.to_string(),
            message: err.to_string(),
        })?;
    Ok(env)
}

/// Subject and body templates owned by the dispatcher.
#[derive(Debug)]
pub struct CompiledTemplates {
    pub subject: Template,
    pub body: Template,
}

impl CompiledTemplates {
    /// Compile the subject string and load the body template file.
    pub fn load(subject: &str, body_path: &Path) -> Result<Self, ConfigError> {
        if !body_path.exists() {
            return Err(ConfigError::FileNotFound(body_path.to_path_buf()));
        }

        let extension = body_path
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or_default();
        let markup = match extension {
            "txt" => false,
            "html" => true,
            other => {
                return Err(ConfigError::UnsupportedExtension {
                    extension: other.to_string(),
                    path: body_path.to_path_buf(),
                })
            }
        };

        let source = std::fs::read_to_string(body_path).map_err(|source| {
            ConfigError::TemplateRead {
                path: body_path.to_path_buf(),
                source,
            }
        })?;

        let name = body_path.display().to_string();
        let body = if markup {
            Template::markup(&name, source)?
        } else {
            Template::plain_text(&name, source)?
        };

        // Subjects never carry markup escaping.
        let subject = Template::plain_text("subject", subject)?;

        Ok(Self { subject, body })
    }

    pub fn body_is_markup(&self) -> bool {
        self.body.is_markup()
    }
}
