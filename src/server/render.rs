//! Template rendering
//!
//! The dispatcher only needs a name and a JSON value turned into HTML, so
//! any engine can sit behind [`Renderer`]. [`TeraRenderer`] is the stock one.

use serde_json::Value;
use tera::Tera;

pub trait Renderer: Send + Sync {
    /// Render template `name` with `data` into a string.
    fn render(&self, name: &str, data: &Value) -> anyhow::Result<String>;
}

impl<F> Renderer for F
where
    F: Fn(&str, &Value) -> anyhow::Result<String> + Send + Sync,
{
    fn render(&self, name: &str, data: &Value) -> anyhow::Result<String> {
        self(name, data)
    }
}

/// Renders Tera templates loaded from disk.
pub struct TeraRenderer {
    tera: Tera,
}

impl TeraRenderer {
    /// Load every template matching `glob`, e.g. `"templates/**/*.html"`.
    pub fn new(glob: &str) -> anyhow::Result<Self> {
        Ok(Self {
            tera: Tera::new(glob)?,
        })
    }

    pub fn from_tera(tera: Tera) -> Self {
        Self { tera }
    }
}

impl Renderer for TeraRenderer {
    fn render(&self, name: &str, data: &Value) -> anyhow::Result<String> {
        let context = tera::Context::from_value(data.clone())?;
        Ok(self.tera.render(name, &context)?)
    }
}
