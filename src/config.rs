use std::fs;
use std::path::Path;

use clap::ValueEnum;

use crate::executor::QuerySpec;
use crate::mock::MockOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SchemaFormat {
    /// Input starting with `{` is an introspection capture, anything else is SDL.
    #[default]
    Auto,
    Sdl,
    Introspection,
}

/// A schema description in one of the two accepted representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    Sdl(String),
    /// JSON text of an introspection capture, `{"data": ...}` or `{"errors": ...}`.
    Introspection(String),
}

impl SchemaSource {
    pub fn from_text(text: String, format: SchemaFormat) -> Self {
        match format {
            SchemaFormat::Sdl => SchemaSource::Sdl(text),
            SchemaFormat::Introspection => SchemaSource::Introspection(text),
            SchemaFormat::Auto => {
                if text.trim_start().starts_with('{') {
                    SchemaSource::Introspection(text)
                } else {
                    SchemaSource::Sdl(text)
                }
            }
        }
    }
}

/// Everything one validation run needs, gathered once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub schema: SchemaSource,
    pub query: QuerySpec,
    pub mock: MockOptions,
}

pub fn load_token(path: &Path) -> anyhow::Result<String> {
    let s = fs::read_to_string(path)?;
    let t = s.trim().to_string();
    if t.is_empty() {
        anyhow::bail!("empty token file");
    }
    Ok(t)
}
