//! Compiler options and `coinscript.toml` discovery.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::tree::{OpcodeStyle, SerializeOptions};

pub const CONFIG_FILE: &str = "coinscript.toml";

/// How condition codes are rendered in emitted source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpcodeMode {
    /// Symbolic when `condition_codes.clib` is included, numeric otherwise.
    #[default]
    Auto,
    Symbolic,
    Numeric,
}

impl OpcodeMode {
    pub fn style_for(self, includes_condition_codes: bool) -> OpcodeStyle {
        match self {
            OpcodeMode::Symbolic => OpcodeStyle::Symbolic,
            OpcodeMode::Numeric => OpcodeStyle::Numeric,
            OpcodeMode::Auto if includes_condition_codes => OpcodeStyle::Symbolic,
            OpcodeMode::Auto => OpcodeStyle::Numeric,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    pub pretty: bool,
    pub line_width: usize,
    pub indent: usize,
    /// Nesting limit for blocks and expressions, in parser and generator.
    pub max_depth: u32,
    /// Fail a spend whose `send` total exceeds the coin's own amount.
    pub conservation_check: bool,
    pub opcodes: OpcodeMode,
    /// Libraries included into every generated program.
    pub extra_includes: Vec<String>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            line_width: 80,
            indent: 2,
            max_depth: crate::parser::MAX_NESTING_DEPTH,
            conservation_check: false,
            opcodes: OpcodeMode::Auto,
            extra_includes: Vec::new(),
        }
    }
}

impl CompileOptions {
    /// Parse options from TOML text. A `[compile]` table is accepted as well
    /// as top-level keys.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        #[derive(Deserialize)]
        struct Wrapped {
            compile: CompileOptions,
        }
        let table: toml::Table = toml::from_str(text)?;
        if table.contains_key("compile") {
            toml::from_str::<Wrapped>(text).map(|wrapped| wrapped.compile)
        } else {
            toml::from_str(text)
        }
    }

    /// Load options from a `coinscript.toml` file.
    pub fn load(path: &Path) -> Result<Self, Diagnostic> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(format!("cannot read '{}': {}", path.display(), e), Span::dummy())
        })?;
        let options = Self::from_toml(&content).map_err(|e| {
            Diagnostic::error(format!("invalid '{}': {}", path.display(), e), Span::dummy())
        })?;
        tracing::debug!(path = %path.display(), "loaded compile options");
        Ok(options)
    }

    /// Search `start_dir` and its ancestors for `coinscript.toml`.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Options for the file at `source_path`: the nearest config, or defaults.
    pub fn discover(source_path: &Path) -> Result<Self, Diagnostic> {
        let dir = source_path.parent().unwrap_or(Path::new("."));
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Serializer settings for a program, before comments are attached.
    pub fn serialize_options(&self, style: OpcodeStyle) -> SerializeOptions {
        SerializeOptions {
            pretty: self.pretty,
            line_width: self.line_width,
            indent: self.indent,
            opcodes: style,
            ..SerializeOptions::default()
        }
    }
}
