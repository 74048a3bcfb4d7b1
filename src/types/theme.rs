use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::options::TemplateMode;

/// Arguments a theme passes when it declares AMP support.
///
/// An empty value still counts as a declaration. A declaration made without
/// any arguments is [`ThemeSupportArgs::bare`], which is not the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSupportArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paired: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_supported: Option<TemplatesSupported>,
}

impl ThemeSupportArgs {
    pub fn paired(paired: bool) -> Self {
        Self {
            paired: Some(paired),
            ..Self::default()
        }
    }

    /// Support declared without an arguments object. Means a standard-only theme.
    pub fn bare() -> Self {
        Self::paired(false)
    }

    pub fn with_templates(templates_supported: TemplatesSupported) -> Self {
        Self {
            templates_supported: Some(templates_supported),
            ..Self::default()
        }
    }

    /// The mode implied by the declaration itself.
    ///
    /// An arguments object leaves the theme paired unless it says otherwise.
    pub fn implied_mode(&self) -> TemplateMode {
        match self.paired {
            Some(false) => TemplateMode::Standard,
            _ => TemplateMode::Transitional,
        }
    }
}

/// A theme support declaration as written in a site manifest.
///
/// `true` is a bare declaration, `false` declares nothing, and an object
/// carries arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThemeSupportDeclaration {
    Bare(bool),
    Args(ThemeSupportArgs),
}

impl ThemeSupportDeclaration {
    pub fn to_args(&self) -> Option<ThemeSupportArgs> {
        match self {
            ThemeSupportDeclaration::Bare(true) => Some(ThemeSupportArgs::bare()),
            ThemeSupportDeclaration::Bare(false) => None,
            ThemeSupportDeclaration::Args(args) => Some(args.clone()),
        }
    }
}

/// The `templates_supported` theme support argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplatesSupported {
    Conditions(IndexMap<String, bool>),
    Keyword(String),
}

impl TemplatesSupported {
    pub fn all() -> Self {
        TemplatesSupported::Keyword("all".to_string())
    }

    pub fn conditions<I, S>(conditions: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        TemplatesSupported::Conditions(
            conditions.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TemplatesSupported::Keyword(k) if k == "all")
    }
}
