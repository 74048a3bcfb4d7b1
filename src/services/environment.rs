//! Live site signals consumed by the options store.
//!
//! The store never owns theme or post type state. It reads it through the
//! narrow traits below on every materialization of the options value.
//! [`ManifestSite`] is a JSON-configurable implementation used by the RPC
//! binary and the tests.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::types::errors::SiteError;
use crate::types::theme::{ThemeSupportArgs, ThemeSupportDeclaration};

/// The active theme and what it declares about AMP.
pub trait ThemeSource {
    fn active_theme_slug(&self) -> String;
    /// `None` when the active theme does not declare AMP support at all.
    fn declared_amp_support(&self) -> Option<ThemeSupportArgs>;
}

/// Registered post types and template conditions.
pub trait ContentRegistry {
    /// Public post types, in registration order.
    fn registered_post_types(&self) -> IndexSet<String>;
    fn post_type_declares_amp_support(&self, post_type: &str) -> bool;
    fn registered_template_conditions(&self) -> IndexSet<String>;
}

/// Classifies themes bundled with the CMS core.
pub trait CoreThemePolicy {
    fn is_core_bundled_theme(&self, slug: &str) -> bool;
}

/// Receives the "routing needs refresh" signal after post type support changes.
pub trait RoutingNotifier {
    fn notify_routing_invalidated(&self);
}

/// Everything the store reads from the site.
pub trait SiteEnvironment: ThemeSource + ContentRegistry + CoreThemePolicy {}

impl<T: ThemeSource + ContentRegistry + CoreThemePolicy> SiteEnvironment for T {}

/// Core themes that ship with AMP-compatible sanitizers.
pub const CORE_THEMES: [&str; 9] = [
    "twentytwentyone",
    "twentytwenty",
    "twentynineteen",
    "twentyseventeen",
    "twentysixteen",
    "twentyfifteen",
    "twentyfourteen",
    "twentythirteen",
    "twentytwelve",
];

/// A fixed list of core-bundled theme slugs.
#[derive(Debug, Clone)]
pub struct CoreThemeList {
    slugs: HashSet<String>,
}

impl CoreThemeList {
    pub fn new<I, S>(slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slugs: slugs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for CoreThemeList {
    fn default() -> Self {
        Self::new(CORE_THEMES)
    }
}

impl CoreThemePolicy for CoreThemeList {
    fn is_core_bundled_theme(&self, slug: &str) -> bool {
        self.slugs.contains(slug)
    }
}

/// Notifier that only logs. Used when no routing subsystem is attached.
#[derive(Debug, Default)]
pub struct LoggingNotifier {
    count: AtomicUsize,
}

impl LoggingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invalidations seen so far.
    pub fn invalidations(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl RoutingNotifier for LoggingNotifier {
    fn notify_routing_invalidated(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
        info!("supported post types changed; routing rules need a refresh");
    }
}

/// A registered post type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTypeSpec {
    pub name: String,
    #[serde(default)]
    pub supports_amp: bool,
}

fn default_post_types() -> Vec<PostTypeSpec> {
    ["post", "page", "attachment"]
        .iter()
        .map(|name| PostTypeSpec {
            name: name.to_string(),
            supports_amp: false,
        })
        .collect()
}

fn default_template_conditions() -> Vec<String> {
    [
        "is_singular",
        "is_front_page",
        "is_home",
        "is_archive",
        "is_author",
        "is_date",
        "is_search",
        "is_404",
        "is_category",
        "is_tag",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_active_theme() -> String {
    "custom-theme".to_string()
}

/// Static description of a site, loadable from JSON.
///
/// ```json
/// {
///   "active_theme": "twentytwenty",
///   "theme_support": { "twentytwenty": { "paired": true }, "twentynineteen": true },
///   "post_types": [{ "name": "book", "supports_amp": true }],
///   "themes": ["twentytwenty", "twentynineteen"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteManifest {
    #[serde(default = "default_active_theme")]
    pub active_theme: String,
    /// AMP support declared per theme slug.
    #[serde(default)]
    pub theme_support: IndexMap<String, ThemeSupportDeclaration>,
    #[serde(default = "default_post_types")]
    pub post_types: Vec<PostTypeSpec>,
    #[serde(default = "default_template_conditions")]
    pub template_conditions: Vec<String>,
    /// Installed themes. Empty means "any slug may be activated".
    #[serde(default)]
    pub themes: Vec<String>,
    /// Overrides the built-in core theme list when present.
    #[serde(default)]
    pub core_themes: Option<Vec<String>>,
}

impl Default for SiteManifest {
    fn default() -> Self {
        Self {
            active_theme: default_active_theme(),
            theme_support: IndexMap::new(),
            post_types: default_post_types(),
            template_conditions: default_template_conditions(),
            themes: Vec::new(),
            core_themes: None,
        }
    }
}

impl SiteManifest {
    /// Loads a manifest from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SiteError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SiteError::Io(format!("Failed to read site manifest: {}", e)))?;
        serde_json::from_str(&content).map_err(|e| SiteError::Parse(e.to_string()))
    }
}

/// A mutable site backed by a [`SiteManifest`].
///
/// Interior mutability lets tests and the RPC layer switch themes or register
/// post types while an options store holds a shared reference.
#[derive(Debug, Default)]
pub struct ManifestSite {
    manifest: Mutex<SiteManifest>,
    core_themes: CoreThemeList,
}

impl ManifestSite {
    pub fn new(manifest: SiteManifest) -> Self {
        let core_themes = match &manifest.core_themes {
            Some(list) => CoreThemeList::new(list.iter().cloned()),
            None => CoreThemeList::default(),
        };
        Self {
            manifest: Mutex::new(manifest),
            core_themes,
        }
    }

    /// Starts from the default manifest with `slug` active.
    pub fn with_theme(slug: &str) -> Self {
        Self::new(SiteManifest {
            active_theme: slug.to_string(),
            ..SiteManifest::default()
        })
    }

    pub fn snapshot(&self) -> SiteManifest {
        self.with_manifest(|m| m.clone())
    }

    pub fn switch_theme(&self, slug: &str) -> Result<(), SiteError> {
        self.with_manifest_mut(|m| {
            if !m.themes.is_empty() && !m.themes.iter().any(|t| t == slug) {
                return Err(SiteError::UnknownTheme(slug.to_string()));
            }
            debug!(from = %m.active_theme, to = %slug, "switching active theme");
            m.active_theme = slug.to_string();
            Ok(())
        })
    }

    /// Declares (or with `None`, removes) AMP support for the active theme.
    pub fn set_theme_support(&self, args: Option<ThemeSupportArgs>) {
        self.with_manifest_mut(|m| {
            let slug = m.active_theme.clone();
            match args {
                Some(args) => {
                    m.theme_support.insert(slug, ThemeSupportDeclaration::Args(args));
                }
                None => {
                    m.theme_support.shift_remove(&slug);
                }
            }
        })
    }

    /// Registers a post type, or updates its AMP support flag if it exists.
    pub fn register_post_type(&self, name: &str, supports_amp: bool) {
        self.with_manifest_mut(|m| {
            match m.post_types.iter_mut().find(|p| p.name == name) {
                Some(existing) => existing.supports_amp = supports_amp,
                None => m.post_types.push(PostTypeSpec {
                    name: name.to_string(),
                    supports_amp,
                }),
            }
        })
    }

    pub fn unregister_post_type(&self, name: &str) {
        self.with_manifest_mut(|m| m.post_types.retain(|p| p.name != name))
    }

    fn with_manifest<R>(&self, f: impl FnOnce(&SiteManifest) -> R) -> R {
        match self.manifest.lock() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn with_manifest_mut<R>(&self, f: impl FnOnce(&mut SiteManifest) -> R) -> R {
        match self.manifest.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl ThemeSource for ManifestSite {
    fn active_theme_slug(&self) -> String {
        self.with_manifest(|m| m.active_theme.clone())
    }

    fn declared_amp_support(&self) -> Option<ThemeSupportArgs> {
        self.with_manifest(|m| {
            m.theme_support
                .get(&m.active_theme)
                .and_then(ThemeSupportDeclaration::to_args)
        })
    }
}

impl ContentRegistry for ManifestSite {
    fn registered_post_types(&self) -> IndexSet<String> {
        self.with_manifest(|m| m.post_types.iter().map(|p| p.name.clone()).collect())
    }

    fn post_type_declares_amp_support(&self, post_type: &str) -> bool {
        self.with_manifest(|m| {
            m.post_types
                .iter()
                .any(|p| p.name == post_type && p.supports_amp)
        })
    }

    fn registered_template_conditions(&self) -> IndexSet<String> {
        self.with_manifest(|m| m.template_conditions.iter().cloned().collect())
    }
}

impl CoreThemePolicy for ManifestSite {
    fn is_core_bundled_theme(&self, slug: &str) -> bool {
        self.core_themes.is_core_bundled_theme(slug)
    }
}
