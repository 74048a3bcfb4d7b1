// Options store.
// Materializes the canonical options value from the persisted blob and the
// live site signals, caches it for as long as those signals stay the same,
// and funnels every write through the same migration and validation pass.

use std::cell::RefCell;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::services::environment::{RoutingNotifier, SiteEnvironment};
use crate::services::migration::{self, MigrationContext};
use crate::services::option_storage::OptionStorage;
use crate::services::validation;
use crate::types::notice::ValidationMessage;
use crate::types::options::{
    Options, TemplateMode, LEGACY_READER_THEME, OPTION_NAME, PLUGIN_VERSION,
};
use crate::types::theme::ThemeSupportArgs;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Key the blob is persisted under.
    pub option_name: String,
    /// Version stamped on every write and compared against on read.
    pub plugin_version: String,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            option_name: OPTION_NAME.to_string(),
            plugin_version: PLUGIN_VERSION.to_string(),
        }
    }
}

/// Trait defining the options store interface.
pub trait OptionsStoreTrait {
    fn get_options(&self) -> Options;
    fn get_option(&self, name: &str) -> Value;
    fn get_option_or(&self, name: &str, default: Value) -> Value;
    fn update_option(&self, name: &str, value: Value) -> bool;
    fn update_options(&self, partial: &Map<String, Value>) -> bool;
    fn reset(&self) -> bool;
    fn take_messages(&self) -> Vec<ValidationMessage>;
}

struct CachedOptions {
    context: MigrationContext,
    options: Options,
}

/// The single read/write path for plugin options.
pub struct OptionsStore {
    storage: Box<dyn OptionStorage>,
    site: Arc<dyn SiteEnvironment>,
    notifier: Arc<dyn RoutingNotifier>,
    config: OptionsConfig,
    cache: RefCell<Option<CachedOptions>>,
    messages: RefCell<Vec<ValidationMessage>>,
}

impl OptionsStore {
    pub fn new<S: OptionStorage + 'static>(
        storage: S,
        site: Arc<dyn SiteEnvironment>,
        notifier: Arc<dyn RoutingNotifier>,
    ) -> Self {
        Self {
            storage: Box::new(storage),
            site,
            notifier,
            config: OptionsConfig::default(),
            cache: RefCell::new(None),
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn with_config(mut self, config: OptionsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OptionsConfig {
        &self.config
    }

    /// Drops the cached value so the next read goes back to storage.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().take();
    }

    /// Messages recorded so far, without draining them.
    pub fn messages(&self) -> Vec<ValidationMessage> {
        self.messages.borrow().clone()
    }

    fn context(&self) -> MigrationContext {
        MigrationContext::capture(self.site.as_ref(), &self.config.plugin_version)
    }

    fn read_raw(&self) -> Result<Option<Value>, ()> {
        self.storage.read(&self.config.option_name).map_err(|e| {
            warn!(option = %self.config.option_name, error = %e, "failed to read options");
        })
    }
}

/// Derives the effective options for the current site from the canonical
/// persisted value.
///
/// The active theme's own declaration takes precedence over the persisted
/// template mode, except over a persisted reader choice. A blob without a
/// usable mode already carries the site default after migration. Nothing
/// computed here is ever written back.
pub fn resolve_effective(canonical: Options, ctx: &MigrationContext) -> Options {
    let mut options = canonical;

    let declared = ctx
        .declared_support
        .as_ref()
        .map(ThemeSupportArgs::implied_mode);
    if let Some(declared) = declared {
        if options.theme_support != TemplateMode::Reader {
            options.theme_support = declared;
        }
    }

    // The active theme cannot render its own reader view.
    if options.theme_support == TemplateMode::Reader && options.reader_theme == ctx.active_theme {
        if ctx.active_theme_is_core {
            debug!(theme = %ctx.active_theme, "reader theme is active; falling back to transitional");
            options.theme_support = TemplateMode::Transitional;
        } else {
            debug!(theme = %ctx.active_theme, "reader theme is active; falling back to legacy reader");
            options.reader_theme = LEGACY_READER_THEME.to_string();
        }
    }

    options
        .supported_post_types
        .retain(|p| ctx.registered_post_types.contains(p));
    options
        .supported_templates
        .retain(|t| ctx.template_conditions.contains(t));

    options
}

impl OptionsStoreTrait for OptionsStore {
    /// Returns the canonical, fully migrated options for the current site.
    ///
    /// The result is cached until the site signals change or a write happens.
    /// Migration results are not persisted by reading.
    fn get_options(&self) -> Options {
        let ctx = self.context();

        if let Some(cached) = self.cache.borrow().as_ref() {
            if cached.context == ctx {
                return cached.options.clone();
            }
        }

        let raw = match self.read_raw() {
            Ok(raw) => raw,
            Err(()) => return resolve_effective(migration::migrate(None, &ctx), &ctx),
        };

        let (canonical, notes) = migration::migrate_with_notes(raw.as_ref(), &ctx);
        let options = resolve_effective(canonical, &ctx);
        // The same stored problem comes back on every re-read; queue it once.
        let mut queued = self.messages.borrow_mut();
        for note in notes {
            if !queued.contains(&note) {
                queued.push(note);
            }
        }
        drop(queued);

        debug!(mode = %options.theme_support, "materialized options");
        *self.cache.borrow_mut() = Some(CachedOptions {
            context: ctx,
            options: options.clone(),
        });
        options
    }

    /// Returns a single option, or `false` if the name is unknown.
    fn get_option(&self, name: &str) -> Value {
        self.get_option_or(name, Value::Bool(false))
    }

    fn get_option_or(&self, name: &str, default: Value) -> Value {
        self.get_options().get(name).unwrap_or(default)
    }

    fn update_option(&self, name: &str, value: Value) -> bool {
        let mut partial = Map::new();
        partial.insert(name.to_string(), value);
        self.update_options(&partial)
    }

    /// Merges `partial` into the persisted options and writes the result.
    ///
    /// Returns true only if persisted state changed. Validation problems are
    /// recorded as messages and never fail the whole update. A failed write
    /// leaves the previously persisted blob in place and returns false.
    fn update_options(&self, partial: &Map<String, Value>) -> bool {
        let ctx = self.context();
        let raw = match self.read_raw() {
            Ok(raw) => raw,
            Err(()) => return false,
        };

        let current = migration::migrate(raw.as_ref(), &ctx);
        let mut messages = Vec::new();
        let mut next = validation::apply_update(&current, partial, &ctx, &mut messages);
        next.version = self.config.plugin_version.clone();

        for message in &messages {
            debug!(code = %message.code, "option validation message");
        }
        self.messages.borrow_mut().extend(messages);

        let blob = next.to_blob();
        if raw.as_ref() == Some(&blob) {
            debug!(option = %self.config.option_name, "options unchanged; skipping write");
            return false;
        }

        if let Err(e) = self.storage.write(&self.config.option_name, &blob) {
            warn!(option = %self.config.option_name, error = %e, "failed to persist options");
            return false;
        }
        info!(option = %self.config.option_name, "persisted options");
        self.clear_cache();

        let post_types_changed = current
            .supported_post_types
            .symmetric_difference(&next.supported_post_types)
            .next()
            .is_some();
        if post_types_changed {
            self.notifier.notify_routing_invalidated();
        }

        true
    }

    /// Deletes the persisted blob so every option reverts to its default.
    fn reset(&self) -> bool {
        match self.storage.delete(&self.config.option_name) {
            Ok(()) => {
                self.clear_cache();
                true
            }
            Err(e) => {
                warn!(option = %self.config.option_name, error = %e, "failed to delete options");
                false
            }
        }
    }

    /// Drains the recorded validation messages.
    fn take_messages(&self) -> Vec<ValidationMessage> {
        self.messages.borrow_mut().drain(..).collect()
    }
}
