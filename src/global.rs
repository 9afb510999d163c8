//! Process-wide default resolver and convenience API.
//!
//! The resolver itself is immutable. Reloading builds a complete new
//! resolver and swaps it in atomically, so a lookup sees either the old data
//! or the new data, never a mix.

use arc_swap::ArcSwapOption;
use once_cell::sync::{Lazy, OnceCell};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::loader;
use crate::resolver::{Bundle, BundleResolver, EngineConfig};

/// A swappable resolver plus the outcome of its one-time default load.
struct ResolverSlot {
    resolver: ArcSwapOption<BundleResolver>,
    /// Set once; holds the load error message if the default load failed
    init: OnceCell<Option<String>>,
}

impl ResolverSlot {
    fn new() -> Self {
        Self {
            resolver: ArcSwapOption::empty(),
            init: OnceCell::new(),
        }
    }

    /// Run `load` once, unless a resolver is already installed.
    fn ensure_with<F>(&self, load: F)
    where
        F: FnOnce() -> Result<BundleResolver>,
    {
        self.init.get_or_init(|| {
            if self.resolver.load().is_some() {
                return None;
            }
            match load() {
                Ok(resolver) => {
                    self.install(resolver);
                    None
                }
                Err(e) => {
                    log::error!("Failed to initialize netblock resolver: {}", e);
                    Some(e.to_string())
                }
            }
        });
    }

    fn install(&self, resolver: BundleResolver) {
        self.resolver.store(Some(Arc::new(resolver)));
    }

    fn current(&self) -> Result<Arc<BundleResolver>> {
        if let Some(resolver) = self.resolver.load_full() {
            return Ok(resolver);
        }
        match self.init.get() {
            Some(Some(message)) => Err(Error::InitFailed(message.clone())),
            _ => Err(Error::NotInitialized),
        }
    }
}

/// Global resolver
static GLOBAL_RESOLVER: Lazy<ResolverSlot> = Lazy::new(ResolverSlot::new);

/// Ensure the global resolver is initialized.
///
/// Loads the embedded data set with the default configuration unless a
/// resolver has already been installed. This is called lazily by
/// [`resolve`] and [`classify`], but can be called explicitly at startup.
/// A failed load is remembered and reported by [`current`].
pub fn ensure_initialized() {
    GLOBAL_RESOLVER.ensure_with(|| loader::load_embedded(EngineConfig::default()));
}

/// Check if the global resolver is initialized.
pub fn is_initialized() -> bool {
    GLOBAL_RESOLVER.resolver.load().is_some()
}

/// Replace the global resolver with one the caller built.
pub fn install(resolver: BundleResolver) {
    GLOBAL_RESOLVER.install(resolver);
}

/// Reload the global resolver from the embedded data set.
pub fn reload_embedded(config: EngineConfig) -> Result<()> {
    let resolver = loader::load_embedded(config)?;
    install(resolver);
    Ok(())
}

/// Reload the global resolver from files.
///
/// On error the current resolver stays in place.
pub fn reload_from_files(
    netblocks: impl AsRef<Path>,
    isps: impl AsRef<Path>,
    config: EngineConfig,
) -> Result<()> {
    let resolver = loader::load_files(netblocks, isps, config)?;
    install(resolver);
    log::debug!("Reloaded global netblock resolver");
    Ok(())
}

/// Get the current global resolver.
///
/// Returns [`Error::InitFailed`] with the load error if the embedded data
/// could not be loaded and nothing has been installed since.
pub fn current() -> Result<Arc<BundleResolver>> {
    ensure_initialized();
    GLOBAL_RESOLVER.current()
}

/// Resolve an address with the global resolver.
///
/// # Examples
/// ```
/// let bundle = netblock::resolve("203.167.129.4", Some("NZ")).unwrap();
/// assert_eq!(bundle.isp_name, "TelstraClear New Zealand");
/// ```
pub fn resolve(address: &str, country: Option<&str>) -> Result<Bundle> {
    current()?.resolve(address, country)
}

/// Classify an address with the global resolver.
pub fn classify(address: &str) -> Result<i32> {
    current()?.classify(address)
}
