//! The classification-and-apply path of a watch session.
//!
//! A [`LiveSession`] resumes a build from its state file, classifies changed
//! paths with the session filter and reloads the affected local packages.
//! Each batch is fully applied before the next one is processed.

use std::collections::BTreeSet;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::{Config, LocalPackage};
use ckl_resources::output::{assets_output_dir, install_assets, locales_output_dir, write_locales};
use ckl_resources::{
    FinalLocaleCultureSet, FinalResourceAssetSet, FinalSet, LiveResources, ResourceError, ResourceKind,
};
use ckl_state::LiveState;
use tracing::{debug, info, trace, warn};

use crate::error::WatchError;
use crate::events::{ChangeEvent, FileEventBatch};
use crate::filter::{ChangeFilter, CompositeFilter, FolderFilter, LocalPackagesFilter};
use crate::watcher::minimal_roots;

/// What a session did for one change.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The path matched no filter.
    Ignored,

    /// The primary state file changed; the session must be reopened.
    Reset,

    /// A local package was reloaded and the view recomputed.
    Reloaded {
        /// The reloaded resource kind.
        kind: ResourceKind,
        /// The package.
        package: Arc<LocalPackage>,
    },

    /// The resource folder of a local package is gone; its contributions
    /// were dropped from the view.
    Removed {
        /// The removed resource kind.
        kind: ResourceKind,
        /// The package.
        package: Arc<LocalPackage>,
    },

    /// A local package changed outside of its resource folders.
    Unchanged {
        /// The package.
        package: Arc<LocalPackage>,
    },

    /// Reloading failed; the previous view is kept.
    ReloadFailed {
        /// The resource kind that failed.
        kind: ResourceKind,
        /// The package.
        package: Arc<LocalPackage>,
        /// Why.
        error: ResourceError,
    },

    /// A watched application folder changed.
    FolderChanged {
        /// The watched folder.
        folder: Utf8PathBuf,
        /// Path relative to the folder.
        sub_path: Utf8PathBuf,
    },
}

impl SessionOutcome {
    /// Returns `true` for [`SessionOutcome::Reset`].
    #[inline]
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        matches!(self, Self::Reset)
    }
}

/// Reloads one package needs for a batch.
struct Pending {
    package: Arc<LocalPackage>,
    kinds: BTreeSet<ResourceKind>,
}

/// A live session over a previously built application.
pub struct LiveSession {
    app_root: Utf8PathBuf,
    config: Config,
    locals: Vec<Arc<LocalPackage>>,
    locales: LiveResources<FinalLocaleCultureSet>,
    assets: LiveResources<FinalResourceAssetSet>,
    filter: Arc<CompositeFilter>,
    output: Option<Utf8PathBuf>,
}

impl LiveSession {
    /// Opens a session from a state file.
    ///
    /// Local packages are loaded from disk and both full views recomputed.
    /// The filter reports the state file, changes under local packages
    /// (except in the cache, output and watched folders of the application)
    /// and changes under each watched folder.
    ///
    /// # Errors
    ///
    /// [`WatchError::State`] when the state file is missing or malformed and
    /// [`WatchError::Resource`] when the current local content does not
    /// merge. Both call for a fresh build.
    pub fn open(state_file: &Utf8Path, app_root: &Utf8Path, config: &Config) -> Result<Self, WatchError> {
        let state = LiveState::read(state_file)?;
        let layout = &config.layout;
        let locales = LiveResources::new(state.locales, layout)?;
        let assets = LiveResources::new(state.assets, layout)?;

        let watched: Vec<Utf8PathBuf> = layout.watched_folders.iter().map(|f| app_root.join(f)).collect();
        let mut packages = LocalPackagesFilter::new(state_file, state.locals.clone())
            .exclude(app_root.join(&layout.cache_folder))
            .exclude(app_root.join(&layout.output_folder));
        for folder in &watched {
            packages = packages.exclude(folder.clone());
        }
        let filter = watched
            .into_iter()
            .fold(CompositeFilter::new().or(packages), |filter, folder| {
                filter.or(FolderFilter::new(folder))
            });

        info!(
            state_file = %state_file,
            locals = state.locals.len(),
            translations = locales.view().len(),
            assets = assets.view().len(),
            "Live session opened"
        );
        Ok(Self {
            app_root: app_root.to_owned(),
            config: config.clone(),
            locals: state.locals,
            locales,
            assets,
            filter: Arc::new(filter),
            output: None,
        })
    }

    /// Rewrites generated outputs under `dir` after each successful reload.
    #[must_use]
    pub fn with_output(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    /// Returns the shared session filter, to classify at the watch source.
    #[must_use]
    pub fn filter(&self) -> Arc<CompositeFilter> {
        Arc::clone(&self.filter)
    }

    /// Classifies one path.
    #[must_use]
    pub fn classify(&self, path: &Utf8Path) -> Option<ChangeEvent> {
        self.filter.classify(path)
    }

    /// Returns the existing directories a watcher must observe: the cache
    /// folder, local package roots and watched folders, without nesting.
    #[must_use]
    pub fn watch_roots(&self) -> Vec<Utf8PathBuf> {
        let layout = &self.config.layout;
        let cache = self.app_root.join(&layout.cache_folder);
        let watched: Vec<Utf8PathBuf> = layout.watched_folders.iter().map(|f| self.app_root.join(f)).collect();
        minimal_roots(
            std::iter::once(cache.as_path())
                .chain(self.locals.iter().map(|p| p.root()))
                .chain(watched.iter().map(Utf8PathBuf::as_path)),
        )
    }

    /// Returns the local packages of the session.
    #[must_use]
    pub fn locals(&self) -> &[Arc<LocalPackage>] {
        &self.locals
    }

    /// Returns the current locale view.
    #[must_use]
    pub fn locales(&self) -> &Arc<FinalLocaleCultureSet> {
        self.locales.view()
    }

    /// Returns the current asset view.
    #[must_use]
    pub fn assets(&self) -> &Arc<FinalResourceAssetSet> {
        self.assets.view()
    }

    /// Classifies and applies one path.
    pub fn handle_path(&mut self, path: &Utf8Path) -> Vec<SessionOutcome> {
        match self.classify(path) {
            Some(change) => self.process([change]),
            None => {
                trace!(path = %path, "Ignored change");
                vec![SessionOutcome::Ignored]
            }
        }
    }

    /// Applies a batch of classified events.
    pub fn process_batch(&mut self, batch: &FileEventBatch) -> Vec<SessionOutcome> {
        self.process(batch.iter().map(|e| e.change.clone()))
    }

    /// Applies a set of changes.
    ///
    /// A reset anywhere in the set wins and nothing else is applied. Otherwise
    /// each affected (package, kind) pair is reloaded once, in the order the
    /// packages were first seen.
    pub fn process(&mut self, changes: impl IntoIterator<Item = ChangeEvent>) -> Vec<SessionOutcome> {
        let mut pending: Vec<Pending> = Vec::new();
        let mut folders: Vec<(Utf8PathBuf, Utf8PathBuf)> = Vec::new();

        for change in changes {
            match change {
                ChangeEvent::PrimaryStateChanged => {
                    info!("State file changed, session reset");
                    return vec![SessionOutcome::Reset];
                }
                ChangeEvent::Local { package, sub_path } => {
                    let kinds = self.affected_kinds(&sub_path);
                    match pending.iter_mut().find(|p| p.package.idx() == package.idx()) {
                        Some(entry) => entry.kinds.extend(kinds),
                        None => pending.push(Pending {
                            package,
                            kinds: kinds.into_iter().collect(),
                        }),
                    }
                }
                ChangeEvent::Folder { folder, sub_path } => {
                    if !folders.iter().any(|(f, s)| *f == folder && *s == sub_path) {
                        folders.push((folder, sub_path));
                    }
                }
            }
        }

        let mut outcomes = Vec::with_capacity(pending.len() + folders.len());
        for Pending { package, kinds } in pending {
            if kinds.is_empty() {
                debug!(package = %package.name(), "Change outside resource folders");
                outcomes.push(SessionOutcome::Unchanged { package });
                continue;
            }
            for kind in kinds {
                outcomes.push(self.reload(kind, &package));
            }
        }
        outcomes.extend(
            folders
                .into_iter()
                .map(|(folder, sub_path)| SessionOutcome::FolderChanged { folder, sub_path }),
        );
        outcomes
    }

    /// The kinds touched by a package-relative path. The package root itself
    /// touches every kind.
    fn affected_kinds(&self, sub_path: &Utf8Path) -> Vec<ResourceKind> {
        if sub_path.as_str().is_empty() {
            return ResourceKind::ALL.to_vec();
        }
        ResourceKind::from_relative_path(sub_path.as_str(), &self.config.layout)
            .into_iter()
            .collect()
    }

    fn reload(&mut self, kind: ResourceKind, package: &Arc<LocalPackage>) -> SessionOutcome {
        let idx = package.idx();
        let result = match kind {
            ResourceKind::Locales => self.reload_locales(idx),
            ResourceKind::Assets => self.reload_assets(idx),
        };
        match result {
            Ok(Some(true)) => SessionOutcome::Reloaded {
                kind,
                package: Arc::clone(package),
            },
            Ok(Some(false)) => SessionOutcome::Removed {
                kind,
                package: Arc::clone(package),
            },
            Ok(None) => SessionOutcome::Unchanged {
                package: Arc::clone(package),
            },
            Err(error) => {
                warn!(kind = %kind, package = %package.name(), error = %error, "Reload failed, keeping previous state");
                SessionOutcome::ReloadFailed {
                    kind,
                    package: Arc::clone(package),
                    error,
                }
            }
        }
    }

    /// Returns `Ok(None)` when the package is not part of the segments and
    /// `Ok(Some(false))` when its resource folder is gone.
    fn reload_locales(&mut self, idx: usize) -> Result<Option<bool>, ResourceError> {
        if !self.locales.tracks(idx) {
            return Ok(None);
        }
        let found = self.locales.reload_local(idx)?;
        if let Some(output) = &self.output {
            let dir = locales_output_dir(output, &self.config.layout);
            if let Err(error) = write_locales(self.locales.view(), &dir) {
                warn!(dir = %dir, error = %error, "Failed to write locales");
            }
        }
        Ok(Some(found))
    }

    fn reload_assets(&mut self, idx: usize) -> Result<Option<bool>, ResourceError> {
        if !self.assets.tracks(idx) {
            return Ok(None);
        }
        let previous = Arc::clone(self.assets.view());
        let found = self.assets.reload_local(idx)?;
        if let Some(output) = &self.output {
            let dir = assets_output_dir(output);
            if let Err(error) = install_assets(self.assets.view(), Some(&previous), &dir) {
                warn!(dir = %dir, error = %error, "Failed to install assets");
            }
        }
        Ok(Some(found))
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("app_root", &self.app_root)
            .field("locals", &self.locals.len())
            .field("locales", &self.locales)
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}
