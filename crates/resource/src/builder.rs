//! Manifest resolution across library paths and share libraries.

use gantry_core::config::ExecConfig;
use gantry_core::context::Context;
use gantry_core::definition::ActionDefinition;
use gantry_core::keys;
use gantry_core::settings::EngineSettings;
use gantry_core::storage::{StorageError, join};
use tracing::{debug, warn};

use crate::entry::{Manifest, ResourceEntry};
use crate::error::ResourceError;

/// Per-type inputs the manifest builder needs from the action kind.
#[derive(Debug, Clone, Copy)]
pub struct KindHints<'a> {
    /// The action's type tag.
    pub type_tag: &'a str,
    /// Share-library name resolved when no configuration names one.
    pub default_sharelib: Option<&'a str>,
    /// Display names that are configuration files: a share-library
    /// file matching one is merged into the action configuration
    /// instead of being localized.
    pub config_file_names: &'a [&'a str],
}

/// Resolves the launcher's localization set.
///
/// Resolution order: workflow libraries, extra launcher library
/// directories, explicit file and archive declarations, action share
/// libraries, the system common library. Missing optional directories
/// are skipped; unreachable storage fails the build.
#[derive(Debug, Clone, Copy)]
pub struct ManifestBuilder<'a> {
    settings: &'a EngineSettings,
}

impl<'a> ManifestBuilder<'a> {
    /// Create a builder over the engine settings.
    #[must_use]
    pub fn new(settings: &'a EngineSettings) -> Self {
        Self { settings }
    }

    /// Build the manifest for one submission.
    ///
    /// Share-library configuration files are merged into `action_conf`
    /// as defaults, which is why the configuration is taken mutably.
    pub async fn build(
        &self,
        ctx: &dyn Context,
        def: &ActionDefinition,
        action_conf: &mut ExecConfig,
        hints: &KindHints<'_>,
    ) -> Result<Manifest, ResourceError> {
        let mut manifest = Manifest::new();
        let app_path = ctx.workflow().app_path.clone();

        for dir in ctx.proto_config().get_list(keys::WORKFLOW_LIB_PATHS) {
            self.add_directory(ctx, dir, &mut manifest).await?;
        }

        let extra_dirs: Vec<String> = action_conf
            .get_list(keys::LAUNCHER_LIB_PATH)
            .into_iter()
            .map(str::to_owned)
            .collect();
        for dir in &extra_dirs {
            self.add_directory(ctx, dir, &mut manifest).await?;
        }

        for declared in split_declarations(&def.files) {
            let path = self.resolve_declaration(ctx, &app_path, &declared)?;
            manifest.add(ResourceEntry::file(&path));
        }
        for declared in split_declarations(&def.archives) {
            let path = self.resolve_declaration(ctx, &app_path, &declared)?;
            manifest.add(ResourceEntry::archive(&path));
        }

        if self.system_libpath_enabled(ctx, action_conf) {
            self.add_share_libraries(ctx, action_conf, hints, &mut manifest)
                .await?;
            self.add_system_library(ctx, &mut manifest).await?;
        }

        debug!(
            action = %def.name,
            entries = manifest.len(),
            "resolved resource manifest"
        );
        Ok(manifest)
    }

    /// Add every file directly under `dir` as a generic entry. A
    /// missing directory is skipped, not an error.
    async fn add_directory(
        &self,
        ctx: &dyn Context,
        dir: &str,
        manifest: &mut Manifest,
    ) -> Result<(), ResourceError> {
        let Some(paths) = self.list_optional(ctx, dir).await? else {
            debug!(dir, "library directory absent, skipping");
            return Ok(());
        };
        for path in paths {
            manifest.add(ResourceEntry::file(&path));
        }
        Ok(())
    }

    /// Evaluate and resolve one file/archive declaration.
    fn resolve_declaration(
        &self,
        ctx: &dyn Context,
        app_path: &str,
        declared: &str,
    ) -> Result<String, ResourceError> {
        let evaluated = ctx.evaluate(declared)?;
        let path_part = evaluated.split('#').next().unwrap_or_default();
        if path_part.trim().is_empty() {
            return Err(ResourceError::MalformedPath {
                path: declared.to_owned(),
                detail: "empty path".to_owned(),
            });
        }
        if evaluated.starts_with('/') || evaluated.contains("://") {
            Ok(evaluated)
        } else {
            Ok(join(app_path, &evaluated))
        }
    }

    /// Resolve the action's share libraries, preferring their entries
    /// over generically declared ones. Files whose display name the
    /// kind declares as a configuration file are merged into the action
    /// configuration instead of localized.
    async fn add_share_libraries(
        &self,
        ctx: &dyn Context,
        action_conf: &mut ExecConfig,
        hints: &KindHints<'_>,
        manifest: &mut Manifest,
    ) -> Result<(), ResourceError> {
        let Some(root) = &self.settings.sharelib_root else {
            debug!("no share-library root deployed, skipping");
            return Ok(());
        };
        for name in self.sharelib_names(ctx, action_conf, hints) {
            let dir = join(root, &name);
            let Some(paths) = self.list_optional(ctx, &dir).await? else {
                warn!(library = %name, dir, "declared share library absent");
                continue;
            };
            for path in paths {
                let base = path.rsplit('/').next().unwrap_or(&path);
                if hints.config_file_names.contains(&base) {
                    self.inject_library_config(ctx, &path, action_conf).await?;
                } else {
                    manifest.add_preferred(ResourceEntry::file(&path));
                }
            }
        }
        Ok(())
    }

    /// Localize the system-wide common library. Enabled means required:
    /// a missing or empty common directory fails the build.
    async fn add_system_library(
        &self,
        ctx: &dyn Context,
        manifest: &mut Manifest,
    ) -> Result<(), ResourceError> {
        let Some(root) = &self.settings.sharelib_root else {
            return Ok(());
        };
        let dir = join(root, &self.settings.system_lib_dir);
        let paths = self
            .list_optional(ctx, &dir)
            .await?
            .ok_or_else(|| ResourceError::MissingSystemSharelib(dir.clone()))?;
        if paths.is_empty() {
            return Err(ResourceError::MissingSystemSharelib(dir));
        }
        for path in paths {
            manifest.add_preferred(ResourceEntry::file(&path));
        }
        Ok(())
    }

    /// Parse a share-library configuration file and default-merge it.
    async fn inject_library_config(
        &self,
        ctx: &dyn Context,
        path: &str,
        action_conf: &mut ExecConfig,
    ) -> Result<(), ResourceError> {
        let bytes = ctx
            .storage()
            .read(path)
            .await
            .map_err(|source| ResourceError::Storage {
                path: path.to_owned(),
                source,
            })?;
        let layer: ExecConfig =
            serde_json::from_slice(&bytes).map_err(|err| ResourceError::MalformedLibraryConfig {
                path: path.to_owned(),
                detail: err.to_string(),
            })?;
        debug!(path, entries = layer.len(), "injecting library configuration");
        action_conf.inject_defaults(&layer);
        Ok(())
    }

    /// Share-library names for this action: action configuration, then
    /// job configuration, then engine settings, then the kind default.
    fn sharelib_names(
        &self,
        ctx: &dyn Context,
        action_conf: &ExecConfig,
        hints: &KindHints<'_>,
    ) -> Vec<String> {
        let key = format!("{}{}", keys::SHARELIB_FOR_PREFIX, hints.type_tag);
        let named = action_conf
            .get(&key)
            .or_else(|| ctx.workflow().conf.get(&key))
            .or_else(|| self.settings.type_sharelibs.get(hints.type_tag).map(String::as_str))
            .or(hints.default_sharelib);
        named
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// System-library use: action configuration, then job
    /// configuration, then the engine default.
    fn system_libpath_enabled(&self, ctx: &dyn Context, action_conf: &ExecConfig) -> bool {
        match action_conf.get(keys::USE_SYSTEM_LIBPATH) {
            Some("true") => true,
            Some("false") => false,
            _ => match ctx.workflow().conf.get(keys::USE_SYSTEM_LIBPATH) {
                Some("true") => true,
                Some("false") => false,
                _ => self.settings.use_system_libpath,
            },
        }
    }

    async fn list_optional(
        &self,
        ctx: &dyn Context,
        dir: &str,
    ) -> Result<Option<Vec<String>>, ResourceError> {
        match ctx.storage().list(dir).await {
            Ok(paths) => Ok(Some(paths)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(source) => Err(ResourceError::Storage {
                path: dir.to_owned(),
                source,
            }),
        }
    }
}

/// Flatten declaration entries, each possibly a comma-separated list.
fn split_declarations(declared: &[String]) -> Vec<String> {
    declared
        .iter()
        .flat_map(|entry| entry.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}
