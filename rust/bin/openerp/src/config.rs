//! Loader settings for one invocation: the optional config file first,
//! then command-line flags on top.

use std::path::{Path, PathBuf};

use clap::Args;
use openerp_core::{ConfigError, LoaderConfig};

/// Flags shared by every command that runs a load.
#[derive(Args, Debug, Clone, Default)]
pub struct LoadArgs {
    /// Addon roots, comma separated. The first root holding a module wins.
    #[arg(long = "addons-path", value_delimiter = ',')]
    pub addons_path: Vec<PathBuf>,

    /// Modules to install, comma separated.
    #[arg(short = 'i', long = "init", value_delimiter = ',')]
    pub init: Vec<String>,

    /// Do not check declared demo files.
    #[arg(long = "without-demo")]
    pub without_demo: bool,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,

    /// Manifest file name at each module root.
    #[arg(long = "manifest")]
    pub manifest: Option<String>,

    /// Directory holding model sources, relative to the module root.
    #[arg(long = "models-dir")]
    pub models_dir: Option<String>,
}

/// Build the loader configuration. Flags override the file.
pub fn resolve(config_path: Option<&Path>, args: &LoadArgs) -> Result<LoaderConfig, ConfigError> {
    let mut config = match config_path {
        Some(path) => LoaderConfig::load(path)?,
        None => LoaderConfig::default(),
    };

    if !args.addons_path.is_empty() {
        config.roots = args.addons_path.clone();
    }
    if !args.init.is_empty() {
        config.modules = args.init.clone();
    }
    if args.without_demo {
        config.with_demo = false;
    }
    if args.strict {
        config.warnings_as_errors = true;
    }
    if let Some(manifest) = &args.manifest {
        config.manifest_file = manifest.clone();
    }
    if let Some(dir) = &args.models_dir {
        config.models_dir = dir.clone();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loader.toml");
        std::fs::write(
            &path,
            "roots = [\"/srv/addons\"]\nmodules = [\"base\"]\nwith_demo = true\n",
        )
        .unwrap();

        let args = LoadArgs {
            init: vec!["sale".into()],
            without_demo: true,
            ..LoadArgs::default()
        };
        let config = resolve(Some(&path), &args).unwrap();
        assert_eq!(config.roots, vec![PathBuf::from("/srv/addons")]);
        assert_eq!(config.modules, vec!["sale".to_string()]);
        assert!(!config.with_demo);
        assert!(!config.warnings_as_errors);
    }

    #[test]
    fn no_file_uses_defaults() {
        let config = resolve(None, &LoadArgs::default()).unwrap();
        assert_eq!(config, LoaderConfig::default());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = PathBuf::from("/definitely/not/here.toml");
        assert!(matches!(
            resolve(Some(&path), &LoadArgs::default()),
            Err(ConfigError::Io { .. })
        ));
    }
}
