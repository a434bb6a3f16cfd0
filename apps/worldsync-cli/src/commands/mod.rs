//! Import command shared by `members` and `worlds`.

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use worldsync_core::{run_members, run_worlds, ImportConfig, ImportKind, RunReport};
use worldsync_nakamura::NakamuraStore;

use crate::error::{CliError, CliResult};
use crate::input::read_rows;

/// Arguments for an import run
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import
    pub csv: PathBuf,

    /// JSON import configuration (server, role maps, templates)
    #[arg(long, short = 'c', env = "WORLDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write the run report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Execute one import run and print its report.
pub async fn execute(kind: ImportKind, args: ImportArgs) -> CliResult<()> {
    let config = load_config(args.config.as_deref())?;
    let rows = read_rows(&args.csv)?;
    let store = NakamuraStore::new(&config.server)?;

    info!(
        kind = kind.source_name(),
        file = %args.csv.display(),
        server = store.base_url(),
        rows = rows.len(),
        "Starting import"
    );

    let report = match kind {
        ImportKind::Members => run_members(&store, &config.members, rows).await,
        ImportKind::Worlds => run_worlds(&store, &config.worlds, rows).await,
    };

    println!("{}", report.render());
    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }

    if report.exceptional > 0 {
        return Err(CliError::Incomplete {
            exceptional: report.exceptional,
        });
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> CliResult<ImportConfig> {
    let mut config = match path {
        Some(path) => ImportConfig::from_file(path)?,
        None => ImportConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn write_report(path: &std::path::Path, report: &RunReport) -> CliResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "Report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_defaults_without_file() {
        let config = load_config(None).unwrap();
        assert!(config.members.role_maps.is_empty());
        assert!(config.worlds.custom_properties.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "worlds.csv": {{ "skipFirstRow": true, "customProperties": ["building"] }} }}"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(config.worlds.skip_first_row);
        assert_eq!(config.worlds.expected_columns(), 12);
    }

    #[test]
    fn test_write_report_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = RunReport::start("members.csv");
        report.record_created(3);
        report.finish();

        write_report(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["created"], 3);
    }
}
