use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::acs;
use crate::config::{Granularity, RunConfig};
use crate::geometry::{self, GEOID};
use crate::ingest::ingest;
use crate::output::{concat_files, read_table, remove_files, write_table};
use crate::services::data_source::DataSource;
use crate::table::Table;
use crate::transform::filter::filter_to_metro;
use crate::transform::join::left_join;
use crate::transform::metrics::derive_acs;
use crate::transform::rollup::rollup;

/// Fetches every configured state and writes one tract file per state.
///
/// States the source has no data for are logged and skipped. Returns the
/// paths written, in state order.
#[tracing::instrument(skip_all, fields(year = config.year, states = ?config.states))]
pub async fn fetch_states<S: DataSource + Sync>(source: &S, config: &RunConfig) -> Result<Vec<PathBuf>> {
    let variables = acs::variable_codes();
    let mut written = Vec::new();

    for state in &config.states {
        let Some(raw) = source.fetch_state(state, &variables).await? else {
            warn!(state = %state, "No scope at state, skipping");
            continue;
        };

        let table = ingest(&raw, config.year)
            .with_context(|| format!("cleaning census data for state {state}"))?;
        let path = config.state_file(state);
        write_table(&path, &table)?;

        info!(state = %state, rows = table.len(), path = %path.display(), "State export complete");
        written.push(path);
    }

    Ok(written)
}

/// Concatenates the per-state `files` written by [`fetch_states`] into the
/// tract-level file, then removes them unless configured to keep them.
///
/// Other files in the output directory, including state files left by
/// earlier runs, are never read.
#[tracing::instrument(skip_all, fields(dir = %config.output_dir.display(), files = files.len()))]
pub fn stitch_states(config: &RunConfig, files: &[PathBuf]) -> Result<Table> {
    let tracts = concat_files(files, &acs::schema())?;

    let path = config.level_file(Granularity::Tracts);
    write_table(&path, &tracts)?;
    info!(files = files.len(), rows = tracts.len(), path = %path.display(), "Tract-level file written");

    if !config.keep_state_files {
        remove_files(files)?;
        info!(files = files.len(), "Individual state-level files removed");
    }
    Ok(tracts)
}

/// Rolls tract rows up to counties and writes the county-level file.
#[tracing::instrument(skip_all, fields(rows = tracts.len()))]
pub fn rollup_counties(tracts: &Table, config: &RunConfig) -> Result<Table> {
    let counties = rollup(tracts, &acs::rollup_policy()).context("rolling tracts up to counties")?;

    let path = config.level_file(Granularity::Counties);
    write_table(&path, &counties)?;
    info!(rows = counties.len(), path = %path.display(), "County-level file written");
    Ok(counties)
}

/// Cuts `table` down to the configured metro area, derives the metrics and
/// writes the result.
///
/// For tract tables with a boundary file configured, geometry is joined on
/// `ACS_GEO_ID` and written to the dataset file as well.
#[tracing::instrument(skip_all, fields(level = level.as_str(), metro = %config.metro.slug))]
pub fn metro_cut(table: &Table, level: Granularity, config: &RunConfig) -> Result<Table> {
    let metro = filter_to_metro(table, &config.metro)?;
    let derived = derive_acs(&metro).with_context(|| format!("deriving metrics for {}", level.as_str()))?;

    let path = config.metro_file(level);
    write_table(&path, &derived)?;
    info!(rows = derived.len(), path = %path.display(), "Metro export complete");

    match (&config.geometry, level) {
        (Some(boundaries), Granularity::Tracts) => {
            let shapes = geometry::load_geojson(boundaries, &config.geo_id_prefix)?;
            let dataset = left_join(&derived, acs::GEO_ID, &shapes, GEOID)?;

            let path = config.dataset_file();
            write_table(&path, &dataset)?;
            info!(rows = dataset.len(), path = %path.display(), "Geometry dataset written");
            Ok(dataset)
        }
        _ => Ok(derived),
    }
}

/// Reads a previously exported table of `level`.
pub fn load_level(config: &RunConfig, level: Granularity) -> Result<Table> {
    read_table(config.level_file(level), &acs::schema())
}

/// Fetch, stitch, roll up and cut both levels to the metro area.
pub async fn run<S: DataSource + Sync>(source: &S, config: &RunConfig) -> Result<()> {
    let files = fetch_states(source, config).await?;
    if files.is_empty() {
        warn!("No state returned data; nothing to process");
        return Ok(());
    }

    let tracts = stitch_states(config, &files)?;
    let counties = rollup_counties(&tracts, config)?;

    metro_cut(&tracts, Granularity::Tracts, config)?;
    metro_cut(&counties, Granularity::Counties, config)?;

    info!(dir = %config.output_dir.display(), "Pipeline complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawResponse;
    use crate::table::Value;
    use std::env;
    use std::fs;

    /// Serves four tracts of Missouri; every other state has no data.
    struct FixedSource;

    // (county, tract, total, black, income)
    const TRACTS: [(&str, &str, &str, &str, &str); 4] = [
        ("510", "101100", "100", "60", "30000"),
        ("510", "101200", "300", "90", "50000"),
        ("189", "210100", "200", "20", "-666666666"),
        ("99", "700100", "50", "5", "60000"),
    ];

    #[async_trait::async_trait]
    impl DataSource for FixedSource {
        async fn fetch_state(&self, state: &str, variables: &[&str]) -> Result<Option<RawResponse>> {
            if state != "29" {
                return Ok(None);
            }
            let mut header: Vec<String> = variables.iter().map(|v| v.to_string()).collect();
            header.extend(["state", "county", "tract"].map(String::from));

            let rows = TRACTS
                .iter()
                .map(|(county, tract, total, black, income)| {
                    let mut row: Vec<String> = variables
                        .iter()
                        .map(|code| match *code {
                            "NAME" => format!("Census Tract {tract}"),
                            "GEO_ID" => format!("1400000US29{county:0>3}{tract}"),
                            "S0701_C01_016E" => black.to_string(),
                            "S0601_C01_047E" => income.to_string(),
                            c if acs::variable_by_code(c)
                                .is_some_and(|v| v.kind == crate::table::ColumnType::Float) =>
                            {
                                "35.5".to_string()
                            }
                            _ => total.to_string(),
                        })
                        .collect();
                    row.extend([state.to_string(), county.to_string(), tract.to_string()]);
                    row
                })
                .collect();

            Ok(Some(RawResponse { header, rows }))
        }
    }

    fn temp_config(name: &str) -> RunConfig {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        RunConfig {
            output_dir: dir,
            ..Default::default()
        }
    }

    fn cleanup(config: &RunConfig) {
        fs::remove_dir_all(&config.output_dir).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_skips_missing_scopes() {
        let config = temp_config("acs_rollup_test_pipeline_fetch");

        let written = fetch_states(&FixedSource, &config).await.unwrap();
        assert_eq!(written, vec![config.state_file("29")]);
        assert!(config.state_file("29").exists());
        assert!(!config.state_file("17").exists());

        cleanup(&config);
    }

    #[tokio::test]
    async fn test_stitch_removes_state_files() {
        let config = temp_config("acs_rollup_test_pipeline_stitch");

        let files = fetch_states(&FixedSource, &config).await.unwrap();
        let tracts = stitch_states(&config, &files).unwrap();

        assert_eq!(tracts.len(), 4);
        assert_eq!(tracts.get(3, "COUNTY"), Some(Value::Text("099".into())));
        assert!(!config.state_file("29").exists());
        assert!(config.level_file(Granularity::Tracts).exists());

        cleanup(&config);
    }

    #[tokio::test]
    async fn test_stitch_ignores_stale_state_files() {
        let earlier = RunConfig {
            keep_state_files: true,
            ..temp_config("acs_rollup_test_pipeline_stale")
        };
        let config = RunConfig {
            gzip: true,
            ..earlier.clone()
        };

        // a plain-text export of the same state from an earlier run
        fetch_states(&FixedSource, &earlier).await.unwrap();
        let files = fetch_states(&FixedSource, &config).await.unwrap();
        let tracts = stitch_states(&config, &files).unwrap();

        assert_eq!(files, vec![config.state_file("29")]);
        assert_eq!(tracts.len(), 4);
        assert!(earlier.state_file("29").exists());

        cleanup(&config);
    }

    #[tokio::test]
    async fn test_run_writes_every_level() {
        let config = temp_config("acs_rollup_test_pipeline_run");

        run(&FixedSource, &config).await.unwrap();

        let counties = load_level(&config, Granularity::Counties).unwrap();
        assert_eq!(counties.len(), 3);
        assert_eq!(counties.get(0, "STATECOUNTY"), Some(Value::Text("29510".into())));
        assert_eq!(counties.get(0, acs::N_RACE_BLACK), Some(Value::Int(150)));
        assert_eq!(counties.get(0, acs::MED_INCOME), Some(Value::Float(40000.0)));
        assert_eq!(counties.get(1, acs::MED_INCOME), Some(Value::Null));

        let metro = read_table(config.metro_file(Granularity::Counties), &acs::schema()).unwrap();
        assert_eq!(metro.len(), 2);
        assert_eq!(metro.get(0, "PCT_BLACK"), Some(Value::Float(0.375)));
        assert_eq!(metro.get(0, "COUNTY_NAME"), Some(Value::Text("St. Louis City".into())));

        let tracts = read_table(config.metro_file(Granularity::Tracts), &acs::schema()).unwrap();
        assert_eq!(tracts.len(), 3);
        assert_eq!(tracts.get(0, "bucket_idx"), Some(Value::Int(4)));
        assert_eq!(tracts.get(2, "bucket_idx"), Some(Value::Null));

        cleanup(&config);
    }
}
