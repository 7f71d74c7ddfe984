//! Run configuration.
//!
//! [`RunConfig`] carries everything a pipeline run needs: which survey
//! year and states to fetch, where files go and what they are called,
//! which metro area to cut out and where to find boundary geometry. Every
//! stage receives it explicitly.

mod metro;

pub use metro::{MetroArea, MetroCounty};

use std::path::PathBuf;

use anyhow::Result;

use crate::geo;

pub const DEFAULT_YEAR: u16 = 2018;
pub const DEFAULT_PREFIX: &str = "census";
pub const DEFAULT_GEO_ID_PREFIX: &str = "1400000US";

/// Level of a geography table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Tracts,
    Counties,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Tracts => "tracts",
            Granularity::Counties => "counties",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub year: u16,
    /// State scopes, already padded to 2 digits.
    pub states: Vec<String>,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub metro: MetroArea,
    /// GeoJSON boundary file joined onto the tract-level metro export.
    pub geometry: Option<PathBuf>,
    /// Prepended to each feature's `GEOID` to match `ACS_GEO_ID`.
    pub geo_id_prefix: String,
    pub gzip: bool,
    pub keep_state_files: bool,
    pub api_key: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            year: DEFAULT_YEAR,
            states: vec!["17".to_string(), "29".to_string()],
            output_dir: PathBuf::from("data"),
            prefix: DEFAULT_PREFIX.to_string(),
            metro: MetroArea::st_louis_core(),
            geometry: None,
            geo_id_prefix: DEFAULT_GEO_ID_PREFIX.to_string(),
            gzip: false,
            keep_state_files: false,
            api_key: None,
        }
    }
}

impl RunConfig {
    /// Replaces the state scopes, padding each to 2 digits.
    pub fn with_states<S: AsRef<str>>(mut self, states: &[S]) -> Result<Self> {
        self.states = states
            .iter()
            .map(|s| geo::state_code(s.as_ref()))
            .collect::<std::result::Result<_, _>>()?;
        Ok(self)
    }

    fn file(&self, stem: &str) -> PathBuf {
        let ext = if self.gzip { "csv.gz" } else { "csv" };
        self.output_dir.join(format!("{stem}.{ext}"))
    }

    /// Per-state tract export, e.g. `census_state_17.csv`.
    pub fn state_file(&self, state: &str) -> PathBuf {
        self.file(&format!("{}_state_{}", self.prefix, state))
    }

    /// All-states tract file or rolled-up county file.
    pub fn level_file(&self, level: Granularity) -> PathBuf {
        self.file(&format!("{}_{}", self.prefix, level.as_str()))
    }

    /// Metro-area cut of a level, e.g. `census_tracts_stl-core.csv`.
    pub fn metro_file(&self, level: Granularity) -> PathBuf {
        self.file(&format!(
            "{}_{}_{}",
            self.prefix,
            level.as_str(),
            self.metro.slug
        ))
    }

    /// Tract-level metro export with geometry attached.
    pub fn dataset_file(&self) -> PathBuf {
        self.file("dataset")
    }
}
