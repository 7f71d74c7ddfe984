use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::geo;

/// A county that belongs to a metro area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetroCounty {
    pub state: String,
    pub county: String,
    pub name: String,
}

/// A caller-named set of counties, e.g. a metropolitan statistical area.
///
/// Stored as a JSON object on disk:
/// ```json
/// {
///   "slug": "stl-core",
///   "name": "St. Louis",
///   "counties": [
///     { "state": "29", "county": "510", "name": "St. Louis City" },
///     { "state": "29", "county": "189", "name": "St. Louis County" }
///   ]
/// }
/// ```
/// State and county codes are re-padded on load, so `"17"`/`"5"` and
/// `"17"`/`"005"` name the same county.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetroArea {
    pub slug: String,
    pub name: String,
    pub counties: Vec<MetroCounty>,
}

impl MetroArea {
    /// Loads a metro area definition from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading metro area file '{path}'"))?;
        let area: MetroArea = serde_json::from_str(&content)
            .with_context(|| format!("parsing metro area file '{path}'"))?;
        area.normalized()
    }

    /// Resolves a built-in area by slug.
    pub fn builtin(slug: &str) -> Result<Self> {
        match slug {
            "stl-core" => Ok(Self::st_louis_core()),
            "stl-msa" => Ok(Self::st_louis_msa()),
            other => bail!("unknown built-in metro area '{other}' (expected stl-core or stl-msa)"),
        }
    }

    /// St. Louis City and St. Louis County.
    pub fn st_louis_core() -> Self {
        Self::from_static(
            "stl-core",
            "St. Louis",
            &[("29", "510", "St. Louis City"), ("29", "189", "St. Louis County")],
        )
    }

    /// The 15-county St. Louis metropolitan statistical area.
    pub fn st_louis_msa() -> Self {
        Self::from_static(
            "stl-msa",
            "St. Louis MSA",
            &[
                ("17", "005", "Bond"),
                ("17", "013", "Calhoun"),
                ("17", "027", "Clinton"),
                ("17", "083", "Jersey"),
                ("17", "117", "Macoupin"),
                ("17", "119", "Madison"),
                ("17", "133", "Monroe"),
                ("17", "163", "St. Clair"),
                ("29", "071", "Franklin"),
                ("29", "099", "Jefferson"),
                ("29", "113", "Lincoln"),
                ("29", "183", "St. Charles"),
                ("29", "510", "St. Louis City"),
                ("29", "189", "St. Louis County"),
                ("29", "219", "Warren"),
            ],
        )
    }

    fn from_static(slug: &str, name: &str, counties: &[(&str, &str, &str)]) -> Self {
        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            counties: counties
                .iter()
                .map(|(state, county, name)| MetroCounty {
                    state: state.to_string(),
                    county: county.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    fn normalized(mut self) -> Result<Self> {
        if self.slug.trim().is_empty() {
            bail!("metro area '{}' has an empty slug", self.name);
        }
        for c in &mut self.counties {
            c.state = geo::state_code(&c.state)?;
            c.county = geo::county_code(&c.county)?;
        }
        Ok(self)
    }

    /// Composite `STATECOUNTY` keys of every member county.
    pub fn keys(&self) -> HashSet<String> {
        self.counties
            .iter()
            .map(|c| format!("{}{}", c.state, c.county))
            .collect()
    }

    /// `STATECOUNTY` key → county name.
    pub fn names(&self) -> HashMap<String, String> {
        self.counties
            .iter()
            .map(|c| (format!("{}{}", c.state, c.county), c.name.clone()))
            .collect()
    }

    /// Distinct state codes the area spans, in first-appearance order.
    pub fn states(&self) -> Vec<String> {
        let mut states: Vec<String> = Vec::new();
        for c in &self.counties {
            if !states.contains(&c.state) {
                states.push(c.state.clone());
            }
        }
        states
    }
}
