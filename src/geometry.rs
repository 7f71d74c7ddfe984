//! GeoJSON boundary loading.
//!
//! Each feature becomes one `(key, coordinates)` row, ready to be the right
//! side of [`crate::transform::join::left_join`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use polars::prelude::{DataFrame, NamedFrom, Series};
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::table::Table;

pub const GEOID: &str = "GEOID";
pub const COORDS: &str = "coords";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Json>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Json,
}

/// Parses a FeatureCollection into a `GEOID`/`coords` table.
///
/// The key is `prefix` followed by the feature's `properties.GEOID`
/// (string or number). `coords` holds the JSON text of
/// `geometry.coordinates`, or null for a feature without geometry.
/// Features without a `GEOID` are skipped.
pub fn parse_geojson(bytes: &[u8], prefix: &str) -> Result<Table> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)?;
    let mut ids: Vec<String> = Vec::new();
    let mut coords: Vec<Option<String>> = Vec::new();
    let mut skipped = 0usize;

    for feature in collection.features {
        let id = match feature.properties.get(GEOID) {
            Some(Json::String(s)) => s.clone(),
            Some(Json::Number(n)) => n.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };
        ids.push(format!("{prefix}{id}"));
        coords.push(
            feature
                .geometry
                .filter(|g| !g.coordinates.is_null())
                .map(|g| g.coordinates.to_string()),
        );
    }

    if skipped > 0 {
        warn!(skipped, "Features without GEOID skipped");
    }
    let table: Table = DataFrame::new(vec![
        Series::new(GEOID.into(), ids).into(),
        Series::new(COORDS.into(), coords).into(),
    ])?
    .into();
    debug!(features = table.len(), "Parsed boundary file");
    Ok(table)
}

/// Reads and parses a GeoJSON file from `path`.
#[tracing::instrument(skip(prefix), fields(path = %path.as_ref().display()))]
pub fn load_geojson(path: impl AsRef<Path>, prefix: &str) -> Result<Table> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading boundary file {}", path.display()))?;
    parse_geojson(&bytes, prefix)
        .with_context(|| format!("parsing boundary file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Column, ColumnType, Value};

    const COLLECTION: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"GEOID": "29510101100", "COUNTYFP": "510"},
             "geometry": {"type": "Polygon", "coordinates": [[[-90.2, 38.6], [-90.1, 38.6], [-90.2, 38.6]]]}},
            {"type": "Feature", "properties": {"GEOID": 29189210100}, "geometry": null},
            {"type": "Feature", "properties": {"NAME": "no id"},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]
    }"#;

    #[test]
    fn test_parse_geojson_keys_and_coords() {
        let table = parse_geojson(COLLECTION.as_bytes(), "1400000US").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(0, GEOID),
            Some(Value::Text("1400000US29510101100".into()))
        );
        assert_eq!(
            table.get(0, COORDS),
            Some(Value::Text("[[[-90.2,38.6],[-90.1,38.6],[-90.2,38.6]]]".into()))
        );
        assert_eq!(
            table.get(1, GEOID),
            Some(Value::Text("1400000US29189210100".into()))
        );
        assert_eq!(table.get(1, COORDS), Some(Value::Null));
    }

    #[test]
    fn test_parse_geojson_rejects_non_collection() {
        assert!(parse_geojson(b"{\"type\": \"Feature\"}", "").is_err());
    }

    #[test]
    fn test_parse_geojson_all_null_geometry_is_text() {
        let table = parse_geojson(
            br#"{"features": [{"properties": {"GEOID": "1"}, "geometry": null}]}"#,
            "",
        )
        .unwrap();
        assert_eq!(table.columns(), vec![Column::text(GEOID), Column::text(COORDS)]);
        assert_eq!(table.column(COORDS).unwrap().kind, ColumnType::Text);
    }
}
