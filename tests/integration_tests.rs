use std::env;
use std::fs;

use acs_rollup::acs;
use acs_rollup::config::MetroArea;
use acs_rollup::geometry::{COORDS, GEOID, parse_geojson};
use acs_rollup::ingest::ingest;
use acs_rollup::output::{read_table, write_table};
use acs_rollup::parser::parse_response;
use acs_rollup::table::{Column, Table, Value};
use acs_rollup::transform::filter::{COUNTY_NAME, filter_to_metro};
use acs_rollup::transform::join::left_join;
use acs_rollup::transform::metrics::{derive_acs, derive_metrics};
use acs_rollup::transform::rollup::rollup;
use acs_rollup::transform::types::{Aggregation, AggregationPolicy, MetricDef};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn test_two_tracts_roll_up_to_one_county() {
    let tracts = Table::from_rows(
        vec![
            Column::text("STATE"),
            Column::text("COUNTY"),
            Column::text("TRACT"),
            Column::integer(acs::N_RACE_BLACK),
            Column::integer(acs::N_RACE_TOTAL_POP),
        ],
        vec![
            vec![text("17"), text("119"), text("5"), Value::Int(10), Value::Int(100)],
            vec![text("17"), text("119"), text("6"), Value::Int(20), Value::Int(50)],
        ],
    )
    .unwrap();

    let policy = AggregationPolicy::new("STATECOUNTY")
        .with_all([acs::N_RACE_BLACK, acs::N_RACE_TOTAL_POP], Aggregation::Sum);
    let counties = rollup(&tracts, &policy).unwrap();

    assert_eq!(counties.len(), 1);
    assert_eq!(counties.get(0, "STATECOUNTY"), Some(text("17119")));
    assert_eq!(counties.get(0, acs::N_RACE_BLACK), Some(Value::Int(30)));
    assert_eq!(counties.get(0, acs::N_RACE_TOTAL_POP), Some(Value::Int(150)));

    let pct = MetricDef::ratio("PCT_BLACK", &[acs::N_RACE_BLACK], &[acs::N_RACE_TOTAL_POP]);
    let derived = derive_metrics(&counties, &[pct]).unwrap();
    assert_eq!(derived.get(0, "PCT_BLACK"), Some(Value::Float(0.2)));
}

#[test]
fn test_fixture_response_through_every_stage() {
    let raw = parse_response(include_bytes!("fixtures/acs_response.json")).unwrap();
    let tracts = ingest(&raw, 2018).unwrap();

    assert_eq!(tracts.len(), 5);
    // state/county/tract arrive as bare JSON numbers for the Illinois rows
    assert_eq!(tracts.get(4, "COUNTY"), Some(text("005")));
    assert_eq!(tracts.get(4, "TRACT"), Some(text("950100")));
    assert_eq!(tracts.get(2, acs::MED_INCOME), Some(Value::Null));

    let counties = rollup(&tracts, &acs::rollup_policy()).unwrap();
    let keys: Vec<_> = (0..counties.len())
        .map(|r| counties.get(r, "STATECOUNTY").unwrap().to_string())
        .collect();
    assert_eq!(keys, vec!["29510", "29189", "17119", "17005"]);
    assert!(counties.column("TRACT").is_none());
    assert!(counties.column(acs::GEO_ID).is_none());
    assert_eq!(counties.get(0, acs::N_RACE_BLACK), Some(Value::Int(2650)));
    assert_eq!(counties.get(0, acs::MED_INCOME), Some(Value::Float(41500.0)));
    assert_eq!(counties.get(1, acs::MED_INCOME), Some(Value::Null));

    let metro = derive_acs(&filter_to_metro(&counties, &MetroArea::st_louis_msa()).unwrap()).unwrap();
    assert_eq!(metro.len(), 4);
    assert_eq!(metro.get(0, COUNTY_NAME), Some(text("St. Louis City")));
    assert_eq!(metro.get(3, COUNTY_NAME), Some(text("Bond")));
    assert_eq!(metro.get(0, "PCT_BLACK"), Some(Value::Float(0.6625)));
    assert_eq!(metro.get(0, "bucket_idx"), Some(Value::Int(6)));
    assert_eq!(metro.get(0, "bucket"), Some(text("(39000, 46000]")));
    assert_eq!(metro.get(1, "bucket_idx"), Some(Value::Null));
    assert_eq!(metro.get(3, "midpoint"), Some(Value::Float(56500.0)));

    let core = filter_to_metro(&tracts, &MetroArea::st_louis_core()).unwrap();
    assert_eq!(core.len(), 3);

    let shapes = parse_geojson(include_bytes!("fixtures/tracts.geojson"), "1400000US").unwrap();
    let tract_metro = derive_acs(&filter_to_metro(&tracts, &MetroArea::st_louis_msa()).unwrap()).unwrap();
    let dataset = left_join(&tract_metro, acs::GEO_ID, &shapes, GEOID).unwrap();

    assert_eq!(dataset.len(), 5);
    assert!(matches!(dataset.get(0, COORDS), Some(Value::Text(_))));
    assert_eq!(dataset.get(2, COORDS), Some(Value::Null));
    assert!(matches!(dataset.get(3, COORDS), Some(Value::Text(_))));
    assert_eq!(dataset.get(4, COORDS), Some(Value::Null));

    let path = env::temp_dir().join("acs_rollup_it_counties.csv.gz");
    let _ = fs::remove_file(&path);
    write_table(&path, &metro).unwrap();
    let back = read_table(&path, &acs::schema()).unwrap();
    assert_eq!(back, metro);
    fs::remove_file(&path).unwrap();
}
