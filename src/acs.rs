//! American Community Survey 5-year subject-table variables.
//!
//! The catalog maps every requested API variable code to the column name
//! used in exported tables and declares its type. [`schema`] and
//! [`rollup_policy`] are both derived from it so the three cannot drift
//! apart.

use crate::geo;
use crate::geometry::COORDS;
use crate::table::{ColumnType, Schema};
use crate::transform::filter::COUNTY_NAME;
use crate::transform::histogram::{BUCKET, BUCKET_IDX, MIDPOINT};
use crate::transform::metrics::acs_metrics;
use crate::transform::types::{Aggregation, AggregationPolicy};

pub const YEAR: &str = "Year";
pub const NAME: &str = "NAME";
pub const GEO_ID: &str = "ACS_GEO_ID";

pub const N_TOTAL_POP: &str = "ACS_N_TOTAL_POP";
pub const N_RACE_TOTAL_POP: &str = "ACS_N_RACE_TOTAL_POP";
pub const N_RACE_WHITE: &str = "ACS_N_RACE_WHITE";
pub const N_RACE_BLACK: &str = "ACS_N_RACE_BLACK";
pub const MED_INCOME: &str = "ACS_MED_INCOME";
pub const N_POVERTY_STAT: &str = "ACS_N_POVERTY_STAT";
pub const N_POVERTY_BELOW_100: &str = "ACS_N_POVERTY_STAT_BELOW_100_PCT";
pub const N_INSURED_NON_INST: &str = "ACS_N_INSURED_NON_INST";
pub const N_DISABIL_Y: &str = "ACS_N_DISABIL_Y";
pub const N_DISABIL_N: &str = "ACS_N_DISABIL_N";

/// Cell values the API uses for "no estimate". Blank cells are treated the
/// same way.
pub const NULL_TOKENS: &[&str] = &[
    "-666666666",
    "-666666666.0",
    "-999999999",
    "-888888888",
    "-555555555",
    "-222222222",
];

/// One requested variable.
#[derive(Debug, Clone, Copy)]
pub struct Variable {
    pub code: &'static str,
    pub name: &'static str,
    pub kind: ColumnType,
    pub aggregation: Aggregation,
}

const fn count(code: &'static str, name: &'static str) -> Variable {
    Variable {
        code,
        name,
        kind: ColumnType::Integer,
        aggregation: Aggregation::Sum,
    }
}

const fn median(code: &'static str, name: &'static str) -> Variable {
    Variable {
        code,
        name,
        kind: ColumnType::Float,
        aggregation: Aggregation::Mean,
    }
}

const fn label(code: &'static str, name: &'static str) -> Variable {
    Variable {
        code,
        name,
        kind: ColumnType::Text,
        aggregation: Aggregation::Drop,
    }
}

pub static VARIABLES: &[Variable] = &[
    label("NAME", NAME),
    label("GEO_ID", GEO_ID),
    // total population
    count("S0101_C01_001E", N_TOTAL_POP),
    // sex
    count("S0101_C03_001E", "ACS_N_MALE"),
    count("S0101_C05_001E", "ACS_N_FEMALE"),
    // age
    median("S0101_C01_032E", "ACS_MED_AGE"),
    median("S0101_C03_032E", "ACS_MED_AGE_M"),
    median("S0101_C05_032E", "ACS_MED_AGE_F"),
    // race
    count("S0701_C01_014E", N_RACE_TOTAL_POP),
    count("S0701_C01_015E", N_RACE_WHITE),
    count("S0701_C01_016E", N_RACE_BLACK),
    count("S0701_C01_017E", "ACS_N_RACE_AMERIND"),
    count("S0701_C01_018E", "ACS_N_RACE_ASIAN"),
    count("S0701_C01_019E", "ACS_N_RACE_HAWPACISL"),
    count("S0701_C01_020E", "ACS_N_RACE_OTHER"),
    count("S0701_C01_021E", "ACS_N_RACE_TWOORMORE"),
    // ethnicity
    count("S0701_C01_022E", "ACS_N_ETHN_HISPLAT_Y"),
    count("S0701_C01_023E", "ACS_N_ETHN_HISPLAT_N"),
    // income and poverty
    median("S0601_C01_047E", MED_INCOME),
    median("S0701_C01_048E", "ACS_MED_INCOME_PAST_12MO"),
    count("S0701_C01_049E", N_POVERTY_STAT),
    count("S0701_C01_050E", N_POVERTY_BELOW_100),
    count("S0701_C01_051E", "ACS_N_POVERTY_STAT_100_TO_149_PCT"),
    count("S0701_C01_052E", "ACS_N_POVERTY_STAT_ABOVE_150_PCT"),
    // insurance, non-institutionalized
    count("S2701_C02_001E", N_INSURED_NON_INST),
    count("S2701_C02_011E", "ACS_N_INSURED_NON_INST_UNDER_19"),
    count("S2701_C02_012E", "ACS_N_INSURED_NON_INST_19_TO_64"),
    count("S2701_C02_013E", "ACS_N_INSURED_NON_INST_OVER_65"),
    // disability
    count("S2701_C02_035E", N_DISABIL_Y),
    count("S2701_C02_036E", N_DISABIL_N),
];

/// API variable codes to request, in catalog order.
pub fn variable_codes() -> Vec<&'static str> {
    VARIABLES.iter().map(|v| v.code).collect()
}

pub fn variable_by_code(code: &str) -> Option<&'static Variable> {
    VARIABLES.iter().find(|v| v.code == code)
}

/// Declared type of every column that can appear in an exported table.
pub fn schema() -> Schema {
    let mut schema = Schema::default();
    schema.declare(YEAR, ColumnType::Integer);
    for name in [geo::STATE, geo::COUNTY, geo::TRACT, geo::STATE_COUNTY] {
        schema.declare(name, ColumnType::Text);
    }
    for v in VARIABLES {
        schema.declare(v.name, v.kind);
    }

    let base = schema.clone();
    for def in acs_metrics() {
        schema.declare(def.name.clone(), def.op.output_kind(|c| base.kind_of(c)));
    }

    schema.declare(COUNTY_NAME, ColumnType::Text);
    schema.declare(BUCKET, ColumnType::Text);
    schema.declare(BUCKET_IDX, ColumnType::Integer);
    schema.declare(MIDPOINT, ColumnType::Float);
    schema.declare(COORDS, ColumnType::Text);
    schema
}

/// The tract → county rollup policy, keyed on `STATECOUNTY`.
///
/// Medians are averaged, counts are summed, `Year`/`STATE`/`COUNTY` keep
/// the first value and tract-level identifiers are dropped.
pub fn rollup_policy() -> AggregationPolicy {
    VARIABLES.iter().fold(
        AggregationPolicy::new(geo::STATE_COUNTY)
            .with_all([YEAR, geo::STATE, geo::COUNTY], Aggregation::First)
            .with(geo::TRACT, Aggregation::Drop),
        |policy, v| policy.with(v.name, v.aggregation),
    )
}
