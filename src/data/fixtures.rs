//! World Bank style CSV fixtures shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};

pub const FIRST_YEAR: i64 = 1960;
pub const LAST_YEAR: i64 = 2022;

/// One value per year from 1960 to 2022, growing linearly.
pub fn linear(base: f64, step: f64) -> Vec<Option<f64>> {
    (FIRST_YEAR..=LAST_YEAR)
        .map(|y| Some(base + step * (y - FIRST_YEAR) as f64))
        .collect()
}

/// Render a file exactly as the World Bank exports it: four metadata lines,
/// quoted cells and a trailing comma on every line.
pub fn world_bank_csv(indicator: &str, rows: &[(&str, Vec<Option<f64>>)]) -> String {
    let mut out = String::from(
        "\"Data Source\",\"World Development Indicators\",\n\n\"Last Updated Date\",\"2023-12-18\",\n\n",
    );
    out.push_str("\"Country Name\",\"Country Code\",\"Indicator Name\",\"Indicator Code\",");
    for year in FIRST_YEAR..=LAST_YEAR {
        out.push_str(&format!("\"{year}\","));
    }
    out.push('\n');

    for (country, values) in rows {
        let code: String = country.chars().take(3).collect::<String>().to_uppercase();
        out.push_str(&format!(
            "\"{country}\",\"{code}\",\"{indicator}\",\"IND.CODE\","
        ));
        for value in values {
            match value {
                Some(v) => out.push_str(&format!("\"{v}\",")),
                None => out.push_str("\"\","),
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_world_bank_csv(
    dir: &Path,
    file: &str,
    indicator: &str,
    rows: &[(&str, Vec<Option<f64>>)],
) -> PathBuf {
    let path = dir.join(file);
    fs::write(&path, world_bank_csv(indicator, rows)).expect("write fixture");
    path
}

/// All seven analysed countries plus two aggregates that must be filtered out.
pub fn full_rows(scale: f64) -> Vec<(&'static str, Vec<Option<f64>>)> {
    vec![
        ("Arab World", linear(1000.0 * scale, 10.0)),
        ("France", linear(50.0 * scale, 1.0)),
        ("Georgia", linear(5.0 * scale, 0.1)),
        ("Germany", linear(80.0 * scale, 0.5)),
        ("India", linear(900.0 * scale, 15.0)),
        ("Morocco", linear(25.0 * scale, 0.4)),
        ("Nigeria", linear(100.0 * scale, 3.0)),
        ("Spain", linear(40.0 * scale, 0.3)),
        ("World", linear(5000.0 * scale, 70.0)),
    ]
}
