//! Portal input files: JSON exports and four-column CSV.
//!
//! - JSON: array of `{guid, title, coordinates: {lat, lng}}`; coordinates may
//!   be strings or numbers.
//! - CSV (no header): `guid, title, lat, lng`. Titles may carry backslash
//!   escaped quotes, which are rewritten to doubled quotes before parsing.
//!
//! Duplicate guids are merged (or rejected when their coordinates differ).

use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use polars::prelude::*;
use portal_patterns::portal::merge_duplicate_portals;
use portal_patterns::{LatLng, Portal};
use serde::Deserialize;

#[derive(Deserialize)]
struct JsonPortal {
    guid: String,
    title: String,
    coordinates: JsonCoordinates,
}

#[derive(Deserialize)]
struct JsonCoordinates {
    lat: Degrees,
    lng: Degrees,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Degrees {
    Text(String),
    Number(f64),
}

impl Degrees {
    fn value(&self) -> Result<f64> {
        match self {
            Degrees::Number(v) => Ok(*v),
            Degrees::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid coordinate {s:?}")),
        }
    }
}

/// Load, validate and de-duplicate the portals of `path`.
pub fn load_portals(path: &Path) -> Result<Vec<Portal>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading portals from {}", path.display()))?;
    let portals = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => parse_json(&text),
        Some(ext) if ext.eq_ignore_ascii_case("csv") => parse_csv(&text),
        _ => bail!("unknown portal file type: {} (expected .json or .csv)", path.display()),
    }
    .with_context(|| format!("parsing {}", path.display()))?;
    let portals = merge_duplicate_portals(portals)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(file = %path.display(), portals = portals.len(), "loaded portals");
    Ok(portals)
}

pub fn parse_json(text: &str) -> Result<Vec<Portal>> {
    let raw: Vec<JsonPortal> = serde_json::from_str(text)?;
    raw.into_iter()
        .enumerate()
        .map(|(i, p)| {
            let lat = p.coordinates.lat.value().with_context(|| format!("portal #{}", i + 1))?;
            let lng = p.coordinates.lng.value().with_context(|| format!("portal #{}", i + 1))?;
            Ok(Portal::new(p.guid, p.title, LatLng::new(lat, lng)))
        })
        .collect()
}

pub fn parse_csv(text: &str) -> Result<Vec<Portal>> {
    let normalized = text.replace("\\\"", "\"\"");
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(normalized.into_bytes()))
        .finish()?;
    if df.width() != 4 {
        bail!("expected 4 columns (guid, title, lat, lng), got {}", df.width());
    }
    let guids = df.column("column_1")?.str()?;
    let titles = df.column("column_2")?.str()?;
    let lats = df.column("column_3")?.str()?;
    let lngs = df.column("column_4")?.str()?;
    let mut portals = Vec::with_capacity(df.height());
    for (row, (((guid, title), lat), lng)) in guids
        .into_iter()
        .zip(titles.into_iter())
        .zip(lats.into_iter())
        .zip(lngs.into_iter())
        .enumerate()
    {
        let line = row + 1;
        let field = |v: Option<&str>, what: &str| -> Result<String> {
            v.map(str::to_owned)
                .ok_or_else(|| anyhow!("line {line}: missing {what}"))
        };
        let degrees = |v: Option<&str>, what: &str| -> Result<f64> {
            let s = field(v, what)?;
            s.trim()
                .parse()
                .map_err(|_| anyhow!("line {line}: invalid {what} {s:?}"))
        };
        portals.push(Portal::new(
            field(guid, "guid")?,
            title.unwrap_or_default(),
            LatLng::new(degrees(lat, "latitude")?, degrees(lng, "longitude")?),
        ));
    }
    Ok(portals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_accepts_text_and_numeric_coordinates() {
        let text = r#"[
            {"guid": "a", "title": "Fountain", "coordinates": {"lat": "52.2297", "lng": "21.0122"}},
            {"guid": "b", "title": "Statue", "coordinates": {"lat": 52.23, "lng": 21.01}}
        ]"#;
        let portals = parse_json(text).unwrap();
        assert_eq!(portals.len(), 2);
        assert_eq!(portals[0].name, "Fountain");
        assert_eq!(portals[0].lat_lng, LatLng::new(52.2297, 21.0122));
        assert_eq!(portals[1].lat_lng, LatLng::new(52.23, 21.01));
    }

    #[test]
    fn json_reports_bad_coordinates() {
        let text = r#"[{"guid": "a", "title": "x", "coordinates": {"lat": "north", "lng": "1"}}]"#;
        let err = parse_json(text).unwrap_err();
        assert!(format!("{err:#}").contains("portal #1"));
    }

    #[test]
    fn csv_handles_escaped_quotes() {
        let text = "a,\"The \\\"Old\\\" Mill\",52.1,21.0\nb,Plain,52.2,21.1\n";
        let portals = parse_csv(text).unwrap();
        assert_eq!(portals.len(), 2);
        assert_eq!(portals[0].name, "The \"Old\" Mill");
        assert_eq!(portals[1].guid, "b");
        assert_eq!(portals[1].lat_lng, LatLng::new(52.2, 21.1));
    }

    #[test]
    fn csv_reports_the_failing_line() {
        let text = "a,One,52.1,21.0\nb,Two,oops,21.1\n";
        let err = parse_csv(text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn duplicates_are_merged_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portals.csv");
        std::fs::write(&path, "a,One,52.1,21.0\na,One,52.1,21.0\nb,Two,52.2,21.1\n").unwrap();
        assert_eq!(load_portals(&path).unwrap().len(), 2);
        std::fs::write(&path, "a,One,52.1,21.0\na,One,52.3,21.0\n").unwrap();
        assert!(load_portals(&path).is_err());
    }
}
