//! Result export and scattered-point input
//!
//! Tables are written as CSV (`lat,lon,value`) or as a GeoJSON point
//! FeatureCollection, chosen by the output extension.

use anyhow::{bail, Context, Result};
use geo_types::Geometry;
use heatgis_algorithms::prelude::*;
use heatgis_core::io::read_vector_from_str;
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    GeoJson,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Format::Csv),
            "geojson" | "json" => Ok(Format::GeoJson),
            _ => bail!(
                "Unsupported format for {}. Use .csv or .geojson.",
                path.display()
            ),
        }
    }
}

pub fn write_table(table: &GridTable, path: &Path) -> Result<()> {
    let format = Format::from_path(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    match format {
        Format::Csv => write_csv(table, &mut writer)?,
        Format::GeoJson => write_geojson(table, &mut writer)?,
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv<W: Write>(table: &GridTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in table.iter() {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_geojson<W: Write>(table: &GridTable, writer: W) -> Result<()> {
    let features: Vec<Value> = table
        .iter()
        .map(|row| {
            json!({
                "type": "Feature",
                "properties": {"value": row.value},
                "geometry": {"type": "Point", "coordinates": [row.lon, row.lat]},
            })
        })
        .collect();
    let doc = json!({"type": "FeatureCollection", "features": features});
    serde_json::to_writer(writer, &doc)?;
    Ok(())
}

/// Scattered values from a CSV with `lat,lon,value` headers or a GeoJSON
/// point layer carrying a `value` property.
pub fn read_points(path: &Path) -> Result<Vec<ScatteredValue>> {
    let format = Format::from_path(path)?;
    let mut text = String::new();
    File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .read_to_string(&mut text)?;
    match format {
        Format::Csv => read_points_csv(text.as_bytes()),
        Format::GeoJson => read_points_geojson(&text, &path.display().to_string()),
    }
}

pub fn read_points_csv<R: Read>(reader: R) -> Result<Vec<ScatteredValue>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv.deserialize::<ScatteredValue>()
        .enumerate()
        .map(|(i, record)| record.with_context(|| format!("Invalid point on data line {}", i + 1)))
        .collect()
}

pub fn read_points_geojson(text: &str, origin: &str) -> Result<Vec<ScatteredValue>> {
    let dataset = read_vector_from_str(text, origin)?;
    let projection = dataset.crs.map(|crs| crs.projection()).transpose()?;

    let mut points = Vec::new();
    for feature in dataset.features.iter() {
        let Some(value) = feature.get_property("value").and_then(|v| v.as_f64()) else {
            continue;
        };
        let coords: Vec<(f64, f64)> = match &feature.geometry {
            Some(Geometry::Point(p)) => vec![(p.x(), p.y())],
            Some(Geometry::MultiPoint(mp)) => mp.iter().map(|p| (p.x(), p.y())).collect(),
            _ => continue,
        };
        for (x, y) in coords {
            let (lon, lat) = projection.map_or((x, y), |proj| proj.inverse(x, y));
            points.push(ScatteredValue::new(lat, lon, value));
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GridTable {
        let grid = GridSpec::new(Bounds::new(0.0, 10.0, 1.0, 11.0), 2, 2).unwrap();
        GridTable::from_values(&grid, vec![0.5, 1.0, 1.5, 2.0]).unwrap()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_path(Path::new("a/out.CSV")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("out.geojson")).unwrap(), Format::GeoJson);
        assert!(Format::from_path(Path::new("out.tif")).is_err());
    }

    #[test]
    fn test_csv_output() {
        let mut buf = Vec::new();
        write_csv(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "lat,lon,value");
        assert_eq!(lines[1], "10.0,0.0,0.5");
        assert_eq!(lines[4], "11.0,1.0,2.0");
    }

    #[test]
    fn test_geojson_output_reads_back_as_points() {
        let mut buf = Vec::new();
        write_geojson(&table(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let points = read_points_geojson(&text, "out").unwrap();
        assert_eq!(points.len(), 4);
        assert_eq!(points[1], ScatteredValue::new(10.0, 1.0, 1.0));
    }

    #[test]
    fn test_csv_points() {
        let text = "lat, lon, value\n10.0, 20.0, 1\n11.0, 21.0, 4.5\n";
        let points = read_points_csv(text.as_bytes()).unwrap();
        assert_eq!(points, vec![
            ScatteredValue::new(10.0, 20.0, 1.0),
            ScatteredValue::new(11.0, 21.0, 4.5),
        ]);

        let bad = "lat,lon,value\n10.0,abc,1\n";
        assert!(read_points_csv(bad.as_bytes()).is_err());
    }
}
