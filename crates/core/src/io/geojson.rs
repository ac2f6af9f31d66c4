//! GeoJSON reading via serde_json
//!
//! Supports FeatureCollection, single Feature, bare Geometry and
//! GeometryCollection documents, plus the legacy (2008) `crs` member.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::{AttributeValue, Feature, FeatureCollection};
use geo_types::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::VectorDataset;

type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<RawGeometry> },
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    geometry: Option<RawGeometry>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

/// Decode a GeoJSON document. `origin` is only used in error messages.
pub(super) fn parse_document(text: &str, origin: &str) -> Result<VectorDataset> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| Error::data_load(origin, e.to_string()))?;

    let kind = root
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::data_load(origin, "missing GeoJSON 'type' member"))?
        .to_string();

    let crs = match root.get("crs") {
        Some(member) if !member.is_null() => Some(parse_crs_member(member, origin)?),
        _ => None,
    };

    let raw_features = match kind.as_str() {
        "FeatureCollection" => decode::<RawCollection>(root, origin)?.features,
        "Feature" => vec![decode::<RawFeature>(root, origin)?],
        _ => vec![RawFeature {
            geometry: Some(decode::<RawGeometry>(root, origin)?),
            properties: None,
            id: None,
        }],
    };

    let features = raw_features
        .into_iter()
        .map(|raw| convert_feature(raw, origin))
        .collect::<Result<FeatureCollection>>()?;

    Ok(VectorDataset { features, crs })
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value, origin: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::data_load(origin, e.to_string()))
}

/// Legacy `crs` member: `{"type": "name", "properties": {"name": "..."}}`
/// or `{"type": "EPSG", "properties": {"code": 3857}}`.
fn parse_crs_member(member: &Value, origin: &str) -> Result<CRS> {
    let props = member.get("properties");
    if let Some(name) = props.and_then(|p| p.get("name")).and_then(Value::as_str) {
        return CRS::parse(name);
    }
    if let Some(code) = props.and_then(|p| p.get("code")).and_then(Value::as_u64) {
        return u32::try_from(code)
            .map(CRS::from_epsg)
            .map_err(|_| Error::UnresolvedCrs(code.to_string()));
    }
    Err(Error::data_load(origin, format!("unrecognized crs member: {member}")))
}

fn convert_feature(raw: RawFeature, origin: &str) -> Result<Feature> {
    let geometry = match raw.geometry {
        Some(g) => convert_geometry(g, origin)?,
        None => None,
    };

    let properties: HashMap<String, AttributeValue> = raw
        .properties
        .unwrap_or_default()
        .iter()
        .map(|(k, v)| (k.clone(), AttributeValue::from_json(v)))
        .collect();

    let id = raw.id.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    });

    Ok(Feature {
        geometry,
        properties,
        id,
    })
}

/// Empty geometries decode to `None`.
fn convert_geometry(raw: RawGeometry, origin: &str) -> Result<Option<Geometry<f64>>> {
    let geometry = match raw {
        RawGeometry::Point { coordinates } => {
            if coordinates.is_empty() {
                return Ok(None);
            }
            Geometry::Point(Point(coord(&coordinates, origin)?))
        }
        RawGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint(
            coordinates
                .iter()
                .map(|p| coord(p, origin).map(Point))
                .collect::<Result<_>>()?,
        )),
        RawGeometry::LineString { coordinates } => {
            Geometry::LineString(line_string(&coordinates, origin)?)
        }
        RawGeometry::MultiLineString { coordinates } => Geometry::MultiLineString(
            MultiLineString(
                coordinates
                    .iter()
                    .map(|l| line_string(l, origin))
                    .collect::<Result<_>>()?,
            ),
        ),
        RawGeometry::Polygon { coordinates } => match polygon(&coordinates, origin)? {
            Some(p) => Geometry::Polygon(p),
            None => return Ok(None),
        },
        RawGeometry::MultiPolygon { coordinates } => {
            let mut polys = Vec::with_capacity(coordinates.len());
            for rings in &coordinates {
                if let Some(p) = polygon(rings, origin)? {
                    polys.push(p);
                }
            }
            Geometry::MultiPolygon(MultiPolygon(polys))
        }
        RawGeometry::GeometryCollection { geometries } => {
            let mut parts = Vec::with_capacity(geometries.len());
            for g in geometries {
                if let Some(part) = convert_geometry(g, origin)? {
                    parts.push(part);
                }
            }
            Geometry::GeometryCollection(GeometryCollection(parts))
        }
    };
    Ok(Some(geometry))
}

fn coord(position: &[f64], origin: &str) -> Result<Coord<f64>> {
    match position {
        [x, y, ..] if x.is_finite() && y.is_finite() => Ok(Coord { x: *x, y: *y }),
        _ => Err(Error::data_load(
            origin,
            format!("invalid position {position:?}"),
        )),
    }
}

fn line_string(positions: &[Position], origin: &str) -> Result<LineString<f64>> {
    positions
        .iter()
        .map(|p| coord(p, origin))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Position>], origin: &str) -> Result<Option<Polygon<f64>>> {
    let mut rings = rings.iter().map(|r| line_string(r, origin));
    let exterior = match rings.next() {
        Some(ring) => ring?,
        None => return Ok(None),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Some(Polygon::new(exterior, interiors)))
}
