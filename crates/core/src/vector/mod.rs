//! Vector data structures: attributed features and geometry families

use geo_types::{Geometry, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Attribute value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    /// Convert a JSON scalar. Arrays and objects are kept as their JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => AttributeValue::Int(i),
                None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => AttributeValue::String(s.clone()),
            other => AttributeValue::String(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Numeric coercion used for weights.
    ///
    /// Numbers pass through, numeric strings are parsed, booleans map to
    /// 1/0. Everything else, including non-finite results, becomes 0.
    pub fn to_weight(&self) -> f64 {
        let v = match self {
            AttributeValue::Int(i) => *i as f64,
            AttributeValue::Float(f) => *f,
            AttributeValue::Bool(b) => f64::from(u8::from(*b)),
            AttributeValue::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            AttributeValue::Null => 0.0,
        };
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }

    /// Numeric value without coercion from strings or booleans
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(i) => Some(*i as f64),
            AttributeValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality used by property filters.
    ///
    /// Integers and floats compare numerically; `Null` never matches.
    pub fn matches(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Null, _) | (_, AttributeValue::Null) => false,
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }

    /// String key used to look up categories (e.g. in rank tables).
    ///
    /// Integral floats render like integers so `3` and `3.0` share a key.
    pub fn category_key(&self) -> Option<String> {
        match self {
            AttributeValue::Null => None,
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Int(i) => Some(i.to_string()),
            AttributeValue::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("{}", *f as i64))
            }
            AttributeValue::Float(f) => Some(f.to_string()),
            AttributeValue::String(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Null => write!(f, "null"),
            AttributeValue::Bool(b) => write!(f, "{b}"),
            AttributeValue::Int(i) => write!(f, "{i}"),
            AttributeValue::Float(v) => write!(f, "{v}"),
            AttributeValue::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    /// Feature geometry
    pub geometry: Option<Geometry<f64>>,
    /// Feature attributes
    pub properties: HashMap<String, AttributeValue>,
    /// Optional feature ID
    pub id: Option<String>,
}

impl Feature {
    /// Create a new feature with geometry
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            properties: HashMap::new(),
            id: None,
        }
    }

    /// Builder-style attribute setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Geometry family a layer operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryFamily {
    Point,
    Line,
    Polygon,
}

impl GeometryFamily {
    pub const ALL: [GeometryFamily; 3] =
        [GeometryFamily::Point, GeometryFamily::Line, GeometryFamily::Polygon];

    pub fn name(&self) -> &'static str {
        match self {
            GeometryFamily::Point => "point",
            GeometryFamily::Line => "line",
            GeometryFamily::Polygon => "polygon",
        }
    }
}

impl fmt::Display for GeometryFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GeometryFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" | "points" | "multipoint" => Ok(GeometryFamily::Point),
            "line" | "lines" | "linestring" | "multilinestring" => Ok(GeometryFamily::Line),
            "polygon" | "polygons" | "multipolygon" => Ok(GeometryFamily::Polygon),
            _ => Err(Error::invalid_parameter(
                "geom_type",
                s,
                "expected one of: point, line, polygon",
            )),
        }
    }
}

/// One single-part geometry produced by [`explode`]
#[derive(Debug, Clone, PartialEq)]
pub enum SinglePart {
    Point(Point<f64>),
    Line(LineString<f64>),
    Polygon(Polygon<f64>),
}

impl SinglePart {
    pub fn family(&self) -> GeometryFamily {
        match self {
            SinglePart::Point(_) => GeometryFamily::Point,
            SinglePart::Line(_) => GeometryFamily::Line,
            SinglePart::Polygon(_) => GeometryFamily::Polygon,
        }
    }
}

/// Split a geometry into its single parts.
///
/// Multi-geometries and collections are flattened recursively. Empty parts
/// (lines with fewer than two coordinates, polygons without an exterior
/// ring) are dropped.
pub fn explode(geometry: &Geometry<f64>) -> Vec<SinglePart> {
    let mut parts = Vec::new();
    explode_into(geometry, &mut parts);
    parts
}

fn explode_into(geometry: &Geometry<f64>, out: &mut Vec<SinglePart>) {
    match geometry {
        Geometry::Point(p) => out.push(SinglePart::Point(*p)),
        Geometry::MultiPoint(mp) => out.extend(mp.iter().map(|p| SinglePart::Point(*p))),
        Geometry::Line(l) => out.push(SinglePart::Line(LineString::from(vec![l.start, l.end]))),
        Geometry::LineString(ls) => push_line(ls, out),
        Geometry::MultiLineString(mls) => mls.iter().for_each(|ls| push_line(ls, out)),
        Geometry::Polygon(p) => push_polygon(p, out),
        Geometry::MultiPolygon(mp) => mp.iter().for_each(|p| push_polygon(p, out)),
        Geometry::Rect(r) => out.push(SinglePart::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => out.push(SinglePart::Polygon(t.to_polygon())),
        Geometry::GeometryCollection(gc) => gc.iter().for_each(|g| explode_into(g, out)),
    }
}

fn push_line(ls: &LineString<f64>, out: &mut Vec<SinglePart>) {
    if ls.0.len() >= 2 {
        out.push(SinglePart::Line(ls.clone()));
    }
}

fn push_polygon(p: &Polygon<f64>, out: &mut Vec<SinglePart>) {
    if p.exterior().0.len() >= 3 {
        out.push(SinglePart::Polygon(p.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{line_string, point, polygon, GeometryCollection, MultiPoint};

    #[test]
    fn test_weight_coercion() {
        assert_eq!(AttributeValue::Int(4).to_weight(), 4.0);
        assert_eq!(AttributeValue::Float(2.5).to_weight(), 2.5);
        assert_eq!(AttributeValue::from(" 7.5 ").to_weight(), 7.5);
        assert_eq!(AttributeValue::from("abc").to_weight(), 0.0);
        assert_eq!(AttributeValue::Bool(true).to_weight(), 1.0);
        assert_eq!(AttributeValue::Null.to_weight(), 0.0);
        assert_eq!(AttributeValue::Float(f64::INFINITY).to_weight(), 0.0);
        assert_eq!(AttributeValue::Int(-3).to_weight(), -3.0);
    }

    #[test]
    fn test_matches_cross_numeric() {
        assert!(AttributeValue::Int(3).matches(&AttributeValue::Float(3.0)));
        assert!(!AttributeValue::Int(3).matches(&AttributeValue::from("3")));
        assert!(!AttributeValue::Null.matches(&AttributeValue::Null));
        assert!(AttributeValue::from("pharmacy").matches(&AttributeValue::from("pharmacy")));
    }

    #[test]
    fn test_category_key() {
        assert_eq!(AttributeValue::Float(2.0).category_key().as_deref(), Some("2"));
        assert_eq!(AttributeValue::Float(2.5).category_key().as_deref(), Some("2.5"));
        assert_eq!(AttributeValue::from("A").category_key().as_deref(), Some("A"));
        assert_eq!(AttributeValue::Null.category_key(), None);
    }

    #[test]
    fn test_from_json() {
        let v: serde_json::Value = serde_json::json!({"a": 1, "b": 1.5, "c": "x", "d": null});
        assert_eq!(AttributeValue::from_json(&v["a"]), AttributeValue::Int(1));
        assert_eq!(AttributeValue::from_json(&v["b"]), AttributeValue::Float(1.5));
        assert_eq!(AttributeValue::from_json(&v["c"]), AttributeValue::from("x"));
        assert!(AttributeValue::from_json(&v["d"]).is_null());
    }

    #[test]
    fn test_family_parse() {
        assert_eq!("Point".parse::<GeometryFamily>().unwrap(), GeometryFamily::Point);
        assert_eq!("lines".parse::<GeometryFamily>().unwrap(), GeometryFamily::Line);
        assert_eq!("MultiPolygon".parse::<GeometryFamily>().unwrap(), GeometryFamily::Polygon);
        assert!("raster".parse::<GeometryFamily>().is_err());
    }

    #[test]
    fn test_explode_flattens() {
        let mp = MultiPoint::from(vec![point!(x: 0.0, y: 0.0), point!(x: 1.0, y: 1.0)]);
        let gc = GeometryCollection(vec![
            Geometry::MultiPoint(mp),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0)]),
            Geometry::Polygon(polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]);
        let parts = explode(&Geometry::GeometryCollection(gc));
        let families: Vec<_> = parts.iter().map(SinglePart::family).collect();
        assert_eq!(
            families,
            vec![
                GeometryFamily::Point,
                GeometryFamily::Point,
                GeometryFamily::Line,
                GeometryFamily::Polygon
            ]
        );
    }
}
