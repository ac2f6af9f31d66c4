//! R-tree over line segments
//!
//! Line parts and polygon outlines are decomposed into straight segments;
//! the nearest segment gives the distance to the nearest part.

use std::collections::HashSet;

use geo_types::LineString;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

#[derive(Debug, Clone)]
struct SegmentEntry {
    a: [f64; 2],
    b: [f64; 2],
    /// Part the segment belongs to
    part: usize,
}

impl RTreeObject for SegmentEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for SegmentEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let (dx, dy) = (self.b[0] - self.a[0], self.b[1] - self.a[1]);
        let (px, py) = (point[0] - self.a[0], point[1] - self.a[1]);
        let len_sq = dx * dx + dy * dy;
        let t = if len_sq > 0.0 {
            ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let (ex, ey) = (px - t * dx, py - t * dy);
        ex * ex + ey * ey
    }
}

/// Nearest-part queries over a set of polylines.
#[derive(Debug, Clone)]
pub struct SegmentIndex {
    tree: RTree<SegmentEntry>,
    paths: usize,
}

impl SegmentIndex {
    /// Build from `(part_id, linestring)` pairs.
    ///
    /// A single-coordinate linestring contributes one degenerate segment so
    /// the part stays reachable.
    pub fn build<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a LineString<f64>)>,
    {
        let mut entries = Vec::new();
        let mut count = 0;
        for (part, ls) in parts {
            count += 1;
            let coords: Vec<[f64; 2]> = ls.coords().map(|c| [c.x, c.y]).collect();
            match coords.as_slice() {
                [] => {}
                [only] => entries.push(SegmentEntry { a: *only, b: *only, part }),
                _ => entries.extend(
                    coords
                        .windows(2)
                        .map(|w| SegmentEntry { a: w[0], b: w[1], part }),
                ),
            }
        }

        Self {
            tree: RTree::bulk_load(entries),
            paths: count,
        }
    }

    /// Number of linestrings indexed
    pub fn paths(&self) -> usize {
        self.paths
    }

    pub fn segments(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Index over the segments of the parts satisfying `accept`.
    pub fn subset<F>(&self, accept: F) -> SegmentIndex
    where
        F: Fn(usize) -> bool,
    {
        let entries: Vec<SegmentEntry> = self
            .tree
            .iter()
            .filter(|entry| accept(entry.part))
            .cloned()
            .collect();
        let paths = entries.iter().map(|e| e.part).collect::<HashSet<_>>().len();
        Self {
            tree: RTree::bulk_load(entries),
            paths,
        }
    }

    /// Nearest part with its distance, `None` if the index is empty.
    pub fn nearest(&self, x: f64, y: f64) -> Option<(usize, f64)> {
        let query = [x, y];
        self.tree
            .nearest_neighbor(&query)
            .map(|entry| (entry.part, entry.distance_2(&query).sqrt()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::line_string;

    fn index() -> (SegmentIndex, Vec<LineString<f64>>) {
        let lines = vec![
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            line_string![(x: 0.0, y: 5.0), (x: 10.0, y: 5.0), (x: 10.0, y: 20.0)],
            line_string![(x: 30.0, y: 30.0)],
        ];
        let idx = SegmentIndex::build(lines.iter().enumerate());
        (idx, lines)
    }

    #[test]
    fn test_counts() {
        let (idx, _) = index();
        assert_eq!(idx.paths(), 3);
        assert_eq!(idx.segments(), 4);
    }

    #[test]
    fn test_perpendicular_and_endpoint_distance() {
        let (idx, _) = index();
        let (part, d) = idx.nearest(5.0, -3.0).unwrap();
        assert_eq!(part, 0);
        assert!((d - 3.0).abs() < 1e-12);

        let (part, d) = idx.nearest(-3.0, -4.0).unwrap();
        assert_eq!(part, 0);
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_subset_query() {
        let (idx, _) = index();
        let rest = idx.subset(|p| p != 0);
        assert_eq!(rest.paths(), 2);
        assert_eq!(rest.segments(), 3);
        let (part, d) = rest.nearest(5.0, 1.0).unwrap();
        assert_eq!(part, 1);
        assert!((d - 4.0).abs() < 1e-12);

        let (part, _) = idx.subset(|p| p == 2).nearest(0.0, 0.0).unwrap();
        assert_eq!(part, 2);

        let none = idx.subset(|_| false);
        assert!(none.is_empty());
        assert!(none.nearest(0.0, 0.0).is_none());
    }
}
