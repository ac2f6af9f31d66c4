//! 2D k-d tree for spatial indexing
//!
//! Nearest and k-nearest queries over point records. Filtered queries run
//! on a [`KdTree::subset`] holding only the accepted records.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

/// A point in the tree, tagged with the id of the record it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedPoint {
    pub x: f64,
    pub y: f64,
    pub id: usize,
}

impl IndexedPoint {
    pub fn new(x: f64, y: f64, id: usize) -> Self {
        Self { x, y, id }
    }

    /// Squared Euclidean distance to (qx, qy)
    #[inline]
    pub fn dist_sq(&self, qx: f64, qy: f64) -> f64 {
        let dx = self.x - qx;
        let dy = self.y - qy;
        dx * dx + dy * dy
    }
}

/// A 2D k-d tree over [`IndexedPoint`]s.
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    points: Vec<IndexedPoint>,
}

#[derive(Debug, Clone)]
struct KdNode {
    point_idx: usize,
    /// 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Result of a nearest-neighbor query
#[derive(Debug, Clone, Copy)]
pub struct NearestResult {
    pub point: IndexedPoint,
    pub distance_sq: f64,
}

impl NearestResult {
    #[inline]
    pub fn distance(&self) -> f64 {
        self.distance_sq.sqrt()
    }
}

impl KdTree {
    /// Build a k-d tree. Construction is O(n log n) with median splits.
    pub fn build(points: Vec<IndexedPoint>) -> Self {
        if points.is_empty() {
            return Self::default();
        }

        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        build_recursive(&points, &mut indices, 0, &mut nodes);

        Self { nodes, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[IndexedPoint] {
        &self.points
    }

    /// Tree over the points whose id satisfies `accept`, ids kept.
    pub fn subset<F>(&self, accept: F) -> KdTree
    where
        F: Fn(usize) -> bool,
    {
        KdTree::build(self.points.iter().filter(|p| accept(p.id)).copied().collect())
    }

    /// Nearest point to (qx, qy), `None` if the tree is empty.
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<NearestResult> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut best: Option<(f64, usize)> = None;
        self.nearest_recursive(0, qx, qy, &mut best);

        best.map(|(distance_sq, idx)| NearestResult {
            point: self.points[idx],
            distance_sq,
        })
    }

    /// Up to `k` nearest points sorted by ascending distance.
    pub fn k_nearest(&self, qx: f64, qy: f64, k: usize) -> Vec<NearestResult> {
        if self.nodes.is_empty() || k == 0 {
            return Vec::new();
        }

        // sorted descending: heap[0] is the current k-th best
        let mut heap: Vec<(f64, usize)> = Vec::with_capacity(k + 1);
        self.knn_recursive(0, qx, qy, k, &mut heap);

        heap.iter()
            .rev()
            .map(|&(distance_sq, idx)| NearestResult {
                point: self.points[idx],
                distance_sq,
            })
            .collect()
    }

    fn nearest_recursive(&self, node_idx: usize, qx: f64, qy: f64, best: &mut Option<(f64, usize)>) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];
        let dist_sq = p.dist_sq(qx, qy);

        let best_dist_sq = best.map_or(f64::INFINITY, |b| b.0);
        if dist_sq < best_dist_sq {
            *best = Some((dist_sq, node.point_idx));
        }

        let diff = if node.split_dim == 0 { qx - p.x } else { qy - p.y };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.nearest_recursive(child, qx, qy, best);
        }

        let best_dist_sq = best.map_or(f64::INFINITY, |b| b.0);
        if diff * diff < best_dist_sq {
            if let Some(child) = second {
                self.nearest_recursive(child, qx, qy, best);
            }
        }
    }

    fn knn_recursive(&self, node_idx: usize, qx: f64, qy: f64, k: usize, heap: &mut Vec<(f64, usize)>) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];
        let dist_sq = p.dist_sq(qx, qy);

        let full = heap.len() >= k;
        if !full || dist_sq < heap[0].0 {
            if full {
                heap.remove(0);
            }
            let pos = heap
                .binary_search_by(|entry| {
                    entry
                        .0
                        .partial_cmp(&dist_sq)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .reverse()
                })
                .unwrap_or_else(|e| e);
            heap.insert(pos, (dist_sq, node.point_idx));
        }

        let diff = if node.split_dim == 0 { qx - p.x } else { qy - p.y };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, heap);
        }

        let threshold = if heap.len() >= k { heap[0].0 } else { f64::INFINITY };
        if diff * diff < threshold {
            if let Some(child) = second {
                self.knn_recursive(child, qx, qy, k, heap);
            }
        }
    }
}

fn build_recursive(
    points: &[IndexedPoint],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let n = indices.len();
    let split_dim = (depth % 2) as u8;

    indices.sort_by(|&a, &b| {
        let (va, vb) = if split_dim == 0 {
            (points[a].x, points[b].x)
        } else {
            (points[a].y, points[b].y)
        };
        va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
    });

    let median = n / 2;
    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    if median > 0 {
        let left = build_recursive(points, &mut indices[..median], depth + 1, nodes);
        nodes[node_idx].left = Some(left);
    }

    if median + 1 < n {
        let right = build_recursive(points, &mut indices[median + 1..], depth + 1, nodes);
        nodes[node_idx].right = Some(right);
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<IndexedPoint> {
        [
            (2.0, 3.0),
            (5.0, 4.0),
            (9.0, 6.0),
            (4.0, 7.0),
            (8.0, 1.0),
            (7.0, 2.0),
            (1.0, 8.0),
            (6.0, 5.0),
        ]
        .iter()
        .enumerate()
        .map(|(id, &(x, y))| IndexedPoint::new(x, y, id))
        .collect()
    }

    fn brute_force(pts: &[IndexedPoint], qx: f64, qy: f64, accept: impl Fn(usize) -> bool) -> Vec<f64> {
        let mut d: Vec<f64> = pts
            .iter()
            .filter(|p| accept(p.id))
            .map(|p| p.dist_sq(qx, qy))
            .collect();
        d.sort_by(|a, b| a.partial_cmp(b).unwrap());
        d
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(Vec::new());
        assert!(tree.is_empty());
        assert!(tree.nearest(0.0, 0.0).is_none());
        assert!(tree.k_nearest(0.0, 0.0, 3).is_empty());
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(pts.clone());

        for qx in 0..10 {
            for qy in 0..10 {
                let (qx, qy) = (qx as f64 + 0.5, qy as f64 + 0.5);
                let got = tree.nearest(qx, qy).unwrap();
                let want = brute_force(&pts, qx, qy, |_| true)[0];
                assert!(
                    (got.distance_sq - want).abs() < 1e-10,
                    "Mismatch at ({}, {}): tree={:.4}, bf={:.4}",
                    qx,
                    qy,
                    got.distance_sq,
                    want
                );
            }
        }
    }

    #[test]
    fn test_subset_skips_rejected() {
        let pts = sample_points();
        let tree = KdTree::build(pts.clone());

        // (6, 5) is id 7; without it the next best must come back
        let sub = tree.subset(|id| id != 7);
        assert_eq!(sub.len(), pts.len() - 1);
        let got = sub.nearest(6.1, 5.1).unwrap();
        assert_ne!(got.point.id, 7);
        let want = brute_force(&pts, 6.1, 5.1, |id| id != 7)[0];
        assert!((got.distance_sq - want).abs() < 1e-10);

        assert!(tree.subset(|_| false).nearest(0.0, 0.0).is_none());
    }

    #[test]
    fn test_subset_k_nearest_matches_brute_force() {
        let pts = sample_points();
        let tree = KdTree::build(pts.clone());
        let even = |id: usize| id % 2 == 0;
        let sub = tree.subset(even);
        assert_eq!(sub.len(), 4);

        for &(qx, qy) in &[(5.0, 5.0), (0.0, 0.0), (9.5, 9.5)] {
            let got = sub.k_nearest(qx, qy, 3);
            let want = brute_force(&pts, qx, qy, even);
            assert_eq!(got.len(), 3);
            for (r, w) in got.iter().zip(&want) {
                assert!(even(r.point.id));
                assert!((r.distance_sq - w).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_k_nearest_sorted_and_capped() {
        let pts = sample_points();
        let tree = KdTree::build(pts.clone());

        let results = tree.k_nearest(5.0, 5.0, 100);
        assert_eq!(results.len(), pts.len());
        for i in 1..results.len() {
            assert!(results[i].distance_sq >= results[i - 1].distance_sq);
        }
    }

    #[test]
    fn test_duplicate_coordinates() {
        let pts = vec![
            IndexedPoint::new(1.0, 1.0, 0),
            IndexedPoint::new(1.0, 1.0, 1),
            IndexedPoint::new(1.0, 1.0, 2),
        ];
        let tree = KdTree::build(pts);
        let knn = tree.k_nearest(1.0, 1.0, 5);
        assert_eq!(knn.len(), 3);
        assert!(knn.iter().all(|r| r.distance_sq == 0.0));
    }
}
