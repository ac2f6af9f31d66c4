//! Point evaluators: nearest, sum_k, density, count

use super::binning::Bins;
use super::{per_cell, LayerContext};
use heatgis_core::{GridSpec, Result};
use tracing::warn;

pub(crate) fn nearest(ctx: &LayerContext<'_>, grid: &GridSpec, samples: &[[f64; 2]]) -> Vec<f64> {
    let Some(points) = ctx.source.points() else {
        return vec![0.0; grid.len()];
    };
    let tree = ctx.point_tree(points.tree(), |part| points.record(part));

    per_cell(grid, samples, |x, y| {
        tree.nearest(x, y).map_or(0.0, |hit| {
            ctx.decay(hit.distance()) * ctx.factors[points.record(hit.point.id)]
        })
    })
}

/// Sum over the `k` nearest selected points; fewer than `k` uses them all.
pub(crate) fn sum_k(
    ctx: &LayerContext<'_>,
    grid: &GridSpec,
    samples: &[[f64; 2]],
    k: usize,
    available: usize,
) -> Vec<f64> {
    let Some(points) = ctx.source.points() else {
        return vec![0.0; grid.len()];
    };
    if available < k {
        warn!(
            "sum_k requested k={} but only {} points match; using all of them",
            k, available
        );
    }
    let k = k.min(available);
    let tree = ctx.point_tree(points.tree(), |part| points.record(part));

    per_cell(grid, samples, |x, y| {
        tree.k_nearest(x, y, k)
            .iter()
            .map(|hit| ctx.decay(hit.distance()) * ctx.factors[points.record(hit.point.id)])
            .sum()
    })
}

/// Mean of per-point factors per bin; empty bins are 0.
pub(crate) fn density(ctx: &LayerContext<'_>, grid: &GridSpec) -> Result<Vec<f64>> {
    let (sums, counts) = accumulate(ctx, grid)?;
    Ok(sums
        .into_iter()
        .zip(counts)
        .map(|(sum, n)| if n == 0 { 0.0 } else { sum / n as f64 })
        .collect())
}

/// Number of selected points per bin.
pub(crate) fn count(ctx: &LayerContext<'_>, grid: &GridSpec) -> Result<Vec<f64>> {
    let (_, counts) = accumulate(ctx, grid)?;
    Ok(counts.into_iter().map(|n| n as f64).collect())
}

fn accumulate(ctx: &LayerContext<'_>, grid: &GridSpec) -> Result<(Vec<f64>, Vec<usize>)> {
    let bins = Bins::for_grid(grid)?;
    let mut sums = vec![0.0; bins.len()];
    let mut counts = vec![0usize; bins.len()];

    if let Some(points) = ctx.source.points() {
        for p in points.tree().points() {
            let record = points.record(p.id);
            if !ctx.selected[record] {
                continue;
            }
            let idx = bins.index(p.x, p.y);
            sums[idx] += ctx.factors[record];
            counts[idx] += 1;
        }
    }
    Ok((sums, counts))
}
