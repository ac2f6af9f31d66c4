//! heatgis CLI - influence heatmaps from vector data

mod job;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use heatgis_algorithms::prelude::*;
use job::JobConfig;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "heatgis")]
#[command(author, version, about = "Influence heatmaps from vector data", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a vector file
    Info {
        /// Input GeoJSON file
        input: PathBuf,
    },
    /// Default heatmap of a single vector file
    Heatmap {
        /// Input GeoJSON file
        input: PathBuf,
        /// Output file (.csv or .geojson)
        output: PathBuf,
        /// Cells per side
        #[arg(short, long, default_value = "100")]
        grid_size: usize,
        /// Numeric property used as a per-feature multiplier
        #[arg(short, long)]
        weight_property: Option<String>,
        /// Property filter, `key=value` or `key=a,b,c` (repeatable)
        #[arg(short, long)]
        filter: Vec<String>,
        /// Aggregation mode; defaults by the dominant geometry family
        #[arg(short, long)]
        mode: Option<String>,
        /// Decay kernel: inverse, exp, linear
        #[arg(short, long, default_value = "exp")]
        decay: String,
        /// Kernel length in metres: exp scale or linear radius; unused by inverse
        #[arg(short, long, default_value = "1000")]
        scale: f64,
        /// Projected CRS used for distances
        #[arg(long, default_value = "EPSG:3857")]
        metric_crs: String,
    },
    /// Evaluate a JSON job (sources, grid, layers) and write the combination
    Eval {
        /// Job file
        job: PathBuf,
        /// Output file (.csv or .geojson)
        output: PathBuf,
    },
    /// Nearest-value resampling of scattered points onto a grid
    Resample {
        /// Points as CSV (lat,lon,value) or GeoJSON with a `value` property
        input: PathBuf,
        /// Output file (.csv or .geojson)
        output: PathBuf,
        /// Grid bounds `min_lon,min_lat,max_lon,max_lat`; defaults to the points' extent
        #[arg(short, long)]
        bounds: Option<String>,
        /// Columns
        #[arg(long, default_value = "100")]
        nx: usize,
        /// Rows
        #[arg(long, default_value = "100")]
        ny: usize,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_result(table: &GridTable, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    output::write_table(table, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, table: &GridTable, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Cells: {} x {}", table.nx(), table.ny());
    if let Some((min, max)) = table.value_range() {
        println!("  Value range: {:.4} .. {:.4}", min, max);
    }
    println!("  Processing time: {:.2?}", elapsed);
}

/// `key=value` or `key=a,b,c`; literals are typed as int, float, bool or string.
fn parse_filter(args: &[String]) -> Result<PropertyFilter> {
    let mut filter = PropertyFilter::new();
    for arg in args {
        let Some((key, raw)) = arg.split_once('=') else {
            bail!("Filter must be 'key=value', got: {}", arg);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("Filter key is empty in: {}", arg);
        }
        let values: Vec<AttributeValue> = raw.split(',').map(|v| parse_literal(v.trim())).collect();
        filter = if values.len() == 1 {
            filter.eq(key, values[0].clone())
        } else {
            filter.one_of(key, values)
        };
    }
    Ok(filter)
}

fn parse_literal(s: &str) -> AttributeValue {
    if let Ok(i) = s.parse::<i64>() {
        AttributeValue::from(i)
    } else if let Ok(f) = s.parse::<f64>() {
        AttributeValue::from(f)
    } else if let Ok(b) = s.parse::<bool>() {
        AttributeValue::from(b)
    } else {
        AttributeValue::from(s)
    }
}

fn decay_length(kind: &str, length: f64) -> Vec<(&'static str, f64)> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "inverse" => Vec::new(),
        "linear" | "linear_cutoff" => vec![("radius", length)],
        _ => vec![("scale", length)],
    }
}

fn parse_bounds(s: &str) -> Result<Bounds> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().context("Invalid bounds value"))
        .collect::<Result<_>>()?;
    match parts[..] {
        [min_x, min_y, max_x, max_y] => Ok(Bounds::new(min_x, min_y, max_x, max_y)),
        _ => bail!("Bounds must be 'min_lon,min_lat,max_lon,max_lat', got: {}", s),
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let pb = spinner("Reading vector...");
            let source = GeoSource::load(&input).context("Failed to read vector file")?;
            pb.finish_and_clear();

            println!("{}", source.summary());
            match source.dominant_family() {
                Some(family) => println!("  Dominant geometry: {}", family),
                None => println!("  Dominant geometry: none"),
            }
        }

        // ── Heatmap ──────────────────────────────────────────────────
        Commands::Heatmap {
            input,
            output,
            grid_size,
            weight_property,
            filter,
            mode,
            decay,
            scale,
            metric_crs,
        } => {
            let metric_crs = CRS::parse(&metric_crs)?;
            let pb = spinner("Reading vector...");
            let source = GeoSource::load_with_crs(&input, metric_crs)
                .context("Failed to read vector file")?;
            pb.finish_and_clear();

            let Some(family) = source.dominant_family() else {
                bail!("{} contains no usable geometry", input.display());
            };
            let mode = match mode {
                Some(m) => m.parse::<AggregationMode>()?,
                None => LayerSpec::default_for("input", family)?.mode(),
            };
            info!("Input: {} {} parts, mode {}", source.part_count(family), family, mode);

            let mut builder = LayerSpec::builder("input", family, mode)
                .filter(parse_filter(&filter)?)
                .decay(decay.clone(), decay_length(&decay, scale));
            if let Some(weight) = weight_property {
                builder = builder.weight_property(weight);
            }
            let spec = builder.build().context("Invalid layer")?;

            let mut catalog = GeoCatalog::new(metric_crs);
            catalog.add("input", source)?;
            let engine = Engine::new(catalog);
            let grid = engine.default_grid(grid_size, grid_size)?;

            let start = Instant::now();
            let table = engine
                .evaluate_layer(&grid, &spec)
                .context("Failed to evaluate layer")?;
            let elapsed = start.elapsed();
            write_result(&table, &output)?;
            done("Heatmap", &output, &table, elapsed);
        }

        // ── Eval ─────────────────────────────────────────────────────
        Commands::Eval { job, output } => {
            let job = JobConfig::load(&job)?;
            let specs = job.layer_specs()?;

            let pb = spinner("Loading sources...");
            let engine = job.build_engine()?;
            pb.finish_and_clear();
            let grid = job.grid(&engine)?;
            info!(
                "Evaluating {} layers on {}x{} grid",
                specs.len(),
                grid.nx(),
                grid.ny()
            );

            let start = Instant::now();
            let table = engine
                .evaluate_combination(&grid, &specs)
                .context("Failed to evaluate layers")?;
            let elapsed = start.elapsed();
            write_result(&table, &output)?;
            done("Combination", &output, &table, elapsed);
        }

        // ── Resample ─────────────────────────────────────────────────
        Commands::Resample {
            input,
            output,
            bounds,
            nx,
            ny,
        } => {
            let points = output::read_points(&input).context("Failed to read points")?;
            info!("Input: {} points", points.len());

            let bounds = match bounds {
                Some(b) => parse_bounds(&b)?,
                None => Bounds::from_coords(points.iter().map(|p| (p.lon, p.lat)))
                    .context("No points to derive bounds from")?,
            };
            let grid = GridSpec::new(bounds, nx, ny)?;

            let start = Instant::now();
            let table = resample(&points, &grid).context("Failed to resample")?;
            let elapsed = start.elapsed();
            write_result(&table, &output)?;
            done("Resampled grid", &output, &table, elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filter() {
        let f = parse_filter(&["amenity=cafe,bar".to_string(), "level=2".to_string()]).unwrap();
        assert_eq!(f.to_string(), PropertyFilter::new()
            .one_of("amenity", ["cafe", "bar"])
            .eq("level", 2i64)
            .to_string());
        assert!(parse_filter(&["novalue".to_string()]).is_err());
        assert!(parse_filter(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_parse_literal_types() {
        assert_eq!(parse_literal("3"), AttributeValue::from(3i64));
        assert_eq!(parse_literal("2.5"), AttributeValue::from(2.5));
        assert_eq!(parse_literal("true"), AttributeValue::from(true));
        assert_eq!(parse_literal("residential"), AttributeValue::from("residential"));
    }

    #[test]
    fn test_parse_bounds() {
        let b = parse_bounds("14.0, 50.0, 14.5, 50.25").unwrap();
        assert_eq!(b.as_tuple(), (14.0, 50.0, 14.5, 50.25));
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("1,2,x,4").is_err());
    }
}
