//! vvcurv CLI - Vector Voting curvature estimation.
//!
//! Usage: vvcurv <COMMAND> [OPTIONS]
//!
//! Run `vvcurv --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use vvcurv::algo::{
    estimate_curvature_with_progress, Attribute, Progress, ShapeCategory, Variant, VotingOptions,
};
use vvcurv::graph::{build_graph, connected_components, Adjacency, GraphOptions};
use vvcurv::io;
use vvcurv::mesh::TriangleMesh;
use vvcurv::synthetic;

#[derive(Parser)]
#[command(name = "vvcurv")]
#[command(author, version, about = "Vector Voting curvature estimation", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate curvature on every triangle of a mesh
    Estimate {
        /// Input mesh file (.ply or .stl)
        input: PathBuf,

        /// Output PLY file with per-face curvature attributes
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for plain-text attribute files (one value per line)
        #[arg(long)]
        attributes: Option<PathBuf>,

        /// Radius of the smallest feature of interest, in mesh units
        #[arg(short, long)]
        radius_hit: f64,

        /// Curvature estimation variant: avv, ssvv or rvv (case-insensitive)
        #[arg(long, default_value = "rvv", value_parser = parse_variant)]
        variant: Variant,

        /// Number of worker threads (default: all cores)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Classification weight of the crease saliency
        #[arg(long, default_value = "0")]
        epsilon: f64,

        /// Classification weight of the ball saliency
        #[arg(long, default_value = "0")]
        eta: f64,

        /// Exclude triangles closer than this distance to the border
        #[arg(long, default_value = "0")]
        exclude_borders: f64,

        /// Number of RVV refinement rounds
        #[arg(long, default_value = "2")]
        rvv_iterations: usize,

        /// Do not weight neighbors by triangle area
        #[arg(long)]
        no_area_weighting: bool,

        /// Flip all triangle normals
        #[arg(long)]
        reverse_normals: bool,

        /// Multiply all coordinates by this factor (e.g. voxel size)
        #[arg(long, default_value = "1")]
        scale: f64,

        /// Which triangles count as adjacent
        #[arg(long, value_enum, default_value = "vertex")]
        adjacency: AdjacencyArg,

        /// Do not show a progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Display mesh and triangle graph information
    Info {
        /// Input mesh file
        input: PathBuf,

        /// Which triangles count as adjacent
        #[arg(long, value_enum, default_value = "vertex")]
        adjacency: AdjacencyArg,
    },

    /// Generate a synthetic test surface
    Generate {
        /// Surface type
        #[arg(value_enum)]
        shape: Shape,

        /// Output mesh file
        output: PathBuf,

        /// Sphere or cylinder radius, torus ring radius
        #[arg(long, default_value = "10")]
        radius: f64,

        /// Torus tube radius
        #[arg(long, default_value = "4")]
        tube_radius: f64,

        /// Cylinder height or plane side length
        #[arg(long, default_value = "40")]
        size: f64,

        /// Mesh resolution: subdivisions (icosphere, default 4), segments
        /// (uv-sphere, cylinder, torus ring, default 64) or cells per side
        /// (plane, default 40)
        #[arg(long)]
        resolution: Option<usize>,

        /// Rings (uv-sphere, cylinder) or vertices around the torus tube
        #[arg(long, default_value = "32")]
        rings: usize,

        /// Standard deviation of Gaussian noise along the normals, as a
        /// fraction of the mean edge length
        #[arg(long, default_value = "0")]
        noise: f64,

        /// Random seed for the noise
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum AdjacencyArg {
    /// Triangles sharing at least one vertex
    Vertex,
    /// Triangles sharing an edge
    Edge,
}

impl From<AdjacencyArg> for Adjacency {
    fn from(arg: AdjacencyArg) -> Self {
        match arg {
            AdjacencyArg::Vertex => Adjacency::SharedVertex,
            AdjacencyArg::Edge => Adjacency::SharedEdge,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Shape {
    /// Subdivided icosahedron
    Icosphere,
    /// Latitude-longitude sphere
    UvSphere,
    /// Open cylinder along z
    Cylinder,
    /// Torus around the z axis
    Torus,
    /// Square patch in the xy plane
    Plane,
}

fn parse_variant(s: &str) -> Result<Variant, String> {
    s.parse::<Variant>().map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` takes precedence over `-v`.
///
/// Library events are emitted through `tracing` and reach the logger via its
/// `log` compatibility records.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = format!("vvcurv={level}");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Estimate {
            input,
            output,
            attributes,
            radius_hit,
            variant,
            workers,
            epsilon,
            eta,
            exclude_borders,
            rvv_iterations,
            no_area_weighting,
            reverse_normals,
            scale,
            adjacency,
            quiet,
        } => {
            let graph = GraphOptions::default()
                .with_adjacency(adjacency.into())
                .with_reverse_normals(reverse_normals)
                .with_scale(scale);
            let mut options = VotingOptions::new(radius_hit)
                .with_variant(variant)
                .with_classification(epsilon, eta)
                .with_exclude_borders(exclude_borders)
                .with_rvv_iterations(rvv_iterations)
                .with_area_weighting(!no_area_weighting)
                .with_graph(graph);
            if let Some(workers) = workers {
                options = options.with_num_workers(workers);
            }
            cmd_estimate(&input, output.as_deref(), attributes.as_deref(), &options, quiet)?;
        }

        Commands::Info { input, adjacency } => {
            cmd_info(&input, adjacency.into())?;
        }

        Commands::Generate {
            shape,
            output,
            radius,
            tube_radius,
            size,
            resolution,
            rings,
            noise,
            seed,
        } => {
            let dims = Dimensions {
                radius,
                tube_radius,
                size,
                resolution,
                rings,
            };
            cmd_generate(shape, &output, &dims, noise, seed)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Workers report concurrently; only ever move forward
        let previous = max_percent.fetch_max(raw_percent, Ordering::Relaxed);
        if raw_percent <= previous && raw_percent != 100 {
            return;
        }
        let percent = raw_percent.max(previous);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let empty = bar_width - filled;

        eprint!(
            "\r[{}{}] {:3}% {:<40}",
            "=".repeat(filled),
            " ".repeat(empty),
            percent,
            message
        );
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn load_mesh(input: &Path) -> Result<TriangleMesh, Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    println!(
        "Loaded: {} vertices, {} faces",
        mesh.num_vertices(),
        mesh.num_faces()
    );
    Ok(mesh)
}

fn cmd_estimate(
    input: &Path,
    output: Option<&Path>,
    attributes: Option<&Path>,
    options: &VotingOptions,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    options.validate()?;
    let mesh = load_mesh(input)?;

    println!(
        "Estimating curvature ({}, radius_hit={}, {} workers)...",
        options.variant, options.radius_hit, options.num_workers
    );
    let progress = if quiet { Progress::none() } else { create_progress() };

    let start = Instant::now();
    let result = estimate_curvature_with_progress(&mesh, options, &progress)?;
    let elapsed = start.elapsed();
    info!(?elapsed, "estimation finished");

    println!(
        "Valid: {} of {} triangles ({:.2?})",
        result.num_valid(),
        result.len(),
        elapsed
    );
    for (reason, count) in result.invalid_counts() {
        println!("  invalid ({reason}): {count}");
    }

    println!("\nAttribute          count        min        max       mean");
    for attribute in Attribute::ALL {
        let s = result.summary(attribute);
        println!(
            "{:<16} {:>7} {:>10.5} {:>10.5} {:>10.5}",
            attribute.name(),
            s.count,
            s.min,
            s.max,
            s.mean
        );
    }

    let mut categories: Vec<(ShapeCategory, usize)> = Vec::new();
    for category in result.category.iter().flatten() {
        match categories.iter_mut().find(|(c, _)| c == category) {
            Some((_, n)) => *n += 1,
            None => categories.push((*category, 1)),
        }
    }
    categories.sort_by_key(|&(c, _)| c.code());
    if !categories.is_empty() {
        println!("\nShape categories:");
        for (category, count) in categories {
            println!("  {:<14} {}", category.as_str(), count);
        }
    }

    if let Some(output) = output {
        io::save_result(&mesh, &result, output)?;
        println!("\nSaved: {}", output.display());
    }

    if let Some(dir) = attributes {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("mesh");
        let written = io::write_attributes(&result, dir, stem)?;
        println!("Wrote {} attribute files to {}", written.len(), dir.display());
    }

    Ok(())
}

fn cmd_info(input: &Path, adjacency: Adjacency) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());

    let areas = mesh.areas();
    let min_area = areas.iter().copied().fold(f64::INFINITY, f64::min);
    let max_area = areas.iter().copied().fold(0.0_f64, f64::max);
    println!("Surface area: {:.6}", mesh.total_area());
    println!("Face area range: [{:.6}, {:.6}]", min_area, max_area);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }
    println!(
        "Average edge length: {:.6}",
        synthetic::mean_edge_length(&mesh)
    );

    let boundary = mesh.boundary_edges();
    if boundary.is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!("Topology: Open ({} boundary edges)", boundary.len());
    }

    let graph = build_graph(&mesh, &GraphOptions::default().with_adjacency(adjacency))?;
    let components = connected_components(&graph);
    let degrees: Vec<usize> = graph.node_ids().map(|n| graph.degree(n)).collect();
    let mean_degree = degrees.iter().sum::<usize>() as f64 / degrees.len().max(1) as f64;

    println!("\nTriangle graph:");
    println!("  Nodes: {}", graph.num_nodes());
    println!("  Edges: {}", graph.num_edges());
    println!("  Mean degree: {:.2}", mean_degree);
    println!("  Border nodes: {}", graph.border_nodes().len());
    println!("  Degenerate triangles: {}", graph.num_degenerate());
    println!(
        "  Connected components: {} (largest {})",
        components.count(),
        components.largest()
    );

    Ok(())
}

/// Size parameters of a generated surface.
struct Dimensions {
    radius: f64,
    tube_radius: f64,
    size: f64,
    resolution: Option<usize>,
    rings: usize,
}

fn cmd_generate(
    shape: Shape,
    output: &Path,
    dims: &Dimensions,
    noise: f64,
    seed: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let Dimensions {
        radius,
        tube_radius,
        size,
        resolution,
        rings,
    } = *dims;
    let mut mesh = match shape {
        Shape::Icosphere => synthetic::icosphere(radius, resolution.unwrap_or(4))?,
        Shape::UvSphere => synthetic::uv_sphere(radius, resolution.unwrap_or(64), rings)?,
        Shape::Cylinder => synthetic::cylinder(radius, size, resolution.unwrap_or(64), rings)?,
        Shape::Torus => {
            synthetic::torus(radius, tube_radius, resolution.unwrap_or(64), rings)?
        }
        Shape::Plane => synthetic::plane(size, resolution.unwrap_or(40))?,
    };

    if noise > 0.0 {
        let sigma = noise * synthetic::mean_edge_length(&mesh);
        mesh = synthetic::add_noise(&mesh, sigma, seed)?;
        println!("Added noise: sigma={:.6} (seed {})", sigma, seed);
    }

    io::save(&mesh, output)?;
    println!(
        "Saved: {} ({} vertices, {} faces)",
        output.display(),
        mesh.num_vertices(),
        mesh.num_faces()
    );

    Ok(())
}
