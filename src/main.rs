use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgEnum, Args, Parser};
use csv::Writer;
use fern::colors::{Color, ColoredLevelConfig};
use graphlib::{
    build_graph, sparse_to_dense,
    tsp::{BruteForceSolver, IlpSolver, TourSolver},
    Coordinate, DistanceProvider, PrioritySet, Stop,
};
use planner::{
    benchmark, compute_route, Algorithm, GreatCircleProvider, OsrmClient, PriorityMode,
    RouteConfig, RouteRequest,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[clap(name = "medroute", about = "Visiting orders for a depot and its stops")]
struct Cli {
    /// Log debug output
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Order the stops of a CSV file and fetch the route for that order
    Route(RouteArgs),
    /// Time the all-pairs engines on random instances
    Bench(BenchArgs),
}

#[derive(ArgEnum, Clone, Copy, Debug)]
enum SolverChoice {
    Ilp,
    BruteForce,
}

#[derive(Args)]
struct RouteArgs {
    /// CSV with columns key,latitude,longitude; the first row is the depot
    #[clap(parse(from_os_str), value_name = "STOPS")]
    stops: PathBuf,

    #[clap(short, long, default_value = "exact_tour")]
    algorithm: Algorithm,

    #[clap(short, env = "K_NEAREST_NEIGHBORS", default_value = "10")]
    k: usize,

    /// Keys of stops to serve first
    #[clap(short, long, use_delimiter = true)]
    priority: Vec<String>,

    #[clap(long, default_value = "constraint")]
    priority_mode: PriorityMode,

    #[clap(long, arg_enum, default_value = "ilp")]
    solver: SolverChoice,

    #[clap(long = "budget-secs", default_value = "10")]
    budget_secs: u64,

    #[clap(long, default_value = "3")]
    repeats: usize,

    #[clap(long, env = "OSRM_BASE_URL", default_value = "http://localhost:5000")]
    osrm_url: String,

    /// Use great-circle distances instead of an OSRM server
    #[clap(long)]
    offline: bool,

    /// Write the plan here instead of stdout
    #[clap(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct BenchArgs {
    #[clap(long, use_delimiter = true, default_value = "5,10,20,40")]
    sizes: Vec<usize>,

    #[clap(long, default_value = "3")]
    repeats: usize,

    #[clap(short, env = "K_NEAREST_NEIGHBORS", default_value = "10")]
    k: usize,

    #[clap(long, default_value = "0")]
    seed: u64,

    #[clap(short, long, default_value = "results.csv", parse(from_os_str))]
    output: PathBuf,
}

#[derive(Deserialize)]
struct StopRecord {
    key: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
struct BenchResult {
    nodes: usize,
    k: usize,
    edges: usize,
    #[serde(rename = "fwTime")]
    fw_time: f64,
    #[serde(rename = "dijkstraTime")]
    dijkstra_time: f64,
    #[serde(rename = "bellmanFordTime")]
    bellman_ford_time: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    set_up_logging(cli.verbose)?;

    match cli.command {
        Command::Route(args) => route(args),
        Command::Bench(args) => bench(args),
    }
}

fn route(args: RouteArgs) -> Result<()> {
    log::info!("Loading stops from {:?}...", args.stops);
    let mut stops = load_stops(&args.stops)?;
    log::info!("    ...success! {} stops.", stops.len());
    if stops.is_empty() {
        anyhow::bail!("{:?} contains no stops", args.stops);
    }
    let depot = stops.remove(0);

    let request = RouteRequest {
        depot,
        stops,
        algorithm: args.algorithm,
        priority: args.priority.into_iter().collect::<PrioritySet>(),
    };
    let config = RouteConfig {
        k: args.k,
        solver_budget: Duration::from_secs(args.budget_secs),
        benchmark_repeats: args.repeats,
        priority_mode: args.priority_mode,
    };

    let provider: Box<dyn DistanceProvider> = if args.offline {
        Box::new(GreatCircleProvider::default())
    } else {
        log::info!("Using OSRM at {}", args.osrm_url);
        Box::new(OsrmClient::new(&args.osrm_url))
    };
    let solver: Box<dyn TourSolver> = match args.solver {
        SolverChoice::Ilp => Box::new(IlpSolver::default()),
        SolverChoice::BruteForce => Box::new(BruteForceSolver),
    };

    let plan = match compute_route(&request, &config, provider.as_ref(), solver.as_ref()) {
        Ok(plan) => plan,
        Err(err) => {
            if let Some(order) = err.visiting_order() {
                log::error!("Stops were ordered as {:?} before the failure.", order);
            }
            return Err(err.into());
        }
    };
    log::info!(
        "Route: {} ({:.0} m, {:.0} s)",
        plan.visiting_keys.join(" -> "),
        plan.total_distance,
        plan.total_duration
    );

    match args.output {
        Some(path) => {
            let file = std::fs::File::create(&path)
                .with_context(|| format!("cannot create {:?}", path))?;
            serde_json::to_writer_pretty(file, &plan)?;
        }
        None => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

fn load_stops(path: &PathBuf) -> Result<Vec<Stop>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("cannot read {:?}", path))?;
    let mut stops = vec![];
    for record in reader.deserialize() {
        let record: StopRecord = record?;
        stops.push(Stop::new(record.key, record.latitude, record.longitude));
    }
    Ok(stops)
}

fn bench(args: BenchArgs) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let provider = GreatCircleProvider::default();

    let mut results = vec![];
    for &n in &args.sizes {
        if n < 2 {
            log::warn!("Skipping size {}: at least two stops are needed.", n);
            continue;
        }
        let coordinates: Vec<Coordinate> = (0..n)
            .map(|_| Coordinate::new(rng.gen_range(52.35..52.65), rng.gen_range(13.1..13.7)))
            .collect();
        let k = args.k.clamp(1, n - 1);

        let graph = build_graph(&coordinates, k, &provider)?;
        let matrix = sparse_to_dense(&graph, n);
        log::info!("Benchmarking n = {}, k = {}...", n, k);
        let report = benchmark(&matrix, &graph, args.repeats)?;
        log::info!(
            "    ...fw {:.6}s, dijkstra {:.6}s, bellman-ford {:.6}s",
            report.floyd_warshall,
            report.dijkstra,
            report.bellman_ford
        );

        results.push(BenchResult {
            nodes: n,
            k,
            edges: graph.num_edges(),
            fw_time: report.floyd_warshall,
            dijkstra_time: report.dijkstra,
            bellman_ford_time: report.bellman_ford,
        });
    }

    export(&args.output, results)
}

fn export<E: Serialize>(output: &PathBuf, results: Vec<E>) -> Result<()> {
    let mut wtr = Writer::from_path(output)?;
    for entry in results {
        wtr.serialize(entry)?;
    }
    wtr.flush()?;
    Ok(())
}

fn set_up_logging(verbose: bool) -> Result<(), fern::InitError> {
    std::fs::create_dir_all("logs")?;
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    let console = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date}][{level}] {message}",
                date = chrono::Local::now().format("%H:%M:%S"),
                level = colors.color(record.level()),
                message = message
            ));
        })
        .chain(std::io::stderr());
    let file = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date}][{level}] {message}",
                date = chrono::Local::now().format("%H:%M:%S"),
                level = record.level(),
                message = message
            ));
        })
        .chain(fern::log_file(format!(
            "logs/{}.log",
            chrono::Local::now().format("%d%m%Y-%H%M")
        ))?);

    fern::Dispatch::new()
        .level(level)
        .chain(console)
        .chain(file)
        .apply()?;

    log::info!("Logger set up!");

    Ok(())
}
