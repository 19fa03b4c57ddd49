//! patrol: a small warehouse patrol mission for the rust_patrol framework.
//!
//! Five agents split a synthetic warehouse floor into partitions and meet at
//! partition borders to keep their plan in sync.  One agent is lost part-way
//! through; the survivors notice at their next meetings and take over its
//! partition.
//!
//! ```text
//! cargo run -p patrol                    # built-in configuration
//! cargo run -p patrol -- mission.json    # MissionConfig from JSON
//! RUST_LOG=pt_partition=debug cargo run -p patrol
//! ```

mod floor;

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pt_core::{AgentId, MissionConfig, ProtocolConfig, Tick};
use pt_graph::DistanceTable;
use pt_output::{CsvWriter, SimOutputObserver};
use pt_partition::VoronoiGenerator;
use pt_sim::SimBuilder;

use floor::{build_floor, COLS, ROWS};

// ── Constants ─────────────────────────────────────────────────────────────────

const AGENT_COUNT: usize   = 5;
const LOST_AGENT:  AgentId = AgentId(2);
const LOST_AT:     Tick    = Tick(600);
const OUTPUT_DIR:  &str    = "output/patrol";

fn default_config() -> MissionConfig {
    MissionConfig {
        total_ticks:             2_000,
        seed:                    42,
        snapshot_interval_ticks: 25,
        drop_probability:        0.02,
        protocol:                ProtocolConfig::default(),
    }
}

/// First CLI argument, if any, is a JSON `MissionConfig`.  Missing fields
/// take their defaults.
fn load_config() -> Result<MissionConfig> {
    let Some(path) = std::env::args().nth(1) else {
        return Ok(default_config());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = load_config()?;
    println!("=== patrol: rust_patrol ===");
    println!(
        "Agents: {AGENT_COUNT}  |  Ticks: {}  |  Seed: {}  |  Drop: {:.0}%",
        config.total_ticks,
        config.seed,
        config.drop_probability * 100.0,
    );

    // 1. Floor plan and travel-time table.
    let graph = build_floor();
    let table = DistanceTable::build(&graph);
    println!(
        "Floor: {COLS}×{ROWS} bays, {} vertices, {} corridors",
        graph.vertex_count(),
        graph.edge_count() / 2,
    );

    // 2. Mission.  Agent 0 generates the partition plan for everyone.
    let mut sim = SimBuilder::new(config.clone(), graph, table, AGENT_COUNT)
        .generator(VoronoiGenerator::default())
        .failure(LOST_AGENT, LOST_AT)
        .build()?;
    for p in sim.plan.topology.partitions.values() {
        info!(
            partition = %p.id, owner = %p.owner_hint, vertices = p.vertices.len(),
            diameter = p.diameter, meeting_points = p.meeting_points.len(),
            "partition",
        );
    }

    // 3. Output.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let mut obs = SimOutputObserver::new(CsvWriter::new(Path::new(OUTPUT_DIR))?);

    // 4. Run.
    let t0 = Instant::now();
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();
    if let Some(e) = obs.take_error() {
        eprintln!("output error: {e}");
    }

    // 5. Summary.
    let f = &sim.faults;
    println!();
    println!("Mission complete in {:.3} s  (output in {OUTPUT_DIR}/)", elapsed.as_secs_f64());
    println!("  exchanges           : {}", f.exchanges);
    println!("  early meetings      : {}", f.early_meetings);
    println!("  peers missing       : {}", f.peers_missing);
    println!("  takeovers proposed  : {}", f.takeovers_proposed);
    println!("  takeovers confirmed : {}", f.takeovers_confirmed);
    println!("  takeovers cancelled : {}", f.takeovers_cancelled);
    println!("  rebalances          : {}", f.rebalances);
    println!("  no route            : {}", f.no_route);
    println!(
        "  coverage            : {}/{} vertices",
        sim.coverage().len(),
        sim.graph.vertex_count(),
    );
    println!();

    println!("{:<10} {:<8} {:<16} {:<10}", "Agent", "Alive", "Partitions", "Vertices");
    println!("{}", "-".repeat(46));
    for agent in &sim.agents {
        let owned: Vec<String> = agent
            .partition
            .owned_partitions()
            .iter()
            .map(|p| p.0.to_string())
            .collect();
        println!(
            "{:<10} {:<8} {:<16} {:<10}",
            agent.id.0,
            if sim.is_alive(agent.id) { "yes" } else { "no" },
            owned.join(","),
            agent.partition.vertices_to_patrol().len(),
        );
    }

    let split: Vec<_> = sim.owner_views().into_iter().filter(|(_, o)| o.len() > 1).collect();
    if !split.is_empty() {
        println!();
        println!("Partitions still without agreed owner: {split:?}");
    }

    Ok(())
}
