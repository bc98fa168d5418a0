//! Simulated engine loop.
//!
//! An audio thread drives the clock with synthetic host timestamps (seeded
//! jitter plus a constant clock-rate error) and walks the published
//! processing order every callback, while a control thread edits the graph.
//! Both monitors watch the render pass; the report summarizes all three.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tactus_core::{
    Connection, Node, NodeId, PerformanceMonitor, PrecisionClock, PrecisionTimingInfo,
    ProcessingGraph, ProcessingOrder, RealTimeSafetyMonitor,
};

use super::common::{ClockPreset, load_engine_config};

#[derive(Args)]
pub struct SimulateArgs {
    /// Engine config file (defaults to the user config, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start from a clock preset instead of a config file
    #[arg(long, value_enum, conflicts_with = "config")]
    preset: Option<ClockPreset>,

    /// Override the sample rate
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Override the buffer size
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Override the tempo
    #[arg(long)]
    bpm: Option<f64>,

    /// Number of callbacks to simulate
    #[arg(short = 'n', long, default_value_t = 2000)]
    buffers: u64,

    /// Peak host-time jitter per callback, in microseconds
    #[arg(long, default_value_t = 50.0)]
    jitter_us: f64,

    /// Host clock rate error in parts per million (positive = host runs fast)
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    drift_ppm: f64,

    /// Seed for the jitter generator
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Pace callbacks in real time instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Add a feedback connection to the demo graph
    #[arg(long)]
    cycle: bool,

    /// Milliseconds between control-thread graph edits (0 disables editing)
    #[arg(long, default_value_t = 5)]
    mutate_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report {
    callbacks: u64,
    simulated_seconds: f64,
    wall_seconds: f64,
    clock: ClockReport,
    graph: GraphReport,
    performance: PerformanceReport,
    safety: SafetyReport,
}

#[derive(Serialize)]
struct ClockReport {
    sample_rate: f64,
    buffer_size: usize,
    bpm: f64,
    sample_position: u64,
    bar: u32,
    beat: u32,
    tick: u32,
    average_jitter: f64,
    max_jitter: f64,
    jitter_std_dev: f64,
    drift_ppm: f64,
    timing_accuracy: f64,
    correction_count: u64,
}

#[derive(Serialize)]
struct GraphReport {
    nodes: usize,
    connections: usize,
    generation: u64,
    skipped_back_edges: usize,
    mutations: u64,
}

#[derive(Serialize)]
struct PerformanceReport {
    average_us: f64,
    max_us: f64,
    min_us: f64,
    budget_us: f64,
    cpu_load: f64,
}

#[derive(Serialize)]
struct SafetyReport {
    total_checks: u64,
    deadline_misses: u64,
    safety_percentage: f64,
    is_real_time_safe: bool,
    dropped_records: u64,
}

/// Everything the audio and control threads share.
struct Engine {
    clock: PrecisionClock,
    graph: ProcessingGraph,
    performance: PerformanceMonitor,
    safety: RealTimeSafetyMonitor,
    callbacks: AtomicU64,
    mutations: AtomicU64,
    running: AtomicBool,
    audio_done: AtomicBool,
}

/// Host-side parameters of the simulated device.
#[derive(Clone, Copy)]
struct HostModel {
    sample_rate: f64,
    buffer_size: usize,
    buffers: u64,
    jitter_seconds: f64,
    drift_ppm: f64,
    seed: u64,
    realtime: bool,
}

/// Node ids of the demo graph the control thread edits.
#[derive(Clone, Copy)]
struct DemoGraph {
    lfo: NodeId,
    delay: NodeId,
    mixer: NodeId,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let mut config = load_engine_config(args.config.as_deref(), args.preset)?;
    if let Some(sample_rate) = args.sample_rate {
        config.audio.sample_rate = sample_rate;
    }
    if let Some(buffer_size) = args.buffer_size {
        config.audio.buffer_size = buffer_size;
    }
    if let Some(bpm) = args.bpm {
        config.clock.bpm = bpm;
    }
    if let Err(err) = config.validate() {
        tracing::warn!("simulate: {err}; out-of-range values will be clamped");
    }

    let engine = Arc::new(Engine {
        clock: PrecisionClock::new(config.clock_config()),
        graph: ProcessingGraph::new(config.graph_config()),
        performance: config.performance_monitor(),
        safety: config.safety_monitor(),
        callbacks: AtomicU64::new(0),
        mutations: AtomicU64::new(0),
        running: AtomicBool::new(true),
        audio_done: AtomicBool::new(false),
    });
    let demo = build_demo_graph(&engine.graph, args.cycle)?;

    // The clock clamps what validation only warned about; report what it uses.
    let host = HostModel {
        sample_rate: engine.clock.sample_rate(),
        buffer_size: engine.clock.current_timing().buffer_size,
        buffers: args.buffers,
        jitter_seconds: args.jitter_us.abs() * 1e-6,
        drift_ppm: args.drift_ppm,
        seed: args.seed,
        realtime: args.realtime,
    };
    engine
        .performance
        .set_budget(host.sample_rate, host.buffer_size);

    let r = Arc::clone(&engine);
    ctrlc::set_handler(move || {
        r.running.store(false, Ordering::SeqCst);
    })?;

    tracing::info!(
        sample_rate = host.sample_rate,
        buffer_size = host.buffer_size,
        buffers = host.buffers,
        "simulate: starting"
    );

    let started = Instant::now();
    engine.clock.start();

    let audio = {
        let engine = Arc::clone(&engine);
        thread::Builder::new()
            .name("tactus-audio".into())
            .spawn(move || audio_thread(&engine, host))
            .context("spawning audio thread")?
    };
    let control = if args.mutate_ms > 0 {
        let engine = Arc::clone(&engine);
        let interval = Duration::from_millis(args.mutate_ms);
        let seed = args.seed.wrapping_add(1);
        Some(
            thread::Builder::new()
                .name("tactus-control".into())
                .spawn(move || control_thread(&engine, demo, interval, seed))
                .context("spawning control thread")?,
        )
    } else {
        None
    };

    let progress = (!args.realtime).then(|| {
        let pb = ProgressBar::new(host.buffers);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} callbacks")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb
    });

    let mut misses = 0usize;
    while !audio.is_finished() {
        if let Some(pb) = &progress {
            pb.set_position(engine.callbacks.load(Ordering::Relaxed));
        }
        misses += engine.safety.drain_misses().len();
        thread::sleep(Duration::from_millis(20));
    }

    let timing = audio
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
    engine.audio_done.store(true, Ordering::SeqCst);
    if let Some(control) = control {
        control
            .join()
            .map_err(|_| anyhow::anyhow!("control thread panicked"))?;
    }
    misses += engine.safety.drain_misses().len();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    engine.clock.stop();
    tracing::debug!("simulate: drained {misses} deadline miss records");

    let report = build_report(&engine, &timing, started.elapsed());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// input -> filter -> delay -> mixer -> output, with lfo -> filter.
fn build_demo_graph(graph: &ProcessingGraph, cycle: bool) -> anyhow::Result<DemoGraph> {
    let input = graph.add_node(Node::new("input"))?;
    let lfo = graph.add_node(Node::new("lfo"))?;
    let filter = graph.add_node(Node::new("filter"))?;
    let delay = graph.add_node(Node::new("delay"))?;
    let mixer = graph.add_node(Node::new("mixer"))?;
    let output = graph.add_node(Node::new("output"))?;

    graph.add_connection(Connection::new(input, filter))?;
    graph.add_connection(Connection::new(lfo, filter).with_ports(0, 1))?;
    graph.add_connection(Connection::new(filter, delay))?;
    graph.add_connection(Connection::new(delay, mixer))?;
    graph.add_connection(Connection::new(mixer, output))?;

    if cycle {
        // Feedback path; refused when the config rejects cycles.
        if let Err(err) = graph.add_connection(Connection::new(delay, filter).with_ports(0, 2)) {
            tracing::warn!("simulate: feedback connection not added: {err}");
        }
    }

    Ok(DemoGraph { lfo, delay, mixer })
}

fn audio_thread(engine: &Engine, host: HostModel) -> PrecisionTimingInfo {
    let mut rng = fastrand::Rng::with_seed(host.seed);
    let mut buffer = vec![0.0f32; host.buffer_size];
    let period = host.buffer_size as f64 / host.sample_rate;
    let budget = Duration::from_secs_f64(period);
    let rate = 1.0 + host.drift_ppm * 1e-6;
    let start = Instant::now();

    for i in 0..host.buffers {
        if !engine.running.load(Ordering::Relaxed) {
            break;
        }
        let nominal = i as f64 * period;
        if host.realtime {
            let target = start + Duration::from_secs_f64(nominal);
            if let Some(wait) = target.checked_duration_since(Instant::now()) {
                thread::sleep(wait);
            }
        }
        let host_time = nominal * rate + (rng.f64() * 2.0 - 1.0) * host.jitter_seconds;

        let deadline = Instant::now() + budget;
        engine.performance.start_processing_cycle();
        engine.clock.process_buffer(host_time, host.buffer_size);
        render(&engine.graph.processing_order(), &mut buffer);
        engine.performance.end_processing_cycle();
        engine.safety.check_deadline(deadline);

        engine.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    engine.clock.current_timing()
}

/// Stand-in DSP: each enabled node mixes its input count into the buffer.
fn render(order: &ProcessingOrder, buffer: &mut [f32]) {
    for entry in order.enabled() {
        let drive = 0.25 * (order.incoming(entry).len() as f32 + 1.0);
        for sample in buffer.iter_mut() {
            *sample = (*sample * 0.5 + drive).tanh();
        }
    }
    std::hint::black_box(buffer);
}

fn control_thread(engine: &Engine, demo: DemoGraph, interval: Duration, seed: u64) {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut inserts: Vec<NodeId> = Vec::new();
    let mut lfo_enabled = true;

    while engine.running.load(Ordering::Relaxed) && !engine.audio_done.load(Ordering::Relaxed) {
        let result = match rng.u8(0..3) {
            0 => {
                let name = format!("insert{}", inserts.len());
                engine.graph.add_node(Node::new(name)).and_then(|id| {
                    inserts.push(id);
                    engine
                        .graph
                        .add_connection(Connection::new(demo.delay, id))?;
                    engine
                        .graph
                        .add_connection(Connection::new(id, demo.mixer))
                        .map(|_| ())
                })
            }
            1 => {
                lfo_enabled = !lfo_enabled;
                engine.graph.set_node_enabled(demo.lfo, lfo_enabled)
            }
            _ => match inserts.pop() {
                Some(id) => engine.graph.remove_node(id),
                None => Ok(()),
            },
        };

        match result {
            Ok(()) => {
                engine.mutations.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => tracing::warn!("simulate: graph edit failed: {err}"),
        }
        thread::sleep(interval);
    }
}

fn build_report(engine: &Engine, timing: &PrecisionTimingInfo, wall: Duration) -> Report {
    let callbacks = engine.callbacks.load(Ordering::Relaxed);
    let order = engine.graph.processing_order();
    let metrics = engine.performance.current_metrics();
    let status = engine.safety.current_status();
    let micros = |d: Duration| d.as_secs_f64() * 1e6;

    Report {
        callbacks,
        simulated_seconds: timing.sample_position as f64 / timing.sample_rate,
        wall_seconds: wall.as_secs_f64(),
        clock: ClockReport {
            sample_rate: timing.sample_rate,
            buffer_size: timing.buffer_size,
            bpm: timing.bpm,
            sample_position: timing.sample_position,
            bar: timing.musical_position.bar,
            beat: timing.musical_position.beat,
            tick: timing.musical_position.tick,
            average_jitter: timing.accuracy.average_jitter,
            max_jitter: timing.accuracy.max_jitter,
            jitter_std_dev: timing.accuracy.jitter_std_dev,
            drift_ppm: timing.accuracy.drift_ppm,
            timing_accuracy: timing.accuracy.timing_accuracy,
            correction_count: timing.accuracy.correction_count,
        },
        graph: GraphReport {
            nodes: engine.graph.node_count(),
            connections: engine.graph.connection_count(),
            generation: order.generation(),
            skipped_back_edges: order.skipped_back_edges(),
            mutations: engine.mutations.load(Ordering::Relaxed),
        },
        performance: PerformanceReport {
            average_us: micros(metrics.average),
            max_us: micros(metrics.max),
            min_us: micros(metrics.min),
            budget_us: micros(metrics.budget),
            cpu_load: metrics.cpu_load,
        },
        safety: SafetyReport {
            total_checks: status.total_checks,
            deadline_misses: status.deadline_misses,
            safety_percentage: status.safety_percentage,
            is_real_time_safe: status.is_real_time_safe,
            dropped_records: status.dropped_records,
        },
    }
}

fn print_report(report: &Report) {
    let clock = &report.clock;
    println!(
        "Simulated {} callbacks ({:.3} s of audio in {:.3} s)",
        report.callbacks, report.simulated_seconds, report.wall_seconds
    );
    println!();
    println!("Clock:");
    println!(
        "  {} Hz, {} frames, {:.1} BPM",
        clock.sample_rate, clock.buffer_size, clock.bpm
    );
    println!(
        "  Position:    sample {} (bar {}, beat {}, tick {})",
        clock.sample_position, clock.bar, clock.beat, clock.tick
    );
    println!(
        "  Jitter:      avg {:.3}, max {:.3}, std dev {:.3} samples",
        clock.average_jitter, clock.max_jitter, clock.jitter_std_dev
    );
    println!("  Drift:       {:.1} ppm", clock.drift_ppm);
    println!(
        "  Accuracy:    {:.1}% ({} corrections)",
        clock.timing_accuracy, clock.correction_count
    );
    println!();

    let graph = &report.graph;
    println!("Graph:");
    println!(
        "  {} nodes, {} connections, generation {}",
        graph.nodes, graph.connections, graph.generation
    );
    println!(
        "  {} control edits, {} skipped back-edges",
        graph.mutations, graph.skipped_back_edges
    );
    println!();

    let perf = &report.performance;
    println!("Performance:");
    println!(
        "  avg {:.1} us, min {:.1} us, max {:.1} us of {:.1} us budget",
        perf.average_us, perf.min_us, perf.max_us, perf.budget_us
    );
    println!("  CPU load:    {:.2}%", perf.cpu_load);
    println!();

    let safety = &report.safety;
    let verdict = if safety.is_real_time_safe {
        "real-time safe"
    } else {
        "NOT real-time safe"
    };
    println!("Safety:");
    println!(
        "  {}/{} deadlines missed ({:.2}% met), {}",
        safety.deadline_misses, safety.total_checks, safety.safety_percentage, verdict
    );
    if safety.dropped_records > 0 {
        println!("  {} miss records dropped", safety.dropped_records);
    }
}
