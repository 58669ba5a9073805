use chrono::{SecondsFormat, Utc};
use clap::Parser;
use lost_found_desk::autoplay::Clerk;
use lost_found_desk::catalog::Catalog;
use lost_found_desk::config::{SessionConfig, SessionOptions};
use lost_found_desk::constants::TICK_DT;
use lost_found_desk::engine::DeskEngine;
use lost_found_desk::types::{
    Difficulty, PlacementKind, RuntimeEvent, ShiftEndReason, ShiftSummary, Snapshot,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Surface containment slack for rounding in the physics step.
const SURFACE_TOLERANCE: f32 = 0.5;
const STARTING_BALANCE: i64 = 0;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    minutes: Option<i32>,
    #[arg(long)]
    difficulty: Option<String>,
    #[arg(long)]
    seed: Option<u64>,
    /// JSON tuning override applied on top of the defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    minutes: i32,
    difficulty: Difficulty,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    minutes: i32,
    difficulty: Difficulty,
    reason: ShiftEndReason,
    #[serde(rename = "durationSecs")]
    duration_secs: f32,
    balance: i64,
    earned: i64,
    served: u32,
    #[serde(rename = "casesSolved")]
    cases_solved: u32,
    #[serde(rename = "timedOut")]
    timed_out: u32,
    #[serde(rename = "hostilesRepelled")]
    hostiles_repelled: u32,
    #[serde(rename = "batchesSpawned")]
    batches_spawned: u32,
    #[serde(rename = "batchPauses")]
    batch_pauses: u32,
    #[serde(rename = "wrongDeliveries")]
    wrong_deliveries: u32,
    thefts: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioRunResult {
    #[serde(flatten)]
    result: ScenarioResultLine,
    #[serde(rename = "anomalyRecords")]
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageEarned")]
    average_earned: i64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

#[derive(Default)]
struct EventCounts {
    batches_spawned: u32,
    batch_pauses: u32,
    wrong_deliveries: u32,
    thefts: u32,
}

fn main() {
    // Engine tracing shares stderr with the JSON log lines, so keep it quiet
    // unless RUST_LOG asks otherwise.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let run_started_at_ms = now_ms();
    let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let scenarios = resolve_scenarios(&cli);
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));

    let base_config = match cli.config.as_deref() {
        Some(path) => match SessionConfig::load(path) {
            Ok(config) => Some(config),
            Err(error) => {
                emit_log(
                    "error",
                    "config_load_failed",
                    &match_id,
                    None,
                    None,
                    None,
                    json!({
                        "path": path.to_string_lossy(),
                        "error": error.to_string(),
                    }),
                );
                std::process::exit(2);
            }
        },
        None => None,
    };
    let catalog = Arc::new(Catalog::builtin());

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_earned = 0i64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "minutes": scenario.minutes,
                "difficulty": scenario.difficulty,
            }),
        );
        let mut config = base_config
            .clone()
            .unwrap_or_else(|| SessionConfig::for_difficulty(scenario.difficulty));
        config.difficulty = scenario.difficulty;
        let scenario_run = run_scenario(&scenario, config, Arc::clone(&catalog));

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_earned += scenario_run.result.earned;
        *reason_counts
            .entry(end_reason_key(scenario_run.result.reason))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "reason": scenario_run.result.reason,
                "earned": scenario_run.result.earned,
                "served": scenario_run.result.served,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => {
                emit_log(
                    "error",
                    "result_serialize_failed",
                    &match_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error.to_string() }),
                );
                std::process::exit(2);
            }
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        started_at,
        run_started_at_ms,
        now_ms(),
        scenario_results,
        reason_counts,
        total_anomalies,
        total_earned,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "anomalyCount": summary.anomaly_count,
            "averageEarned": summary.average_earned,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_scenario(scenario: &Scenario, config: SessionConfig, catalog: Arc<Catalog>) -> ScenarioRunResult {
    let mut engine = DeskEngine::new(
        config,
        catalog,
        SessionOptions {
            seed: scenario.seed,
            starting_balance: STARTING_BALANCE,
            day: 1,
            shift_duration_override: Some((scenario.minutes * 60) as f32),
        },
    );
    let mut clerk = Clerk::new(scenario.seed.wrapping_mul(31).wrapping_add(7));

    let mut counts = EventCounts::default();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut tick_safety = 0usize;
    let mut last_tick = 0u64;
    let tick_limit = (scenario.minutes.max(1) as f32 * 60.0 / TICK_DT) as usize + 60;

    while !engine.is_ended() {
        clerk.act(&mut engine, TICK_DT);
        engine.step(TICK_DT);
        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(&engine, &snapshot) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        tick_safety += 1;
        if tick_safety > tick_limit {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }

        for event in &snapshot.events {
            match event {
                RuntimeEvent::BatchSpawned { .. } => counts.batches_spawned += 1,
                RuntimeEvent::BatchPaused { .. } => counts.batch_pauses += 1,
                RuntimeEvent::DeliveryWrong { .. } | RuntimeEvent::CaseFailed { .. } => {
                    counts.wrong_deliveries += 1
                }
                RuntimeEvent::ItemStolen { .. } => counts.thefts += 1,
                _ => {}
            }
        }
    }

    let summary = engine.build_summary();
    ScenarioRunResult {
        result: result_line(scenario, &summary, counts, anomalies),
        anomaly_records,
        finished_tick: last_tick,
    }
}

fn result_line(
    scenario: &Scenario,
    summary: &ShiftSummary,
    counts: EventCounts,
    anomalies: Vec<String>,
) -> ScenarioResultLine {
    ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        minutes: scenario.minutes,
        difficulty: scenario.difficulty,
        reason: summary.reason,
        duration_secs: summary.duration_secs,
        balance: summary.balance,
        earned: summary.earned,
        served: summary.served,
        cases_solved: summary.cases_solved,
        timed_out: summary.timed_out,
        hostiles_repelled: summary.hostiles_repelled,
        batches_spawned: counts.batches_spawned,
        batch_pauses: counts.batch_pauses,
        wrong_deliveries: counts.wrong_deliveries,
        thefts: counts.thefts,
        anomalies,
    }
}

fn collect_snapshot_anomalies(engine: &DeskEngine, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();

    let ledger = engine.ledger();
    let replayed = ledger.replay(ledger.starting_balance());
    if replayed != snapshot.balance {
        anomalies.push(format!(
            "balance {} differs from ledger sum {replayed}",
            snapshot.balance
        ));
    }

    let mut item_ids = HashSet::new();
    let mut held = 0;
    let surface = engine.config.physics.surface;
    for item in &snapshot.items {
        if !item_ids.insert(item.id.as_str()) {
            anomalies.push(format!("item listed twice: {}", item.id));
        }
        if item.placement == PlacementKind::Held {
            held += 1;
        }
        if !(item.x.is_finite() && item.y.is_finite() && item.angle.is_finite()) {
            anomalies.push(format!("non-finite item transform: {}", item.id));
            continue;
        }
        if item.placement == PlacementKind::Desk
            && (item.x < surface.x - SURFACE_TOLERANCE
                || item.y < surface.y - SURFACE_TOLERANCE
                || item.x + item.width > surface.right() + SURFACE_TOLERANCE
                || item.y + item.height > surface.bottom() + SURFACE_TOLERANCE)
        {
            anomalies.push(format!("desk item outside the surface: {}", item.id));
        }
    }
    if held > 1 {
        anomalies.push(format!("{held} items held at once"));
    }

    let mut slots = HashSet::new();
    for visitor in &snapshot.visitors {
        if !(0.0..=1.0).contains(&visitor.patience) {
            anomalies.push(format!(
                "visitor patience out of range: {} {}",
                visitor.id, visitor.patience
            ));
        }
        if visitor.slot >= engine.slot_count() || !slots.insert(visitor.slot) {
            anomalies.push(format!(
                "visitor slot conflict: {} slot {}",
                visitor.id, visitor.slot
            ));
        }
        if !(visitor.x.is_finite() && visitor.y.is_finite()) {
            anomalies.push(format!("non-finite visitor position: {}", visitor.id));
        }
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(now_ms));
    let difficulty = cli
        .difficulty
        .as_deref()
        .and_then(Difficulty::parse)
        .unwrap_or(Difficulty::Normal);

    if cli.single || cli.minutes.is_some() || cli.difficulty.is_some() {
        let minutes = clamp_i32(cli.minutes.unwrap_or(3), 1, 10);
        return vec![Scenario {
            name: format!("custom-{minutes}m"),
            minutes,
            difficulty,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "quick-check-normal".to_string(),
            minutes: 1,
            difficulty: Difficulty::Normal,
            seed,
        },
        Scenario {
            name: "full-shift-hard".to_string(),
            minutes: 3,
            difficulty: Difficulty::Hard,
            seed: normalize_seed(seed as u64 + 1),
        },
    ]
}

fn clamp_i32(value: i32, min: i32, max: i32) -> i32 {
    value.clamp(min, max)
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

#[allow(clippy::too_many_arguments)]
fn build_run_summary(
    match_id: String,
    started_at: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_earned: i64,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let average_earned = if scenario_count == 0 {
        0
    } else {
        total_earned / scenario_count as i64
    };
    RunSummary {
        match_id,
        started_at,
        started_at_ms,
        finished_at_ms,
        scenario_count,
        anomaly_count,
        average_earned,
        reason_counts,
        scenarios,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    if let Ok(line) = serde_json::to_string(&log_line) {
        eprintln!("{line}");
    }
}

fn end_reason_key(reason: ShiftEndReason) -> String {
    match reason {
        ShiftEndReason::Timeout => "timeout",
    }
    .to_string()
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, summary_text)
}
