use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use roadsafe_engine::alert::{self, AlertCooldown};
use roadsafe_engine::severity::{self, SeverityConfig};
use roadsafe_engine::{
    doctor as engine_doctor, valid_detections, AccidentAnalyzer, AccidentDecision, Detection, EngineConfig, Frame,
};
use roadsafe_proto::event::{AccidentEvent, EventKind};

use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "roadsafe", version, about = "RoadSafeNet - accident detection over object-detector output")]
struct Cli {
    #[arg(long)]
    config: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the config and the configured detection logs.
    Doctor,
    /// Replay every configured stream concurrently.
    Run,
    /// Replay a single detection log.
    Replay {
        path: String,
        #[arg(long, default_value = "replay")]
        stream: String,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    alert: AlertCfg,
    #[serde(default)]
    replay: ReplayCfg,
    #[serde(default)]
    streams: Vec<StreamCfg>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
struct AlertCfg {
    cooldown_s: u64,
}

impl Default for AlertCfg {
    fn default() -> Self {
        Self { cooldown_s: 300 }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
struct ReplayCfg {
    /// Analyze only frames whose number is a multiple of this.
    frame_skip: u64,
    /// Pacing between analyzed frames; 0 replays as fast as possible.
    frame_interval_ms: u64,
    /// Emit a status event for every analyzed frame, not just accidents.
    emit_all: bool,
    /// Capture rate of the logs; maps frame numbers onto the alert cooldown clock.
    fps: f64,
}

impl Default for ReplayCfg {
    fn default() -> Self {
        Self { frame_skip: 2, frame_interval_ms: 0, emit_all: false, fps: 30.0 }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct StreamCfg {
    name: String,
    detections: String,
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).context("read config")?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the event stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg)?,
        Command::Run => run(&cfg).await?,
        Command::Replay { path, stream } => {
            engine_doctor::check_engine_config(&cfg.engine)?;
            check_replay(&cfg.replay)?;
            let job = StreamJob::new(&cfg, StreamCfg { name: stream, detections: path });
            let stats = job.replay().await?;
            info!("replay: {}", stats);
        }
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    engine_doctor::check_engine_config(&cfg.engine)?;
    check_replay(&cfg.replay)?;

    let mut names = HashSet::new();
    for s in &cfg.streams {
        anyhow::ensure!(!s.name.is_empty(), "stream name missing");
        anyhow::ensure!(names.insert(s.name.as_str()), "duplicate stream name: {}", s.name);
        if !std::path::Path::new(&s.detections).is_file() {
            warn!("doctor: stream {}: detections log {} not found", s.name, s.detections);
        }
    }
    if cfg.streams.is_empty() {
        warn!("doctor: no [[streams]] configured; only `replay` is usable");
    }

    info!("doctor: OK");
    Ok(())
}

fn check_replay(r: &ReplayCfg) -> Result<()> {
    anyhow::ensure!(r.frame_skip >= 1, "replay.frame_skip must be >= 1");
    anyhow::ensure!(r.fps.is_finite() && r.fps > 0.0, "replay.fps must be > 0");
    Ok(())
}

async fn run(cfg: &Config) -> Result<()> {
    engine_doctor::check_engine_config(&cfg.engine)?;
    check_replay(&cfg.replay)?;
    anyhow::ensure!(!cfg.streams.is_empty(), "no [[streams]] configured");
    info!("run: starting {} stream(s)", cfg.streams.len());

    // one task and one analyzer per stream
    let mut tasks = tokio::task::JoinSet::new();
    for s in &cfg.streams {
        let job = StreamJob::new(cfg, s.clone());
        tasks.spawn(async move {
            let name = job.stream.name.clone();
            (name, job.replay().await)
        });
    }

    loop {
        tokio::select! {
            next = tasks.join_next() => match next {
                None => break,
                Some(Ok((name, Ok(stats)))) => info!("run: stream {} finished: {}", name, stats),
                Some(Ok((name, Err(e)))) => warn!("run: stream {} failed: {:#}", name, e),
                Some(Err(e)) => warn!("run: stream task panicked: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("run: interrupted");
                tasks.abort_all();
                break;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
struct StreamStats {
    lines: u64,
    bad_lines: u64,
    analyzed: u64,
    accidents: u64,
    alerts: u64,
    restarts: u64,
}

impl std::fmt::Display for StreamStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lines={} bad={} analyzed={} accidents={} alerts={} restarts={}",
            self.lines, self.bad_lines, self.analyzed, self.accidents, self.alerts, self.restarts
        )
    }
}

struct StreamJob {
    stream: StreamCfg,
    engine: EngineConfig,
    pacing: ReplayCfg,
    cooldown: Duration,
}

impl StreamJob {
    fn new(cfg: &Config, stream: StreamCfg) -> Self {
        Self {
            stream,
            engine: cfg.engine.clone(),
            pacing: cfg.replay.clone(),
            cooldown: Duration::from_secs(cfg.alert.cooldown_s),
        }
    }

    async fn replay(self) -> Result<StreamStats> {
        let path = &self.stream.detections;
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("open detections log {}", path))?;
        let mut lines = BufReader::new(file).lines();

        let mut analyzer = AccidentAnalyzer::new(&self.engine);
        let mut alerts = AlertCooldown::new(self.cooldown);
        let mut stats = StreamStats::default();
        let skip = self.pacing.frame_skip.max(1);
        let mut last_frame: Option<u64> = None;

        info!("stream {}: replaying {}", self.stream.name, path);

        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("read {}", path))?
        {
            stats.lines += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let frame: Frame = match serde_json::from_str(line) {
                Ok(f) => f,
                Err(e) => {
                    warn!("stream {}: line {}: bad frame: {}", self.stream.name, stats.lines, e);
                    stats.bad_lines += 1;
                    continue;
                }
            };
            if frame.frame % skip != 0 {
                continue;
            }

            // a log spliced from several captures restarts its frame numbers
            if last_frame.is_some_and(|prev| frame.frame < prev) {
                warn!(
                    "stream {}: frame number went back to {} after {} analyzed frames; resetting",
                    self.stream.name,
                    frame.frame,
                    analyzer.frames_seen()
                );
                analyzer.reset();
                alerts.reset();
                stats.restarts += 1;
            }
            last_frame = Some(frame.frame);

            let (dets, decision) = analyze_frame(&mut analyzer, &frame);
            stats.analyzed += 1;

            let mut kind = EventKind::Status;
            let mut note = String::new();
            if decision.is_accident {
                stats.accidents += 1;
                let at = alert::stream_time(frame.frame, self.pacing.fps);
                if alerts.allow_at(at) {
                    stats.alerts += 1;
                    kind = EventKind::Accident;
                } else {
                    note = format!("alert suppressed (cooldown, {}s left)", alerts.remaining_at(at).as_secs());
                    debug!("stream {}: frame {}: {}", self.stream.name, frame.frame, note);
                }
            }

            if kind == EventKind::Accident || self.pacing.emit_all {
                let ev = build_event(
                    &self.stream.name,
                    frame.frame,
                    &dets,
                    &decision,
                    &self.engine.severity,
                    kind,
                    now_unix_ms(),
                    note,
                );
                println!("{}", serde_json::to_string(&ev).context("encode event")?);
            }

            if self.pacing.frame_interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.pacing.frame_interval_ms)).await;
            }
        }

        Ok(stats)
    }
}

/// Validate once so the decision, severity and scene counts all see the same detections.
fn analyze_frame(analyzer: &mut AccidentAnalyzer, frame: &Frame) -> (Vec<Detection>, AccidentDecision) {
    let dets = valid_detections(&frame.detections);
    let decision = analyzer.evaluate(&dets);
    (dets, decision)
}

fn now_unix_ms() -> i64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

fn build_event(
    stream: &str,
    frame_no: u64,
    dets: &[Detection],
    decision: &AccidentDecision,
    sev_cfg: &SeverityConfig,
    kind: EventKind,
    ts_unix_ms: i64,
    note: String,
) -> AccidentEvent {
    let (vehicles, persons) = severity::count_roles(dets);
    let sev = severity::classify(sev_cfg, decision, dets);
    let indicators = decision
        .indicators
        .iter()
        .map(|r| format!("{}:{:.2}:{}", r.kind.as_str(), r.score, r.severity_label.as_str()))
        .collect();

    let msg = match (kind, note.is_empty()) {
        (EventKind::Accident, _) => format!(
            "ACCIDENT frame={} confidence={:.0}% rule={}",
            frame_no,
            decision.confidence * 100.0,
            decision.method.as_str()
        ),
        (EventKind::Status, true) => format!("frame={} score={:.2}", frame_no, decision.accident_score),
        (EventKind::Status, false) => format!("frame={} score={:.2} {}", frame_no, decision.accident_score, note),
    };

    AccidentEvent {
        ts_unix_ms,
        stream: stream.to_string(),
        frame: frame_no,
        kind,
        severity: sev.as_str().to_string(),
        confidence: decision.confidence,
        accident_score: decision.accident_score,
        temporal_confidence: decision.temporal_confidence,
        critical_indicators: decision.critical_indicators,
        method: decision.method.as_str().to_string(),
        vehicles: vehicles as u32,
        persons: persons as u32,
        indicators,
        msg,
    }
}
