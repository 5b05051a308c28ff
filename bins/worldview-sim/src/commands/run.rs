//! The `run` command: drive journeys until stopped

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use worldview_cli::output::{format_count, format_distance, format_duration, format_speed};
use worldview_cli::{JourneyBoard, Status};
use worldview_core::config::{Config, SchedulerMode};
use worldview_core::{Error, ErrorCode, Result};
use worldview_journey::scheduler::{METRIC_COMPLETED, METRIC_FAILED, METRIC_TICKS};
use worldview_journey::{
    AutoJourneyScheduler, BroadcastPublisher, CompositePublisher, InMemoryJourneyRepository,
    JourneyError, JourneyOrchestrator, JourneySnapshot, JourneyStatus, MultiJourneyScheduler,
    PositionEvent, RouteSource, TracingPublisher,
};
use worldview_telemetry::metrics;

/// Events a slow terminal may fall behind by before some are skipped
const EVENT_BUFFER: usize = 1024;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scheduler flavor: multi or auto (overrides scheduler.mode)
    #[arg(long)]
    pub mode: Option<SchedulerMode>,

    /// Journeys to start in multi mode
    #[arg(short = 'n', long, default_value_t = 3)]
    pub journeys: usize,

    /// Vehicle speed in m/s (overrides scheduler.default_speed_mps)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Route for every journey in multi mode (random when omitted)
    #[arg(long)]
    pub route: Option<String>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration_secs: Option<u64>,
}

pub async fn run(config: &Config, args: RunArgs, json_output: bool) -> Result<()> {
    let scheduler_config = &config.schema.scheduler;
    let mode = args.mode.unwrap_or(scheduler_config.mode);
    let speed = args.speed.unwrap_or(scheduler_config.default_speed_mps);
    let tick = Duration::from_millis(scheduler_config.tick_interval_ms);

    if !speed.is_finite() || speed <= 0.0 {
        return Err(Error::new(
            ErrorCode::InvalidArgument,
            format!("--speed must be a positive number of m/s, got {speed}"),
        ));
    }
    if mode == SchedulerMode::Multi && args.journeys == 0 {
        return Err(Error::new(ErrorCode::InvalidArgument, "--journeys must be at least 1"));
    }

    let routes = super::load_routes(config)?;
    if routes.count() == 0 {
        return Err(JourneyError::NoRoutesAvailable.into());
    }

    let broadcast = BroadcastPublisher::new(EVENT_BUFFER);
    let events = broadcast.subscribe();
    let publisher = CompositePublisher::default()
        .with(Arc::new(TracingPublisher))
        .with(Arc::new(broadcast));
    let orchestrator = Arc::new(JourneyOrchestrator::new(
        Arc::new(InMemoryJourneyRepository::new()),
        Arc::new(routes),
        Arc::new(publisher),
    ));

    if !json_output {
        Status::info(&startup_message(mode, args.journeys, speed));
    }
    let printer = tokio::spawn(print_events(events, json_output));
    let shutdown = CancellationToken::new();

    info!(
        mode = ?mode,
        tick_ms = scheduler_config.tick_interval_ms,
        speed_mps = speed,
        "Starting simulation"
    );

    let (scheduler_task, multi) = match mode {
        SchedulerMode::Multi => {
            let scheduler = Arc::new(MultiJourneyScheduler::new(Arc::clone(&orchestrator), tick));
            for n in 1..=args.journeys {
                let journey_id = format!("car-{n}");
                match &args.route {
                    Some(route_id) => {
                        orchestrator.start_journey_on_route(&journey_id, route_id, speed)?
                    }
                    None => orchestrator.start_new_journey(&journey_id, speed)?,
                };
                scheduler.register(journey_id);
            }
            let task = tokio::spawn(Arc::clone(&scheduler).run(shutdown.clone()));
            (task, Some(scheduler))
        }
        SchedulerMode::Auto => {
            let scheduler = Arc::new(AutoJourneyScheduler::new(
                Arc::clone(&orchestrator),
                tick,
                Duration::from_millis(scheduler_config.auto_start_delay_ms),
                speed,
            ));
            (tokio::spawn(scheduler.run(shutdown.clone())), None)
        }
    };

    let reason = tokio::select! {
        _ = tokio::signal::ctrl_c() => "interrupted",
        _ = time_limit(args.duration_secs) => "time limit reached",
        _ = all_finished(multi.as_deref(), tick) => {
            idle_reason(&orchestrator.list_journeys()?, args.journeys)
        }
    };
    info!(reason, "Stopping simulation");

    shutdown.cancel();
    scheduler_task
        .await
        .map_err(|e| Error::internal(format!("scheduler task failed: {e}")))?;

    let journeys = orchestrator.list_journeys()?;

    // The broadcast sender lives in the orchestrator; dropping the last
    // handle closes the event stream and lets the printer drain and exit.
    drop(multi);
    drop(orchestrator);
    printer
        .await
        .map_err(|e| Error::internal(format!("event printer failed: {e}")))?;

    print_summary(reason, &journeys, json_output)
}

async fn time_limit(seconds: Option<u64>) {
    match seconds {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => std::future::pending().await,
    }
}

/// Resolves once the multi scheduler tracks nothing. Journeys leave it on
/// completion, but also after an error or when they vanish.
async fn all_finished(scheduler: Option<&MultiJourneyScheduler>, poll: Duration) {
    let Some(scheduler) = scheduler else {
        return std::future::pending().await;
    };
    loop {
        tokio::time::sleep(poll).await;
        if scheduler.tracked_count() == 0 {
            return;
        }
    }
}

/// Stop reason once no journey is tracked any more.
fn idle_reason(journeys: &[JourneySnapshot], started: usize) -> &'static str {
    let completed = journeys
        .iter()
        .filter(|journey| journey.status == JourneyStatus::Completed)
        .count();
    if completed == started {
        "all journeys completed"
    } else {
        "no journeys left"
    }
}

fn startup_message(mode: SchedulerMode, journeys: usize, speed: f64) -> String {
    let drive = match mode {
        SchedulerMode::Multi => format_count(journeys, "journey", "journeys"),
        SchedulerMode::Auto => "one journey at a time".to_string(),
    };
    format!("Driving {drive} at {}, press Ctrl-C to stop", format_speed(speed))
}

async fn print_events(mut events: broadcast::Receiver<PositionEvent>, json_output: bool) {
    let mut board = (!json_output).then(JourneyBoard::new);

    loop {
        match events.recv().await {
            Ok(event) => match board.as_mut() {
                Some(board) => render(board, &event),
                None => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!(error = %err, "Failed to encode event"),
                },
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event output fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn render(board: &mut JourneyBoard, event: &PositionEvent) {
    let journey = event.journey();
    match event {
        PositionEvent::JourneyCompleted { .. } => {
            board.finish(&journey.journey_id, &format!("{} arrived", journey.route_name));
        }
        PositionEvent::JourneyStarted { .. } | PositionEvent::CoordinateUpdate { .. } => {
            let message = format!(
                "{} · {} left · {}",
                journey.route_name,
                format_distance(journey.remaining_distance_meters),
                format_speed(journey.speed_meters_per_second)
            );
            board.update(&journey.journey_id, journey.progress_percentage, &message);
        }
    }
}

fn print_summary(reason: &str, journeys: &[JourneySnapshot], json_output: bool) -> Result<()> {
    let registry = metrics();

    if json_output {
        let summary = json!({
            "type": "summary",
            "reason": reason,
            "journeys": journeys,
            "metrics": registry.export_json(),
        });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    Status::header("Simulation summary");
    Status::field("Stopped", reason);
    Status::field(
        "Uptime",
        &format_duration(Duration::from_secs(registry.uptime_secs())),
    );
    Status::field("Ticks", &registry.counter(METRIC_TICKS).to_string());
    Status::field("Completed", &registry.counter(METRIC_COMPLETED).to_string());

    let failed = registry.counter(METRIC_FAILED);
    if failed > 0 {
        Status::field("Failed", &failed.to_string().red().to_string());
    }

    if !journeys.is_empty() {
        println!();
        for journey in journeys {
            Status::field(
                &journey.journey_id,
                &format!(
                    "{} {:>5.1}% {}",
                    journey.status,
                    journey.progress_percentage,
                    journey.route_name.dimmed()
                ),
            );
        }
    }

    Ok(())
}
