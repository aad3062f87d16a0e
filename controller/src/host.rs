use std::{
    collections::HashMap,
    io::ErrorKind,
    net::SocketAddr,
    str::FromStr,
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::{
    net::TcpListener,
    sync::{
        mpsc::{self, error::TrySendError},
        watch,
    },
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use compressor_common::{
    BusyReason, Command, ConnectivityConfig, ConnectivityInfo, ControlError, ControlScheduler,
    HistorySample, RuntimeConfig, StatusSnapshot, TickReport,
};

use crate::plant::SimulatedPlant;

#[derive(Clone)]
struct AppState {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<StatusSnapshot>,
    history: watch::Receiver<Arc<Vec<HistorySample>>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct QueuedBody {
    queued: &'static str,
}

/// Facts about the host the status page reports alongside control state.
#[derive(Debug, Clone)]
struct HostEnvironment {
    address: String,
    signal_strength_dbm: Option<i32>,
}

impl HostEnvironment {
    fn new(config: &ConnectivityConfig) -> Self {
        Self {
            address: config
                .address
                .clone()
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            signal_strength_dbm: config.signal_strength_dbm,
        }
    }

    fn info(&self) -> ConnectivityInfo {
        ConnectivityInfo {
            address: self.address.clone(),
            signal_strength_dbm: self.signal_strength_dbm,
            uptime_secs: monotonic_ms() / 1_000,
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut runtime = load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.controller.http_port);

    let environment = HostEnvironment::new(&runtime.connectivity);
    let plant = SimulatedPlant::new(runtime.simulation.clone());
    let scheduler = ControlScheduler::new(&runtime.controller, runtime.settings, plant);

    let (command_tx, command_rx) = mpsc::channel(runtime.controller.command_queue_depth);
    let initial = scheduler.engine().snapshot(&environment.info());
    let (status_tx, status_rx) = watch::channel(initial);
    let (history_tx, history_rx) = watch::channel(Arc::new(scheduler.history()));

    spawn_control_loop(
        scheduler,
        command_rx,
        status_tx,
        history_tx,
        environment,
        Duration::from_millis(runtime.controller.tick_interval_ms),
    );

    let app = router(AppState {
        commands: command_tx,
        status: status_rx,
        history: history_rx,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handle_get_status))
        .route("/history", get(handle_get_history))
        .route(
            "/toggleSystem",
            get(handle_toggle_system).post(handle_toggle_system),
        )
        .route("/toggleComp", get(handle_toggle_comp).post(handle_toggle_comp))
        .route("/toggleFan", get(handle_toggle_fan).post(handle_toggle_fan))
        .route("/toggleMode", get(handle_toggle_mode).post(handle_toggle_mode))
        .route("/setTemp", get(handle_set_temp).post(handle_set_temp))
        .route(
            "/setCompTemp",
            get(handle_set_comp_temp).post(handle_set_comp_temp),
        )
        .route("/setHyst", get(handle_set_hyst).post(handle_set_hyst))
        .route("/setDelay", get(handle_set_delay).post(handle_set_delay))
        .with_state(state)
}

fn spawn_control_loop(
    mut scheduler: ControlScheduler<SimulatedPlant>,
    mut commands: mpsc::Receiver<Command>,
    status: watch::Sender<StatusSnapshot>,
    history: watch::Sender<Arc<Vec<HistorySample>>>,
    environment: HostEnvironment,
    period: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let pending = drain_commands(&mut commands);
            let report = scheduler.tick(monotonic_ms(), pending, &environment.info());
            log_report(&report);

            let plant = scheduler.hardware();
            debug!(
                air_c = plant.air_c(),
                compressor_c = plant.compressor_c(),
                compressor_on = plant.is_compressor_on(),
                fan_on = plant.is_fan_on(),
                "plant state"
            );

            if report.sampled.is_some() {
                history.send_replace(Arc::new(scheduler.history()));
            }
            status.send_replace(report.snapshot);
        }
    });
}

fn drain_commands(commands: &mut mpsc::Receiver<Command>) -> Vec<Command> {
    let mut pending = Vec::new();
    while let Ok(command) = commands.try_recv() {
        pending.push(command);
    }
    pending
}

fn log_report(report: &TickReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => info!("command applied: {}", outcome.command.name()),
            Err(err) => warn!("command {} rejected: {err}", outcome.command.name()),
        }
    }

    if let Some(transition) = report.transition {
        info!(
            "compressor {} -> {} ({:?})",
            transition.from.as_str(),
            transition.to.as_str(),
            transition.cause
        );
    }

    // Relays are driven by the scheduler; this only records what changed.
    for action in &report.actions {
        info!("relay action: {action:?}");
    }

    if report.snapshot.t1.is_none() {
        debug!("compressor sensor unavailable");
    }
    if report.snapshot.t2.is_none() {
        debug!("air sensor unavailable");
    }

    if let Some(sample) = report.sampled {
        debug!("history sample: t1={:?} t2={:?}", sample.t1, sample.t2);
    }
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.status.borrow().clone();
    Json(status)
}

async fn handle_get_history(State(state): State<AppState>) -> impl IntoResponse {
    let history: Vec<HistorySample> = state.history.borrow().iter().copied().collect();
    Json(history)
}

async fn handle_toggle_system(State(state): State<AppState>) -> impl IntoResponse {
    enqueue(&state, Command::ToggleSystem)
}

async fn handle_toggle_comp(State(state): State<AppState>) -> impl IntoResponse {
    let busy = {
        let status = state.status.borrow();
        if !status.is_system_on() {
            Some(BusyReason::SystemOff)
        } else if status.is_waiting() && status.countdown > 1 {
            // A WAIT in its last second may end before the command is
            // drained; the control loop makes the final call.
            Some(BusyReason::RestartDelay)
        } else {
            None
        }
    };

    if let Some(reason) = busy {
        return error_response(StatusCode::CONFLICT, &ControlError::Busy(reason).to_string());
    }
    enqueue(&state, Command::ToggleCompressor)
}

async fn handle_toggle_fan(State(state): State<AppState>) -> impl IntoResponse {
    if !state.status.borrow().is_system_on() {
        let err = ControlError::Busy(BusyReason::SystemOff);
        return error_response(StatusCode::CONFLICT, &err.to_string());
    }
    enqueue(&state, Command::ToggleFan)
}

async fn handle_toggle_mode(State(state): State<AppState>) -> impl IntoResponse {
    enqueue(&state, Command::ToggleMode)
}

async fn handle_set_temp(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match parse_param::<f32>(&params, "t") {
        Ok(value) => enqueue(&state, Command::SetAirSetpoint(value)),
        Err(response) => response,
    }
}

async fn handle_set_comp_temp(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match parse_param::<f32>(&params, "c") {
        Ok(value) => enqueue(&state, Command::SetCompCutoff(value)),
        Err(response) => response,
    }
}

async fn handle_set_hyst(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match parse_param::<f32>(&params, "h") {
        Ok(value) => enqueue(&state, Command::SetHysteresis(value)),
        Err(response) => response,
    }
}

async fn handle_set_delay(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match parse_param::<i64>(&params, "d") {
        Ok(value) => {
            // Out-of-range delays are clamped by the settings store.
            let seconds = value.clamp(0, u32::MAX as i64) as u32;
            enqueue(&state, Command::SetDelay(seconds))
        }
        Err(response) => response,
    }
}

fn enqueue(state: &AppState, command: Command) -> Response {
    if let Err(err) = command.validate() {
        return error_response(StatusCode::BAD_REQUEST, &err.to_string());
    }

    match state.commands.try_send(command) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(QueuedBody {
                queued: command.name(),
            }),
        )
            .into_response(),
        Err(TrySendError::Full(_)) => {
            warn!("command queue full, dropping {}", command.name());
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Command queue is full")
        }
        Err(TrySendError::Closed(_)) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Control loop is not running",
        ),
    }
}

fn parse_param<T: FromStr>(params: &HashMap<String, String>, key: &str) -> Result<T, Response> {
    let Some(value) = params.get(key) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            &format!("Missing '{key}' parameter"),
        ));
    };
    value.trim().parse::<T>().map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid value for '{key}'"),
        )
    })
}

async fn load_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let Ok(path) = std::env::var("COMPRESSOR_CONFIG") else {
        return Ok(RuntimeConfig::default());
    };

    match tokio::fs::read(&path).await {
        Ok(raw) => serde_json::from_slice::<RuntimeConfig>(&raw)
            .with_context(|| format!("failed to parse runtime config at {path}")),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read runtime config at {path}")),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use compressor_common::{ControllerConfig, ControllerEngine, SensorReading, Settings};
    use tower::ServiceExt;

    use super::*;

    struct Harness {
        app: Router,
        commands: mpsc::Receiver<Command>,
        _status: watch::Sender<StatusSnapshot>,
        _history: watch::Sender<Arc<Vec<HistorySample>>>,
    }

    fn harness(engine: &ControllerEngine) -> Harness {
        let (command_tx, command_rx) = mpsc::channel(4);
        let (status_tx, status_rx) =
            watch::channel(engine.snapshot(&ConnectivityInfo::default()));
        let (history_tx, history_rx) = watch::channel(Arc::new(engine.history()));
        Harness {
            app: router(AppState {
                commands: command_tx,
                status: status_rx,
                history: history_rx,
            }),
            commands: command_rx,
            _status: status_tx,
            _history: history_tx,
        }
    }

    fn idle_engine() -> ControllerEngine {
        ControllerEngine::new(&ControllerConfig::default(), Settings::default())
    }

    fn waiting_engine() -> ControllerEngine {
        let mut engine = idle_engine();
        engine.tick(SensorReading::new(Some(30.0), Some(6.0)), 1);
        engine.tick(SensorReading::new(Some(30.0), Some(2.0)), 1);
        engine
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn status_uses_device_field_names() {
        let harness = harness(&waiting_engine());

        let (status, json) = get(&harness.app, "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["compState"], "WAIT");
        assert_eq!(json["countdown"], 120);
        assert_eq!(json["system"], "ON");
        assert_eq!(json["mode"], "Cooling");
        assert_eq!(json["delay"], 120);
        assert_eq!(json["t2"], 2.0);
    }

    #[tokio::test]
    async fn set_temp_queues_command() {
        let mut harness = harness(&idle_engine());

        let (status, json) = get(&harness.app, "/setTemp?t=20.5").await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["queued"], "setTemp");
        assert_eq!(
            harness.commands.try_recv().ok(),
            Some(Command::SetAirSetpoint(20.5))
        );
    }

    #[tokio::test]
    async fn negative_hysteresis_is_rejected_before_queueing() {
        let mut harness = harness(&idle_engine());

        let (status, _) = get(&harness.app, "/setHyst?h=-1").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(harness.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_or_garbled_values_are_bad_requests() {
        let harness = harness(&idle_engine());

        let (missing, json) = get(&harness.app, "/setCompTemp").await;
        assert_eq!(missing, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing 'c' parameter");

        let (garbled, _) = get(&harness.app, "/setTemp?t=warm").await;
        assert_eq!(garbled, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn negative_delay_is_clamped_by_the_store() {
        let mut harness = harness(&idle_engine());

        let (status, _) = get(&harness.app, "/setDelay?d=-5").await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(harness.commands.try_recv().ok(), Some(Command::SetDelay(0)));
    }

    #[tokio::test]
    async fn compressor_toggle_refused_during_wait() {
        let mut harness = harness(&waiting_engine());

        let (status, json) = get(&harness.app, "/toggleComp").await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "busy: compressor restart delay in progress");
        assert!(harness.commands.try_recv().is_err());
    }

    #[tokio::test]
    async fn compressor_toggle_queued_in_last_second_of_wait() {
        let mut engine = waiting_engine();
        engine.tick(SensorReading::new(Some(30.0), Some(2.0)), 119);
        assert_eq!(engine.countdown_secs(), 1);
        let mut harness = harness(&engine);

        let (status, json) = get(&harness.app, "/toggleComp").await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["queued"], "toggleComp");
        assert_eq!(
            harness.commands.try_recv().ok(),
            Some(Command::ToggleCompressor)
        );
    }

    #[tokio::test]
    async fn fan_toggle_refused_with_power_off() {
        let mut engine = idle_engine();
        engine.apply_command(Command::ToggleSystem).unwrap();
        engine.tick(SensorReading::default(), 1);
        let harness = harness(&engine);

        let (status, _) = get(&harness.app, "/toggleFan").await;

        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn full_queue_reports_unavailable() {
        let harness = harness(&idle_engine());

        for _ in 0..4 {
            let (status, _) = get(&harness.app, "/toggleMode").await;
            assert_eq!(status, StatusCode::ACCEPTED);
        }
        let (status, _) = get(&harness.app, "/toggleMode").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn history_preserves_gaps() {
        let mut engine = idle_engine();
        engine.tick(SensorReading::new(None, Some(4.0)), 300);
        let harness = harness(&engine);

        let (status, json) = get(&harness.app, "/history").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!([{ "t1": null, "t2": 4.0 }]));
    }

    #[tokio::test]
    async fn drained_commands_keep_arrival_order() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(Command::ToggleFan).await.unwrap();
        tx.send(Command::SetDelay(30)).await.unwrap();

        assert_eq!(
            drain_commands(&mut rx),
            vec![Command::ToggleFan, Command::SetDelay(30)]
        );
        assert!(drain_commands(&mut rx).is_empty());
    }
}
