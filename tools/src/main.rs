//! sim-runner: headless simulation runner for the airline engine.
//!
//! Usage:
//!   sim-runner --seed 12345 --days 365 --db run.db
//!   sim-runner --seed 12345 --speed 5 --ipc-mode
//!   sim-runner --db run.db --resume run-12345-1700000000 --days 30

use airline_core::{
    cascade::DayReport,
    clock::SimSpeed,
    collaborators::{ContractOffer, RouteData, WorldEvent},
    command::PlayerCommand,
    config::SimConfig,
    engine::SimEngine,
    event::Notification,
    fleet::{Aircraft, AircraftStatus},
    mission::{Mission, MissionRecord},
    rival_subsystem::RankingEntry,
    scheduler::FrameScheduler,
    store::SimStore,
    types::DayNumber,
};
use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Advance { ms: f64 },
    Frame { now_ms: f64 },
    RunDays { count: u64 },
    Command { command: PlayerCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    day: DayNumber,
    date: String,
    paused: bool,
    speed: SimSpeed,
    cash: f64,
    reputation: f64,
    fuel_price: f64,
    fleet: Vec<Aircraft>,
    active_mission: Option<Mission>,
    mission_history: Vec<MissionRecord>,
    ranking: Vec<RankingEntry>,
    active_events: Vec<WorldEvent>,
    contract_offers: Vec<ContractOffer>,
    notifications: Vec<Notification>,
    partial_days: Vec<DayNumber>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 365u64);
    let speed = parse_arg(&args, "--speed", 1u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = arg_str(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_str(&args, "--data-dir").unwrap_or("./data");
    let resume = arg_str(&args, "--resume");

    if !ipc_mode {
        println!("Airline tycoon — sim-runner");
        println!("  seed:      {seed}");
        println!("  days:      {days}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let mut config = SimConfig::load(data_dir)?;
    config.clock.speed = SimSpeed::from_multiplier(speed)
        .ok_or_else(|| anyhow::anyhow!("unsupported speed x{speed}; use 1, 2, 5 or 10"))?;

    let store = if db == ":memory:" { SimStore::in_memory()? } else { SimStore::open(db)? };
    store.migrate()?;
    let store = Arc::new(Mutex::new(store));

    let run_id = match resume {
        Some(id) => id.to_string(),
        None => format!("run-{seed}-{}", chrono::Utc::now().timestamp()),
    };
    let mut engine = SimEngine::build(run_id.clone(), seed, config, Some(Box::new(Arc::clone(&store))));

    if resume.is_some() && !engine.load_latest(&run_id)? {
        anyhow::bail!("no snapshot stored for run {run_id}");
    }

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        let reports = engine.run_days(days);
        print_summary(&mut engine, &store, &reports)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut frames = FrameScheduler::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let reports = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Vec::new(),
            IpcCommand::Advance { ms } => engine.advance(ms),
            IpcCommand::Frame { now_ms } => engine.advance(frames.frame(now_ms)),
            IpcCommand::RunDays { count } => engine.run_days(count),
            IpcCommand::Command { command } => {
                let name = command.name();
                if let Err(e) = engine.apply_command(command) {
                    log::warn!("command {name} rejected: {e}");
                    let err_json = serde_json::json!({ "error": e.to_string(), "command": name });
                    writeln!(stdout, "{}", err_json)?;
                }
                Vec::new()
            }
        };

        let state = build_ui_state(engine, &reports);
        writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn build_ui_state(engine: &mut SimEngine, reports: &[DayReport]) -> UiState {
    let notifications = engine.drain_notifications();
    let ranking = engine.ranking();
    let ctx = &engine.ctx;
    UiState {
        day: ctx.day_number,
        date: ctx.clock.date().to_string(),
        paused: ctx.clock.paused,
        speed: ctx.clock.speed,
        cash: ctx.company.cash,
        reputation: ctx.company.reputation,
        fuel_price: ctx.fuel_price,
        fleet: ctx.fleet.iter().cloned().collect(),
        active_mission: ctx.missions.active().cloned(),
        mission_history: ctx.missions.history.clone(),
        ranking,
        active_events: ctx.active_events.clone(),
        contract_offers: ctx.contract_offers.clone(),
        notifications,
        partial_days: reports.iter().filter(|r| !r.is_complete()).map(|r| r.day).collect(),
    }
}

fn print_summary(engine: &mut SimEngine, store: &Arc<Mutex<SimStore>>, reports: &[DayReport]) -> Result<()> {
    let events = store
        .lock()
        .map_err(|_| anyhow::anyhow!("store lock poisoned"))?
        .event_count(&engine.run_id)?;
    let partial = reports.iter().filter(|r| !r.is_complete()).count();
    let ctx = &engine.ctx;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", engine.run_id);
    println!("  days run:       {}", reports.len());
    println!("  final day:      {} ({})", ctx.day_number, ctx.clock.date());
    println!("  partial days:   {partial}");
    println!("  events logged:  {events}");
    println!("  cash:           {:.0}", ctx.company.cash);
    println!("  reputation:     {:.1}", ctx.company.reputation);
    println!("  fuel price:     {:.3}", ctx.fuel_price);
    println!(
        "  fleet size:     {} ({} flying, {} in maintenance)",
        ctx.fleet.len(),
        ctx.fleet.count_with_status(AircraftStatus::Flight),
        ctx.fleet.count_with_status(AircraftStatus::Maintenance),
    );

    println!();
    println!("=== ROUTES ===");
    let network = &engine.collaborators().routes;
    let mut routes = network.routes()?;
    routes.sort_by(|a, b| a.id.0.cmp(&b.id.0));
    for route in &routes {
        let city = |code: &str| network.airport(code).map(|a| a.city).unwrap_or_else(|| code.to_string());
        println!(
            "  {:<8} {:>12} -> {:<12} aircraft {}",
            route.id.0,
            city(&route.origin),
            city(&route.destination),
            ctx.fleet.on_route(&route.id).count(),
        );
    }

    println!();
    println!("=== MISSIONS ===");
    match ctx.missions.active() {
        Some(m) => println!("  active: {}", m.id().title()),
        None => println!("  active: (none)"),
    }
    for record in &ctx.missions.history {
        println!("  {} -> {:?}", record.mission.title(), record.outcome);
    }

    println!();
    println!("=== RANKING ===");
    for entry in engine.ranking() {
        let marker = if entry.is_player { "*" } else { " " };
        println!(
            " {marker}{:>2}. {:<24} income {:>10.0}  rep {:>5.1}",
            entry.position, entry.name, entry.daily_income, entry.reputation
        );
    }

    let notifications = engine.drain_notifications();
    if !notifications.is_empty() {
        println!();
        println!("=== NOTIFICATIONS ({}) ===", notifications.len());
        for n in notifications.iter().rev().take(10).rev() {
            println!("  {}", serde_json::to_string(n)?);
        }
    }
    Ok(())
}

fn arg_str<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    arg_str(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
