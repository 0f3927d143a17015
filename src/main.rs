//! Command-line front end: pick a machine, measure for ten seconds, store the
//! verdict.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use sonocheck::audio::{
    AudioSource, MicrophoneSource, SignalSource, SignalSpec, available_input_devices,
};
use sonocheck::calibration::Calibration;
use sonocheck::diagnostics::{MachineProfile, builtin_catalog, find_profile, load_catalog};
use sonocheck::logging;
use sonocheck::session::{HistoryRecord, Session, SessionState};
use sonocheck::storage::{AppStore, Persistence};
use tracing::{debug, info};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = logging::init(options.verbose) {
        eprintln!("Logging disabled: {err}");
    }

    let mut store = AppStore::open_default().map_err(|err| err.to_string())?;
    let catalog = resolve_catalog(&options, &store)?;

    if options.list {
        for profile in &catalog {
            println!(
                "{:<20} {:<28} {:<12} max {:>5.1} dB  {}-{} Hz",
                profile.id,
                profile.name,
                profile.category,
                profile.max_db,
                profile.peak_freq_range.low,
                profile.peak_freq_range.high
            );
        }
    }
    if options.devices {
        let devices = available_input_devices(store.settings().audio_input.host.as_deref())
            .map_err(|err| err.to_string())?;
        for device in devices {
            let marker = if device.is_default { "*" } else { " " };
            println!("{marker} [{}] {}", device.host_id, device.name);
        }
    }
    if options.clear_history {
        store.clear_history().map_err(|err| err.to_string())?;
        println!("History cleared.");
    }
    if let Some(value) = &options.calibrate {
        let calibration: Calibration = value.parse().map_err(|err| format!("{err}"))?;
        store
            .save_calibration(calibration)
            .map_err(|err| err.to_string())?;
        println!("Calibration set to {calibration}.");
    }
    if options.history {
        print_history(&store.load_history().map_err(|err| err.to_string())?, options.json)?;
    }

    let Some(machine_id) = &options.machine else {
        return Ok(());
    };
    let profile = find_profile(&catalog, machine_id)
        .cloned()
        .ok_or_else(|| format!("Unknown machine {machine_id:?}; see --list"))?;
    let refresh_hz = options
        .refresh_hz
        .map(|hz| {
            let mut settings = store.settings().clone();
            settings.refresh_hz = hz;
            settings.normalized().refresh_hz
        })
        .unwrap_or(store.settings().refresh_hz);

    let record = if options.demo {
        let source = SignalSource::new(demo_signal(&profile));
        measure(source, store, profile, refresh_hz, options.stop_after)?
    } else {
        let source = MicrophoneSource::new(store.settings().audio_input.clone());
        measure(source, store, profile, refresh_hz, options.stop_after)?
    };
    print_history(std::slice::from_ref(&record), options.json)
}

fn resolve_catalog(options: &Options, store: &AppStore) -> Result<Vec<MachineProfile>, String> {
    match options
        .catalog
        .as_ref()
        .or(store.settings().catalog_path.as_ref())
    {
        Some(path) => load_catalog(path).map_err(|err| err.to_string()),
        None => Ok(builtin_catalog()),
    }
}

/// Tone in the middle of the machine's expected band.
fn demo_signal(profile: &MachineProfile) -> SignalSpec {
    let range = profile.peak_freq_range;
    SignalSpec {
        frequency: f64::from(range.low + range.high) / 2.0,
        ..SignalSpec::default()
    }
}

fn measure<A: AudioSource>(
    source: A,
    store: AppStore,
    profile: MachineProfile,
    refresh_hz: u32,
    stop_after: Option<Duration>,
) -> Result<HistoryRecord, String> {
    let mut session = Session::new(source, store).with_refresh_hz(refresh_hz);
    session.select_machine(profile);
    let started = Instant::now();
    session.start_at(started).map_err(|err| err.to_string())?;
    eprintln!("Measuring with calibration {}...", session.calibration());

    loop {
        let now = Instant::now();
        let events = session.advance(now);
        if let Some(metrics) = events.polled {
            debug!(
                "{:.1} dB, peak {} Hz, stable {}, {}",
                metrics.db, metrics.peak_frequency, metrics.is_stable, metrics.status
            );
        }
        if let Some(record) = events.finished {
            return Ok(record);
        }
        if events.countdown_ticks > 0
            && let Some(remaining) = session.remaining_seconds()
        {
            let metrics = session.metrics();
            info!(
                "{remaining:>2}s left: {:.1} dB, peak {} Hz, {}",
                metrics.db, metrics.peak_frequency, metrics.status
            );
        }
        if stop_after.is_some_and(|limit| now.duration_since(started) >= limit)
            && let Some(record) = session.stop()
        {
            return Ok(record);
        }
        if session.state() != SessionState::Running {
            return Err("Measurement ended without a verdict".to_string());
        }
        std::thread::sleep(session.refresh_interval());
    }
}

fn print_history(records: &[HistoryRecord], json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(records)
            .map_err(|err| format!("Failed to encode history: {err}"))?;
        println!("{text}");
        return Ok(());
    }
    if records.is_empty() {
        println!("No measurements recorded.");
    }
    for record in records {
        println!(
            "{}  {:<20} {:<8} {:>6.1} dB  {:>5} Hz",
            record.created_at, record.machine_id, record.status, record.db, record.peak_frequency
        );
    }
    Ok(())
}

#[derive(Default)]
struct Options {
    list: bool,
    devices: bool,
    machine: Option<String>,
    history: bool,
    json: bool,
    clear_history: bool,
    calibrate: Option<String>,
    refresh_hz: Option<u32>,
    catalog: Option<PathBuf>,
    demo: bool,
    stop_after: Option<Duration>,
    verbose: bool,
}

fn parse_args(args: Vec<String>) -> Result<Option<Options>, String> {
    let mut options = Options::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--list" => options.list = true,
            "--devices" => options.devices = true,
            "--history" => options.history = true,
            "--json" => options.json = true,
            "--clear-history" => options.clear_history = true,
            "--demo" => options.demo = true,
            "-v" | "--verbose" => options.verbose = true,
            "--machine" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--machine requires a value".to_string())?;
                options.machine = Some(value.to_string());
            }
            "--calibrate" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--calibrate requires a value".to_string())?;
                options.calibrate = Some(value.to_string());
            }
            "--catalog" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--catalog requires a value".to_string())?;
                options.catalog = Some(PathBuf::from(value));
            }
            "--refresh-hz" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--refresh-hz requires a value".to_string())?;
                let hz = value
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid --refresh-hz value: {value}"))?;
                options.refresh_hz = Some(hz);
            }
            "--stop-after" => {
                idx += 1;
                let value =
                    args.get(idx).ok_or_else(|| "--stop-after requires a value".to_string())?;
                let secs = value
                    .parse::<f64>()
                    .ok()
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .ok_or_else(|| format!("Invalid --stop-after value: {value}"))?;
                options.stop_after = Some(Duration::from_secs_f64(secs));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    let has_action = options.list
        || options.devices
        || options.history
        || options.clear_history
        || options.calibrate.is_some()
        || options.machine.is_some();
    if !has_action {
        println!("{}", help_text());
        return Ok(None);
    }
    Ok(Some(options))
}

fn help_text() -> String {
    [
        "sonocheck",
        "",
        "Measures A-weighted level and dominant frequency for ten seconds and",
        "judges the result against a machine profile.",
        "",
        "Usage:",
        "  sonocheck --list",
        "  sonocheck --machine <id> [--demo] [--stop-after <secs>]",
        "  sonocheck --history [--json]",
        "  sonocheck --calibrate <dB>",
        "",
        "Options:",
        "  --list               List machine profiles.",
        "  --devices            List audio input devices.",
        "  --machine <id>       Run one measurement for the machine.",
        "  --demo               Measure a generated tone instead of the microphone.",
        "  --stop-after <secs>  Stop the measurement early.",
        "  --refresh-hz <n>     Metrics refresh rate for this run (1-240).",
        "  --catalog <path>     Machine catalog TOML replacing the built-in list.",
        "  --calibrate <dB>     Store a calibration offset in [-60, 60].",
        "  --history            Print stored verdicts, most recent first.",
        "  --json               Print verdicts as JSON.",
        "  --clear-history      Delete all stored verdicts.",
        "  -v, --verbose        Debug logging (RUST_LOG takes precedence).",
    ]
    .join("\n")
}
