use beacon_positioning::utils::logging::{init_logging, LogLevel};
use beacon_positioning::{
    load_registry, parse_beacon_map, CalibrationParams, CalibrationSet, PositioningConfig, PositioningEngine, Registry,
    RssiSample, Timestamp,
};
use tracing::{info, warn};

const DEMO_MAP: &str = "\
Name;X;Y
beacon_1;0;0
beacon_2;12;0
beacon_3;12;8
beacon_4;0;8
beacon_5;6;4,5
";

/// Command line options
struct Options {
    log_level: LogLevel,
    config_path: Option<String>,
    beacons_path: Option<String>,
    cycles: u64,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options { log_level: LogLevel::Info, config_path: None, beacons_path: None, cycles: 20 };
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = || iter.next().cloned().ok_or_else(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--log" => options.log_level = value()?.parse()?,
            "--config" => options.config_path = Some(value()?),
            "--beacons" => options.beacons_path = Some(value()?),
            "--cycles" => options.cycles = value()?.parse().map_err(|e| format!("--cycles: {e}"))?,
            other => return Err(format!("unknown argument {other}")),
        }
    }
    Ok(options)
}

/// Walk a rectangle inside the layout at 0.8 m/s, one fix per second
fn walk_position(registry: &Registry, t_s: f64) -> (f64, f64) {
    let (min_x, min_y, max_x, max_y) = registry.bounds().unwrap_or((0.0, 0.0, 10.0, 10.0));
    let (x0, y0, x1, y1) = (min_x + 2.0, min_y + 2.0, max_x - 2.0, max_y - 2.0);
    let (w, h) = ((x1 - x0).max(0.5), (y1 - y0).max(0.5));
    let s = (0.8 * t_s) % (2.0 * (w + h));
    if s < w {
        (x0 + s, y0)
    } else if s < w + h {
        (x1, y0 + (s - w))
    } else if s < 2.0 * w + h {
        (x1 - (s - w - h), y1)
    } else {
        (x0, y1 - (s - 2.0 * w - h))
    }
}

/// Synthetic scan: five samples per anchor with a deterministic ripple
fn simulate_scan(registry: &Registry, params: &CalibrationParams, x: f64, y: f64, t: Timestamp) -> Vec<RssiSample> {
    let mut samples = Vec::new();
    for (i, anchor) in registry.iter().enumerate() {
        let rssi = params.distance_to_rssi(anchor.distance_to(x, y));
        for k in 0..5u64 {
            let ripple = (((t / 1_000 + k) as f64) * 1.7 + i as f64).sin() * 2.0;
            samples.push(RssiSample::new(anchor.id.clone(), rssi + ripple, t - (4 - k) * 150));
        }
    }
    samples
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{e}");
            eprintln!(
                "Usage: {} [--log <level>] [--config <json>] [--beacons <Name;X;Y file>] [--cycles <n>]",
                args.first().map_or("beacon-positioning", |s| s.as_str())
            );
            return Err(e.into());
        }
    };
    init_logging(options.log_level);

    let config = match &options.config_path {
        Some(path) => PositioningConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => PositioningConfig::default(),
    };
    let beacon_map = match &options.beacons_path {
        Some(path) => std::fs::read_to_string(path)?,
        None => DEMO_MAP.to_string(),
    };

    let registry = load_registry(parse_beacon_map(&beacon_map)?)?;
    let engine = PositioningEngine::new(config)?;
    let params = CalibrationParams::default();
    let calibration = CalibrationSet::global(params);
    let mut devices = engine.tracker_registry();
    info!(anchors = registry.len(), cycles = options.cycles, "starting simulated walk");

    for cycle in 1..=options.cycles {
        let t = cycle * 1_000;
        let (x, y) = walk_position(&registry, t as f64 / 1_000.0);
        let samples = simulate_scan(&registry, &params, x, y, t);

        match engine.estimate_for_device("demo", &samples, &registry, &calibration, &mut devices) {
            Ok(estimate) => {
                let error = (estimate.x - x).hypot(estimate.y - y);
                println!("{}", serde_json::to_string(&estimate)?);
                info!(cycle, truth_x = x, truth_y = y, error, "cycle done");
            }
            Err(e) if e.is_recoverable() => warn!(cycle, %e, "cycle skipped"),
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
