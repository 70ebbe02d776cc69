// src/main.rs
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use blinkpong::brainflow::MuseSession;
use blinkpong::calibration::Calibrator;
use blinkpong::clock::MonotonicClock;
use blinkpong::config::AppConfig;
use blinkpong::drivers::{BlinkError, ErrorKind, SampleSource, SpectralEstimator, SyntheticSource};
use blinkpong::engine::BlinkEngine;
use blinkpong::gui::BlinkPongApp;
use blinkpong::signal::StopSignal;
use blinkpong::types::InputMode;
use clap::Parser;
use eframe::egui;
use log::{error, info};
#[derive(Parser, Debug)]
#[command(name = "blinkpong", version, about = "EEG blink controlled paddle game")]
struct Cli {
    /// Run without EEG; SPACE acts as a blink
    #[arg(long)]
    simulation: bool,
    /// Let the computer play the right paddle
    #[arg(long)]
    npc: bool,
    /// Record a no-blink baseline first and derive personal thresholds
    #[arg(long)]
    calibration: bool,
    /// Baseline length in seconds (overrides the config file)
    #[arg(long)]
    calibration_seconds: Option<f64>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// BrainFlow board id (38 = Muse 2)
    #[arg(long)]
    board_id: Option<i32>,
    #[arg(long)]
    serial_port: Option<String>,
    #[arg(long)]
    mac_address: Option<String>,
    /// Feed the full pipeline from a built-in signal generator
    #[arg(long)]
    synthetic: bool,
}
impl Cli {
    fn mode(&self) -> InputMode {
        if self.simulation {
            InputMode::Simulation
        } else if self.synthetic {
            InputMode::Synthetic
        } else {
            InputMode::Headset
        }
    }
}
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(secs) = cli.calibration_seconds {
        config.calibration.duration_seconds = secs;
    }
    if let Some(id) = cli.board_id {
        config.headset.board_id = id;
    }
    if let Some(port) = &cli.serial_port {
        config.headset.serial_port = port.clone();
    }
    if let Some(mac) = &cli.mac_address {
        config.headset.mac_address = mac.clone();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
fn open_source(mode: InputMode, config: &AppConfig) -> Result<Box<dyn SampleSource>> {
    match mode {
        InputMode::Headset => {
            info!("connecting to Muse headset (board {})...", config.headset.board_id);
            match MuseSession::connect(&config.headset) {
                Ok((session, rate)) => {
                    info!("EEG connection established at {rate} Hz");
                    Ok(Box::new(session))
                }
                Err(err) => {
                    if err.kind() == ErrorKind::Connection {
                        error!("failed to connect to EEG stream: {err}");
                        eprintln!("You can run in simulation mode with --simulation");
                    }
                    Err(err.into())
                }
            }
        }
        InputMode::Synthetic => {
            let source = SyntheticSource::new(256.0, 4, rand::random()).with_periodic_bursts(4.0, 0.6);
            Ok(Box::new(source))
        }
        InputMode::Simulation => Err(anyhow!("simulation mode has no sample source")),
    }
}
/// Blocks until ENTER, giving up with `Interrupted` if `stop` is raised first.
fn wait_for_enter(stop: &StopSignal) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    // The reader thread is left blocked on stdin if we bail out.
    thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(io::stdin().lock().read_line(&mut line).map(|_| ()));
    });
    loop {
        if stop.is_triggered() {
            return Err(BlinkError::Interrupted.into());
        }
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(read) => return read.context("failed to read from stdin"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        }
    }
}
fn run_calibration(
    source: &mut dyn SampleSource,
    config: &mut AppConfig,
    stop: &StopSignal,
) -> Result<()> {
    println!("\n=== EEG CALIBRATION ===");
    println!(
        "Sit still and look at the screen WITHOUT BLINKING for {:.0} seconds.",
        config.calibration.duration_seconds
    );
    print!("Press ENTER when ready...");
    io::stdout().flush()?;
    wait_for_enter(stop)?;
    println!("Calibrating... DO NOT BLINK!");
    let estimator = SpectralEstimator::new(config.spectral.clone());
    let duration = Duration::from_secs_f64(config.calibration.duration_seconds);
    let rate = source.sampling_rate_hz();
    let result = Calibrator::new(&config.stream, &estimator, &config.calibration)
        .with_stop(stop)
        .calibrate(source, rate, duration, &MonotonicClock::new())
        .context("calibration failed")?;
    println!(
        "Alpha baseline {:.2} -> threshold {:.2}",
        result.alpha_baseline, result.alpha_threshold
    );
    println!(
        "Delta baseline {:.2} -> threshold {:.2}",
        result.delta_baseline, result.delta_threshold
    );
    config.detector = result.apply_to(config.detector.clone());
    Ok(())
}
fn build_engine(cli: &Cli, config: &mut AppConfig, stop: &StopSignal) -> Result<BlinkEngine> {
    let mode = cli.mode();
    if mode == InputMode::Simulation {
        info!("running in simulation mode - press SPACE to blink");
        return Ok(BlinkEngine::simulation());
    }
    let mut source = open_source(mode, config)?;
    if cli.calibration {
        run_calibration(source.as_mut(), config, stop)?;
        info!("using calibrated blink thresholds");
    }
    Ok(BlinkEngine::with_source(mode, source, config)?)
}
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    let stop = StopSignal::new().install_ctrlc();
    let engine = match build_engine(&cli, &mut config, &stop) {
        Ok(engine) => engine,
        Err(err) if matches!(err.downcast_ref::<BlinkError>(), Some(BlinkError::Interrupted)) => {
            info!("stopped before the game started");
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    if cli.npc {
        info!("playing against the computer");
    } else {
        info!("right paddle: UP/DOWN arrows");
    }
    let app = BlinkPongApp::new(engine, cli.npc, stop);
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([980.0, 540.0])
        .with_min_inner_size([960.0, 520.0])
        .with_title("BlinkPong");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native("BlinkPong", options, Box::new(move |_cc| Box::new(app)))
        .map_err(|err| anyhow!("window error: {err}"))?;
    info!("game ended");
    Ok(())
}
