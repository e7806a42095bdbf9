use cellular_sim_check::config::{
    self, Backend, Config, ConfigLoader, LogFormat, SimulationConfig,
};
use cellular_sim_check::driver::{AtCellularStack, Fault, SimulatedStack};
use cellular_sim_check::error::AppResult;
use cellular_sim_check::harness::{Harness, RunReport};
use cellular_sim_check::port::SyncSerialPort;
use cellular_sim_check::sequence::{self, SimTestFixture, SystemClock};
use cellular_sim_check::CellularStack;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "cellular-sim-check",
    version,
    about = "Hardware-in-the-loop check of a cellular modem's SIM interface.",
    long_about = "Brings the modem to device-ready, unlocks the SIM with the configured PIN, toggles the PIN query off and on, and checks that the SIM is ready and reports an IMSI. Exits 0 on success or when the run is not supported by the configuration, 1 on a failed check, 2 when the run could not start."
)]
struct Args {
    /// Configuration file (defaults to the standard search path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serial port of the modem's AT interface
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate of the AT interface
    #[arg(short, long)]
    baud: Option<u32>,

    /// Target modem identifier
    #[arg(short, long)]
    device: Option<String>,

    /// SIM PIN
    #[arg(long)]
    pin: Option<String>,

    /// Run against the in-memory simulated modem
    #[arg(long)]
    simulate: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Global run timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the effective configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,
}

// --- Main Application Entry Point ---
#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> AppResult<u8> {
    let mut loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    apply_cli_overrides(loader.config_mut(), &args);
    config::validate(loader.config())?;

    if let Some(path) = &args.init_config {
        loader.save_to(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(0);
    }

    let config = loader.into_config();
    init_logging(&config);

    let backend = if args.simulate {
        Backend::Simulated
    } else {
        Backend::At
    };
    if let Err(not_supported) = config.check_supported(backend) {
        warn!("{not_supported}");
        println!("{not_supported}");
        return Ok(0);
    }

    let fixture = build_fixture(&config, backend)?;
    let report = Harness::run(sequence::specification(&config.harness), fixture).await;
    emit(&report, args.json)?;

    let code = report.exit_code();
    if report.timed_out {
        // The blocked case thread is never joined; exit without waiting on it.
        std::process::exit(i32::from(code));
    }
    Ok(code)
}

fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(port) = &args.port {
        config.modem.port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.modem.baud = baud;
    }
    if let Some(device) = &args.device {
        config.modem.device = Some(device.clone());
    }
    if let Some(pin) = &args.pin {
        config.sim.pin = Some(pin.clone());
    }
    if let Some(secs) = args.timeout_secs {
        config.harness.timeout_secs = secs;
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn build_fixture(config: &Config, backend: Backend) -> AppResult<SimTestFixture> {
    // check_supported guarantees a PIN here.
    let pin = config.sim.pin.clone().unwrap_or_default();

    let (stack, settings) = match backend {
        Backend::Simulated => {
            let stack = simulated_stack(&config.simulation, &pin);
            let settings = if config.simulation.real_time {
                config.sequence.clone()
            } else {
                config.sequence.clone().without_delays()
            };
            info!(real_time = config.simulation.real_time, "using simulated modem");
            (Box::new(stack) as Box<dyn CellularStack>, settings)
        }
        Backend::At => {
            let port_name = config.modem.port.as_deref().unwrap_or_default();
            let port = SyncSerialPort::open(port_name, config.modem.port_configuration())?;
            info!(
                port = port_name,
                device = config.modem.device.as_deref().unwrap_or_default(),
                baud = config.modem.baud,
                "using AT modem"
            );
            let stack = AtCellularStack::new(port).with_ready_timeout(config.modem.ready_timeout());
            (
                Box::new(stack) as Box<dyn CellularStack>,
                config.sequence.clone(),
            )
        }
    };

    Ok(SimTestFixture::new(
        stack,
        pin,
        settings,
        Arc::new(SystemClock),
    ))
}

fn simulated_stack(simulation: &SimulationConfig, pin: &str) -> SimulatedStack {
    let mut builder = SimulatedStack::builder()
        .pin(pin)
        .imsi(simulation.imsi.clone());
    if simulation.pin_query_unsupported {
        builder = builder.fail_pin_query(Fault::Unsupported);
    }
    builder.build()
}

fn emit(report: &RunReport, json: bool) -> AppResult<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}
