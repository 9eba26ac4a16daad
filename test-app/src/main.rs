// phytolib test application -- CLI tool for exercising the Algaemist
// backend against real hardware or a mock transport.
//
// Usage:
//   phytolib-test-app discover
//   phytolib-test-app --port /dev/ttyUSB0 info
//   phytolib-test-app --port /dev/ttyUSB0 sensors
//   phytolib-test-app --mock set-ph 7.5
//   phytolib-test-app --port /dev/ttyUSB0 poll --duration 30
//   phytolib-test-app --port /dev/ttyUSB0 log --path culture.csv --comment "fed"

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use phytolib::algaemist::sampler::{PollSampler, SamplerConfig};
use phytolib::algaemist::{Algaemist, AlgaemistBuilder};
use phytolib::telemetry::TelemetryStore;
use phytolib::transport::discovery;
use phytolib::{DeviceAddress, LightMode, ReactorMode, ScheduleTime};
use phytolib_test_harness::MockTransport;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// phytolib test application -- exercises the reactor backend from the
/// command line.
#[derive(Parser)]
#[command(name = "phytolib-test-app", version)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0). Auto-discovered when omitted.
    #[arg(long, global = true)]
    port: Option<String>,

    /// Device address of the reactor unit.
    #[arg(long, global = true, default_value_t = 21)]
    addr: u8,

    /// Baud rate of the serial link.
    #[arg(long, global = true, default_value_t = 9600)]
    baud: u32,

    /// Use a mock transport with canned replies instead of hardware.
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate reactor ports (FTDI adapters).
    Discover,
    /// Read device info, versions, and error code.
    Info,
    /// Read the aggregated sensor snapshot.
    Sensors,
    /// Read the aggregated pump snapshot.
    Pumps,
    /// Set the pH setpoint.
    SetPh { value: f64 },
    /// Set the day temperature setpoint.
    SetTempDay { value: f64 },
    /// Set the night temperature setpoint.
    SetTempNight { value: f64 },
    /// Set the light brightness percentage.
    SetBrightness { percent: u16 },
    /// Set the light on/off schedule (HH:MM each).
    SetLightSchedule { on: String, off: String },
    /// Set the light control mode (1=continuous, 2=timed, 3=sinus).
    SetLightMode { code: u16 },
    /// Set the turbidity setpoint.
    SetTurbidity { value: u16 },
    /// Set the chemostat setpoint percentage.
    SetChemostat { percent: u16 },
    /// Get or set the reactor operating mode (0-3).
    Mode {
        /// New mode; omit to read the current one.
        code: Option<u16>,
    },
    /// Run the poll sampler and print each update.
    Poll {
        /// How long to poll, in seconds.
        #[arg(long, default_value_t = 30)]
        duration: u64,
        /// Safety-log path.
        #[arg(long, default_value = ".data/safety_log.csv")]
        log_path: String,
    },
    /// Read both snapshots and append them to a telemetry store.
    Log {
        /// Store path.
        #[arg(long, default_value = "culture_log.csv")]
        path: String,
        /// Optional comment column.
        #[arg(long)]
        comment: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Mock transport wiring
// ---------------------------------------------------------------------------

/// Pre-load canned replies so a subcommand can run without hardware.
///
/// The canned frames assume the default address (21) and the exact
/// example values shown in the subcommand help.
fn canned_mock(command: &Command) -> MockTransport {
    let mut mock = MockTransport::new();
    match command {
        Command::Info => {
            mock.expect(b"/21i0000", b"/21i0000iALGAEMIST;MK3\n");
            mock.expect(b"/21i0001", b"/21i0001i4.2\n");
            mock.expect(b"/21v0000", b"/21v0000v1.9\n");
            mock.expect(b"/21e0000", b"/21e0000e0\n");
        }
        Command::Sensors => {
            mock.expect(b"/21x0000", b"/21x0000x21.5;7.20;300.0;310.0;50.0;12.0\n");
        }
        Command::Pumps => {
            mock.expect(b"/21q0000", b"/21q0000q10.0;20.0;0.0;5.0\n");
        }
        Command::SetPh { .. } => mock.expect(b"/21P0075", b"/21P0075OK\n"),
        Command::SetTempDay { .. } => mock.expect(b"/21R0210", b"/21R0210??\n"),
        Command::SetTempNight { .. } => mock.expect(b"/21R1180", b"/21R1180OK\n"),
        Command::SetBrightness { .. } => mock.expect(b"/21B0080", b"/21B0080OK\n"),
        Command::Mode { code: None } => mock.expect(b"/21m0000", b"/21m0000^0\n"),
        Command::Mode { code: Some(_) } => mock.expect(b"/21M0002", b"/21M0002OK\n"),
        _ => {}
    }
    mock
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Command::Discover = cli.command {
        let ports = discovery::find_ports(discovery::DEFAULT_MANUFACTURER)
            .context("port discovery failed")?;
        for port in ports {
            println!("{port}");
        }
        return Ok(());
    }

    let address = DeviceAddress::new(cli.addr).context("invalid device address")?;
    let mut builder = AlgaemistBuilder::new(address).baud_rate(cli.baud);
    if let Some(port) = &cli.port {
        builder = builder.port(port);
    }

    let reactor = if cli.mock {
        builder
            .sync_clock(false)
            .settle_delay(Duration::from_millis(1))
            .connect_with_transport(Box::new(canned_mock(&cli.command)))
            .await?
    } else {
        builder.connect().await?
    };

    run_command(cli.command, Arc::new(reactor)).await
}

async fn run_command(command: Command, reactor: Arc<Algaemist>) -> Result<()> {
    match command {
        Command::Discover => unreachable!("handled before connecting"),

        Command::Info => {
            println!("system info:  {:?}", reactor.get_system_info().await);
            println!("board:        {:?}", reactor.get_board_version().await);
            println!("comm:         {:?}", reactor.get_comm_version().await);
            println!("error code:   {:?}", reactor.get_error_code().await);
        }

        Command::Sensors => match reactor.read_all_sensors().await {
            Some(s) => {
                println!("temp:       {:.1} °C", s.temp_c);
                println!("pH:         {:.2}", s.ph);
                println!("light prim: {:.1}", s.light_primary);
                println!("light sec:  {:.1}", s.light_secondary);
                println!("air flow:   {:.1}", s.air_flow);
                println!("CO2 flow:   {:.1}", s.co2_flow);
            }
            None => bail!("sensor read failed"),
        },

        Command::Pumps => match reactor.read_all_pumps().await {
            Some(p) => {
                println!("CO2 pump:    {:.1} %", p.co2_pump);
                println!("heater pump: {:.1} %", p.heater_pump);
                println!("cooler pump: {:.1} %", p.cooler_pump);
                println!("turb pump:   {:.1} %", p.turb_pump);
            }
            None => bail!("pump read failed"),
        },

        Command::SetPh { value } => report("set pH", reactor.set_ph(value).await)?,
        Command::SetTempDay { value } => {
            report("set day temperature", reactor.set_temp_day(value).await)?
        }
        Command::SetTempNight { value } => {
            report("set night temperature", reactor.set_temp_night(value).await)?
        }
        Command::SetBrightness { percent } => {
            report("set brightness", reactor.set_brightness(percent).await)?
        }
        Command::SetLightSchedule { on, off } => {
            let on = parse_hhmm(&on)?;
            let off = parse_hhmm(&off)?;
            report("set light ON time", reactor.set_light_on_time(on).await)?;
            report("set light OFF time", reactor.set_light_off_time(off).await)?;
        }
        Command::SetLightMode { code } => {
            let mode = LightMode::try_from(code).context("invalid light mode")?;
            report("set light mode", reactor.set_light_mode(mode).await)?
        }
        Command::SetTurbidity { value } => {
            report("set turbidity", reactor.set_turbidity(value).await)?
        }
        Command::SetChemostat { percent } => {
            report("set chemostat", reactor.set_chemostat(percent).await)?
        }

        Command::Mode { code: None } => {
            println!("reactor mode: {:?}", reactor.get_reactor_mode().await);
        }
        Command::Mode { code: Some(code) } => {
            let mode = ReactorMode::try_from(code).context("invalid reactor mode")?;
            report("set reactor mode", reactor.set_reactor_mode(mode).await)?
        }

        Command::Poll { duration, log_path } => {
            let store = Arc::new(TelemetryStore::new(log_path));
            let sampler = PollSampler::spawn(reactor.clone(), store, SamplerConfig::default());
            let mut updates = sampler.updates();

            let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(u) = updates.borrow_and_update().clone() {
                            println!(
                                "tick {}: temp {:?}, pH {:?}, turb pump {:?}",
                                u.seq,
                                u.sensors.map(|s| s.temp_c),
                                u.sensors.map(|s| s.ph),
                                u.pumps.map(|p| p.turb_pump),
                            );
                        }
                    }
                }
            }
            sampler.shutdown().await;
        }

        Command::Log { path, comment } => {
            let store = TelemetryStore::new(path);
            report(
                "manual log",
                reactor.log_current_values(&store, comment).await,
            )?
        }
    }

    reactor.disconnect().await;
    Ok(())
}

fn report(what: &str, ok: bool) -> Result<()> {
    if ok {
        println!("{what}: OK");
        Ok(())
    } else {
        bail!("{what}: device refused or did not answer");
    }
}

fn parse_hhmm(s: &str) -> Result<ScheduleTime> {
    let (h, m) = s
        .split_once(':')
        .with_context(|| format!("expected HH:MM, got {s:?}"))?;
    ScheduleTime::new(h.parse()?, m.parse()?).map_err(|e| anyhow::anyhow!("{e}"))
}
