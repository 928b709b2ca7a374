//! Demo binary running a full resolve/dispatch/subscribe round against the
//! simulated instrument.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dynavar::harness::{RecordingSink, SinkLog};
use dynavar::{DriverOpts, ValueKind};
use dynavar_sim::{build_driver, spawn_poller, SharedDriver, SimDevice, SimLayout};
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "dynavar-sim",
    version,
    about = "Simulated instrument demo for the dynavar binding layer"
)]
struct Cli {
    /// Layout TOML file; instrument defaults are used when omitted.
    #[arg(long)]
    layout: Option<PathBuf>,
    /// Poll period in milliseconds.
    #[arg(long, default_value = "20")]
    period_ms: u64,
    /// How many poll periods to let the instrument run.
    #[arg(long, default_value = "5")]
    ticks: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let layout = match &cli.layout {
        Some(path) => SimLayout::load(path)
            .with_context(|| format!("loading layout from {}", path.display()))?,
        None => SimLayout::default(),
    };
    info!(
        channels = layout.channels,
        waveform_len = layout.waveform_len,
        "instrument layout"
    );

    let log = SinkLog::new();
    let opts: DriverOpts<SimDevice> = DriverOpts::new()
        .interrupt_sink(ValueKind::Int64, Box::new(RecordingSink::new(log.clone())))
        .interrupt_sink(
            ValueKind::Float32Array,
            Box::new(RecordingSink::new(log.clone())),
        )
        .init_hook(|driver| {
            info!(variables = driver.variables().len(), "record binding complete");
        });
    let mut driver = build_driver("sim0", SimDevice::new(layout), opts)
        .context("registering instrument functions")?;

    // The bindings a record database would hand us at boot.
    let sum_set = driver.resolve_binding("SUM set")?;
    let sum_add = driver.resolve_binding("SUM add")?;
    let sum = driver.resolve_binding("SUM")?;
    let chan = driver.resolve_binding("CHAN 2")?;
    let count = driver.resolve_binding("COUNT")?;
    let wave = driver.resolve_binding("WAVE sine")?;
    let msg = driver.resolve_binding("MSG")?;
    driver.complete_init();

    driver.write_int32(sum_set, 5)?;
    driver.write_int32(sum_add, 3)?;
    driver.write_int32(sum_add, 3)?;
    info!(
        total = driver.read_int32(sum)?,
        "accumulator after set 5, add 3, add 3"
    );

    driver.write_float64(chan, 21.5)?;
    driver.write_octet(msg, "bringup ok")?;

    driver.subscribe(count)?;
    driver.subscribe(wave)?;

    let period = Duration::from_millis(cli.period_ms);
    let shared: SharedDriver = Arc::new(Mutex::new(driver));
    let mut handle = spawn_poller(shared.clone(), period).context("spawning poller")?;
    thread::sleep(period * u32::try_from(cli.ticks).unwrap_or(u32::MAX));
    handle.stop();
    if handle.join().is_err() {
        anyhow::bail!("poller thread panicked");
    }

    let mut driver = shared.lock();
    info!(counter = driver.read_int64(count)?, "counter after polling");

    let mut wave_buf = vec![0.0_f32; 8];
    let copied = driver.read_float32_array(wave, &mut wave_buf)?;
    info!(samples = copied, head = ?&wave_buf[..copied.min(4)], "waveform snapshot");

    let mut text = [0_u8; 80];
    let len = driver.read_octet(msg, &mut text)?;
    info!(message = %String::from_utf8_lossy(&text[..len]), "message buffer");

    driver.unsubscribe(count)?;
    driver.unsubscribe(wave)?;
    info!(deliveries = log.events().len(), "interrupt deliveries recorded");
    Ok(())
}
