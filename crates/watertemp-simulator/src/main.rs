//! Desktop simulator for the watertemp telemetry loop.
//!
//! Runs the real `watertemp-core` loop against a synthetic 1-Wire bus and
//! prints both display surfaces to the terminal after every tick. Records go
//! either to a plain directory on the host or, with `--image`, through the
//! FAT driver into a partitioned SD card image file.
//!
//! ```text
//! RUST_LOG=info watertemp-simulator --probes 2 --ticks 20 --out-dir data
//! ```

use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow};
use clap::Parser;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_hal_async::delay::DelayNs;
use embedded_sdmmc::{Block, BlockCount, BlockDevice, BlockIdx, TimeSource};
use log::{error, info};

use watertemp_core::config::TelemetryConfig;
use watertemp_core::display_manager::{DisplayRenderer, SurfaceLock, SurfacePair, TextSurface};
use watertemp_core::framebuffer::FrameBuffer;
use watertemp_core::sensors::{
    BusError, BusOperation, DS18B20_FAMILY_CODE, DeviceAddress, OneWireBus, Resolution,
};
use watertemp_core::storage::{SdCardMedium, StorageError, StorageMedium};
use watertemp_core::surface::LabelSurface;
use watertemp_core::telemetry::{TelemetryLoop, Uptime};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Size of each simulated display panel.
const PANEL_SIZE: Size = Size::new(128, 32);

/// Family code of the DS18S20, which the logger does not drive.
const UNKNOWN_FAMILY_CODE: u64 = 0x10;

#[derive(Parser, Debug)]
#[command(version, about = "Run the watertemp telemetry loop on the desktop")]
struct Args {
    /// TOML file with telemetry settings; missing keys keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write records through the FAT driver into this SD card image
    #[arg(short, long, conflicts_with = "out_dir")]
    image: Option<PathBuf>,

    /// Directory that receives the data file when no image is given
    #[arg(short, long, default_value = "watertemp-data")]
    out_dir: PathBuf,

    /// Stop after this many ticks instead of running until a fault
    #[arg(short, long)]
    ticks: Option<u32>,

    /// Number of simulated DS18B20 probes on the bus; discovery keeps at most three
    #[arg(short, long, default_value_t = 2)]
    probes: usize,

    /// Number of foreign devices on the bus, which discovery must skip
    #[arg(long, default_value_t = 0)]
    unknown_devices: usize,

    /// Draw each surface as an ASCII panel instead of printing its text
    #[arg(long)]
    panel: bool,
}

fn load_config(path: Option<&Path>) -> anyhow::Result<TelemetryConfig> {
    let Some(path) = path else {
        return Ok(TelemetryConfig::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Mock 1-Wire bus
// ---------------------------------------------------------------------------

/// Bus populated with synthetic devices whose temperatures drift over time.
struct SimulatedBus {
    devices: Vec<DeviceAddress>,
    cursor: usize,
    started: Instant,
    resolution: Resolution,
}

impl SimulatedBus {
    fn new(probes: usize, unknown_devices: usize) -> Self {
        // Foreign devices come first so discovery has to step over them
        let unknown = (0..unknown_devices as u64)
            .map(|serial| DeviceAddress(((0xF000 + serial) << 8) | UNKNOWN_FAMILY_CODE));
        let probes = (0..probes as u64)
            .map(|serial| DeviceAddress(((0x1000 + serial) << 8) | DS18B20_FAMILY_CODE as u64));

        Self {
            devices: unknown.chain(probes).collect(),
            cursor: 0,
            started: Instant::now(),
            resolution: Resolution::default(),
        }
    }

    /// Water temperature: 18–24 °C sinusoidal, each probe phase-shifted.
    fn celsius_for(&self, address: DeviceAddress) -> f32 {
        let t = self.started.elapsed().as_secs_f64();
        let phase = (address.0 >> 8) as f64;
        let celsius = 21.0 + 3.0 * ((t + phase * 7.0) / 60.0).sin() + 0.3 * (t / 11.0).cos();

        // Quantize to the configured conversion step like the real sensor
        let step = match self.resolution {
            Resolution::Bits9 => 0.5,
            Resolution::Bits10 => 0.25,
            Resolution::Bits11 => 0.125,
            Resolution::Bits12 => 0.0625,
        };
        ((celsius / step).round() * step) as f32
    }

    fn known(&self, address: DeviceAddress, operation: BusOperation) -> Result<(), BusError> {
        if self.devices.contains(&address) {
            Ok(())
        } else {
            Err(BusError::Transport {
                operation,
                code: -1,
            })
        }
    }
}

impl OneWireBus for SimulatedBus {
    async fn search_next(&mut self) -> Result<Option<DeviceAddress>, BusError> {
        let next = self.devices.get(self.cursor).copied();
        self.cursor += 1;
        Ok(next)
    }

    async fn set_resolution(
        &mut self,
        address: DeviceAddress,
        resolution: Resolution,
    ) -> Result<(), BusError> {
        self.known(address, BusOperation::SetResolution)?;
        self.resolution = resolution;
        Ok(())
    }

    /// Blocks for the datasheet conversion time, as a real conversion does.
    async fn trigger_conversion(&mut self, address: DeviceAddress) -> Result<(), BusError> {
        self.known(address, BusOperation::TriggerConversion)?;
        let millis = self.resolution.conversion_time_ms();
        std::thread::sleep(Duration::from_millis(millis as u64));
        Ok(())
    }

    async fn read_celsius(&mut self, address: DeviceAddress) -> Result<f32, BusError> {
        self.known(address, BusOperation::ReadTemperature)?;
        Ok(self.celsius_for(address))
    }
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Appends lines to files in a host directory. Mounting creates the directory.
struct HostDirMedium {
    root: PathBuf,
}

impl StorageMedium for HostDirMedium {
    type Volume = ();

    fn mount(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).map_err(|e| {
            error!("Failed to create {}: {}", self.root.display(), e);
            StorageError::MountFailed
        })
    }

    fn append_line(
        &mut self,
        _volume: &(),
        file_name: &str,
        line: &str,
    ) -> Result<(), StorageError> {
        let path = self.root.join(file_name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                error!("Failed to open {}: {}", path.display(), e);
                StorageError::OpenFailed
            })?;
        writeln!(file, "{}", line).map_err(|e| {
            error!("Failed to write {}: {}", path.display(), e);
            StorageError::WriteFailed
        })
    }

    fn unmount(&mut self, _volume: ()) -> Result<(), StorageError> {
        Ok(())
    }
}

/// SD card image file served as a block device.
struct ImageBlockDevice {
    file: RefCell<File>,
}

impl ImageBlockDevice {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("opening SD card image {}", path.display()))?;
        Ok(Self {
            file: RefCell::new(file),
        })
    }
}

impl BlockDevice for ImageBlockDevice {
    type Error = std::io::Error;

    fn read(&self, blocks: &mut [Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(start_block_idx.0 as u64 * Block::LEN as u64))?;
        for block in blocks.iter_mut() {
            file.read_exact(&mut block.contents)?;
        }
        Ok(())
    }

    fn write(&self, blocks: &[Block], start_block_idx: BlockIdx) -> Result<(), Self::Error> {
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(start_block_idx.0 as u64 * Block::LEN as u64))?;
        for block in blocks {
            file.write_all(&block.contents)?;
        }
        Ok(())
    }

    fn num_blocks(&self) -> Result<BlockCount, Self::Error> {
        let len = self.file.borrow().metadata()?.len();
        Ok(BlockCount((len / Block::LEN as u64) as u32))
    }
}

/// The logger has no RTC; every file gets the same timestamp.
struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> embedded_sdmmc::Timestamp {
        embedded_sdmmc::Timestamp {
            year_since_1970: 54,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Platform shims
// ---------------------------------------------------------------------------

struct StdUptime {
    started: Instant,
}

impl Uptime for StdUptime {
    fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns as u64));
    }
}

type Panel = LabelSurface<FrameBuffer<BinaryColor>>;

/// Panel that echoes every redraw to stdout.
struct TerminalPanel {
    title: &'static str,
    panel: Panel,
    ascii: bool,
}

impl TerminalPanel {
    fn new(title: &'static str, ascii: bool) -> Self {
        Self {
            title,
            panel: LabelSurface::new(
                FrameBuffer::new(PANEL_SIZE, BinaryColor::Off),
                BinaryColor::On,
                BinaryColor::Off,
            ),
            ascii,
        }
    }

    fn print(&self) {
        println!("== {} ==", self.title);
        if !self.ascii {
            println!("{}", self.panel.text());
            return;
        }

        let buffer = self.panel.display();
        let size = buffer.size();
        for y in 0..size.height as usize {
            let row: String = (0..size.width as usize)
                .map(|x| match buffer.pixel(x, y) {
                    Some(BinaryColor::On) => '#',
                    _ => ' ',
                })
                .collect();
            println!("|{}|", row.trim_end());
        }
    }
}

impl TextSurface for TerminalPanel {
    fn set_text(&mut self, text: &str) {
        self.panel.set_text(text);
        self.print();
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn run<M: StorageMedium>(args: &Args, config: TelemetryConfig, medium: M) -> anyhow::Result<()> {
    let surfaces = SurfaceLock::new(SurfacePair {
        readings: TerminalPanel::new("Readings", args.panel),
        summary: TerminalPanel::new("Min / Max", args.panel),
    });

    let bus = SimulatedBus::new(args.probes, args.unknown_devices);
    let clock = StdUptime {
        started: Instant::now(),
    };

    let mut telemetry = embassy_futures::block_on(TelemetryLoop::start(
        bus,
        medium,
        clock,
        StdDelay,
        DisplayRenderer::new(&surfaces),
        config,
    ))
    .map_err(|e| anyhow!("telemetry startup failed: {}", e))?;

    info!(
        "{} probe(s) active, {} device(s) skipped",
        telemetry.session().registry.len(),
        telemetry.session().registry.skipped_devices()
    );

    let Some(limit) = args.ticks else {
        // Runs until a fatal fault
        let fault = embassy_futures::block_on(telemetry.run());
        return Err(anyhow!("telemetry loop stopped: {}", fault));
    };

    for _ in 0..limit {
        let report = embassy_futures::block_on(telemetry.tick())
            .map_err(|e| anyhow!("telemetry loop stopped: {}", e))?;
        info!(
            "Tick {} at {}{}",
            report.tick,
            report.timestamp,
            if report.persisted { "" } else { " (not saved)" }
        );
        if let Some(event) = report.window_event {
            info!("Storage window event: {:?}", event);
        }
    }

    info!("Stopping after {} tick(s)", limit);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    info!("Starting watertemp simulator");
    info!(
        "Tick {} ms, window closes after {} ticks, unit {}",
        config.tick_interval_ms,
        config.window.close_after_ticks,
        config.unit.symbol()
    );

    match &args.image {
        Some(path) => {
            info!("Writing records into SD card image {}", path.display());
            let device = ImageBlockDevice::open(path)?;
            run(&args, config, SdCardMedium::new(device, FixedTimeSource))
        }
        None => {
            info!("Writing records under {}", args.out_dir.display());
            let medium = HostDirMedium {
                root: args.out_dir.clone(),
            };
            run(&args, config, medium)
        }
    }
}
