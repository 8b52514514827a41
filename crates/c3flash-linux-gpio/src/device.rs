//! Linux GPIO bitbang transport
//!
//! Drives the six flash lines through the GPIO character device. The data
//! lines change direction with the lane mode:
//!
//! | Mode        | IO0    | IO1   | IO2/IO3         |
//! |-------------|--------|-------|-----------------|
//! | `Single`    | output | input | output, high    |
//! | `QuadWrite` | output | output| output          |
//! | `QuadRead`  | input  | input | input           |

use std::time::Duration;

use gpiocdev::line::{Offset, Value};
use gpiocdev::request::{Config, Request};

use c3flash_core::transport::{LaneMode, Transport};

use crate::error::{LinuxGpioError, Result};

/// GPIO line indices
#[derive(Debug, Clone, Copy)]
enum Line {
    Cs = 0,
    Sck = 1,
    Io0 = 2,
    Io1 = 3,
    Io2 = 4,
    Io3 = 5,
}

const LINE_COUNT: usize = 6;

const DATA_LINES: [Line; 4] = [Line::Io0, Line::Io1, Line::Io2, Line::Io3];

/// Default half-period delay in nanoseconds (for ~100 kHz clock)
const DEFAULT_HALF_PERIOD_NS: u64 = 5000;

/// Consumer label shown by `gpioinfo`
const CONSUMER: &str = "c3flash";

/// Configuration for opening the GPIO transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinuxGpioConfig {
    /// Device path (e.g., "/dev/gpiochip0")
    pub device: String,
    /// CS# line offset
    pub cs: Offset,
    /// SCK line offset
    pub sck: Offset,
    /// IO0 (DI) line offset
    pub io0: Offset,
    /// IO1 (DO) line offset
    pub io1: Offset,
    /// IO2 (WP#) line offset
    pub io2: Offset,
    /// IO3 (HOLD#) line offset
    pub io3: Offset,
    /// Half-period delay in nanoseconds
    pub half_period_ns: u64,
}

impl LinuxGpioConfig {
    /// Create a configuration with every line given explicitly
    pub fn new(device: impl Into<String>, cs: Offset, sck: Offset, io: [Offset; 4]) -> Self {
        Self {
            device: device.into(),
            cs,
            sck,
            io0: io[0],
            io1: io[1],
            io2: io[2],
            io3: io[3],
            half_period_ns: DEFAULT_HALF_PERIOD_NS,
        }
    }

    /// Set clock speed in Hz (approximate, via half-period calculation)
    pub fn with_speed_hz(mut self, hz: u32) -> Self {
        if hz > 0 {
            self.half_period_ns = 500_000_000 / hz as u64;
        }
        self
    }

    fn offsets(&self) -> [Offset; LINE_COUNT] {
        [self.cs, self.sck, self.io0, self.io1, self.io2, self.io3]
    }
}

fn level(high: bool) -> Value {
    if high {
        Value::Active
    } else {
        Value::Inactive
    }
}

/// Flash transport over Linux GPIO lines
pub struct LinuxGpioTransport {
    request: Request,
    offsets: [Offset; LINE_COUNT],
    half_period_ns: u64,
    mode: LaneMode,
    cs_active: bool,
    sck_high: bool,
    io0_high: bool,
}

impl LinuxGpioTransport {
    /// Request the lines and leave the bus idle in single lane mode
    pub fn open(config: &LinuxGpioConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxGpioError::NoDevice);
        }
        let offsets = config.offsets();
        for (i, offset) in offsets.iter().enumerate() {
            if offsets[..i].contains(offset) {
                return Err(LinuxGpioError::DuplicateLine(*offset));
            }
        }

        log::debug!("linux_gpio: opening {}", config.device);

        // CS inactive, SCK idling high
        let (cs_active, sck_high, io0_high) = (false, true, false);
        let req_config = line_config(&offsets, LaneMode::Single, (cs_active, sck_high, io0_high));
        let request = Request::from_config(req_config)
            .on_chip(&config.device)
            .with_consumer(CONSUMER)
            .request()
            .map_err(|source| LinuxGpioError::LineRequestFailed {
                path: config.device.clone(),
                source,
            })?;

        log::info!(
            "linux_gpio: opened {} (cs={}, sck={}, io0={}, io1={}, io2={}, io3={})",
            config.device,
            config.cs,
            config.sck,
            config.io0,
            config.io1,
            config.io2,
            config.io3
        );

        Ok(Self {
            request,
            offsets,
            half_period_ns: config.half_period_ns,
            mode: LaneMode::Single,
            cs_active,
            sck_high,
            io0_high,
        })
    }

    fn offset(&self, line: Line) -> Offset {
        self.offsets[line as usize]
    }

    fn set_line(&self, line: Line, high: bool) {
        if let Err(e) = self.request.set_value(self.offset(line), level(high)) {
            log::error!("linux_gpio: failed to set {:?}: {}", line, e);
        }
    }

    fn get_line(&self, line: Line) -> bool {
        match self.request.value(self.offset(line)) {
            Ok(Value::Active) => true,
            Ok(Value::Inactive) => false,
            Err(e) => {
                log::error!("linux_gpio: failed to read {:?}: {}", line, e);
                false
            }
        }
    }
}

/// Full line configuration for `mode`, keeping CS, SCK and IO0 at their
/// current levels
fn line_config(
    offsets: &[Offset; LINE_COUNT],
    mode: LaneMode,
    (cs_active, sck_high, io0_high): (bool, bool, bool),
) -> Config {
    let mut cfg = Config::default();
    // CS is active low
    cfg.with_line(offsets[Line::Cs as usize])
        .as_output(level(!cs_active));
    cfg.with_line(offsets[Line::Sck as usize])
        .as_output(level(sck_high));

    match mode {
        LaneMode::Single => {
            cfg.with_line(offsets[Line::Io0 as usize])
                .as_output(level(io0_high));
            cfg.with_line(offsets[Line::Io1 as usize]).as_input();
            // WP# and HOLD# inactive
            cfg.with_line(offsets[Line::Io2 as usize])
                .as_output(Value::Active);
            cfg.with_line(offsets[Line::Io3 as usize])
                .as_output(Value::Active);
        }
        LaneMode::QuadWrite => {
            for line in DATA_LINES {
                cfg.with_line(offsets[line as usize]).as_output(Value::Inactive);
            }
        }
        LaneMode::QuadRead => {
            for line in DATA_LINES {
                cfg.with_line(offsets[line as usize]).as_input();
            }
        }
    }
    cfg
}

impl Transport for LinuxGpioTransport {
    fn set_cs(&mut self, active: bool) {
        self.cs_active = active;
        self.set_line(Line::Cs, !active);
    }

    fn set_sck(&mut self, high: bool) {
        self.sck_high = high;
        self.set_line(Line::Sck, high);
    }

    fn set_mosi(&mut self, high: bool) {
        self.io0_high = high;
        self.set_line(Line::Io0, high);
    }

    fn get_miso(&self) -> bool {
        self.get_line(Line::Io1)
    }

    fn set_lane_mode(&mut self, mode: LaneMode) {
        if self.mode == mode {
            return;
        }
        let cfg = line_config(
            &self.offsets,
            mode,
            (self.cs_active, self.sck_high, self.io0_high),
        );
        if let Err(e) = self.request.reconfigure(&cfg) {
            log::error!("linux_gpio: failed to switch to {:?}: {}", mode, e);
        }
        self.mode = mode;
    }

    fn set_quad_io(&mut self, nibble: u8) {
        for (bit, line) in DATA_LINES.into_iter().enumerate() {
            self.set_line(line, nibble & (1 << bit) != 0);
        }
    }

    fn get_quad_io(&self) -> u8 {
        DATA_LINES
            .into_iter()
            .enumerate()
            .filter(|&(_, line)| self.get_line(line))
            .fold(0, |acc, (bit, _)| acc | (1 << bit))
    }

    fn half_period_delay(&self) {
        if self.half_period_ns > 0 {
            std::thread::sleep(Duration::from_nanos(self.half_period_ns));
        }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

fn parse_offset(name: &'static str, value: &str) -> Result<Offset> {
    value
        .parse()
        .map_err(|_| LinuxGpioError::InvalidParameter(format!("{}={}", name, value)))
}

/// Parse transport options from a list of key-value pairs
///
/// # Supported Options
///
/// - `dev=/dev/gpiochipN` - GPIO chip device path (or use gpiochip)
/// - `gpiochip=N` - GPIO chip number (alternative to dev)
/// - `cs=N` - CS# line offset (required)
/// - `sck=N` - SCK line offset (required)
/// - `io0=N` or `mosi=N` - IO0 line offset (required)
/// - `io1=N` or `miso=N` - IO1 line offset (required)
/// - `io2=N` or `wp=N` - IO2 line offset (required)
/// - `io3=N` or `hold=N` - IO3 line offset (required)
/// - `spispeed=N` - clock speed in kHz (optional, default ~100 kHz)
pub fn parse_options(options: &[(&str, &str)]) -> Result<LinuxGpioConfig> {
    let mut device = String::new();
    let mut gpiochip: Option<u32> = None;
    let mut cs = None;
    let mut sck = None;
    let mut io = [None; 4];
    let mut speed_khz = None;

    for &(key, value) in options {
        match key {
            "dev" => device = value.to_string(),
            "gpiochip" => gpiochip = Some(parse_offset("gpiochip", value)?),
            "cs" => cs = Some(parse_offset("cs", value)?),
            "sck" => sck = Some(parse_offset("sck", value)?),
            "io0" | "mosi" => io[0] = Some(parse_offset("io0", value)?),
            "io1" | "miso" => io[1] = Some(parse_offset("io1", value)?),
            "io2" | "wp" => io[2] = Some(parse_offset("io2", value)?),
            "io3" | "hold" => io[3] = Some(parse_offset("io3", value)?),
            "spispeed" => {
                let khz: u32 = value.parse().map_err(|_| {
                    LinuxGpioError::InvalidParameter(format!("spispeed={}", value))
                })?;
                speed_khz = Some(khz);
            }
            _ => log::warn!("linux_gpio: unknown option: {}={}", key, value),
        }
    }

    match (device.is_empty(), gpiochip) {
        (true, Some(n)) => device = format!("/dev/gpiochip{}", n),
        (true, None) => return Err(LinuxGpioError::NoDevice),
        (false, Some(_)) => return Err(LinuxGpioError::ConflictingDevice),
        (false, None) => {}
    }

    let cs = cs.ok_or(LinuxGpioError::MissingParameter("cs"))?;
    let sck = sck.ok_or(LinuxGpioError::MissingParameter("sck"))?;
    let io = [
        io[0].ok_or(LinuxGpioError::MissingParameter("io0 (or mosi)"))?,
        io[1].ok_or(LinuxGpioError::MissingParameter("io1 (or miso)"))?,
        io[2].ok_or(LinuxGpioError::MissingParameter("io2 (or wp)"))?,
        io[3].ok_or(LinuxGpioError::MissingParameter("io3 (or hold)"))?,
    ];

    let config = LinuxGpioConfig::new(device, cs, sck, io);
    Ok(match speed_khz {
        Some(khz) => config.with_speed_hz(khz.saturating_mul(1000)),
        None => config,
    })
}
