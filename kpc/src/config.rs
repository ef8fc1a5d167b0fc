use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use dotenv::var;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use kpc_gpio::charlieplex::{AnimationTiming, FLICKER_FREE_DWELL};
use kpc_gpio::debounce::SampledDebounce;
use kpc_gpio::raw::GpioChip;

const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't access the config file: {0}")]
    Io(#[from] io::Error),
    #[error("malformed config file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Path of the config file, taken from `CONFIG_FILE`.
pub fn config_path() -> PathBuf {
    var("CONFIG_FILE")
        .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string())
        .into()
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// File holding the access code.
    pub password_file: PathBuf,
    pub gpio: GpioConfig,
    pub keypad: KeypadConfig,
    pub leds: LedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            password_file: PathBuf::from("password.txt"),
            gpio: GpioConfig::default(),
            keypad: KeypadConfig::default(),
            leds: LedConfig::default(),
        }
    }
}

impl Config {
    /// Loads the config from [config_path], or `None` if there's no such file.
    pub fn try_load() -> Result<Option<Self>, ConfigError> {
        Self::try_load_from(&config_path())
    }

    pub fn try_load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Rejects values the hardware can't work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dwell = Duration::from_millis(self.leds.dwell_ms);
        if dwell >= FLICKER_FREE_DWELL {
            return Err(ConfigError::Invalid(format!(
                "leds.dwell_ms must be below {} ms, got {}",
                FLICKER_FREE_DWELL.as_millis(),
                self.leds.dwell_ms,
            )));
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// How the GPIO registers are reached.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GpioDevice {
    /// `/dev/gpiomem`, usable without root.
    #[default]
    Gpiomem,
    /// `/dev/mem`, needs root.
    Mem,
}

/// The SoC of the board, which decides the register layout.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GpioSoc {
    /// Pi 2 v1.2 and Pi 3.
    #[default]
    Bcm2837,
    /// Pi 4.
    Bcm2711,
}

impl From<GpioSoc> for GpioChip {
    fn from(soc: GpioSoc) -> Self {
        match soc {
            GpioSoc::Bcm2837 => GpioChip::Bcm2837,
            GpioSoc::Bcm2711 => GpioChip::Bcm2711,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
#[serde(default)]
pub struct GpioConfig {
    pub device: GpioDevice,
    pub soc: GpioSoc,
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct KeypadConfig {
    /// BCM numbers of the row pins, top row first.
    pub rows: [usize; 4],
    /// BCM numbers of the column pins, left column first.
    pub cols: [usize; 3],
    pub debounce_samples: u32,
    pub debounce_interval_ms: u64,
    pub poll_interval_ms: u64,
    /// Empty scans in a row that count as releasing the held key.
    pub release_scans: u32,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        KeypadConfig {
            rows: [18, 23, 24, 12],
            cols: [17, 27, 22],
            debounce_samples: 20,
            debounce_interval_ms: 5,
            poll_interval_ms: 20,
            release_scans: 3,
        }
    }
}

impl KeypadConfig {
    pub fn debounce(&self) -> SampledDebounce {
        SampledDebounce::new(
            self.debounce_samples,
            Duration::from_millis(self.debounce_interval_ms),
        )
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
#[serde(default)]
pub struct LedConfig {
    /// BCM numbers of the three charlieplexed pins.
    pub pins: [usize; 3],
    pub dwell_ms: u64,
    pub flash_period_ms: u64,
    pub power_up_ms: u64,
    pub power_down_ms: u64,
    pub correct_step_ms: u64,
    pub wrong_ms: u64,
}

impl Default for LedConfig {
    fn default() -> Self {
        LedConfig {
            pins: [13, 19, 26],
            dwell_ms: 3,
            flash_period_ms: 200,
            power_up_ms: 2000,
            power_down_ms: 2000,
            correct_step_ms: 300,
            wrong_ms: 1200,
        }
    }
}

impl LedConfig {
    pub fn timing(&self) -> AnimationTiming {
        AnimationTiming {
            dwell: Duration::from_millis(self.dwell_ms),
            flash_period: Duration::from_millis(self.flash_period_ms),
            power_up: Duration::from_millis(self.power_up_ms),
            power_down: Duration::from_millis(self.power_down_ms),
            correct_step: Duration::from_millis(self.correct_step_ms),
            wrong: Duration::from_millis(self.wrong_ms),
        }
    }
}
