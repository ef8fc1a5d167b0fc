mod config;
mod controller;
mod fsm;
mod store;

use dotenv::dotenv;
use eyre::WrapErr;
use log::{debug, error, info, trace};
use sysinfo::System;
use kpc_gpio::charlieplex::Charlieplex;
use kpc_gpio::delay::ThreadDelay;
use kpc_gpio::keypad::{GpioKeypad, KeypadScanner};
use kpc_gpio::raw::RawGpioDriver;
use kpc_gpio::{GpioBias, GpioDriver};
use crate::config::{Config, GpioDevice};
use crate::controller::Controller;
use crate::fsm::{default_rules, Fsm};
use crate::store::{FilePasswordStore, PasswordStore};

fn log_banner() {
    const UNKNOWN_STR: &str = "???";

    info!(
        "KPC v{} on {}",
        env!("CARGO_PKG_VERSION"),
        System::name().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "System ver {} kernel ver {}",
        System::long_os_version().as_deref().unwrap_or(UNKNOWN_STR),
        System::kernel_version().as_deref().unwrap_or(UNKNOWN_STR),
    );
    info!(
        "Hostname {}",
        System::host_name().as_deref().unwrap_or(UNKNOWN_STR)
    );
    info!("Architecture {}", System::cpu_arch());
}

fn load_config() -> eyre::Result<Config> {
    debug!("Trying to load config...");
    let config = if let Some(config) = Config::try_load()? {
        info!("Config loaded.");
        config
    } else {
        info!("Config not found. Using default");
        let config = Config::default();
        config.save()?;
        info!("Default config saved.");
        config
    };
    debug!("{:?}", config);
    Ok(config)
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    log_banner();

    let config = load_config()?;

    let mut store = FilePasswordStore::new(&config.password_file);
    store
        .read()
        .wrap_err_with(|| format!("No usable access code in {:?}", store.path()))?;
    debug!("Access code found in {:?}.", store.path());

    debug!("Initializing GPIO driver...");
    let chip = config.gpio.soc.into();
    let gpio = match config.gpio.device {
        GpioDevice::Gpiomem => RawGpioDriver::new_gpiomem(chip)?,
        GpioDevice::Mem => RawGpioDriver::new_mem(chip)?,
    };
    debug!("{:?} initialized.", gpio);

    let delay = ThreadDelay;

    debug!("Initializing keypad driver...");
    let mut keypad_row_bus = gpio.get_pin_bus(config.keypad.rows)?;
    let mut keypad_col_bus = gpio.get_pin_bus(config.keypad.cols)?;
    keypad_col_bus.set_bias(GpioBias::PullDown)?;
    let keypad_row_out = keypad_row_bus.as_output()?;
    let keypad_col_in = keypad_col_bus.as_input()?;

    let keypad = GpioKeypad::new(&*keypad_row_out, &*keypad_col_in, &delay)
        .with_debounce(config.keypad.debounce());
    let mut scanner = KeypadScanner::new(&keypad, &delay)
        .with_poll_interval(config.keypad.poll_interval())
        .with_release_scans(config.keypad.release_scans);
    debug!("{:?} initialized.", keypad);

    debug!("Initializing LED board...");
    let mut led_bus = gpio.get_pin_bus(config.leds.pins)?;
    let led_pins = led_bus.as_tristate()?;
    let mut leds = Charlieplex::new(&*led_pins, &delay)?
        .with_timing(config.leds.timing());
    debug!("{:?} initialized.", leds);

    info!("KPC initialized.");

    let mut controller = Controller::new(&mut scanner, &mut leds, &mut store);
    let mut fsm = Fsm::new(default_rules());
    debug!("{} rules loaded.", fsm.rules().len());

    let result = fsm.run(&mut controller);
    if let Err(err) = &result {
        error!("Stopped on a fault: {}", err);
    }
    trace!("Last session: {:?}", controller.session());
    if let Err(err) = controller.go_dark() {
        error!("Couldn't turn the LEDs off: {}", err);
    }
    result?;

    info!("Bye.");
    Ok(())
}
