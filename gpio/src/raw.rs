//! Memory-mapped driver for the GPIO block of the BCM2837 (Pi 2 v1.2, Pi 3) and the
//! BCM2711 (Pi 4). The two differ in where the block sits and in how pull resistors are set.
//!
//! Everything the keypad and the LED board do is expressed through three primitives,
//! [RawGpioDriver::set_pin_mode], [RawGpioDriver::set_pin_level] and
//! [RawGpioDriver::read_pin_level], plus the pull resistor configuration.

use crate::{
    GpioBias, GpioBus, GpioBusInput, GpioBusOutput, GpioBusTristate,
    GpioDriver, GpioError, GpioResult, PinMode, PinState,
};
use bitvec::vec::BitVec;
use log::trace;
use memmap2::{MmapOptions, MmapRaw};
use std::fmt::{Debug, Formatter};
use std::fs::OpenOptions;
use std::sync::atomic::AtomicU8;
use std::thread;
use std::time::Duration;

/// The SoC whose GPIO block is driven.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioChip {
    /// Pi 2 v1.2 and Pi 3. Pulls are set with the GPPUD/GPPUDCLK clocking sequence.
    #[default]
    Bcm2837,
    /// Pi 4. Pulls are set directly in the GPIO_PUP_PDN_CNTRL registers.
    Bcm2711,
}

impl GpioChip {
    /// Physical address of the GPIO block.
    pub fn gpio_base(self) -> u64 {
        match self {
            GpioChip::Bcm2837 => 0x3F20_0000,
            GpioChip::Bcm2711 => 0xFE20_0000,
        }
    }
}

pub struct RawGpioDriver {
    mmap: MmapRaw,
    chip: GpioChip,
    used_pins: BitVec<AtomicU8>,
}

impl RawGpioDriver {
    const PIN_COUNT: usize = 58;

    // Word offsets of the registers used.
    const GPFSEL0: usize = 0x00 / 4;
    const GPSET0: usize = 0x1C / 4;
    const GPCLR0: usize = 0x28 / 4;
    const GPLEV0: usize = 0x34 / 4;
    const GPPUD: usize = 0x94 / 4;
    const GPPUDCLK0: usize = 0x98 / 4;
    const GPIO_PUP_PDN_CNTRL_REG0: usize = 0xE4 / 4;

    // At least 150 core cycles between the steps of the GPPUD sequence.
    const GPPUD_SETUP: Duration = Duration::from_micros(5);

    fn create(path: &str, offset: u64, chip: GpioChip) -> GpioResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)?;

        let mmap = MmapOptions::new()
            .offset(offset)
            .len(4096)
            .map_raw(&file)?;

        trace!("Mapped {} at offset {:#x}.", path, offset);

        Ok(RawGpioDriver {
            mmap,
            chip,
            used_pins: BitVec::repeat(false, Self::PIN_COUNT),
        })
    }

    /// Opens `/dev/gpiomem`, which exposes only the GPIO block and doesn't need root.
    pub fn new_gpiomem(chip: GpioChip) -> GpioResult<Self> {
        Self::create("/dev/gpiomem", 0, chip)
    }

    /// Opens `/dev/mem` at the GPIO block's physical address. Needs root.
    pub fn new_mem(chip: GpioChip) -> GpioResult<Self> {
        Self::create("/dev/mem", chip.gpio_base(), chip)
    }

    pub fn chip(&self) -> GpioChip {
        self.chip
    }

    fn check_pin(pin_index: usize) -> GpioResult<()> {
        if pin_index >= Self::PIN_COUNT {
            return Err(GpioError::InvalidArgument);
        }
        Ok(())
    }

    fn register(&self, word_offset: usize) -> *mut u32 {
        let base = self.mmap.as_mut_ptr() as *mut u32;
        // The offsets used stay well within the mapped 4 KiB page.
        unsafe { base.add(word_offset) }
    }

    /// Switches the pin between input and output (GPFSELn).
    pub fn set_pin_mode(&self, pin_index: usize, mode: PinMode) -> GpioResult<()> {
        Self::check_pin(pin_index)?;

        let function = match mode {
            PinMode::Input => 0b000,
            PinMode::Output => 0b001,
        };

        let register_ptr = self.register(Self::GPFSEL0 + pin_index / 10);
        let shift = (pin_index % 10) * 3;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b111 << shift);
        register_value |= function << shift;
        unsafe { register_ptr.write_volatile(register_value) };

        Ok(())
    }

    /// Sets the output latch of the pin (GPSETn/GPCLRn).
    ///
    /// Takes effect on the wire only while the pin is in output mode.
    pub fn set_pin_level(&self, pin_index: usize, high: bool) -> GpioResult<()> {
        Self::check_pin(pin_index)?;

        let base = if high { Self::GPSET0 } else { Self::GPCLR0 };
        let register_ptr = self.register(base + pin_index / 32);
        unsafe { register_ptr.write_volatile(1 << (pin_index % 32)) };

        Ok(())
    }

    /// Reads the physical level of the pin (GPLEVn).
    pub fn read_pin_level(&self, pin_index: usize) -> GpioResult<bool> {
        Self::check_pin(pin_index)?;

        let register_ptr = self.register(Self::GPLEV0 + pin_index / 32);
        let register_value = unsafe { register_ptr.read_volatile() };
        Ok((register_value >> (pin_index % 32)) & 1 != 0)
    }

    /// Sets the pull resistor of the pin, the way the chip expects it.
    pub fn set_bias(&self, pin_index: usize, bias: GpioBias) -> GpioResult<()> {
        Self::check_pin(pin_index)?;

        match self.chip {
            GpioChip::Bcm2837 => self.set_bias_clocked(pin_index, bias),
            GpioChip::Bcm2711 => self.set_bias_direct(pin_index, bias),
        }

        Ok(())
    }

    fn set_bias_clocked(&self, pin_index: usize, bias: GpioBias) {
        let control = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullDown => 0b01,
            GpioBias::PullUp => 0b10,
        };

        let pud_ptr = self.register(Self::GPPUD);
        let clock_ptr = self.register(Self::GPPUDCLK0 + pin_index / 32);

        unsafe { pud_ptr.write_volatile(control) };
        thread::sleep(Self::GPPUD_SETUP);
        unsafe { clock_ptr.write_volatile(1 << (pin_index % 32)) };
        thread::sleep(Self::GPPUD_SETUP);
        unsafe {
            pud_ptr.write_volatile(0);
            clock_ptr.write_volatile(0);
        }
    }

    fn set_bias_direct(&self, pin_index: usize, bias: GpioBias) {
        let bias_value = match bias {
            GpioBias::None => 0b00,
            GpioBias::PullUp => 0b01,
            GpioBias::PullDown => 0b10,
        };

        let register_ptr = self.register(Self::GPIO_PUP_PDN_CNTRL_REG0 + pin_index / 16);
        let shift = (pin_index % 16) * 2;

        let mut register_value = unsafe { register_ptr.read_volatile() };
        register_value &= !(0b11 << shift);
        register_value |= bias_value << shift;
        unsafe { register_ptr.write_volatile(register_value) };
    }

    /// Puts the pin in the given tri-state configuration.
    pub fn drive_pin(&self, pin_index: usize, state: PinState) -> GpioResult<()> {
        match state.level() {
            Some(high) => {
                // Latch first so the pin never glitches to the stale level.
                self.set_pin_level(pin_index, high)?;
                self.set_pin_mode(pin_index, PinMode::Output)?;
            }
            None => {
                self.set_pin_mode(pin_index, PinMode::Input)?;
            }
        }
        Ok(())
    }

    fn reset_pin(&self, pin_index: usize) -> GpioResult<()> {
        self.set_pin_mode(pin_index, PinMode::Input)?;
        self.set_bias(pin_index, GpioBias::None)?;
        self.set_pin_level(pin_index, false)?;
        Ok(())
    }
}

impl Debug for RawGpioDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawGpioDriver({:?}, {:?})", self.chip, self.mmap.as_ptr().addr())
    }
}

impl GpioDriver for RawGpioDriver {
    fn count(&self) -> GpioResult<usize> {
        Ok(Self::PIN_COUNT)
    }

    fn get_pin_bus<const N: usize>(&self, indices: [usize; N]) -> GpioResult<Box<dyn GpioBus<N> + '_>> {
        let n = self.count()?;

        if indices.iter().any(|&index| index >= n) {
            return Err(GpioError::InvalidArgument);
        }

        if indices.iter().any(|&index| self.used_pins[index]) {
            return Err(GpioError::AlreadyInUse);
        }

        for &index in &indices {
            self.used_pins.set_aliased(index, true);
            self.reset_pin(index)?;
        }

        Ok(Box::new(RawGpioBus {
            driver: self,
            pin_indices: indices,
        }))
    }
}

struct RawGpioBus<'a, const N: usize> {
    driver: &'a RawGpioDriver,
    pin_indices: [usize; N],
}

impl<const N: usize> Debug for RawGpioBus<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}{:?}", self.driver, self.pin_indices)
    }
}

impl<const N: usize> GpioBus<N> for RawGpioBus<'_, N> {
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.set_pin_mode(pin_index, PinMode::Input)?;
        }
        Ok(Box::new(RawGpioBusInput { bus: self }))
    }

    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.drive_pin(pin_index, PinState::Low)?;
        }
        Ok(Box::new(RawGpioBusOutput { bus: self }))
    }

    fn as_tristate(&mut self) -> GpioResult<Box<dyn GpioBusTristate<N> + '_>> {
        for &pin_index in &self.pin_indices {
            self.driver.drive_pin(pin_index, PinState::Floating)?;
        }
        Ok(Box::new(RawGpioBusTristate { bus: self }))
    }

    fn set_bias(&mut self, bias: GpioBias) -> GpioResult<()> {
        for &pin_index in &self.pin_indices {
            self.driver.set_bias(pin_index, bias)?;
        }
        Ok(())
    }
}

impl<const N: usize> Drop for RawGpioBus<'_, N> {
    fn drop(&mut self) {
        for &pin_index in &self.pin_indices {
            _ = self.driver.reset_pin(pin_index);
            self.driver.used_pins.set_aliased(pin_index, false);
        }
        trace!("Released pins {:?}.", self.pin_indices);
    }
}

struct RawGpioBusInput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusInput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[input]", self.bus)
    }
}

impl<const N: usize> GpioBusInput<N> for RawGpioBusInput<'_, N> {
    fn read(&self) -> GpioResult<[bool; N]> {
        let mut values = [false; N];
        for (value, &pin_index) in values.iter_mut().zip(&self.bus.pin_indices) {
            *value = self.bus.driver.read_pin_level(pin_index)?;
        }
        Ok(values)
    }
}

struct RawGpioBusOutput<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusOutput<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[output]", self.bus)
    }
}

impl<const N: usize> GpioBusOutput<N> for RawGpioBusOutput<'_, N> {
    fn write(&self, values: &[bool; N]) -> GpioResult<()> {
        for (&value, &pin_index) in values.iter().zip(&self.bus.pin_indices) {
            self.bus.driver.set_pin_level(pin_index, value)?;
        }
        Ok(())
    }
}

struct RawGpioBusTristate<'a, const N: usize> {
    bus: &'a RawGpioBus<'a, N>,
}

impl<const N: usize> Debug for RawGpioBusTristate<'_, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[tristate]", self.bus)
    }
}

impl<const N: usize> GpioBusTristate<N> for RawGpioBusTristate<'_, N> {
    fn set(&self, states: &[PinState; N]) -> GpioResult<()> {
        // Float everything first so two pins are never briefly driven against each other.
        for &pin_index in &self.bus.pin_indices {
            self.bus.driver.set_pin_mode(pin_index, PinMode::Input)?;
        }
        for (&state, &pin_index) in states.iter().zip(&self.bus.pin_indices) {
            self.bus.driver.drive_pin(pin_index, state)?;
        }
        Ok(())
    }
}
