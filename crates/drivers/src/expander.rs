//! MCP23S17 expander fan-out.
//!
//! Two primaries sit on physical chip selects. Their sixteen output bits
//! each drive the CS of one secondary, giving 32 secondaries × 16 outputs
//! from two controller lines.
//!
//! ```text
//! controller CS21 ──> primary 0 ── OLATA/OLATB bit n ──> CS of secondary n
//! controller CS22 ──> primary 1 ── OLATA/OLATB bit n ──> CS of secondary 16 + n
//! ```
//!
//! Secondaries have no line of their own: a secondary frame reaches
//! whichever secondaries the primaries currently hold low. Every secondary
//! access therefore happens inside a *window*: one primary write that pulls
//! exactly one latch bit low, the secondary frame, and one primary write
//! that drives the latch back to `0xFF`.

use bench_platform::mcp23s17::{
    self, DESELECT_ALL, IOCON, IOCON_HAEN, IODIRA, IODIRB, OLATA, OLATB, PRIMARY_READ,
    PRIMARY_WRITE, SECONDARY_READ, SECONDARY_WRITE, SELECT_ALL,
};
use bench_platform::{
    with_selected, BenchError, ExpanderAddress, ExpanderConfig, PinId, Port, Primary, Transport,
};
use tracing::{debug, warn};

/// Which way a pin operation moves the latch bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drive {
    Set,
    Clear,
}

/// Fan-out protocol over two primaries and 32 secondaries.
#[derive(Debug, Clone, Copy)]
pub struct FanOut {
    config: ExpanderConfig,
}

impl FanOut {
    /// Create the protocol for the given wiring.
    pub const fn new(config: ExpanderConfig) -> Self {
        Self { config }
    }

    /// Wiring in use.
    pub const fn config(&self) -> &ExpanderConfig {
        &self.config
    }

    /// Bring every expander to a known state.
    ///
    /// 1. HAEN on both primaries, so later frames can target one of them.
    /// 2. Primary latches preloaded to `0xFF`, then both ports switched to
    ///    outputs: no secondary CS is pulled low when the drivers turn on.
    /// 3. `0xFF` written again to both latches (deselect).
    /// 4. Select-all windows configuring every secondary: HAEN and port A
    ///    outputs, then port B outputs.
    ///
    /// Secondaries receive HAEN so that they ignore primary frames clocked
    /// while they are still selected.
    pub fn initialize<T>(&self, bus: &mut T) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        debug!("expander: initialize");
        self.broadcast(bus, IOCON, IOCON_HAEN)?;

        self.broadcast(bus, OLATA, DESELECT_ALL)?;
        self.broadcast(bus, OLATB, DESELECT_ALL)?;
        self.broadcast(bus, IODIRA, 0x00)?;
        self.broadcast(bus, IODIRB, 0x00)?;
        self.broadcast(bus, OLATA, DESELECT_ALL)?;
        self.broadcast(bus, OLATB, DESELECT_ALL)?;

        self.select_all_window(bus, &[(IOCON, IOCON_HAEN), (IODIRA, 0x00)])?;
        self.select_all_window(bus, &[(IODIRB, 0x00)])?;
        Ok(())
    }

    /// Drive output `address.secondary_pin()` of the addressed secondary high.
    pub fn enable_pin<T>(&self, bus: &mut T, address: ExpanderAddress) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        debug!(
            primary = address.primary().index(),
            primary_pin = address.primary_pin(),
            secondary = address.secondary(),
            secondary_pin = address.secondary_pin(),
            "expander: enable pin"
        );
        self.update_pin(bus, address, Drive::Set)
    }

    /// Drive output `address.secondary_pin()` of the addressed secondary low.
    pub fn disable_pin<T>(&self, bus: &mut T, address: ExpanderAddress) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        debug!(
            primary = address.primary().index(),
            primary_pin = address.primary_pin(),
            secondary = address.secondary(),
            secondary_pin = address.secondary_pin(),
            "expander: disable pin"
        );
        self.update_pin(bus, address, Drive::Clear)
    }

    /// Read one output latch port of the secondary wired to `primary_pin`.
    pub fn read_latch<T>(
        &self,
        bus: &mut T,
        primary: Primary,
        primary_pin: u8,
        port: Port,
    ) -> Result<u8, BenchError>
    where
        T: Transport + ?Sized,
    {
        let address = ExpanderAddress::new(primary.index(), primary_pin, 0, 0)?;
        self.window(bus, address, |bus| {
            secondary_read(bus, mcp23s17::olat(port))
        })
    }

    /// Read a register of one primary.
    pub fn read_primary<T>(
        &self,
        bus: &mut T,
        primary: Primary,
        register: u8,
    ) -> Result<u8, BenchError>
    where
        T: Transport + ?Sized,
    {
        let mut frame = mcp23s17::read_frame(PRIMARY_READ, register);
        self.primary_exchange(bus, &[self.config.chip_select(primary)], &mut frame)?;
        let [_, _, value] = frame;
        Ok(value)
    }

    // ── Sequences ───────────────────────────────────────────────────────────

    fn update_pin<T>(
        &self,
        bus: &mut T,
        address: ExpanderAddress,
        drive: Drive,
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let register = mcp23s17::olat(address.latch_port());
        let bit = address.latch_bit();

        let current = self.window(bus, address, |bus| secondary_read(bus, register))?;
        let next = match drive {
            Drive::Set => current | bit,
            Drive::Clear => current & !bit,
        };
        self.window(bus, address, |bus| secondary_write(bus, register, next))
    }

    /// Select one secondary, run `f`, deselect.
    ///
    /// A failure inside the window gets one best-effort release write; the
    /// first error is returned. A failed select write aborts before `f`.
    fn window<T, R, F>(&self, bus: &mut T, address: ExpanderAddress, f: F) -> Result<R, BenchError>
    where
        T: Transport + ?Sized,
        F: FnOnce(&mut T) -> Result<R, BenchError>,
    {
        let primary = address.primary();
        let latch = mcp23s17::olat(address.select_port());
        self.write_primary(bus, primary, latch, address.select_mask())?;

        match f(bus) {
            Ok(value) => {
                self.write_primary(bus, primary, latch, DESELECT_ALL)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(release) = self.write_primary(bus, primary, latch, DESELECT_ALL) {
                    warn!(%release, "expander: release after failed window also failed");
                }
                Err(err)
            }
        }
    }

    /// Select every secondary on both primaries, write `writes` to all of
    /// them, deselect.
    fn select_all_window<T>(&self, bus: &mut T, writes: &[(u8, u8)]) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        self.broadcast(bus, OLATA, SELECT_ALL)?;
        self.broadcast(bus, OLATB, SELECT_ALL)?;
        for &(register, value) in writes {
            secondary_write(bus, register, value)?;
        }
        self.broadcast(bus, OLATA, DESELECT_ALL)?;
        self.broadcast(bus, OLATB, DESELECT_ALL)
    }

    // ── Frames ──────────────────────────────────────────────────────────────

    fn broadcast<T>(&self, bus: &mut T, register: u8, value: u8) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let mut frame = mcp23s17::write_frame(PRIMARY_WRITE, register, value);
        self.primary_exchange(bus, &self.config.chip_selects(), &mut frame)
    }

    fn write_primary<T>(
        &self,
        bus: &mut T,
        primary: Primary,
        register: u8,
        value: u8,
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let mut frame = mcp23s17::write_frame(PRIMARY_WRITE, register, value);
        self.primary_exchange(bus, &[self.config.chip_select(primary)], &mut frame)
    }

    /// Primary frame: CS low, settle, exchange, settle, CS high.
    fn primary_exchange<T>(
        &self,
        bus: &mut T,
        lines: &[PinId],
        frame: &mut [u8; 3],
    ) -> Result<(), BenchError>
    where
        T: Transport + ?Sized,
    {
        let settle_us = self.config.settle_us;
        with_selected(bus, lines, |bus| {
            bus.delay_us(settle_us);
            bus.exchange(frame)?;
            bus.delay_us(settle_us);
            Ok(())
        })
    }
}

/// Secondary frames carry no CS framing of their own.
fn secondary_write<T>(bus: &mut T, register: u8, value: u8) -> Result<(), BenchError>
where
    T: Transport + ?Sized,
{
    bus.exchange(&mut mcp23s17::write_frame(SECONDARY_WRITE, register, value))
}

fn secondary_read<T>(bus: &mut T, register: u8) -> Result<u8, BenchError>
where
    T: Transport + ?Sized,
{
    let mut frame = mcp23s17::read_frame(SECONDARY_READ, register);
    bus.exchange(&mut frame)?;
    let [_, _, value] = frame;
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    use bench_platform::mcp23s17::GPIOA;
    use bench_platform::{BenchConfig, Level};
    use bench_testing::{Event, SimulatedBench};

    const CFG: ExpanderConfig = BenchConfig::DEFAULT.expander;

    fn ready_bench() -> SimulatedBench {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        FanOut::new(CFG).initialize(&mut bench).unwrap();
        bench.clear_trace();
        bench.reset_peak();
        bench
    }

    #[test]
    fn initialize_enables_hardware_addressing_everywhere() {
        let bench = ready_bench();
        for primary in Primary::ALL {
            let chip = bench.primary(primary);
            assert!(chip.haen());
            assert_eq!(chip.register(IODIRA), 0x00);
            assert_eq!(chip.register(IODIRB), 0x00);
            assert_eq!(chip.latch(), 0xFFFF);
        }
        for index in 0..32 {
            let chip = bench.secondary(index).unwrap();
            assert!(chip.haen(), "secondary {index} must have HAEN");
            assert_eq!(chip.register(IODIRA), 0x00);
            assert_eq!(chip.register(IODIRB), 0x00);
        }
        assert!(bench.selected_secondaries().is_empty());
    }

    #[test]
    fn initialize_starts_with_iocon_broadcast() {
        let mut bench = SimulatedBench::new(BenchConfig::DEFAULT);
        FanOut::new(CFG).initialize(&mut bench).unwrap();
        let first = bench.exchanges().next().unwrap().to_vec();
        assert_eq!(first, vec![PRIMARY_WRITE, IOCON, IOCON_HAEN]);
        // Both primary selects framed the broadcast.
        assert_eq!(
            &bench.trace()[..2],
            &[
                Event::Line { pin: PinId(21), level: Level::Low },
                Event::Line { pin: PinId(22), level: Level::Low },
            ]
        );
    }

    #[test]
    fn primary_frames_settle_inside_the_select() {
        let mut bench = ready_bench();
        FanOut::new(CFG)
            .read_primary(&mut bench, Primary::Second, OLATB)
            .unwrap();
        let settle = CFG.settle_us * 1_000;
        assert_eq!(
            bench.trace()[1..4],
            [
                Event::Delay { ns: settle },
                Event::Exchange {
                    tx: vec![PRIMARY_READ, OLATB, 0x00],
                    rx: vec![0x00, 0x00, 0xFF],
                },
                Event::Delay { ns: settle },
            ]
        );
    }

    #[test]
    fn read_primary_targets_one_chip() {
        let mut bench = ready_bench();
        let value = FanOut::new(CFG)
            .read_primary(&mut bench, Primary::First, IOCON)
            .unwrap();
        assert_eq!(value, IOCON_HAEN);
        assert_eq!(bench.line_history(PinId(21)), vec![Level::Low, Level::High]);
        assert!(bench.line_history(PinId(22)).is_empty());
    }

    #[test]
    fn enable_sets_only_the_target_bit() {
        let mut bench = ready_bench();
        let address = ExpanderAddress::new(1, 9, 25, 12).unwrap();
        FanOut::new(CFG).enable_pin(&mut bench, address).unwrap();

        let target = SimulatedBench::wired_secondary(Primary::Second, 9);
        assert_eq!(bench.secondary_latch(target), Some(1 << 12));
        for index in (0..32).filter(|&i| i != target) {
            assert_eq!(bench.secondary_latch(index), Some(0), "secondary {index}");
        }
        assert_eq!(bench.peak_selected_secondaries(), 1);
    }

    #[test]
    fn read_latch_returns_port_value() {
        let mut bench = ready_bench();
        let fan_out = FanOut::new(CFG);
        fan_out
            .enable_pin(&mut bench, ExpanderAddress::new(0, 14, 14, 1).unwrap())
            .unwrap();
        assert_eq!(
            fan_out.read_latch(&mut bench, Primary::First, 14, Port::A).unwrap(),
            0x02
        );
        assert_eq!(
            fan_out.read_latch(&mut bench, Primary::First, 14, Port::B).unwrap(),
            0x00
        );
    }

    #[test]
    fn failed_read_releases_the_window() {
        let mut bench = ready_bench();
        // exchange 0: select, 1: secondary read (fails), 2: release
        bench.fail_exchange(1);
        let address = ExpanderAddress::new(0, 3, 5, 2).unwrap();
        let err = FanOut::new(CFG).enable_pin(&mut bench, address).unwrap_err();

        assert_eq!(err, BenchError::Transport);
        assert!(bench.selected_secondaries().is_empty());
        assert_eq!(bench.primary(Primary::First).register(OLATA), DESELECT_ALL);
        bench.assert_lines_idle().unwrap();
    }

    #[test]
    fn failed_select_aborts_without_secondary_traffic() {
        let mut bench = ready_bench();
        bench.fail_exchange(0);
        let address = ExpanderAddress::new(0, 3, 5, 2).unwrap();
        assert!(FanOut::new(CFG).disable_pin(&mut bench, address).is_err());
        assert_eq!(bench.exchanges().count(), 0);
        bench.assert_lines_idle().unwrap();
    }

    #[test]
    fn gpio_write_is_not_used_for_latches() {
        let mut bench = ready_bench();
        FanOut::new(CFG)
            .enable_pin(&mut bench, ExpanderAddress::new(0, 0, 0, 0).unwrap())
            .unwrap();
        assert!(bench.exchanges().all(|tx| tx[1] != GPIOA));
    }
}
