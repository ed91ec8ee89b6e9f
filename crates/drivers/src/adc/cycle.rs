//! LTC2380-24 conversion cycle as a typestate machine.
//!
//! ```text
//! [Idle] --trigger()--> [Triggered] --start()--> [Converting] --clock()--> frame
//!            CNV high ≥ pulse          CNV low          CS low, 5 bytes, CS high
//! ```
//!
//! Reading before the CNV edge, or raising CS while CNV is still high, is a
//! compile error. The cycle borrows the bus for its whole lifetime.

use core::marker::PhantomData;

use bench_platform::ltc2380::FRAME_LEN;
use bench_platform::{with_selected, AdcConfig, BenchError, Level, Transport};

// ── State types (zero-sized) ──────────────────────────────────────────────────

/// CNV low, CS high; no conversion pending.
pub struct Idle;

/// CNV held high for the configured pulse width.
pub struct Triggered;

/// CNV back low; the conversion result is ready to be clocked out.
pub struct Converting;

// ── Cycle ─────────────────────────────────────────────────────────────────────

/// One conversion in progress on `bus`.
pub struct Cycle<'a, T: ?Sized, State> {
    bus: &'a mut T,
    config: &'a AdcConfig,
    _state: PhantomData<State>,
}

impl<'a, T, State> Cycle<'a, T, State>
where
    T: Transport + ?Sized,
{
    fn advance<Next>(self) -> Cycle<'a, T, Next> {
        Cycle {
            bus: self.bus,
            config: self.config,
            _state: PhantomData,
        }
    }
}

impl<'a, T> Cycle<'a, T, Idle>
where
    T: Transport + ?Sized,
{
    /// Begin a cycle. The caller guarantees CNV low and CS high.
    pub fn new(bus: &'a mut T, config: &'a AdcConfig) -> Self {
        Self {
            bus,
            config,
            _state: PhantomData,
        }
    }

    /// Raise CNV and hold it for the pulse width.
    pub fn trigger(self) -> Result<Cycle<'a, T, Triggered>, BenchError> {
        self.bus.set_line(self.config.cnv, Level::High)?;
        self.bus.delay_ns(self.config.pulse_ns);
        Ok(self.advance())
    }
}

impl<'a, T> Cycle<'a, T, Triggered>
where
    T: Transport + ?Sized,
{
    /// Drop CNV; the converter runs on the rising edge already seen.
    pub fn start(self) -> Result<Cycle<'a, T, Converting>, BenchError> {
        self.bus.set_line(self.config.cnv, Level::Low)?;
        Ok(self.advance())
    }
}

impl<'a, T> Cycle<'a, T, Converting>
where
    T: Transport + ?Sized,
{
    /// Clock the result frame out under CS. CS is released on every path.
    pub fn clock(self) -> Result<[u8; FRAME_LEN], BenchError> {
        let mut frame = [0u8; FRAME_LEN];
        with_selected(self.bus, &[self.config.cs], |bus| bus.exchange(&mut frame))?;
        Ok(frame)
    }
}
