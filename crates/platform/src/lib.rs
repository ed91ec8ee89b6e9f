//! Platform layer for the SPI peripheral bench.
//!
//! This crate holds everything the chip protocols share but do not own:
//! the bus transport contract, chip-select framing, the immutable
//! configuration tables, typed values and the error taxonomy.
//!
//! # Architecture Layers
//!
//! ```text
//! Orchestration (caller: test sequencer, CLI, ...)
//!         ↓
//! Chip protocols (bench-drivers: MCP23S17 fan-out, AD8802, LTC2380)
//!         ↓
//! Platform (this crate - Transport contract, config, register maps)
//!         ↓
//! Hardware (embedded-hal SpiBus + GPIO lines, or a simulated bench)
//! ```
//!
//! # Register maps
//!
//! - [`mcp23s17`] - I/O expander registers and opcodes
//! - [`ad8802`] - DAC channel nibbles and scaling constants
//! - [`ltc2380`] - ADC frame layout and calibration constants
//!
//! # Features
//!
//! - `std`: Enable standard library support
//! - `serde`: Deserialize [`BenchConfig`] from JSON/TOML
//! - `defmt`: Enable defmt::Format derives
//!
//! # Example
//!
//! ```no_run
//! use bench_platform::{BenchConfig, BenchError, Level, Transport};
//!
//! fn park<T: Transport>(bus: &mut T) -> Result<(), BenchError> {
//!     for (pin, level) in BenchConfig::DEFAULT.idle_lines() {
//!         bus.set_line(pin, level)?;
//!     }
//!     Ok(())
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)] // all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod ad8802;
pub mod config;
pub mod error;
pub mod hal_transport;
pub mod ltc2380;
pub mod mcp23s17;
pub mod transport;
pub mod types;

pub use config::{AdcConfig, BenchConfig, DacConfig, ExpanderConfig, SpiSettings};
pub use error::{BenchError, ConfigError, OutOfRangeError, RangeKind};
pub use hal_transport::HalTransport;
pub use transport::{with_selected, Level, PinId, Transport};
pub use types::{
    DacChannel, DacChip, ExpanderAddress, OutputVoltage, Port, Primary, Quantity, RawSample,
    Reading,
};
