//! SPI peripheral bench drivers
//!
//! Chip protocols for the bench's shared SPI bus. Each protocol owns its
//! own CS sequencing and timing; all of them borrow the bus mutably for the
//! length of one operation, so two operations can never interleave.
//!
//! # Architecture
//!
//! ```text
//! Bring-up / orchestration (boot::Bench)
//!         ↓
//! Chip protocols (expander::FanOut, dac::Ad8802, adc::Ltc2380)
//!         ↓
//! Transport contract (bench_platform::Transport)
//!         ↓
//! HalTransport (embedded-hal) or bench_testing::SimulatedBench
//! ```
//!
//! # Features
//!
//! - `std` - Enable standard library (host tools and tests)
//! - `defmt` - Enable defmt::Format derives on the platform types
//!
//! # Example
//!
//! ```no_run
//! use bench_drivers::boot::Bench;
//! use bench_platform::{BenchConfig, BenchError, ExpanderAddress, Transport};
//!
//! fn run<T: Transport>(bus: T) -> Result<(), BenchError> {
//!     let mut bench = Bench::new(bus, BenchConfig::DEFAULT)?;
//!     if !bench.bring_up().is_ready() {
//!         return Ok(());
//!     }
//!     bench.enable_pin(ExpanderAddress::new(0, 3, 5, 2)?)?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![warn(clippy::dbg_macro)]
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // every operation returns BenchError
#![allow(clippy::must_use_candidate)]

pub mod adc;
pub mod boot;
pub mod dac;
pub mod expander;

pub use adc::Ltc2380;
pub use boot::{Bench, BringUpReport};
pub use dac::Ad8802;
pub use expander::FanOut;
