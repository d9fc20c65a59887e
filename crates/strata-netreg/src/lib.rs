//! Strata network registration.
//!
//! Turns the modem's versioned registration answers into one normalized
//! [`RegistrationRecord`] per domain, and keeps the reported radio
//! technology from flapping inside a RAT family while the device stays on
//! the same cell.
//!
//! - [`normalize`] maps every payload revision onto the record model
//! - [`ratchet`] holds the higher-ranked technology across updates
//! - [`family`] builds the family table from carrier config
//! - [`service`] correlates radio requests and completions per slot

pub mod config;
pub mod error;
pub mod family;
pub mod normalize;
pub mod ratchet;
pub mod raw;
pub mod record;
pub mod service;
pub mod tech;

pub use config::{CarrierConfig, CarrierConfigStore, InMemoryConfigStore};
pub use error::{NetRegError, RadioError, ResultCode};
pub use family::{RatFamilies, RatFamilyTable};
pub use normalize::normalize;
pub use ratchet::{RatRatchet, RatchetOutcome};
pub use raw::RawRegistrationResult;
pub use record::{RegistrationRecord, ServiceState};
pub use service::{NetworkServiceCallback, NetworkServiceProvider, RadioChannel, Reply};
pub use tech::{Domain, RadioTechnology, RegistrationState};
