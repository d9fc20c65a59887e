//! # Radio Technology Model
//!
//! RIL radio technology codes, the access network each one belongs to, and
//! the small enums shared by every registration record.
//!
//! Family strings in carrier config are written in RIL codes, so
//! [`RadioTechnology`] keeps the numeric value as its discriminant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NetRegError;

// ─── Radio Technology ───────────────────────────────────────────────────────

/// Radio access technology as reported by the modem (RIL code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RadioTechnology {
    Unknown = 0,
    Gprs = 1,
    Edge = 2,
    Umts = 3,
    Is95a = 4,
    Is95b = 5,
    OneXRtt = 6,
    Evdo0 = 7,
    EvdoA = 8,
    Hsdpa = 9,
    Hsupa = 10,
    Hspa = 11,
    EvdoB = 12,
    Ehrpd = 13,
    Lte = 14,
    Hspap = 15,
    Gsm = 16,
    TdScdma = 17,
    Iwlan = 18,
    LteCa = 19,
    Nr = 20,
}

/// Access network a radio technology runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessNetwork {
    Unknown,
    Geran,
    Utran,
    Eutran,
    Cdma2000,
    Iwlan,
    Ngran,
}

impl RadioTechnology {
    const ALL: [RadioTechnology; 21] = [
        RadioTechnology::Unknown,
        RadioTechnology::Gprs,
        RadioTechnology::Edge,
        RadioTechnology::Umts,
        RadioTechnology::Is95a,
        RadioTechnology::Is95b,
        RadioTechnology::OneXRtt,
        RadioTechnology::Evdo0,
        RadioTechnology::EvdoA,
        RadioTechnology::Hsdpa,
        RadioTechnology::Hsupa,
        RadioTechnology::Hspa,
        RadioTechnology::EvdoB,
        RadioTechnology::Ehrpd,
        RadioTechnology::Lte,
        RadioTechnology::Hspap,
        RadioTechnology::Gsm,
        RadioTechnology::TdScdma,
        RadioTechnology::Iwlan,
        RadioTechnology::LteCa,
        RadioTechnology::Nr,
    ];

    /// Numeric RIL code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Lenient conversion used for modem payloads: codes outside the RIL
    /// table resolve to [`RadioTechnology::Unknown`].
    pub fn from_ril(code: i32) -> Self {
        u8::try_from(code)
            .ok()
            .and_then(|c| Self::try_from(c).ok())
            .unwrap_or(RadioTechnology::Unknown)
    }

    pub fn access_network(self) -> AccessNetwork {
        match self {
            RadioTechnology::Gprs | RadioTechnology::Edge | RadioTechnology::Gsm => {
                AccessNetwork::Geran
            }
            RadioTechnology::Umts
            | RadioTechnology::Hsdpa
            | RadioTechnology::Hsupa
            | RadioTechnology::Hspa
            | RadioTechnology::Hspap
            | RadioTechnology::TdScdma => AccessNetwork::Utran,
            RadioTechnology::Is95a
            | RadioTechnology::Is95b
            | RadioTechnology::OneXRtt
            | RadioTechnology::Evdo0
            | RadioTechnology::EvdoA
            | RadioTechnology::EvdoB
            | RadioTechnology::Ehrpd => AccessNetwork::Cdma2000,
            RadioTechnology::Lte | RadioTechnology::LteCa => AccessNetwork::Eutran,
            RadioTechnology::Iwlan => AccessNetwork::Iwlan,
            RadioTechnology::Nr => AccessNetwork::Ngran,
            RadioTechnology::Unknown => AccessNetwork::Unknown,
        }
    }
}

impl TryFrom<u8> for RadioTechnology {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(code as usize).copied().ok_or(code)
    }
}

impl fmt::Display for RadioTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioTechnology::Unknown => "unknown",
            RadioTechnology::Gprs => "GPRS",
            RadioTechnology::Edge => "EDGE",
            RadioTechnology::Umts => "UMTS",
            RadioTechnology::Is95a => "IS95A",
            RadioTechnology::Is95b => "IS95B",
            RadioTechnology::OneXRtt => "1xRTT",
            RadioTechnology::Evdo0 => "EvDo-rev.0",
            RadioTechnology::EvdoA => "EvDo-rev.A",
            RadioTechnology::Hsdpa => "HSDPA",
            RadioTechnology::Hsupa => "HSUPA",
            RadioTechnology::Hspa => "HSPA",
            RadioTechnology::EvdoB => "EvDo-rev.B",
            RadioTechnology::Ehrpd => "eHRPD",
            RadioTechnology::Lte => "LTE",
            RadioTechnology::Hspap => "HSPAP",
            RadioTechnology::Gsm => "GSM",
            RadioTechnology::TdScdma => "TD-SCDMA",
            RadioTechnology::Iwlan => "IWLAN",
            RadioTechnology::LteCa => "LTE-CA",
            RadioTechnology::Nr => "NR",
        };
        f.write_str(name)
    }
}

// ─── Domain ─────────────────────────────────────────────────────────────────

/// Registration domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Circuit-switched (voice).
    Cs,
    /// Packet-switched (data).
    Ps,
}

impl Domain {
    pub const CS_CODE: i32 = 1;
    pub const PS_CODE: i32 = 2;

    pub fn code(self) -> i32 {
        match self {
            Domain::Cs => Self::CS_CODE,
            Domain::Ps => Self::PS_CODE,
        }
    }
}

impl TryFrom<i32> for Domain {
    type Error = NetRegError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            Self::CS_CODE => Ok(Domain::Cs),
            Self::PS_CODE => Ok(Domain::Ps),
            other => Err(NetRegError::InvalidArgument(other)),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Cs => write!(f, "cs"),
            Domain::Ps => write!(f, "ps"),
        }
    }
}

/// Transport the record was obtained over. Cellular records are always WWAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transport {
    #[default]
    Wwan,
}

// ─── Registration State ─────────────────────────────────────────────────────

/// Canonical registration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    NotRegisteredNotSearching,
    Home,
    NotRegisteredSearching,
    Denied,
    Unknown,
    Roaming,
}

impl RegistrationState {
    /// Registered on a home or roaming network.
    pub fn is_in_service(self) -> bool {
        matches!(self, RegistrationState::Home | RegistrationState::Roaming)
    }
}

/// Raw registration state codes as sent by the radio HAL.
pub mod hal_reg_state {
    pub const NOT_REG_MT_NOT_SEARCHING_OP: i32 = 0;
    pub const REG_HOME: i32 = 1;
    pub const NOT_REG_MT_SEARCHING_OP: i32 = 2;
    pub const REG_DENIED: i32 = 3;
    pub const UNKNOWN: i32 = 4;
    pub const REG_ROAMING: i32 = 5;
    pub const NOT_REG_MT_NOT_SEARCHING_OP_EM: i32 = 10;
    pub const NOT_REG_MT_SEARCHING_OP_EM: i32 = 12;
    pub const REG_DENIED_EM: i32 = 13;
    pub const UNKNOWN_EM: i32 = 14;
}

// ─── Service Types ──────────────────────────────────────────────────────────

/// Services offered by a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Voice,
    Data,
    Sms,
    Video,
    Emergency,
}

/// Tri-state LTE VoPS capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LteStatus {
    Supported,
    NotSupported,
    #[default]
    NotAvailable,
}

impl From<bool> for LteStatus {
    fn from(supported: bool) -> Self {
        if supported {
            LteStatus::Supported
        } else {
            LteStatus::NotSupported
        }
    }
}
