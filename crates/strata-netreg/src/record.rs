//! # Canonical Registration Records
//!
//! [`RegistrationRecord`] is the single registration model every HAL
//! revision is normalized into. Records are read-only outside this crate;
//! the ratchet engine is the only writer, through crate-private setters.
//!
//! [`ServiceState`] pairs the voice and data records with the serving cell
//! bandwidths, which is the snapshot the ratchet compares.

use serde::{Deserialize, Serialize};

use crate::tech::{Domain, LteStatus, RadioTechnology, RegistrationState, ServiceType, Transport};

// ─── Cell Identity ──────────────────────────────────────────────────────────

/// Operator names broadcast by the serving cell (1.2+ payloads).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorNames {
    pub alpha_long: Option<String>,
    pub alpha_short: Option<String>,
}

/// Identity of the serving cell.
///
/// MCC and MNC are `None` unless the modem reported a well-formed code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CellIdentity {
    Gsm {
        mcc: Option<String>,
        mnc: Option<String>,
        lac: i32,
        cid: i32,
        arfcn: i32,
        bsic: u8,
        operator: OperatorNames,
    },
    Wcdma {
        mcc: Option<String>,
        mnc: Option<String>,
        lac: i32,
        cid: i32,
        psc: i32,
        uarfcn: i32,
        operator: OperatorNames,
    },
    Tdscdma {
        mcc: Option<String>,
        mnc: Option<String>,
        lac: i32,
        cid: i32,
        cpid: i32,
        operator: OperatorNames,
    },
    Lte {
        mcc: Option<String>,
        mnc: Option<String>,
        ci: i32,
        pci: i32,
        tac: i32,
        earfcn: i32,
        bandwidth_khz: Option<u32>,
        operator: OperatorNames,
    },
    Nr {
        mcc: Option<String>,
        mnc: Option<String>,
        nci: i64,
        pci: i32,
        tac: i32,
        nrarfcn: i32,
        operator: OperatorNames,
    },
    Cdma {
        network_id: i32,
        system_id: i32,
        base_station_id: i32,
        longitude: i32,
        latitude: i32,
        operator: OperatorNames,
    },
}

impl CellIdentity {
    pub fn mcc(&self) -> Option<&str> {
        match self {
            CellIdentity::Gsm { mcc, .. }
            | CellIdentity::Wcdma { mcc, .. }
            | CellIdentity::Tdscdma { mcc, .. }
            | CellIdentity::Lte { mcc, .. }
            | CellIdentity::Nr { mcc, .. } => mcc.as_deref(),
            CellIdentity::Cdma { .. } => None,
        }
    }

    pub fn mnc(&self) -> Option<&str> {
        match self {
            CellIdentity::Gsm { mnc, .. }
            | CellIdentity::Wcdma { mnc, .. }
            | CellIdentity::Tdscdma { mnc, .. }
            | CellIdentity::Lte { mnc, .. }
            | CellIdentity::Nr { mnc, .. } => mnc.as_deref(),
            CellIdentity::Cdma { .. } => None,
        }
    }

    pub fn operator(&self) -> &OperatorNames {
        match self {
            CellIdentity::Gsm { operator, .. }
            | CellIdentity::Wcdma { operator, .. }
            | CellIdentity::Tdscdma { operator, .. }
            | CellIdentity::Lte { operator, .. }
            | CellIdentity::Nr { operator, .. }
            | CellIdentity::Cdma { operator, .. } => operator,
        }
    }

    pub fn is_cdma(&self) -> bool {
        matches!(self, CellIdentity::Cdma { .. })
    }

    /// MCC+MNC of a 3GPP cell, or `None` for CDMA cells and cells with an
    /// incomplete code.
    pub fn plmn(&self) -> Option<String> {
        if self.is_cdma() {
            return None;
        }
        match (self.mcc(), self.mnc()) {
            (Some(mcc), Some(mnc)) if !mcc.is_empty() && !mnc.is_empty() => {
                Some(format!("{mcc}{mnc}"))
            }
            _ => None,
        }
    }
}

// ─── Domain Extensions ──────────────────────────────────────────────────────

/// CDMA2000 fields of a circuit-switched registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSpecificInfo {
    pub css_supported: bool,
    pub roaming_indicator: i32,
    pub system_is_in_prl: i32,
    pub default_roaming_indicator: i32,
}

/// LTE voice-over-PS capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LteVopsSupport {
    pub vops: LteStatus,
    pub emergency_bearer: LteStatus,
}

impl LteVopsSupport {
    pub const NOT_AVAILABLE: LteVopsSupport = LteVopsSupport {
        vops: LteStatus::NotAvailable,
        emergency_bearer: LteStatus::NotAvailable,
    };

    pub fn from_flags(vops_supported: bool, emc_bearer_supported: bool) -> Self {
        LteVopsSupport {
            vops: vops_supported.into(),
            emergency_bearer: emc_bearer_supported.into(),
        }
    }
}

/// Packet-switched registration fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSpecificInfo {
    pub max_data_calls: i32,
    pub is_dc_nr_restricted: bool,
    pub is_nr_available: bool,
    pub is_endc_available: bool,
    pub lte_vops_support: LteVopsSupport,
}

/// Domain-specific part of a record. The variant *is* the record's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "lowercase")]
pub enum DomainInfo {
    Cs(VoiceSpecificInfo),
    Ps(DataSpecificInfo),
}

impl DomainInfo {
    pub fn domain(&self) -> Domain {
        match self {
            DomainInfo::Cs(_) => Domain::Cs,
            DomainInfo::Ps(_) => Domain::Ps,
        }
    }
}

// ─── Registration Record ────────────────────────────────────────────────────

/// Fields common to every domain, produced by one shared conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub state: RegistrationState,
    pub technology: RadioTechnology,
    pub reject_cause: i32,
    pub emergency_only: bool,
    pub available_services: Vec<ServiceType>,
    pub cell_identity: Option<CellIdentity>,
    pub registered_plmn: String,
    pub carrier_aggregation: bool,
}

/// Canonical registration record for one domain over WWAN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    transport: Transport,
    #[serde(flatten)]
    registration: Registration,
    extension: DomainInfo,
}

impl RegistrationRecord {
    pub fn new(registration: Registration, extension: DomainInfo) -> Self {
        Self {
            transport: Transport::Wwan,
            registration,
            extension,
        }
    }

    pub fn domain(&self) -> Domain {
        self.extension.domain()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.registration.state
    }

    pub fn technology(&self) -> RadioTechnology {
        self.registration.technology
    }

    pub fn reject_cause(&self) -> i32 {
        self.registration.reject_cause
    }

    pub fn is_emergency_only(&self) -> bool {
        self.registration.emergency_only
    }

    pub fn available_services(&self) -> &[ServiceType] {
        &self.registration.available_services
    }

    pub fn cell_identity(&self) -> Option<&CellIdentity> {
        self.registration.cell_identity.as_ref()
    }

    pub fn registered_plmn(&self) -> &str {
        &self.registration.registered_plmn
    }

    pub fn is_using_carrier_aggregation(&self) -> bool {
        self.registration.carrier_aggregation
    }

    pub fn extension(&self) -> &DomainInfo {
        &self.extension
    }

    pub fn voice_info(&self) -> Option<&VoiceSpecificInfo> {
        match &self.extension {
            DomainInfo::Cs(info) => Some(info),
            DomainInfo::Ps(_) => None,
        }
    }

    pub fn data_info(&self) -> Option<&DataSpecificInfo> {
        match &self.extension {
            DomainInfo::Ps(info) => Some(info),
            DomainInfo::Cs(_) => None,
        }
    }

    pub(crate) fn set_technology(&mut self, technology: RadioTechnology) {
        self.registration.technology = technology;
    }

    pub(crate) fn set_carrier_aggregation(&mut self, on: bool) {
        self.registration.carrier_aggregation = on;
    }
}

// ─── Service State ──────────────────────────────────────────────────────────

/// Snapshot of a slot's WWAN registration as published by the state model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceState {
    pub voice: RegistrationRecord,
    pub data: RegistrationRecord,
    /// Per serving cell channel bandwidths in kHz.
    #[serde(default)]
    pub cell_bandwidths: Vec<u32>,
}

impl ServiceState {
    pub fn record(&self, domain: Domain) -> &RegistrationRecord {
        match domain {
            Domain::Cs => &self.voice,
            Domain::Ps => &self.data,
        }
    }

    pub(crate) fn record_mut(&mut self, domain: Domain) -> &mut RegistrationRecord {
        match domain {
            Domain::Cs => &mut self.voice,
            Domain::Ps => &mut self.data,
        }
    }

    /// Carrier aggregation as seen by the data registration.
    pub fn is_using_carrier_aggregation(&self) -> bool {
        self.data.is_using_carrier_aggregation()
    }

    pub fn aggregate_bandwidth_khz(&self) -> u64 {
        self.cell_bandwidths.iter().map(|&bw| u64::from(bw)).sum()
    }
}
