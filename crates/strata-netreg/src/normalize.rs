//! # Registration Normalizer
//!
//! Converts a [`RawRegistrationResult`] of any HAL revision into a
//! [`RegistrationRecord`].
//!
//! The unified 1.5 result is matched first and serves either domain. Older
//! revisions are domain specific: a voice payload answers only a CS request
//! and a data payload only a PS request. Anything else is rejected with
//! [`NetRegError::NormalizationFailed`].
//!
//! Registration state, emergency-only, available services and PLMN are
//! derived the same way for every revision.

use tracing::debug;

use crate::error::NetRegError;
use crate::raw::{
    AccessTechnologySpecificInfo, HalCellIdentity, HalCellIdentityV1_2, HalOperatorNames,
    LteVopsInfo, RawRegistrationResult, RegStateResultV1_5, VopsInfo,
};
use crate::record::{
    CellIdentity, DataSpecificInfo, DomainInfo, LteVopsSupport, OperatorNames, Registration,
    RegistrationRecord, VoiceSpecificInfo,
};
use crate::tech::{
    AccessNetwork, Domain, RadioTechnology, RegistrationState, ServiceType, hal_reg_state,
};

/// 3GPP TS 24.008 §6.1.3.0 / §10.5.6.2: at most 16 PDP contexts.
pub const MAX_DATA_CALLS: i32 = 16;

// ─── Shared Derivations ─────────────────────────────────────────────────────

pub fn registration_state_from_hal(code: i32) -> RegistrationState {
    match code {
        hal_reg_state::NOT_REG_MT_NOT_SEARCHING_OP
        | hal_reg_state::NOT_REG_MT_NOT_SEARCHING_OP_EM => {
            RegistrationState::NotRegisteredNotSearching
        }
        hal_reg_state::REG_HOME => RegistrationState::Home,
        hal_reg_state::NOT_REG_MT_SEARCHING_OP | hal_reg_state::NOT_REG_MT_SEARCHING_OP_EM => {
            RegistrationState::NotRegisteredSearching
        }
        hal_reg_state::REG_DENIED | hal_reg_state::REG_DENIED_EM => RegistrationState::Denied,
        hal_reg_state::UNKNOWN | hal_reg_state::UNKNOWN_EM => RegistrationState::Unknown,
        hal_reg_state::REG_ROAMING => RegistrationState::Roaming,
        _ => RegistrationState::NotRegisteredNotSearching,
    }
}

/// Whether the HAL state code means "emergency calls only".
pub fn is_emergency_only(code: i32) -> bool {
    matches!(
        code,
        hal_reg_state::NOT_REG_MT_NOT_SEARCHING_OP_EM
            | hal_reg_state::NOT_REG_MT_SEARCHING_OP_EM
            | hal_reg_state::REG_DENIED_EM
            | hal_reg_state::UNKNOWN_EM
    )
}

pub fn available_services(
    state: RegistrationState,
    domain: Domain,
    emergency_only: bool,
) -> Vec<ServiceType> {
    if emergency_only {
        return vec![ServiceType::Emergency];
    }
    if !state.is_in_service() {
        return Vec::new();
    }
    match domain {
        Domain::Ps => vec![ServiceType::Data],
        Domain::Cs => vec![ServiceType::Voice, ServiceType::Sms, ServiceType::Video],
    }
}

/// Registered PLMN derived from the serving cell, or empty.
pub fn plmn_from_cell_identity(cell: Option<&CellIdentity>) -> String {
    cell.and_then(CellIdentity::plmn).unwrap_or_default()
}

fn registration(
    domain: Domain,
    reg_state: i32,
    rat: i32,
    reject_cause: i32,
    cell_identity: Option<CellIdentity>,
) -> Registration {
    let state = registration_state_from_hal(reg_state);
    let emergency_only = is_emergency_only(reg_state);
    let registered_plmn = plmn_from_cell_identity(cell_identity.as_ref());
    Registration {
        state,
        technology: RadioTechnology::from_ril(rat),
        reject_cause,
        emergency_only,
        available_services: available_services(state, domain, emergency_only),
        cell_identity,
        registered_plmn,
        carrier_aggregation: false,
    }
}

fn lte_vops(rat: i32, info: Option<LteVopsInfo>) -> LteVopsSupport {
    match info {
        Some(info) if RadioTechnology::from_ril(rat).access_network() == AccessNetwork::Eutran => {
            LteVopsSupport::from_flags(info.is_vops_supported, info.is_emc_bearer_supported)
        }
        _ => LteVopsSupport::NOT_AVAILABLE,
    }
}

// ─── Cell Identity ──────────────────────────────────────────────────────────

fn mcc(raw: &str) -> Option<String> {
    (raw.len() == 3 && raw.bytes().all(|b| b.is_ascii_digit())).then(|| raw.to_string())
}

fn mnc(raw: &str) -> Option<String> {
    ((2..=3).contains(&raw.len()) && raw.bytes().all(|b| b.is_ascii_digit()))
        .then(|| raw.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl From<&HalOperatorNames> for OperatorNames {
    fn from(names: &HalOperatorNames) -> Self {
        OperatorNames {
            alpha_long: non_empty(&names.alpha_long),
            alpha_short: non_empty(&names.alpha_short),
        }
    }
}

impl From<&HalCellIdentity> for CellIdentity {
    fn from(cell: &HalCellIdentity) -> Self {
        let operator = OperatorNames::default();
        match cell {
            HalCellIdentity::Gsm {
                mcc: c,
                mnc: n,
                lac,
                cid,
                arfcn,
                bsic,
            } => CellIdentity::Gsm {
                mcc: mcc(c),
                mnc: mnc(n),
                lac: *lac,
                cid: *cid,
                arfcn: *arfcn,
                bsic: *bsic,
                operator,
            },
            HalCellIdentity::Wcdma {
                mcc: c,
                mnc: n,
                lac,
                cid,
                psc,
                uarfcn,
            } => CellIdentity::Wcdma {
                mcc: mcc(c),
                mnc: mnc(n),
                lac: *lac,
                cid: *cid,
                psc: *psc,
                uarfcn: *uarfcn,
                operator,
            },
            HalCellIdentity::Tdscdma {
                mcc: c,
                mnc: n,
                lac,
                cid,
                cpid,
            } => CellIdentity::Tdscdma {
                mcc: mcc(c),
                mnc: mnc(n),
                lac: *lac,
                cid: *cid,
                cpid: *cpid,
                operator,
            },
            HalCellIdentity::Lte {
                mcc: c,
                mnc: n,
                ci,
                pci,
                tac,
                earfcn,
            } => CellIdentity::Lte {
                mcc: mcc(c),
                mnc: mnc(n),
                ci: *ci,
                pci: *pci,
                tac: *tac,
                earfcn: *earfcn,
                bandwidth_khz: None,
                operator,
            },
            HalCellIdentity::Nr {
                mcc: c,
                mnc: n,
                nci,
                pci,
                tac,
                nrarfcn,
            } => CellIdentity::Nr {
                mcc: mcc(c),
                mnc: mnc(n),
                nci: *nci,
                pci: *pci,
                tac: *tac,
                nrarfcn: *nrarfcn,
                operator,
            },
            HalCellIdentity::Cdma {
                network_id,
                system_id,
                base_station_id,
                longitude,
                latitude,
            } => CellIdentity::Cdma {
                network_id: *network_id,
                system_id: *system_id,
                base_station_id: *base_station_id,
                longitude: *longitude,
                latitude: *latitude,
                operator,
            },
        }
    }
}

impl From<&HalCellIdentityV1_2> for CellIdentity {
    fn from(raw: &HalCellIdentityV1_2) -> Self {
        let mut cell = CellIdentity::from(&raw.cell);
        let names = OperatorNames::from(&raw.operator_names);
        match &mut cell {
            CellIdentity::Lte {
                bandwidth_khz,
                operator,
                ..
            } => {
                *bandwidth_khz = u32::try_from(raw.bandwidth_khz).ok().filter(|&bw| bw > 0);
                *operator = names;
            }
            CellIdentity::Gsm { operator, .. }
            | CellIdentity::Wcdma { operator, .. }
            | CellIdentity::Tdscdma { operator, .. }
            | CellIdentity::Nr { operator, .. }
            | CellIdentity::Cdma { operator, .. } => *operator = names,
        }
        cell
    }
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// Normalizes `raw` as the answer to a `domain` request.
pub fn normalize(
    raw: &RawRegistrationResult,
    domain: Domain,
) -> Result<RegistrationRecord, NetRegError> {
    let record = match (raw, domain) {
        (RawRegistrationResult::RegStateV1_5(result), _) => from_unified(result, domain),

        (RawRegistrationResult::VoiceV1_0(voice), Domain::Cs) => RegistrationRecord::new(
            registration(
                domain,
                voice.reg_state,
                voice.rat,
                voice.reason_for_denial,
                voice.cell_identity.as_ref().map(CellIdentity::from),
            ),
            DomainInfo::Cs(VoiceSpecificInfo {
                css_supported: voice.css_supported,
                roaming_indicator: voice.roaming_indicator,
                system_is_in_prl: voice.system_is_in_prl,
                default_roaming_indicator: voice.default_roaming_indicator,
            }),
        ),
        (RawRegistrationResult::VoiceV1_2(voice), Domain::Cs) => RegistrationRecord::new(
            registration(
                domain,
                voice.reg_state,
                voice.rat,
                voice.reason_for_denial,
                voice.cell_identity.as_ref().map(CellIdentity::from),
            ),
            DomainInfo::Cs(VoiceSpecificInfo {
                css_supported: voice.css_supported,
                roaming_indicator: voice.roaming_indicator,
                system_is_in_prl: voice.system_is_in_prl,
                default_roaming_indicator: voice.default_roaming_indicator,
            }),
        ),

        (RawRegistrationResult::DataV1_0(data), Domain::Ps) => RegistrationRecord::new(
            registration(
                domain,
                data.reg_state,
                data.rat,
                data.reason_data_denied,
                data.cell_identity.as_ref().map(CellIdentity::from),
            ),
            DomainInfo::Ps(DataSpecificInfo {
                max_data_calls: data.max_data_calls,
                lte_vops_support: LteVopsSupport::NOT_AVAILABLE,
                ..Default::default()
            }),
        ),
        (RawRegistrationResult::DataV1_2(data), Domain::Ps) => RegistrationRecord::new(
            registration(
                domain,
                data.reg_state,
                data.rat,
                data.reason_data_denied,
                data.cell_identity.as_ref().map(CellIdentity::from),
            ),
            DomainInfo::Ps(DataSpecificInfo {
                max_data_calls: data.max_data_calls,
                lte_vops_support: LteVopsSupport::NOT_AVAILABLE,
                ..Default::default()
            }),
        ),
        (RawRegistrationResult::DataV1_4(data), Domain::Ps) => {
            let base = &data.base;
            let vops = match data.vops_info {
                VopsInfo::LteVopsInfo(info) => Some(info),
                VopsInfo::NoInit => None,
            };
            RegistrationRecord::new(
                registration(
                    domain,
                    base.reg_state,
                    base.rat,
                    base.reason_data_denied,
                    base.cell_identity.as_ref().map(CellIdentity::from),
                ),
                DomainInfo::Ps(DataSpecificInfo {
                    max_data_calls: base.max_data_calls,
                    is_dc_nr_restricted: data.nr_indicators.is_dc_nr_restricted,
                    is_nr_available: data.nr_indicators.is_nr_available,
                    is_endc_available: data.nr_indicators.is_endc_available,
                    lte_vops_support: lte_vops(base.rat, vops),
                }),
            )
        }

        (
            RawRegistrationResult::VoiceV1_0(_)
            | RawRegistrationResult::VoiceV1_2(_)
            | RawRegistrationResult::DataV1_0(_)
            | RawRegistrationResult::DataV1_2(_)
            | RawRegistrationResult::DataV1_4(_),
            _,
        ) => {
            return Err(NetRegError::NormalizationFailed {
                domain,
                shape: raw.shape(),
            });
        }
    };

    debug!(
        %domain,
        shape = raw.shape(),
        state = ?record.registration_state(),
        technology = %record.technology(),
        "registration normalized"
    );
    Ok(record)
}

fn from_unified(result: &RegStateResultV1_5, domain: Domain) -> RegistrationRecord {
    let cell_identity = result.cell_identity.as_ref().map(CellIdentity::from);
    let mut registration = registration(
        domain,
        result.reg_state,
        result.rat,
        result.reason_for_denial,
        cell_identity,
    );
    if !result.registered_plmn.is_empty() {
        registration.registered_plmn = result.registered_plmn.clone();
    }

    // 1.5 reports carrier aggregation through the flag, never the RAT.
    if registration.technology == RadioTechnology::LteCa {
        registration.technology = RadioTechnology::Lte;
        registration.carrier_aggregation = true;
    }

    let extension = match domain {
        Domain::Cs => {
            let cdma = match result.access_technology_specific_info {
                AccessTechnologySpecificInfo::CdmaInfo(info) => info,
                _ => Default::default(),
            };
            DomainInfo::Cs(VoiceSpecificInfo {
                css_supported: cdma.css_supported,
                roaming_indicator: cdma.roaming_indicator,
                system_is_in_prl: cdma.system_is_in_prl,
                default_roaming_indicator: cdma.default_roaming_indicator,
            })
        }
        Domain::Ps => {
            let mut info = DataSpecificInfo {
                max_data_calls: MAX_DATA_CALLS,
                lte_vops_support: LteVopsSupport::NOT_AVAILABLE,
                ..Default::default()
            };
            if let AccessTechnologySpecificInfo::EutranInfo(eutran) =
                result.access_technology_specific_info
            {
                info.is_dc_nr_restricted = eutran.nr_indicators.is_dc_nr_restricted;
                info.is_nr_available = eutran.nr_indicators.is_nr_available;
                info.is_endc_available = eutran.nr_indicators.is_endc_available;
                info.lte_vops_support = lte_vops(result.rat, Some(eutran.lte_vops_info));
            } else {
                debug!("no EUTRAN info in 1.5 registration result");
            }
            DomainInfo::Ps(info)
        }
    };

    RegistrationRecord::new(registration, extension)
}
