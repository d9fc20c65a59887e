//! # Raw Registration Payloads
//!
//! Wire shapes of the radio HAL's registration results, one struct per
//! schema revision. [`RawRegistrationResult`] is the tagged union the radio
//! channel delivers; the normalizer turns it into a
//! [`RegistrationRecord`](crate::record::RegistrationRecord).
//!
//! | Revision | Voice                | Data                 |
//! |----------|----------------------|----------------------|
//! | 1.0      | `VoiceRegStateV1_0`  | `DataRegStateV1_0`   |
//! | 1.2      | `VoiceRegStateV1_2`  | `DataRegStateV1_2`   |
//! | 1.4      | (voice 1.2)          | `DataRegStateV1_4`   |
//! | 1.5      | `RegStateResultV1_5` | `RegStateResultV1_5` |
//!
//! Integer fields keep the HAL's signed encoding; interpretation happens in
//! the normalizer.

use serde::{Deserialize, Serialize};

// ─── Cell Identity ──────────────────────────────────────────────────────────

/// Cell identity as reported by the 1.0 HAL. MCC/MNC arrive as strings and
/// may be empty when the modem does not know them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HalCellIdentity {
    Gsm {
        mcc: String,
        mnc: String,
        lac: i32,
        cid: i32,
        arfcn: i32,
        bsic: u8,
    },
    Wcdma {
        mcc: String,
        mnc: String,
        lac: i32,
        cid: i32,
        psc: i32,
        uarfcn: i32,
    },
    Tdscdma {
        mcc: String,
        mnc: String,
        lac: i32,
        cid: i32,
        cpid: i32,
    },
    Lte {
        mcc: String,
        mnc: String,
        ci: i32,
        pci: i32,
        tac: i32,
        earfcn: i32,
    },
    Nr {
        mcc: String,
        mnc: String,
        nci: i64,
        pci: i32,
        tac: i32,
        nrarfcn: i32,
    },
    Cdma {
        network_id: i32,
        system_id: i32,
        base_station_id: i32,
        longitude: i32,
        latitude: i32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalOperatorNames {
    pub alpha_long: String,
    pub alpha_short: String,
}

/// 1.2 cell identity: adds operator names and, for LTE cells, the channel
/// bandwidth in kHz (0 when unknown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalCellIdentityV1_2 {
    pub cell: HalCellIdentity,
    #[serde(default)]
    pub operator_names: HalOperatorNames,
    #[serde(default)]
    pub bandwidth_khz: i32,
}

// ─── 1.0 / 1.2 ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRegStateV1_0 {
    pub reg_state: i32,
    pub rat: i32,
    pub css_supported: bool,
    pub roaming_indicator: i32,
    pub system_is_in_prl: i32,
    pub default_roaming_indicator: i32,
    pub reason_for_denial: i32,
    pub cell_identity: Option<HalCellIdentity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceRegStateV1_2 {
    pub reg_state: i32,
    pub rat: i32,
    pub css_supported: bool,
    pub roaming_indicator: i32,
    pub system_is_in_prl: i32,
    pub default_roaming_indicator: i32,
    pub reason_for_denial: i32,
    pub cell_identity: Option<HalCellIdentityV1_2>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRegStateV1_0 {
    pub reg_state: i32,
    pub rat: i32,
    pub reason_data_denied: i32,
    pub max_data_calls: i32,
    pub cell_identity: Option<HalCellIdentity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRegStateV1_2 {
    pub reg_state: i32,
    pub rat: i32,
    pub reason_data_denied: i32,
    pub max_data_calls: i32,
    pub cell_identity: Option<HalCellIdentityV1_2>,
}

// ─── 1.4 ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LteVopsInfo {
    pub is_vops_supported: bool,
    pub is_emc_bearer_supported: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NrIndicators {
    pub is_endc_available: bool,
    pub is_dc_nr_restricted: bool,
    pub is_nr_available: bool,
}

/// VoPS union carried by 1.4 data results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VopsInfo {
    #[default]
    NoInit,
    LteVopsInfo(LteVopsInfo),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRegStateV1_4 {
    pub base: DataRegStateV1_2,
    #[serde(default)]
    pub vops_info: VopsInfo,
    #[serde(default)]
    pub nr_indicators: NrIndicators,
}

// ─── 1.5 ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cdma2000RegistrationInfo {
    pub css_supported: bool,
    pub roaming_indicator: i32,
    pub system_is_in_prl: i32,
    pub default_roaming_indicator: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EutranRegistrationInfo {
    pub lte_vops_info: LteVopsInfo,
    pub nr_indicators: NrIndicators,
}

/// Access-technology-specific union of the unified 1.5 result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTechnologySpecificInfo {
    #[default]
    NoInit,
    CdmaInfo(Cdma2000RegistrationInfo),
    EutranInfo(EutranRegistrationInfo),
}

/// Unified registration result, shared by the voice and data requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegStateResultV1_5 {
    pub reg_state: i32,
    pub rat: i32,
    pub reason_for_denial: i32,
    pub cell_identity: Option<HalCellIdentityV1_2>,
    #[serde(default)]
    pub registered_plmn: String,
    #[serde(default)]
    pub access_technology_specific_info: AccessTechnologySpecificInfo,
}

// ─── Tagged Union ───────────────────────────────────────────────────────────

/// A registration result of any schema revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum RawRegistrationResult {
    #[serde(rename = "1.5")]
    RegStateV1_5(RegStateResultV1_5),
    #[serde(rename = "voice-1.0")]
    VoiceV1_0(VoiceRegStateV1_0),
    #[serde(rename = "voice-1.2")]
    VoiceV1_2(VoiceRegStateV1_2),
    #[serde(rename = "data-1.0")]
    DataV1_0(DataRegStateV1_0),
    #[serde(rename = "data-1.2")]
    DataV1_2(DataRegStateV1_2),
    #[serde(rename = "data-1.4")]
    DataV1_4(DataRegStateV1_4),
}

impl RawRegistrationResult {
    /// Short name of the payload shape, for logs and errors.
    pub fn shape(&self) -> &'static str {
        match self {
            RawRegistrationResult::RegStateV1_5(_) => "RegStateResult 1.5",
            RawRegistrationResult::VoiceV1_0(_) => "VoiceRegStateResult 1.0",
            RawRegistrationResult::VoiceV1_2(_) => "VoiceRegStateResult 1.2",
            RawRegistrationResult::DataV1_0(_) => "DataRegStateResult 1.0",
            RawRegistrationResult::DataV1_2(_) => "DataRegStateResult 1.2",
            RawRegistrationResult::DataV1_4(_) => "DataRegStateResult 1.4",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_tagged_json() {
        let json = r#"{
            "version": "1.5",
            "reg_state": 1,
            "rat": 14,
            "reason_for_denial": 0,
            "cell_identity": null,
            "registered_plmn": "310260",
            "access_technology_specific_info": {
                "eutran_info": {
                    "lte_vops_info": { "is_vops_supported": true },
                    "nr_indicators": { "is_nr_available": true }
                }
            }
        }"#;
        let raw: RawRegistrationResult = serde_json::from_str(json).unwrap();
        let RawRegistrationResult::RegStateV1_5(result) = raw else {
            panic!("expected 1.5 payload");
        };
        assert_eq!(result.registered_plmn, "310260");
        let AccessTechnologySpecificInfo::EutranInfo(info) = result.access_technology_specific_info
        else {
            panic!("expected eutran info");
        };
        assert!(info.lte_vops_info.is_vops_supported);
        assert!(!info.lte_vops_info.is_emc_bearer_supported);
        assert!(info.nr_indicators.is_nr_available);
    }

    #[test]
    fn unknown_version_tag_is_rejected() {
        let json = r#"{ "version": "0.9", "reg_state": 1 }"#;
        assert!(serde_json::from_str::<RawRegistrationResult>(json).is_err());
    }

    #[test]
    fn shape_names_are_distinct() {
        let data = RawRegistrationResult::DataV1_0(DataRegStateV1_0 {
            reg_state: 1,
            rat: 3,
            reason_data_denied: 0,
            max_data_calls: 4,
            cell_identity: None,
        });
        assert_eq!(data.shape(), "DataRegStateResult 1.0");
    }
}
