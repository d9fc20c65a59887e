//! # RAT Ratchet
//!
//! Keeps the published technology and cell bandwidth from bouncing down
//! while the device stays put. Within one RAT family (for example the HSPA
//! variants) the technology only moves up; a lower-ranked report is replaced
//! by the previous, higher one.
//!
//! A location change disarms both the voice and data latches and publishes
//! the new state as-is. A latch re-arms once the technology changes again
//! inside the new location.

use std::sync::Arc;

use tracing::debug;

use crate::family::{RatFamilies, RatFamilyTable};
use crate::record::{RegistrationRecord, ServiceState};
use crate::tech::{Domain, RadioTechnology};

/// What a ratchet call did to the new state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RatchetOutcome {
    /// Old and new data technologies were in the same family.
    pub same_family: bool,
    pub bandwidths_updated: bool,
    pub voice_held: bool,
    pub data_held: bool,
}

/// Per-slot ratchet engine.
pub struct RatRatchet {
    families: Arc<RatFamilies>,
    voice_enabled: bool,
    data_enabled: bool,
}

impl RatRatchet {
    pub fn new(families: Arc<RatFamilies>) -> Self {
        Self {
            families,
            voice_enabled: true,
            data_enabled: true,
        }
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn data_enabled(&self) -> bool {
        self.data_enabled
    }

    pub fn is_enabled(&self, domain: Domain) -> bool {
        match domain {
            Domain::Cs => self.voice_enabled,
            Domain::Ps => self.data_enabled,
        }
    }

    /// Replaces `state`'s bandwidths with `bandwidths` iff their sum is
    /// strictly larger. Returns whether the state changed.
    pub fn update_bandwidths(bandwidths: &[u32], state: &mut ServiceState) -> bool {
        let candidate: u64 = bandwidths.iter().map(|&bw| u64::from(bw)).sum();
        if candidate > state.aggregate_bandwidth_khz() {
            state.cell_bandwidths = bandwidths.to_vec();
            return true;
        }
        false
    }

    /// Ratchets `new` against `old` if their data technologies share a family.
    pub fn ratchet(
        &mut self,
        old: &ServiceState,
        new: &mut ServiceState,
        location_changed: bool,
    ) -> RatchetOutcome {
        let mut outcome = RatchetOutcome::default();

        if location_changed {
            self.voice_enabled = false;
            self.data_enabled = false;
            debug!("location changed, RAT ratchet disarmed");
            return outcome;
        }

        let table = self.families.load();
        if !is_same_rat_family(&table, old, new) {
            return outcome;
        }
        outcome.same_family = true;

        outcome.bandwidths_updated = Self::update_bandwidths(&old.cell_bandwidths, new);
        outcome.voice_held = ratchet_domain(
            &table,
            &mut self.voice_enabled,
            old.record(Domain::Cs),
            new.record_mut(Domain::Cs),
        );
        outcome.data_held = ratchet_domain(
            &table,
            &mut self.data_enabled,
            old.record(Domain::Ps),
            new.record_mut(Domain::Ps),
        );

        if outcome.voice_held || outcome.data_held || outcome.bandwidths_updated {
            debug!(
                voice = %new.voice.technology(),
                data = %new.data.technology(),
                ?outcome,
                "ratcheted service state"
            );
        }
        outcome
    }
}

/// Data technology, with LTE + carrier aggregation promoted to LTE-CA.
fn data_rat(state: &ServiceState) -> RadioTechnology {
    match state.data.technology() {
        RadioTechnology::Lte if state.is_using_carrier_aggregation() => RadioTechnology::LteCa,
        rat => rat,
    }
}

fn is_same_rat_family(table: &RatFamilyTable, a: &ServiceState, b: &ServiceState) -> bool {
    let (rat_a, rat_b) = (data_rat(a), data_rat(b));
    rat_a == rat_b || table.same_family(rat_a, rat_b)
}

/// Higher ranked of the two when they share a family, otherwise `new`.
fn ratchet_rat(
    table: &RatFamilyTable,
    old: RadioTechnology,
    new: RadioTechnology,
) -> RadioTechnology {
    let Some(family) = table.family_of(old) else {
        return new;
    };
    if !table.same_family(old, new) {
        return new;
    }
    if table.rank(family, old) > table.rank(family, new) {
        old
    } else {
        new
    }
}

fn ratchet_domain(
    table: &RatFamilyTable,
    enabled: &mut bool,
    old: &RegistrationRecord,
    new: &mut RegistrationRecord,
) -> bool {
    if !*enabled {
        if old.technology() != new.technology() {
            *enabled = true;
        }
        return false;
    }

    if old.is_using_carrier_aggregation() {
        new.set_carrier_aggregation(true);
    }
    let rat = ratchet_rat(table, old.technology(), new.technology());
    if rat == new.technology() {
        return false;
    }
    new.set_technology(rat);
    true
}
