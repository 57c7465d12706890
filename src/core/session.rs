// resolution session
//
// Validation results are cached per session, not globally: two sessions over
// the same registry never see each other's state.
use std::collections::HashSet;

use log::debug;

use crate::core::connection::Connection;
use crate::core::error::ResolveError;
use crate::core::matcher::ResolvedMapping;
use crate::core::registry::{Registry, VariationRef};
use crate::core::types::{FeatureId, GroupId, GroupKind, VDeviceId};

fn kind_label(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Scenario => "scenario",
        GroupKind::Setup => "setup",
    }
}

pub struct Session<'a> {
    pub registry: &'a Registry,
    validated_features: HashSet<FeatureId>,
    validated_groups: HashSet<GroupId>,
}

impl<'a> Session<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            validated_features: HashSet::new(),
            validated_groups: HashSet::new(),
        }
    }

    /// Validates a feature's role inheritance once; later calls for the same
    /// feature are free.
    pub fn ensure_feature_valid(&mut self, feature: FeatureId) -> Result<(), ResolveError> {
        if self.validated_features.contains(&feature) {
            return Ok(());
        }
        self.registry.validate_vdevice_inheritance(feature)?;
        self.validated_features.insert(feature);
        Ok(())
    }

    /// Validates a group's device inheritance and its activated role
    /// mappings once.
    pub fn ensure_group_valid(&mut self, group: GroupId) -> Result<(), ResolveError> {
        if self.validated_groups.contains(&group) {
            return Ok(());
        }
        self.registry.validate_group_inheritance(group)?;
        self.registry.check_vdevice_feature_existence(group)?;
        self.validated_groups.insert(group);
        Ok(())
    }

    /// Validates both groups and every feature their devices instantiate,
    /// then enumerates the possible mappings of the scenario onto the setup.
    /// The arguments have to be a scenario and a setup, in that order.
    pub fn resolve(
        &mut self,
        scenario: GroupId,
        setup: GroupId,
    ) -> Result<Vec<ResolvedMapping>, ResolveError> {
        for (group, expected) in [(scenario, GroupKind::Scenario), (setup, GroupKind::Setup)] {
            let found = self.registry.groups[group as usize].kind;
            if found != expected {
                return Err(ResolveError::GroupMisuse {
                    group: self.registry.group_name(group).to_string(),
                    expected: kind_label(expected).to_string(),
                    found: kind_label(found).to_string(),
                });
            }
        }
        self.ensure_group_valid(scenario)?;
        self.ensure_group_valid(setup)?;
        for group in [scenario, setup] {
            for device in self.registry.abs_devices(group) {
                let features: Vec<FeatureId> = self.registry.devices[device as usize]
                    .features
                    .values()
                    .map(|instance| instance.feature)
                    .collect();
                for feature in features {
                    self.ensure_feature_valid(feature)?;
                }
            }
        }

        let mappings = self.registry.enumerate_mappings(scenario, setup)?;
        debug!(
            "`{}` on `{}`: {} mapping(s)",
            self.registry.group_name(scenario),
            self.registry.group_name(setup),
            mappings.len()
        );
        Ok(mappings)
    }

    /// Resolves a method variation after making sure the owning feature's
    /// declarations are sound.
    pub fn method_variation(
        &mut self,
        feature: FeatureId,
        method: &str,
        vdevice: VDeviceId,
        with_connection: &Connection,
    ) -> Result<Option<VariationRef>, ResolveError> {
        self.ensure_feature_valid(feature)?;
        self.registry
            .method_variation(feature, method, vdevice, with_connection, false)
    }
}
