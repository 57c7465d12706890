// serializable resolution reports
use serde::Serialize;

use crate::core::matcher::ResolvedMapping;
use crate::core::registry::Registry;
use crate::core::types::GroupId;

/// One resolved mapping, by name: scenario device to setup device, active
/// role to setup device.
#[derive(Debug, Clone, Serialize)]
pub struct MappingEntry {
    pub devices: Vec<(String, String)>,
    pub roles: Vec<(String, String)>,
}

/// The full result of resolving one scenario against one setup.
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    pub scenario: String,
    pub setup: String,
    pub mappings: Vec<MappingEntry>,
}

impl MappingReport {
    pub fn build(
        registry: &Registry,
        scenario: GroupId,
        setup: GroupId,
        mappings: &[ResolvedMapping],
    ) -> Self {
        let entries = mappings
            .iter()
            .map(|mapping| MappingEntry {
                devices: mapping
                    .devices
                    .iter()
                    .map(|(&from, &to)| (registry.device_qname(from), registry.device_qname(to)))
                    .collect(),
                roles: mapping
                    .roles
                    .iter()
                    .map(|(&role, &to)| (registry.vdevice_qname(role), registry.device_qname(to)))
                    .collect(),
            })
            .collect();
        Self {
            scenario: registry.group_name(scenario).to_string(),
            setup: registry.group_name(setup).to_string(),
            mappings: entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::Connection;
    use crate::core::metadata::ConnMetadata;
    use crate::core::session::Session;
    use crate::core::types::{Direction, GroupKind};

    #[test]
    fn report_uses_qualified_names() {
        let mut reg = Registry::new();
        let power = reg.add_kind("Power", None);
        let charger_feat = reg.add_feature("ChargerFeature", None);
        let consumer = reg.add_vdevice(charger_feat, "Consumer", None);

        let scenario = reg.add_group("ScenarioCharge", GroupKind::Scenario, None);
        let charger = reg.add_device(scenario, "Charger", None, &["p1"]);
        let load = reg.add_device(scenario, "Load", None, &["n1"]);
        reg.add_device_feature(charger, "charger", charger_feat);
        reg.bind_vdevice(charger, "charger", consumer, load);
        reg.connect(
            scenario,
            Connection::new(
                power,
                ConnMetadata::between(charger, "p1", load, "n1", Direction::Bidirectional),
            ),
        )
        .unwrap();

        let setup = reg.add_group("SetupLab", GroupKind::Setup, None);
        let psu = reg.add_device(setup, "PSU", None, &["out"]);
        let board = reg.add_device(setup, "Board", None, &["pwr"]);
        reg.add_device_feature(psu, "charger", charger_feat);
        reg.connect(
            setup,
            Connection::new(
                power,
                ConnMetadata::between(psu, "out", board, "pwr", Direction::Bidirectional),
            ),
        )
        .unwrap();

        let mut session = Session::new(&reg);
        let mappings = session.resolve(scenario, setup).unwrap();
        let report = MappingReport::build(&reg, scenario, setup, &mappings);

        assert_eq!(report.scenario, "ScenarioCharge");
        assert_eq!(report.setup, "SetupLab");
        assert_eq!(report.mappings.len(), 1);
        let entry = &report.mappings[0];
        assert!(entry
            .devices
            .contains(&("ScenarioCharge.Charger".to_string(), "SetupLab.PSU".to_string())));
        assert!(entry
            .roles
            .contains(&("ChargerFeature.Consumer".to_string(), "SetupLab.Board".to_string())));
    }
}
