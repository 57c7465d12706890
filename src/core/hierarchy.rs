// group inheritance validation
//
// Scenarios and setups may derive from each other. A child that redeclares
// any device has to redeclare all of them, every redeclaration has to
// descend from the same-named parent device, and a name may not be reused
// for an unrelated device (nor a descendant renamed).
use crate::core::error::ResolveError;
use crate::core::registry::Registry;
use crate::core::types::{DeviceId, GroupId};

impl Registry {
    /// The devices effective for a group: its own, or - if it declares
    /// none - the first declaration found walking up the parent chain.
    pub fn abs_devices(&self, group: GroupId) -> Vec<DeviceId> {
        let decl = &self.groups[group as usize];
        if !decl.devices.is_empty() {
            return decl.devices.clone();
        }
        match decl.parent {
            Some(parent) => self.abs_devices(parent),
            None => Vec::new(),
        }
    }

    /// Validates the device declarations along a group's inheritance chain
    /// (all-or-nothing overriding, name/lineage agreement, full coverage of
    /// the parent's devices).
    pub fn validate_group_inheritance(&self, group: GroupId) -> Result<(), ResolveError> {
        let decl = &self.groups[group as usize];
        let Some(parent) = decl.parent else {
            return Ok(());
        };
        self.validate_group_inheritance(parent)?;

        if decl.devices.is_empty() {
            // nothing redeclared, parent devices are effective as-is
            return Ok(());
        }

        let parent_devices = self.abs_devices(parent);
        for &local in &decl.devices {
            let local_name = self.device_name(local);
            let by_name = parent_devices
                .iter()
                .copied()
                .find(|&p| self.device_name(p) == local_name);
            let by_lineage = parent_devices
                .iter()
                .copied()
                .find(|&p| self.device_within(local, p));

            match (by_name, by_lineage) {
                // fresh device, no relation to the parent level
                (None, None) => {}
                // proper override: same name, proper descent
                (Some(a), Some(b)) if a == b => {}
                // name reused for a device of foreign (or no) lineage
                (Some(p), _) => {
                    return Err(ResolveError::WrongLineage {
                        child_member: self.device_qname(local),
                        parent_member: self.device_qname(p),
                    });
                }
                // descends from a parent device but dropped its name
                (None, Some(p)) => {
                    return Err(ResolveError::WrongName {
                        child_member: self.device_qname(local),
                        parent_member: self.device_qname(p),
                    });
                }
            }
        }

        // coverage: every parent device has to survive into the child level
        for &p in &parent_devices {
            let covered = decl.devices.iter().any(|&local| {
                self.device_name(local) == self.device_name(p) && self.device_within(local, p)
            });
            if !covered {
                return Err(ResolveError::MissingOverride {
                    child: decl.name.clone(),
                    parent: self.group_name(parent).to_string(),
                    parent_member: self.device_qname(p),
                });
            }
        }
        Ok(())
    }

    /// Checks that every activated role mapping of a group is backed up: the
    /// peer device carrying the role has to provide (a descendant of) every
    /// feature the role requires.
    pub fn check_vdevice_feature_existence(&self, group: GroupId) -> Result<(), ResolveError> {
        for &device in &self.abs_devices(group) {
            for instance in self.devices[device as usize].features.values() {
                let Some((vdevice, peer)) = instance.vdevice_binding else {
                    continue;
                };
                for &required in self.vdevices[vdevice as usize].features.values() {
                    let provided = self.devices[peer as usize]
                        .features
                        .values()
                        .any(|peer_inst| self.feature_within(peer_inst.feature, required));
                    if !provided {
                        return Err(ResolveError::MissingFeatureImplementation {
                            device: self.device_qname(peer),
                            vdevice: self.vdevice_qname(vdevice),
                            feature: self.feature_name(required).to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::GroupKind;

    // SetupBase with two devices, returned together with their ids
    fn base_setup(reg: &mut Registry) -> (GroupId, DeviceId, DeviceId) {
        let base = reg.add_group("SetupBase", GroupKind::Setup, None);
        let supply = reg.add_device(base, "Supply", None, &["p1"]);
        let board = reg.add_device(base, "Board", None, &["n1"]);
        (base, supply, board)
    }

    #[test]
    fn silent_inheritance_passes_and_keeps_the_parent_devices() {
        let mut reg = Registry::new();
        let (base, supply, board) = base_setup(&mut reg);
        let child = reg.add_group("SetupChild", GroupKind::Setup, Some(base));

        reg.validate_group_inheritance(child).unwrap();
        assert_eq!(reg.abs_devices(child), vec![supply, board]);
    }

    #[test]
    fn full_overriding_passes() {
        let mut reg = Registry::new();
        let (base, supply, board) = base_setup(&mut reg);
        let child = reg.add_group("SetupChild", GroupKind::Setup, Some(base));
        let c_supply = reg.add_device(child, "Supply", Some(supply), &["p1"]);
        let c_board = reg.add_device(child, "Board", Some(board), &["n1"]);

        reg.validate_group_inheritance(child).unwrap();
        assert_eq!(reg.abs_devices(child), vec![c_supply, c_board]);
    }

    #[test]
    fn partial_overriding_is_rejected() {
        let mut reg = Registry::new();
        let (base, supply, _board) = base_setup(&mut reg);
        let child = reg.add_group("SetupChild", GroupKind::Setup, Some(base));
        reg.add_device(child, "Supply", Some(supply), &["p1"]);

        let err = reg.validate_group_inheritance(child).unwrap_err();
        match err {
            ResolveError::MissingOverride {
                child,
                parent,
                parent_member,
            } => {
                assert_eq!(child, "SetupChild");
                assert_eq!(parent, "SetupBase");
                assert_eq!(parent_member, "SetupBase.Board");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn reusing_a_name_for_an_unrelated_device_is_rejected() {
        let mut reg = Registry::new();
        let (base, supply, board) = base_setup(&mut reg);
        let child = reg.add_group("SetupChild", GroupKind::Setup, Some(base));
        reg.add_device(child, "Supply", Some(supply), &["p1"]);
        // same name as the parent's Board, but declared without its lineage
        reg.add_device(child, "Board", None, &["n1"]);
        let _ = board;

        let err = reg.validate_group_inheritance(child).unwrap_err();
        match err {
            ResolveError::WrongLineage {
                child_member,
                parent_member,
            } => {
                assert_eq!(child_member, "SetupChild.Board");
                assert_eq!(parent_member, "SetupBase.Board");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn renaming_a_descendant_is_rejected() {
        let mut reg = Registry::new();
        let (base, supply, board) = base_setup(&mut reg);
        let child = reg.add_group("SetupChild", GroupKind::Setup, Some(base));
        reg.add_device(child, "Supply", Some(supply), &["p1"]);
        // descends from Board but changed the name
        reg.add_device(child, "Mainboard", Some(board), &["n1"]);

        let err = reg.validate_group_inheritance(child).unwrap_err();
        assert!(matches!(err, ResolveError::WrongName { .. }));
    }

    #[test]
    fn a_valid_three_level_chain_stays_valid_at_every_prefix() {
        let mut reg = Registry::new();
        let (base, supply, board) = base_setup(&mut reg);
        let mid = reg.add_group("SetupMid", GroupKind::Setup, Some(base));
        let m_supply = reg.add_device(mid, "Supply", Some(supply), &["p1"]);
        let m_board = reg.add_device(mid, "Board", Some(board), &["n1"]);
        let leaf = reg.add_group("SetupLeaf", GroupKind::Setup, Some(mid));
        reg.add_device(leaf, "Supply", Some(m_supply), &["p1"]);
        reg.add_device(leaf, "Board", Some(m_board), &["n1"]);
        // the leaf may also introduce a fresh device of its own
        reg.add_device(leaf, "Probe", None, &["t1"]);

        reg.validate_group_inheritance(base).unwrap();
        reg.validate_group_inheritance(mid).unwrap();
        reg.validate_group_inheritance(leaf).unwrap();
    }

    #[test]
    fn activated_role_mappings_need_backing_features_on_the_peer() {
        let mut reg = Registry::new();
        let serial_feat = reg.add_feature("SerialFeature", None);
        let term_feat = reg.add_feature("TerminalFeature", None);
        let v1 = reg.add_vdevice(term_feat, "V1", None);
        reg.add_vdevice_feature(v1, "link", serial_feat);

        let setup = reg.add_group("SetupA", GroupKind::Setup, None);
        let host = reg.add_device(setup, "Host", None, &["h1"]);
        let target = reg.add_device(setup, "Target", None, &["t1"]);
        reg.add_device_feature(host, "terminal", term_feat);
        reg.bind_vdevice(host, "terminal", v1, target);

        // the target provides nothing yet
        let err = reg.check_vdevice_feature_existence(setup).unwrap_err();
        match err {
            ResolveError::MissingFeatureImplementation {
                device,
                vdevice,
                feature,
            } => {
                assert_eq!(device, "SetupA.Target");
                assert_eq!(vdevice, "TerminalFeature.V1");
                assert_eq!(feature, "SerialFeature");
            }
            other => panic!("unexpected error: {}", other),
        }

        // a subtype of the required feature on the peer is good enough
        let usb_serial = reg.add_feature("UsbSerialFeature", Some(serial_feat));
        reg.add_device_feature(target, "serial", usb_serial);
        reg.check_vdevice_feature_existence(setup).unwrap();
    }
}
