// the declaration registry
//
// Everything a project declares (connection kinds, features with their inner
// roles, scenario/setup groups with their devices) is registered here through
// explicit builder calls. Lineage is a plain optional parent id stored at
// registration time - validation later is simple chain traversal, there is no
// runtime type introspection anywhere.
use indexmap::IndexMap;

use crate::core::connection::Connection;
use crate::core::error::ResolveError;
use crate::core::tree::KindTree;
use crate::core::types::{DeviceId, FeatureId, GroupId, GroupKind, KindId, VDeviceId};

/// One instantiated feature on a device, optionally with its active abstract
/// role mapped onto a peer device of the same group.
#[derive(Debug, Clone)]
pub struct FeatureInstance {
    pub feature: FeatureId,
    pub vdevice_binding: Option<(VDeviceId, DeviceId)>,
}

/// A named participant of a scenario or setup: attachment points plus the
/// features it provides.
#[derive(Debug, Clone)]
pub struct DeviceDecl {
    pub name: String,
    pub group: GroupId,
    pub parent: Option<DeviceId>,
    pub nodes: Vec<String>,
    pub features: IndexMap<String, FeatureInstance>,
}

/// An abstract role placeholder nested in a feature. `features` maps the
/// attribute name under which a required feature is instantiated to that
/// feature.
#[derive(Debug, Clone)]
pub struct VDeviceDecl {
    pub name: String,
    pub owner: FeatureId,
    pub parent: Option<VDeviceId>,
    pub features: IndexMap<String, FeatureId>,
}

/// One registered implementation of a feature method, valid for the listed
/// roles over the listed connection templates.
#[derive(Debug, Clone)]
pub struct MethodVariation {
    pub label: String,
    pub for_vdevice: IndexMap<VDeviceId, Vec<Connection>>,
}

/// Points at one method variation of one feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariationRef {
    pub feature: FeatureId,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FeatureDecl {
    pub name: String,
    pub parent: Option<FeatureId>,
    pub vdevices: Vec<VDeviceId>,
    pub class_binding: IndexMap<VDeviceId, Vec<Connection>>,
    pub methods: IndexMap<String, Vec<MethodVariation>>,
}

/// A scenario or setup container: its devices plus the connections declared
/// between them. Setup connections are absolute (concrete, already merged);
/// scenario connections are requirements.
#[derive(Debug, Clone)]
pub struct GroupDecl {
    pub name: String,
    pub kind: GroupKind,
    pub parent: Option<GroupId>,
    pub devices: Vec<DeviceId>,
    pub connections: Vec<Connection>,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub tree: KindTree,
    pub features: Vec<FeatureDecl>,
    pub vdevices: Vec<VDeviceDecl>,
    pub devices: Vec<DeviceDecl>,
    pub groups: Vec<GroupDecl>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- builder calls -------------------------------------------------

    pub fn add_kind(&mut self, name: &str, parent: Option<KindId>) -> KindId {
        self.tree.add_kind(name, parent)
    }

    pub fn add_feature(&mut self, name: &str, parent: Option<FeatureId>) -> FeatureId {
        let id = self.features.len() as FeatureId;
        self.features.push(FeatureDecl {
            name: name.to_string(),
            parent,
            ..Default::default()
        });
        id
    }

    /// Attaches the parent of a feature after the fact. A feature has at
    /// most one parent; a second registration fails fast.
    pub fn set_feature_parent(
        &mut self,
        child: FeatureId,
        parent: FeatureId,
    ) -> Result<(), ResolveError> {
        if let Some(existing) = self.features[child as usize].parent {
            return Err(ResolveError::MultipleParent {
                child: self.features[child as usize].name.clone(),
                existing: self.features[existing as usize].name.clone(),
                rejected: self.features[parent as usize].name.clone(),
            });
        }
        self.features[child as usize].parent = Some(parent);
        Ok(())
    }

    pub fn add_vdevice(
        &mut self,
        owner: FeatureId,
        name: &str,
        parent: Option<VDeviceId>,
    ) -> VDeviceId {
        let id = self.vdevices.len() as VDeviceId;
        self.vdevices.push(VDeviceDecl {
            name: name.to_string(),
            owner,
            parent,
            features: IndexMap::new(),
        });
        self.features[owner as usize].vdevices.push(id);
        id
    }

    pub fn add_vdevice_feature(&mut self, vdevice: VDeviceId, attribute: &str, feature: FeatureId) {
        self.vdevices[vdevice as usize]
            .features
            .insert(attribute.to_string(), feature);
    }

    /// Class-based binding: the connection templates under which the given
    /// role is usable with this feature at all.
    pub fn set_class_binding(
        &mut self,
        feature: FeatureId,
        vdevice: VDeviceId,
        templates: Vec<Connection>,
    ) {
        self.features[feature as usize]
            .class_binding
            .insert(vdevice, templates);
    }

    /// Method-based binding: registers (or extends) the variation `label` of
    /// `method` as valid for `vdevice` over the given connection templates.
    pub fn add_method_variation(
        &mut self,
        feature: FeatureId,
        method: &str,
        label: &str,
        vdevice: VDeviceId,
        templates: Vec<Connection>,
    ) {
        let variations = self.features[feature as usize]
            .methods
            .entry(method.to_string())
            .or_default();
        if let Some(var) = variations.iter_mut().find(|v| v.label == label) {
            var.for_vdevice.entry(vdevice).or_default().extend(templates);
        } else {
            let mut for_vdevice = IndexMap::new();
            for_vdevice.insert(vdevice, templates);
            variations.push(MethodVariation {
                label: label.to_string(),
                for_vdevice,
            });
        }
    }

    pub fn add_group(&mut self, name: &str, kind: GroupKind, parent: Option<GroupId>) -> GroupId {
        let id = self.groups.len() as GroupId;
        self.groups.push(GroupDecl {
            name: name.to_string(),
            kind,
            parent,
            devices: Vec::new(),
            connections: Vec::new(),
        });
        id
    }

    /// Attaches the parent of a group after the fact; a second registration
    /// fails fast (peer multi-inheritance is illegal for scenarios/setups).
    pub fn set_group_parent(&mut self, child: GroupId, parent: GroupId) -> Result<(), ResolveError> {
        if let Some(existing) = self.groups[child as usize].parent {
            return Err(ResolveError::MultipleParent {
                child: self.groups[child as usize].name.clone(),
                existing: self.groups[existing as usize].name.clone(),
                rejected: self.groups[parent as usize].name.clone(),
            });
        }
        self.groups[child as usize].parent = Some(parent);
        Ok(())
    }

    pub fn add_device(
        &mut self,
        group: GroupId,
        name: &str,
        parent: Option<DeviceId>,
        nodes: &[&str],
    ) -> DeviceId {
        let id = self.devices.len() as DeviceId;
        self.devices.push(DeviceDecl {
            name: name.to_string(),
            group,
            parent,
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            features: IndexMap::new(),
        });
        self.groups[group as usize].devices.push(id);
        id
    }

    pub fn add_device_feature(&mut self, device: DeviceId, attribute: &str, feature: FeatureId) {
        self.devices[device as usize].features.insert(
            attribute.to_string(),
            FeatureInstance {
                feature,
                vdevice_binding: None,
            },
        );
    }

    /// Activates the mapping of the abstract role `vdevice` of the feature
    /// instantiated under `attribute` onto the peer device `peer`.
    pub fn bind_vdevice(
        &mut self,
        device: DeviceId,
        attribute: &str,
        vdevice: VDeviceId,
        peer: DeviceId,
    ) {
        if let Some(instance) = self.devices[device as usize].features.get_mut(attribute) {
            instance.vdevice_binding = Some((vdevice, peer));
        }
    }

    /// Declares a connection between two devices of a group. Endpoints are
    /// mandatory here (pure templates only live in binding tables) and have
    /// to hit attachment points the endpoint devices actually declare.
    pub fn connect(&mut self, group: GroupId, connection: Connection) -> Result<(), ResolveError> {
        let Some(ep) = connection.metadata.endpoints.as_ref() else {
            return Err(ResolveError::MissingEndpoints);
        };
        for (device, node) in [(ep.from_device, &ep.from_node), (ep.to_device, &ep.to_node)] {
            if !self.devices[device as usize].nodes.iter().any(|n| n == node) {
                return Err(ResolveError::UnknownNode {
                    device: self.device_qname(device),
                    node: node.clone(),
                });
            }
        }
        self.groups[group as usize].connections.push(connection);
        Ok(())
    }

    // ---- lineage helpers ----------------------------------------------

    /// True if `feature` is `ancestor` itself or descends from it.
    pub fn feature_within(&self, feature: FeatureId, ancestor: FeatureId) -> bool {
        let mut cur = Some(feature);
        while let Some(f) = cur {
            if f == ancestor {
                return true;
            }
            cur = self.features[f as usize].parent;
        }
        false
    }

    pub fn vdevice_within(&self, vdevice: VDeviceId, ancestor: VDeviceId) -> bool {
        let mut cur = Some(vdevice);
        while let Some(v) = cur {
            if v == ancestor {
                return true;
            }
            cur = self.vdevices[v as usize].parent;
        }
        false
    }

    pub fn device_within(&self, device: DeviceId, ancestor: DeviceId) -> bool {
        let mut cur = Some(device);
        while let Some(d) = cur {
            if d == ancestor {
                return true;
            }
            cur = self.devices[d as usize].parent;
        }
        false
    }

    // ---- name helpers (for error messages) -----------------------------

    pub fn feature_name(&self, feature: FeatureId) -> &str {
        &self.features[feature as usize].name
    }

    pub fn vdevice_name(&self, vdevice: VDeviceId) -> &str {
        &self.vdevices[vdevice as usize].name
    }

    pub fn device_name(&self, device: DeviceId) -> &str {
        &self.devices[device as usize].name
    }

    pub fn group_name(&self, group: GroupId) -> &str {
        &self.groups[group as usize].name
    }

    /// "Group.Device" style qualified name.
    pub fn device_qname(&self, device: DeviceId) -> String {
        let d = &self.devices[device as usize];
        format!("{}.{}", self.groups[d.group as usize].name, d.name)
    }

    /// "Feature.VDevice" style qualified name.
    pub fn vdevice_qname(&self, vdevice: VDeviceId) -> String {
        let v = &self.vdevices[vdevice as usize];
        format!("{}.{}", self.features[v.owner as usize].name, v.name)
    }
}
