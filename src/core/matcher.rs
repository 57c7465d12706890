// topology matching
//
// Decides whether a setup can host a scenario. The setup's connections are
// flattened into a four-key table (device, node, device, node) holding the
// single connections of each link in both orientations; a scenario mapping
// is an injective device assignment under which every scenario requirement
// finds a satisfying bundle in that table.
use indexmap::IndexMap;
use log::debug;

use crate::core::connection::Connection;
use crate::core::error::ResolveError;
use crate::core::registry::Registry;
use crate::core::types::{DeviceId, Direction, FeatureId, GroupId, VDeviceId};

/// Singles of every declared link, reachable from either side:
/// `table[from][from_node][to][to_node]` lists the single connections of the
/// one link declared over that node pair.
pub type ConnTable =
    IndexMap<DeviceId, IndexMap<String, IndexMap<DeviceId, IndexMap<String, Vec<Connection>>>>>;

/// One way of playing a scenario on a setup: which setup device takes which
/// scenario device's place, and which setup device fills which active role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMapping {
    pub devices: IndexMap<DeviceId, DeviceId>,
    pub roles: IndexMap<VDeviceId, DeviceId>,
}

fn insert_slot(
    table: &mut ConnTable,
    from_device: DeviceId,
    from_node: &str,
    to_device: DeviceId,
    to_node: &str,
    singles: Vec<Connection>,
) -> bool {
    let slot = table
        .entry(from_device)
        .or_default()
        .entry(from_node.to_string())
        .or_default()
        .entry(to_device)
        .or_default();
    if slot.contains_key(to_node) {
        return false;
    }
    slot.insert(to_node.to_string(), singles);
    true
}

impl Registry {
    /// The level of a group hierarchy whose declarations are effective: the
    /// group itself, or the nearest ancestor that declares devices.
    pub fn effective_group(&self, group: GroupId) -> GroupId {
        let mut cur = group;
        loop {
            if !self.groups[cur as usize].devices.is_empty() {
                return cur;
            }
            match self.groups[cur as usize].parent {
                Some(parent) => cur = parent,
                None => return cur,
            }
        }
    }

    /// The connections effective for a group: the nearest level (the group
    /// itself or an ancestor) that declares any, with endpoint device ids
    /// remapped onto the effective device set. An overriding child that
    /// declares no links of its own inherits the parent's.
    pub fn all_connections(&self, group: GroupId) -> Vec<Connection> {
        let members = self.abs_devices(group);
        let mut cur = Some(group);
        while let Some(level) = cur {
            let declared = &self.groups[level as usize].connections;
            if !declared.is_empty() {
                return declared
                    .iter()
                    .map(|connection| {
                        let mut remapped = connection.clone();
                        if let Some(ep) = remapped.metadata.endpoints.as_mut() {
                            ep.from_device = self.counterpart_in(ep.from_device, &members);
                            ep.to_device = self.counterpart_in(ep.to_device, &members);
                        }
                        remapped
                    })
                    .collect();
            }
            cur = self.groups[level as usize].parent;
        }
        Vec::new()
    }

    /// The same-named device of the effective level, when the id stems from
    /// an ancestor level. `validate_group_inheritance` guarantees the name
    /// correspondence of overriding devices.
    fn counterpart_in(&self, device: DeviceId, members: &[DeviceId]) -> DeviceId {
        members
            .iter()
            .copied()
            .find(|&member| self.device_name(member) == self.device_name(device))
            .unwrap_or(device)
    }

    /// The effective connections with duplicates (equal up to endpoint
    /// twisting) removed.
    pub fn all_abs_connections(&self, group: GroupId) -> Vec<Connection> {
        let mut out: Vec<Connection> = Vec::new();
        for connection in self.all_connections(group) {
            if !out.iter().any(|seen| seen.equal_with(&connection, &self.tree)) {
                out.push(connection);
            }
        }
        out
    }

    /// Flattens a group's connections into the four-key lookup table. At
    /// most one link may exist per node pair; a second one makes the
    /// topology ambiguous and that is fatal.
    pub fn absolute_single_connections(&self, group: GroupId) -> Result<ConnTable, ResolveError> {
        let mut table = ConnTable::new();
        for connection in self.all_abs_connections(group) {
            let Some(ep) = connection.metadata.endpoints.clone() else {
                return Err(ResolveError::MissingEndpoints);
            };
            let singles = connection.get_singles();
            let forward = insert_slot(
                &mut table,
                ep.from_device,
                &ep.from_node,
                ep.to_device,
                &ep.to_node,
                singles.clone(),
            );
            let backward = forward
                && insert_slot(
                    &mut table,
                    ep.to_device,
                    &ep.to_node,
                    ep.from_device,
                    &ep.from_node,
                    singles,
                );
            if !backward {
                return Err(ResolveError::TopologyAmbiguity {
                    group: self.group_name(self.effective_group(group)).to_string(),
                    from_device: self.device_name(ep.from_device).to_string(),
                    from_node: ep.from_node.clone(),
                    to_device: self.device_name(ep.to_device).to_string(),
                    to_node: ep.to_node.clone(),
                });
            }
        }
        Ok(table)
    }

    /// Every link between two devices, with the singles of each node pair
    /// combined back into one connection.
    fn bundles_between(
        &self,
        table: &ConnTable,
        a: DeviceId,
        b: DeviceId,
    ) -> Result<Vec<Connection>, ResolveError> {
        let mut bundles = Vec::new();
        if let Some(by_node) = table.get(&a) {
            for peers in by_node.values() {
                if let Some(slots) = peers.get(&b) {
                    for singles in slots.values() {
                        bundles.push(Connection::based_on(singles)?);
                    }
                }
            }
        }
        Ok(bundles)
    }

    fn directed_over(bundle: &Connection, from: DeviceId, to: DeviceId, dir: Direction) -> bool {
        match dir {
            Direction::Bidirectional => {
                bundle.metadata.has_connection_from_to(from, Some(to))
                    && bundle.metadata.has_connection_from_to(to, Some(from))
            }
            Direction::Unidirectional => bundle.metadata.has_connection_from_to(from, Some(to)),
        }
    }

    fn requirement_holds(
        &self,
        requirement: &Connection,
        from: DeviceId,
        to: DeviceId,
        bundles: &[Connection],
    ) -> bool {
        bundles.iter().any(|bundle| {
            requirement.contained_in(bundle, &self.tree, true)
                && Self::directed_over(bundle, from, to, requirement.metadata.direction)
        })
    }

    /// True if `setup_device` instantiates (a descendant of) every feature
    /// `scenario_device` asks for.
    fn provides_features(&self, setup_device: DeviceId, scenario_device: DeviceId) -> bool {
        self.devices[scenario_device as usize]
            .features
            .values()
            .all(|needed| {
                self.devices[setup_device as usize]
                    .features
                    .values()
                    .any(|have| self.feature_within(have.feature, needed.feature))
            })
    }

    fn class_binding_for(&self, feature: FeatureId, vdevice: VDeviceId) -> Option<&Vec<Connection>> {
        let mut cur = Some(feature);
        while let Some(f) = cur {
            let found = self.features[f as usize]
                .class_binding
                .iter()
                .find(|&(&bound, _)| self.vdevice_within(vdevice, bound));
            if let Some((_, templates)) = found {
                return Some(templates);
            }
            cur = self.features[f as usize].parent;
        }
        None
    }

    fn mapping_fits(
        &self,
        assignment: &IndexMap<DeviceId, DeviceId>,
        requirements: &[Connection],
        table: &ConnTable,
    ) -> Result<bool, ResolveError> {
        for requirement in requirements {
            let Some(ep) = requirement.metadata.endpoints.as_ref() else {
                return Err(ResolveError::MissingEndpoints);
            };
            let (Some(&from), Some(&to)) =
                (assignment.get(&ep.from_device), assignment.get(&ep.to_device))
            else {
                return Ok(false);
            };
            let bundles = self.bundles_between(table, from, to)?;
            if !self.requirement_holds(requirement, from, to, &bundles) {
                debug!(
                    "requirement `{}` between `{}` and `{}` not met",
                    requirement.describe(&self.tree),
                    self.device_qname(from),
                    self.device_qname(to)
                );
                return Ok(false);
            }
        }

        // class-based bindings of activated roles
        for (&scenario_device, &mapped) in assignment {
            for instance in self.devices[scenario_device as usize].features.values() {
                let Some((vdevice, peer)) = instance.vdevice_binding else {
                    continue;
                };
                let Some(templates) = self.class_binding_for(instance.feature, vdevice) else {
                    continue;
                };
                let Some(&mapped_peer) = assignment.get(&peer) else {
                    return Ok(false);
                };
                let bundles = self.bundles_between(table, mapped, mapped_peer)?;
                let usable = templates.iter().any(|template| {
                    bundles.iter().any(|bundle| {
                        template
                            .get_singles()
                            .iter()
                            .all(|single| single.contained_in(bundle, &self.tree, true))
                            && Self::directed_over(
                                bundle,
                                mapped,
                                mapped_peer,
                                template.metadata.direction,
                            )
                    })
                });
                if !usable {
                    debug!(
                        "role `{}` unusable between `{}` and `{}`",
                        self.vdevice_qname(vdevice),
                        self.device_qname(mapped),
                        self.device_qname(mapped_peer)
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn finish_mapping(&self, assignment: &IndexMap<DeviceId, DeviceId>) -> ResolvedMapping {
        let mut roles = IndexMap::new();
        for &scenario_device in assignment.keys() {
            for instance in self.devices[scenario_device as usize].features.values() {
                if let Some((vdevice, peer)) = instance.vdevice_binding {
                    if let Some(&mapped_peer) = assignment.get(&peer) {
                        roles.insert(vdevice, mapped_peer);
                    }
                }
            }
        }
        ResolvedMapping {
            devices: assignment.clone(),
            roles,
        }
    }

    fn extend_assignment(
        &self,
        scenario_devices: &[DeviceId],
        candidates: &[Vec<DeviceId>],
        requirements: &[Connection],
        table: &ConnTable,
        assignment: &mut IndexMap<DeviceId, DeviceId>,
        results: &mut Vec<ResolvedMapping>,
    ) -> Result<(), ResolveError> {
        let depth = assignment.len();
        if depth == scenario_devices.len() {
            if self.mapping_fits(assignment, requirements, table)? {
                results.push(self.finish_mapping(assignment));
            }
            return Ok(());
        }
        let scenario_device = scenario_devices[depth];
        for &candidate in &candidates[depth] {
            if assignment.values().any(|&used| used == candidate) {
                continue;
            }
            assignment.insert(scenario_device, candidate);
            self.extend_assignment(
                scenario_devices,
                candidates,
                requirements,
                table,
                assignment,
                results,
            )?;
            assignment.shift_remove(&scenario_device);
        }
        Ok(())
    }

    /// Enumerates every way the setup can host the scenario. An impossible
    /// pair yields the empty list, never an error; errors are reserved for
    /// ill-formed declarations (e.g. an ambiguous setup topology).
    pub fn enumerate_mappings(
        &self,
        scenario: GroupId,
        setup: GroupId,
    ) -> Result<Vec<ResolvedMapping>, ResolveError> {
        let scenario_devices = self.abs_devices(scenario);
        let setup_devices = self.abs_devices(setup);
        let table = self.absolute_single_connections(setup)?;
        let requirements = self.all_abs_connections(scenario);

        // feature compatibility narrows the candidates per scenario device
        let mut candidates: Vec<Vec<DeviceId>> = Vec::with_capacity(scenario_devices.len());
        for &scenario_device in &scenario_devices {
            let fitting: Vec<DeviceId> = setup_devices
                .iter()
                .copied()
                .filter(|&setup_device| self.provides_features(setup_device, scenario_device))
                .collect();
            if fitting.is_empty() {
                debug!(
                    "no device of `{}` can play `{}`",
                    self.group_name(setup),
                    self.device_qname(scenario_device)
                );
            }
            candidates.push(fitting);
        }

        let mut results = Vec::new();
        let mut assignment = IndexMap::new();
        self.extend_assignment(
            &scenario_devices,
            &candidates,
            &requirements,
            &table,
            &mut assignment,
            &mut results,
        )?;
        Ok(results)
    }
}
