// capability resolution
//
// A feature method may have several registered implementations ("method
// variations"), each valid for certain roles over certain connection
// templates. Given the connection that is actually in effect, exactly one
// variation has to remain - the most specific one.
use indexmap::IndexMap;
use log::{debug, trace};

use crate::core::connection::Connection;
use crate::core::error::ResolveError;
use crate::core::registry::{Registry, VariationRef};
use crate::core::types::{FeatureId, VDeviceId};

impl Registry {
    /// The roles visible on a feature: its own, or - if it declares none -
    /// the first declaration found walking up the parent chain.
    pub fn abs_vdevices(&self, feature: FeatureId) -> Vec<VDeviceId> {
        let decl = &self.features[feature as usize];
        if !decl.vdevices.is_empty() {
            return decl.vdevices.clone();
        }
        match decl.parent {
            Some(parent) => self.abs_vdevices(parent),
            None => Vec::new(),
        }
    }

    fn method_known_in_chain(&self, feature: FeatureId, method: &str) -> bool {
        let mut cur = Some(feature);
        while let Some(f) = cur {
            if self.features[f as usize].methods.contains_key(method) {
                return true;
            }
            cur = self.features[f as usize].parent;
        }
        false
    }

    /// Searches the unique most-specific method variation of `method` that
    /// is bound to `vdevice` and whose required connection is satisfied by
    /// `with_connection`. Endpoint metadata is ignored during matching -
    /// structural binding does not depend on which concrete devices end up
    /// mapped.
    ///
    /// If nothing matches on this feature, the search repeats one level up
    /// the parent chain. `ignore_no_findings` turns the final
    /// "nothing found" error into `Ok(None)` for probing callers.
    pub fn method_variation(
        &self,
        feature: FeatureId,
        method: &str,
        vdevice: VDeviceId,
        with_connection: &Connection,
        ignore_no_findings: bool,
    ) -> Result<Option<VariationRef>, ResolveError> {
        let decl = &self.features[feature as usize];

        // collect every possible variation; matching singles of the same
        // variation are combined so a requirement may be covered by the
        // union of several of its templates
        let mut candidates: IndexMap<usize, Connection> = IndexMap::new();
        if let Some(variations) = decl.methods.get(method) {
            for (index, variation) in variations.iter().enumerate() {
                let Some(templates) = variation.for_vdevice.get(&vdevice) else {
                    continue;
                };
                for template in templates {
                    for single in template.get_singles() {
                        if !single.contained_in(with_connection, &self.tree, true) {
                            continue;
                        }
                        trace!(
                            "variation `{}.{}:{}` possible over `{}`",
                            decl.name,
                            method,
                            variation.label,
                            single.describe(&self.tree)
                        );
                        match candidates.get(&index) {
                            None => {
                                candidates.insert(index, single);
                            }
                            Some(existing) => {
                                let combined =
                                    Connection::based_on(&[existing.clone(), single])?;
                                candidates.insert(index, combined);
                            }
                        }
                    }
                }
            }
        }

        if candidates.is_empty() {
            if let Some(parent) = decl.parent {
                if let Some(found) =
                    self.method_variation(parent, method, vdevice, with_connection, true)?
                {
                    return Ok(Some(found));
                }
            }
            if ignore_no_findings {
                return Ok(None);
            }
            if !self.method_known_in_chain(feature, method) {
                return Err(ResolveError::UnknownMethod {
                    feature: decl.name.clone(),
                    method: method.to_string(),
                });
            }
            return Err(ResolveError::UnresolvedCapability {
                feature: decl.name.clone(),
                method: method.to_string(),
                vdevice: self.vdevice_name(vdevice).to_string(),
                connection: with_connection.describe(&self.tree),
            });
        }

        // more than one possibility: repeatedly discard a candidate whose
        // connection is contained in every other remaining candidate's, up
        // to a fixed point
        while candidates.len() > 1 {
            let mut removable = None;
            'candidates: for (&index, connection) in &candidates {
                for (&other_index, other_connection) in &candidates {
                    if other_index == index {
                        continue;
                    }
                    if !connection.contained_in(other_connection, &self.tree, false) {
                        continue 'candidates;
                    }
                }
                removable = Some(index);
                break;
            }
            match removable {
                Some(index) => {
                    debug!(
                        "dropping dominated variation `{}.{}:{}`",
                        decl.name, method, decl.methods[method][index].label
                    );
                    candidates.shift_remove(&index);
                }
                None => break,
            }
            if candidates.len() == 1 {
                break;
            }
        }

        if candidates.len() > 1 {
            return Err(ResolveError::AmbiguousResolution {
                feature: decl.name.clone(),
                method: method.to_string(),
                vdevice: self.vdevice_name(vdevice).to_string(),
                connection: with_connection.describe(&self.tree),
            });
        }
        // exactly one candidate is left at this point
        let (&index, _) = candidates.first().ok_or(ResolveError::EmptyCombination)?;
        Ok(Some(VariationRef { feature, index }))
    }

    /// Validates the role declarations along a feature's inheritance chain:
    /// a child that overrides any parent role has to override all of them,
    /// every override has to descend from the same-named parent role, and
    /// feature attributes inside an overriding role may only be replaced by
    /// same-or-subtype features.
    pub fn validate_vdevice_inheritance(&self, feature: FeatureId) -> Result<(), ResolveError> {
        let decl = &self.features[feature as usize];
        let Some(parent) = decl.parent else {
            return Ok(());
        };
        // the whole ancestor chain has to be sound first
        self.validate_vdevice_inheritance(parent)?;

        if decl.vdevices.is_empty() {
            // nothing overridden at this level, parent roles are inherited
            return Ok(());
        }

        for &parent_vd in &self.abs_vdevices(parent) {
            let parent_name = self.vdevice_name(parent_vd);
            let Some(&child_vd) = decl
                .vdevices
                .iter()
                .find(|&&v| self.vdevice_name(v) == parent_name)
            else {
                return Err(ResolveError::MissingOverride {
                    child: decl.name.clone(),
                    parent: self.feature_name(parent).to_string(),
                    parent_member: parent_name.to_string(),
                });
            };
            if !self.vdevice_within(child_vd, parent_vd) {
                return Err(ResolveError::WrongLineage {
                    child_member: self.vdevice_qname(child_vd),
                    parent_member: self.vdevice_qname(parent_vd),
                });
            }

            // attribute overriding inside the role: same name, subtype only
            for (attribute, &parent_feat) in &self.vdevices[parent_vd as usize].features {
                match self.vdevices[child_vd as usize].features.get(attribute) {
                    None => {
                        return Err(ResolveError::CapabilitySubstitution {
                            vdevice: self.vdevice_qname(child_vd),
                            parent_vdevice: self.vdevice_qname(parent_vd),
                            attribute: attribute.clone(),
                            detail: "the attribute is missing".to_string(),
                        });
                    }
                    Some(&child_feat) if !self.feature_within(child_feat, parent_feat) => {
                        return Err(ResolveError::CapabilitySubstitution {
                            vdevice: self.vdevice_qname(child_vd),
                            parent_vdevice: self.vdevice_qname(parent_vd),
                            attribute: attribute.clone(),
                            detail: format!(
                                "`{}` is not a subtype of `{}`",
                                self.feature_name(child_feat),
                                self.feature_name(parent_feat)
                            ),
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
