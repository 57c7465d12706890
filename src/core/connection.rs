// the connection algebra: singles, based_on merges, containment
use crate::core::error::ResolveError;
use crate::core::metadata::ConnMetadata;
use crate::core::tree::KindTree;
use crate::core::types::KindId;

/// A typed edge. `kinds` is the AND-combination of all kinds this edge
/// requires (or provides) over one endpoint pair; a "single" has exactly one
/// kind. The kind list is kept sorted and deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub kinds: Vec<KindId>,
    pub metadata: ConnMetadata,
}

impl Connection {
    /// A pure type template: one kind, no endpoints.
    pub fn template(kind: KindId) -> Self {
        Self {
            kinds: vec![kind],
            metadata: ConnMetadata::template(),
        }
    }

    pub fn new(kind: KindId, metadata: ConnMetadata) -> Self {
        Self {
            kinds: vec![kind],
            metadata,
        }
    }

    fn normalize(&mut self) {
        self.kinds.sort_unstable();
        self.kinds.dedup();
    }

    /// Decomposes into atomic single-kind connections over the same
    /// endpoints. A single decomposes into itself.
    pub fn get_singles(&self) -> Vec<Connection> {
        self.kinds
            .iter()
            .map(|&kind| Connection {
                kinds: vec![kind],
                metadata: self.metadata.clone(),
            })
            .collect()
    }

    /// Merges connections that share the same endpoints into one connection
    /// requiring the union of all their kinds.
    pub fn based_on(parts: &[Connection]) -> Result<Connection, ResolveError> {
        let Some(first) = parts.first() else {
            return Err(ResolveError::EmptyCombination);
        };
        let mut combined = first.clone();
        for part in &parts[1..] {
            if !part.metadata.equal_with(&first.metadata) {
                return Err(ResolveError::EndpointMismatch);
            }
            combined.kinds.extend_from_slice(&part.kinds);
        }
        combined.normalize();
        Ok(combined)
    }

    /// True iff every kind required by `self` is satisfied by a kind present
    /// in `other` (the provided kind may be the required kind itself or any
    /// descendant of it), and - unless `ignore_metadata` - the endpoint and
    /// direction predicate holds as well.
    pub fn contained_in(&self, other: &Connection, tree: &KindTree, ignore_metadata: bool) -> bool {
        for &required in &self.kinds {
            if !other
                .kinds
                .iter()
                .any(|&provided| tree.is_within(provided, required))
            {
                return false;
            }
        }
        ignore_metadata || self.metadata.contained_in(&other.metadata)
    }

    /// Mutual kind containment plus metadata equality. The twisted-endpoint
    /// case of a bidirectional link counts as equal.
    pub fn equal_with(&self, other: &Connection, tree: &KindTree) -> bool {
        self.contained_in(other, tree, true)
            && other.contained_in(self, tree, true)
            && self.metadata.equal_with(&other.metadata)
    }

    /// Human-readable kind description for error messages.
    pub fn describe(&self, tree: &KindTree) -> String {
        let names: Vec<&str> = self.kinds.iter().map(|&k| tree.name(k)).collect();
        names.join("+")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::ConnMetadata;
    use crate::core::types::Direction;

    fn power_tree() -> (KindTree, KindId, KindId, KindId) {
        let mut t = KindTree::new();
        let power = t.add_kind("Power", None);
        let dc = t.add_kind("DCPower", Some(power));
        let ac = t.add_kind("ACPower", Some(power));
        (t, power, dc, ac)
    }

    fn pair_meta() -> ConnMetadata {
        ConnMetadata::between(0, "p1", 1, "n1", Direction::Bidirectional)
    }

    #[test]
    fn containment_is_reflexive() {
        let (tree, power, dc, _) = power_tree();
        for c in [
            Connection::template(power),
            Connection::new(dc, pair_meta()),
        ] {
            assert!(c.contained_in(&c, &tree, false));
        }
    }

    #[test]
    fn containment_is_transitive() {
        let (mut tree, power, dc, _) = power_tree();
        let dc_usb = tree.add_kind("DCPowerOverUsb", Some(dc));

        // a requires Power, b provides DCPower, c provides DCPowerOverUsb
        let a = Connection::template(power);
        let b = Connection::template(dc);
        let c = Connection::template(dc_usb);

        assert!(a.contained_in(&b, &tree, false));
        assert!(b.contained_in(&c, &tree, false));
        assert!(a.contained_in(&c, &tree, false));
    }

    #[test]
    fn a_generic_requirement_is_satisfied_by_a_specific_link_not_vice_versa() {
        let (tree, power, dc, _) = power_tree();
        let generic = Connection::new(power, pair_meta());
        let specific = Connection::new(dc, pair_meta());

        assert!(generic.contained_in(&specific, &tree, false));
        assert!(!specific.contained_in(&generic, &tree, false));
    }

    #[test]
    fn equal_with_is_symmetric_and_implies_mutual_containment() {
        let (tree, _, dc, _) = power_tree();
        let a = Connection::new(dc, pair_meta());
        let b = Connection::new(
            dc,
            ConnMetadata::between(1, "n1", 0, "p1", Direction::Bidirectional),
        );

        assert!(a.equal_with(&b, &tree));
        assert!(b.equal_with(&a, &tree));
        assert!(a.contained_in(&b, &tree, false));
        assert!(b.contained_in(&a, &tree, false));
    }

    #[test]
    fn endpoint_reversal_law() {
        let (tree, _, dc, _) = power_tree();
        let bidi = Connection::new(dc, pair_meta());
        let twisted = Connection::new(
            dc,
            ConnMetadata::between(1, "n1", 0, "p1", Direction::Bidirectional),
        );
        let one_way = Connection::new(
            dc,
            ConnMetadata::between(0, "p1", 1, "n1", Direction::Unidirectional),
        );

        assert!(bidi.equal_with(&twisted, &tree));
        assert!(!bidi.equal_with(&one_way, &tree));
        assert!(one_way.contained_in(&bidi, &tree, false));
        assert!(!bidi.contained_in(&one_way, &tree, false));
    }

    #[test]
    fn singles_of_a_based_on_combination_reconstruct_the_original() {
        let (tree, _, dc, ac) = power_tree();
        // two singles over the same pair combine into one composite...
        let dc_single = Connection::new(dc, pair_meta());
        let ac_single = Connection::new(ac, pair_meta());
        let both = Connection::based_on(&[dc_single.clone(), ac_single.clone()]).unwrap();
        assert_eq!(both.kinds.len(), 2);

        // ...and decompose back into exactly those two singles
        let singles = both.get_singles();
        assert_eq!(singles.len(), 2);
        assert!(singles.iter().any(|s| s.equal_with(&dc_single, &tree)));
        assert!(singles.iter().any(|s| s.equal_with(&ac_single, &tree)));

        let rebuilt = Connection::based_on(&singles).unwrap();
        assert!(rebuilt.equal_with(&both, &tree));
    }

    #[test]
    fn based_on_rejects_differing_endpoints_and_empty_input() {
        let (_, _, dc, ac) = power_tree();
        let here = Connection::new(dc, pair_meta());
        let elsewhere = Connection::new(
            ac,
            ConnMetadata::between(0, "p1", 2, "x1", Direction::Bidirectional),
        );

        let err = Connection::based_on(&[here, elsewhere]).unwrap_err();
        assert!(matches!(err, ResolveError::EndpointMismatch));

        let err = Connection::based_on(&[]).unwrap_err();
        assert!(matches!(err, ResolveError::EmptyCombination));
    }

    #[test]
    fn composite_requirement_is_satisfied_by_the_union_of_singles() {
        let (tree, _, dc, ac) = power_tree();
        let requirement =
            Connection::based_on(&[Connection::template(dc), Connection::template(ac)]).unwrap();

        let dc_link = Connection::new(dc, pair_meta());
        let ac_link = Connection::new(ac, pair_meta());

        // neither single link alone satisfies the composite requirement
        assert!(!requirement.contained_in(&dc_link, &tree, true));
        assert!(!requirement.contained_in(&ac_link, &tree, true));

        // their based_on union does
        let union = Connection::based_on(&[dc_link, ac_link]).unwrap();
        assert!(requirement.contained_in(&union, &tree, true));
    }
}
