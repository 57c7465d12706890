// endpoint metadata of a connection
/*

equal_with:    same direction, same endpoints in the same order, OR - if both
               sides are bidirectional - the endpoints swapped

contained_in:  equal_with, plus the case where self is unidirectional and the
               other side is a bidirectional link over the same (or swapped)
               endpoints

Both sides of a symmetric situation have to be checked explicitly; there is
no direction normalization anywhere.

*/
use crate::core::types::{DeviceId, Direction};

/// The four identity fields of a connection. Either all of them exist or the
/// connection is a pure type template without endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub from_device: DeviceId,
    pub from_node: String,
    pub to_device: DeviceId,
    pub to_node: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnMetadata {
    pub endpoints: Option<Endpoints>,
    pub direction: Direction,
}

impl ConnMetadata {
    /// Metadata of a pure type template: no endpoints, bidirectional.
    pub fn template() -> Self {
        Self {
            endpoints: None,
            direction: Direction::Bidirectional,
        }
    }

    pub fn between(
        from_device: DeviceId,
        from_node: &str,
        to_device: DeviceId,
        to_node: &str,
        direction: Direction,
    ) -> Self {
        Self {
            endpoints: Some(Endpoints {
                from_device,
                from_node: from_node.to_string(),
                to_device,
                to_node: to_node.to_string(),
            }),
            direction,
        }
    }

    fn check_same(&self, other: &ConnMetadata) -> bool {
        match (&self.endpoints, &other.endpoints) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn check_twisted(&self, other: &ConnMetadata) -> bool {
        match (&self.endpoints, &other.endpoints) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.from_device == b.to_device
                    && a.from_node == b.to_node
                    && a.to_device == b.from_device
                    && a.to_node == b.from_node
            }
            _ => false,
        }
    }

    /// True in exactly these situations:
    /// * both bidirectional, endpoints the same (or swapped)
    /// * both unidirectional, endpoints the same in the same order
    pub fn equal_with(&self, other: &ConnMetadata) -> bool {
        match (self.direction, other.direction) {
            (Direction::Bidirectional, Direction::Bidirectional) => {
                self.check_same(other) || self.check_twisted(other)
            }
            (Direction::Unidirectional, Direction::Unidirectional) => self.check_same(other),
            _ => false,
        }
    }

    /// Like `equal_with`, plus: a unidirectional requirement is satisfiable
    /// by a bidirectional concrete link over the same (or swapped) endpoints.
    /// The other way around is NOT contained.
    pub fn contained_in(&self, other: &ConnMetadata) -> bool {
        if self.equal_with(other) {
            return true;
        }
        if self.direction == Direction::Unidirectional
            && other.direction == Direction::Bidirectional
        {
            return self.check_same(other) || self.check_twisted(other);
        }
        false
    }

    /// Checks whether this connection carries traffic from `start` to `end`
    /// (any `end` if `None`), honoring directionality.
    pub fn has_connection_from_to(&self, start: DeviceId, end: Option<DeviceId>) -> bool {
        let Some(ep) = &self.endpoints else {
            return false;
        };
        match end {
            None => {
                if self.direction == Direction::Bidirectional {
                    start == ep.from_device || start == ep.to_device
                } else {
                    start == ep.from_device
                }
            }
            Some(end) => {
                if self.direction == Direction::Bidirectional {
                    (start == ep.from_device && end == ep.to_device)
                        || (start == ep.to_device && end == ep.from_device)
                } else {
                    start == ep.from_device && end == ep.to_device
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bidi(from: DeviceId, fnode: &str, to: DeviceId, tnode: &str) -> ConnMetadata {
        ConnMetadata::between(from, fnode, to, tnode, Direction::Bidirectional)
    }

    fn uni(from: DeviceId, fnode: &str, to: DeviceId, tnode: &str) -> ConnMetadata {
        ConnMetadata::between(from, fnode, to, tnode, Direction::Unidirectional)
    }

    #[test]
    fn equal_with_accepts_swapped_endpoints_only_for_bidirectional() {
        let a = bidi(0, "p1", 1, "n1");
        let b = bidi(1, "n1", 0, "p1");
        assert!(a.equal_with(&b));
        assert!(b.equal_with(&a));

        let c = uni(0, "p1", 1, "n1");
        let d = uni(1, "n1", 0, "p1");
        assert!(!c.equal_with(&d));
        assert!(c.equal_with(&c.clone()));
    }

    #[test]
    fn unidirectional_requirement_is_contained_in_bidirectional_link() {
        let req = uni(0, "p1", 1, "n1");
        let link = bidi(0, "p1", 1, "n1");
        let twisted_link = bidi(1, "n1", 0, "p1");

        assert!(req.contained_in(&link));
        assert!(req.contained_in(&twisted_link));
        // the bidirectional side is NOT contained in the unidirectional one
        assert!(!link.contained_in(&req));
        // and the two are not equal either
        assert!(!req.equal_with(&link));
    }

    #[test]
    fn templates_compare_by_direction_only() {
        let t1 = ConnMetadata::template();
        let t2 = ConnMetadata::template();
        assert!(t1.equal_with(&t2));

        let with_endpoints = bidi(0, "p1", 1, "n1");
        assert!(!t1.equal_with(&with_endpoints));
        assert!(!t1.contained_in(&with_endpoints));
    }

    #[test]
    fn has_connection_from_to_honors_direction() {
        let one_way = uni(0, "p1", 1, "n1");
        assert!(one_way.has_connection_from_to(0, Some(1)));
        assert!(!one_way.has_connection_from_to(1, Some(0)));
        assert!(one_way.has_connection_from_to(0, None));
        assert!(!one_way.has_connection_from_to(1, None));

        let both_ways = bidi(0, "p1", 1, "n1");
        assert!(both_ways.has_connection_from_to(1, Some(0)));
        assert!(both_ways.has_connection_from_to(1, None));
    }
}
