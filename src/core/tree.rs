// the single-rooted type tree of connection kinds
use crate::core::types::KindId;

/// One kind in the tree. Top-level kinds hang below an implicit root and
/// carry `parent = None`.
#[derive(Debug, Clone)]
pub struct KindNode {
    pub name: String,
    pub parent: Option<KindId>,
}

/// Registry of all declared connection kinds. Subtyping is "is-a" along the
/// parent chain: `DCPower` is a `Power`, so a `DCPower` link satisfies a
/// `Power` requirement.
#[derive(Debug, Clone, Default)]
pub struct KindTree {
    pub kinds: Vec<KindNode>,
}

impl KindTree {
    pub fn new() -> Self {
        Self { kinds: Vec::new() }
    }

    pub fn add_kind(&mut self, name: &str, parent: Option<KindId>) -> KindId {
        let id = self.kinds.len() as KindId;
        self.kinds.push(KindNode {
            name: name.to_string(),
            parent,
        });
        id
    }

    pub fn name(&self, kind: KindId) -> &str {
        &self.kinds[kind as usize].name
    }

    pub fn parent(&self, kind: KindId) -> Option<KindId> {
        self.kinds[kind as usize].parent
    }

    /// True if `kind` is `ancestor` itself or lies below it in the tree.
    pub fn is_within(&self, kind: KindId, ancestor: KindId) -> bool {
        let mut cur = Some(kind);
        while let Some(k) = cur {
            if k == ancestor {
                return true;
            }
            cur = self.parent(k);
        }
        false
    }
}
