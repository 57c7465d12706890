use thiserror::Error;

/// Every structural defect the resolver can detect. All of these are raised
/// eagerly, before any test body would run, and none are retried.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error(
        "found more than one possible method variation for `{feature}.{method}` \
         with role `{vdevice}` and usable connection `{connection}`"
    )]
    AmbiguousResolution {
        feature: String,
        method: String,
        vdevice: String,
        connection: String,
    },

    #[error(
        "found no possible method variation for `{feature}.{method}` \
         with role `{vdevice}` and usable connection `{connection}`"
    )]
    UnresolvedCapability {
        feature: String,
        method: String,
        vdevice: String,
        connection: String,
    },

    #[error("`{child}` already has the parent `{existing}` - can not attach `{rejected}` too")]
    MultipleParent {
        child: String,
        existing: String,
        rejected: String,
    },

    #[error(
        "missing overriding of `{parent_member}` from `{parent}` in `{child}` - \
         if one member is overridden, all have to be"
    )]
    MissingOverride {
        child: String,
        parent: String,
        parent_member: String,
    },

    #[error("`{child_member}` has the same name as `{parent_member}` but does not descend from it")]
    WrongLineage {
        child_member: String,
        parent_member: String,
    },

    #[error("`{child_member}` descends from `{parent_member}` but does not reuse its name")]
    WrongName {
        child_member: String,
        parent_member: String,
    },

    #[error(
        "feature attribute `{attribute}` of role `{parent_vdevice}` is not properly \
         overridden in `{vdevice}`: {detail}"
    )]
    CapabilitySubstitution {
        vdevice: String,
        parent_vdevice: String,
        attribute: String,
        detail: String,
    },

    #[error(
        "found multiple definitions for the connection from `{from_device}` (node `{from_node}`) \
         to `{to_device}` (node `{to_node}`) in `{group}`"
    )]
    TopologyAmbiguity {
        group: String,
        from_device: String,
        from_node: String,
        to_device: String,
        to_node: String,
    },

    #[error(
        "device `{device}` mapped to role `{vdevice}` has no implementation \
         for the feature `{feature}`"
    )]
    MissingFeatureImplementation {
        device: String,
        vdevice: String,
        feature: String,
    },

    #[error("can not combine connections that do not share the same endpoints")]
    EndpointMismatch,

    #[error("can not combine an empty set of connections")]
    EmptyCombination,

    #[error("a connection between devices needs endpoints on both sides")]
    MissingEndpoints,

    #[error("device `{device}` has no attachment point named `{node}`")]
    UnknownNode { device: String, node: String },

    #[error("`{group}` is a {found}, but a {expected} is required here")]
    GroupMisuse {
        group: String,
        expected: String,
        found: String,
    },

    #[error("the method `{method}` is not declared on `{feature}` or any of its ancestors")]
    UnknownMethod { feature: String, method: String },
}
