//! # Function Segments
//!
//! The three function groupings of a Component, each carrying its spec path and
//! status keys as associated data.

use crate::crd::{
    ApiStatusEntry, ComponentSpec, ComponentStatus, DependentApiDeclaration,
    ExposedApiDeclaration,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Core,
    Management,
    Security,
}

/// Whether a child represents an API the Component offers or consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiKind {
    Exposed,
    Dependent,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Core, Segment::Management, Segment::Security];

    /// Key of this segment under `spec`, also used as the segment label value
    #[must_use]
    pub fn spec_key(self) -> &'static str {
        match self {
            Segment::Core => "coreFunction",
            Segment::Management => "managementFunction",
            Segment::Security => "securityFunction",
        }
    }

    /// Key of this segment's status list for the given API kind
    #[must_use]
    pub fn status_key(self, kind: ApiKind) -> &'static str {
        match (self, kind) {
            (Segment::Core, ApiKind::Exposed) => "coreAPIs",
            (Segment::Management, ApiKind::Exposed) => "managementAPIs",
            (Segment::Security, ApiKind::Exposed) => "securityAPIs",
            (Segment::Core, ApiKind::Dependent) => "coreDependentAPIs",
            (Segment::Management, ApiKind::Dependent) => "managementDependentAPIs",
            (Segment::Security, ApiKind::Dependent) => "securityDependentAPIs",
        }
    }

    /// Core children carry the resolved version in their name; the other
    /// segments keep the legacy unversioned form.
    #[must_use]
    pub fn uses_versioned_names(self) -> bool {
        matches!(self, Segment::Core)
    }

    #[must_use]
    pub fn from_spec_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|segment| segment.spec_key() == key)
    }

    #[must_use]
    pub fn exposed_declarations(self, spec: &ComponentSpec) -> &[ExposedApiDeclaration] {
        match self {
            Segment::Core => &spec.core_function.exposed_apis,
            Segment::Management => &spec.management_function.exposed_apis,
            Segment::Security => &spec.security_function.exposed_apis,
        }
    }

    #[must_use]
    pub fn dependent_declarations(self, spec: &ComponentSpec) -> &[DependentApiDeclaration] {
        match self {
            Segment::Core => &spec.core_function.dependent_apis,
            Segment::Management => &spec.management_function.dependent_apis,
            Segment::Security => &spec.security_function.dependent_apis,
        }
    }

    #[must_use]
    pub fn status_entries(self, kind: ApiKind, status: &ComponentStatus) -> &[ApiStatusEntry] {
        match (self, kind) {
            (Segment::Core, ApiKind::Exposed) => &status.core_apis,
            (Segment::Management, ApiKind::Exposed) => &status.management_apis,
            (Segment::Security, ApiKind::Exposed) => &status.security_apis,
            (Segment::Core, ApiKind::Dependent) => &status.core_dependent_apis,
            (Segment::Management, ApiKind::Dependent) => &status.management_dependent_apis,
            (Segment::Security, ApiKind::Dependent) => &status.security_dependent_apis,
        }
    }

    pub fn status_entries_mut(
        self,
        kind: ApiKind,
        status: &mut ComponentStatus,
    ) -> &mut Vec<ApiStatusEntry> {
        match (self, kind) {
            (Segment::Core, ApiKind::Exposed) => &mut status.core_apis,
            (Segment::Management, ApiKind::Exposed) => &mut status.management_apis,
            (Segment::Security, ApiKind::Exposed) => &mut status.security_apis,
            (Segment::Core, ApiKind::Dependent) => &mut status.core_dependent_apis,
            (Segment::Management, ApiKind::Dependent) => &mut status.management_dependent_apis,
            (Segment::Security, ApiKind::Dependent) => &mut status.security_dependent_apis,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec_key())
    }
}

impl ApiKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKind::Exposed => "exposed",
            ApiKind::Dependent => "dependent",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_keys_are_distinct() {
        let mut keys: Vec<&str> = Segment::ALL
            .iter()
            .flat_map(|s| [s.status_key(ApiKind::Exposed), s.status_key(ApiKind::Dependent)])
            .collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 6);
    }

    #[test]
    fn test_spec_key_round_trip() {
        for segment in Segment::ALL {
            assert_eq!(Segment::from_spec_key(segment.spec_key()), Some(segment));
        }
        assert_eq!(Segment::from_spec_key("coreAPIs"), None);
    }

    #[test]
    fn test_status_entries_mut_targets_matching_list() {
        let mut status = ComponentStatus::default();
        Segment::Management
            .status_entries_mut(ApiKind::Dependent, &mut status)
            .push(ApiStatusEntry {
                name: "x".to_string(),
                ..Default::default()
            });
        assert_eq!(status.management_dependent_apis.len(), 1);
        assert!(status.management_apis.is_empty());
    }
}
