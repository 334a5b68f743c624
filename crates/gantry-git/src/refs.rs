//! Ref classification.
//!
//! Classification is purely syntactic: it never looks at the repository.
//! Resolution (turning a classified ref into a commit) happens against a
//! [`GitRepository`](crate::GitRepository).

use std::fmt;

const TAG_PREFIX: &str = "refs/tags/";
const BRANCH_PREFIX: &str = "refs/heads/";

/// Whether a ref names a tag or a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Tag,
    Branch,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag => f.write_str("tag"),
            Self::Branch => f.write_str("branch"),
        }
    }
}

/// A ref string classified by its syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefName {
    /// `refs/tags/<name>`
    Tag(String),
    /// `refs/heads/<name>`
    Branch(String),
    /// Anything else; treated as a branch short name.
    Bare(String),
}

impl RefName {
    /// Classify a ref string.
    pub fn classify(ref_str: &str) -> Self {
        if let Some(tag) = ref_str.strip_prefix(TAG_PREFIX) {
            return Self::Tag(tag.to_string());
        }
        if let Some(branch) = ref_str.strip_prefix(BRANCH_PREFIX) {
            return Self::Branch(branch.to_string());
        }
        Self::Bare(ref_str.to_string())
    }

    /// The name without any `refs/...` prefix.
    pub fn short_name(&self) -> &str {
        match self {
            Self::Tag(name) | Self::Branch(name) | Self::Bare(name) => name,
        }
    }

    /// What the ref resolves against. Bare names resolve as branches.
    pub fn kind(&self) -> RefKind {
        match self {
            Self::Tag(_) => RefKind::Tag,
            Self::Branch(_) | Self::Bare(_) => RefKind::Branch,
        }
    }

    /// Normalized, fully-qualified ref.
    pub fn full_name(&self) -> String {
        match self {
            Self::Tag(name) => format!("{TAG_PREFIX}{name}"),
            Self::Branch(name) | Self::Bare(name) => format!("{BRANCH_PREFIX}{name}"),
        }
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_tag() {
        let r = RefName::classify("refs/tags/v1.2.0");
        assert_eq!(r, RefName::Tag("v1.2.0".into()));
        assert_eq!(r.kind(), RefKind::Tag);
        assert_eq!(r.full_name(), "refs/tags/v1.2.0");
    }

    #[test]
    fn test_classify_branch() {
        let r = RefName::classify("refs/heads/feature/login");
        assert_eq!(r, RefName::Branch("feature/login".into()));
        assert_eq!(r.short_name(), "feature/login");
    }

    #[test]
    fn test_classify_bare_normalizes_to_branch() {
        let r = RefName::classify("main");
        assert_eq!(r, RefName::Bare("main".into()));
        assert_eq!(r.kind(), RefKind::Branch);
        assert_eq!(r.full_name(), "refs/heads/main");
    }

    #[test]
    fn test_other_namespaces_are_bare() {
        let r = RefName::classify("refs/pull/12/head");
        assert_eq!(r, RefName::Bare("refs/pull/12/head".into()));
        assert_eq!(r.full_name(), "refs/heads/refs/pull/12/head");
    }

    proptest! {
        #[test]
        fn prop_tag_roundtrip(name in "[a-zA-Z0-9._/-]{1,40}") {
            let full = format!("refs/tags/{name}");
            let r = RefName::classify(&full);
            prop_assert_eq!(r.short_name(), name.as_str());
            prop_assert_eq!(r.full_name(), full);
        }

        #[test]
        fn prop_bare_names_become_branches(name in "[a-zA-Z0-9._-][a-zA-Z0-9._/-]{0,40}") {
            prop_assume!(!name.starts_with("refs/"));
            let r = RefName::classify(&name);
            prop_assert_eq!(r.kind(), RefKind::Branch);
            prop_assert_eq!(r.full_name(), format!("refs/heads/{name}"));
        }

        #[test]
        fn prop_full_name_is_stable(s in "\\PC{0,40}") {
            let full = RefName::classify(&s).full_name();
            prop_assert_eq!(RefName::classify(&full).full_name(), full);
        }
    }
}
