use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{EnumString, IntoStaticStr};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}


#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    PageReference,
    Page,
    PageFolder,
    DocumentGroup,
    Media,
    MediaFolder,
    ReferenceFolder,
    Template,
    Generic,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}


/// Category tag plus the capabilities only some categories expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum NodeKind {
    PageReference { page: NodeId },
    Page,
    PageFolder,
    DocumentGroup,
    Media,
    MediaFolder,
    ReferenceFolder { start_node: Option<NodeId> },
    Template,
    Generic,
}

impl NodeKind {
    pub fn category(&self) -> Category {
        match self {
            Self::PageReference { .. } => Category::PageReference,
            Self::Page => Category::Page,
            Self::PageFolder => Category::PageFolder,
            Self::DocumentGroup => Category::DocumentGroup,
            Self::Media => Category::Media,
            Self::MediaFolder => Category::MediaFolder,
            Self::ReferenceFolder { .. } => Category::ReferenceFolder,
            Self::Template => Category::Template,
            Self::Generic => Category::Generic,
        }
    }

    pub fn referenced_page(&self) -> Option<NodeId> {
        match self {
            Self::PageReference { page } => Some(*page),
            _ => None,
        }
    }

    pub fn start_node(&self) -> Option<NodeId> {
        match self {
            Self::ReferenceFolder { start_node } => *start_node,
            _ => None,
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockState {
    #[default]
    Unlocked,
    LockedBySelf,
    LockedByOther,
}

impl LockState {
    /// Held on the server by a session other than the caller's.
    pub fn is_foreign(&self) -> bool {
        matches!(self, Self::LockedByOther)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseState {
    Released,
    #[default]
    Unreleased,
}


/// Snapshot of a tree element as read from the host.
///
/// Holds ids only. The parent link is a plain id into the host's arena and
/// the snapshot is never refreshed in place; callers re-fetch when they need
/// current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub uid: Option<String>,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub lock: LockState,
    pub release: ReleaseState,
    pub incoming_references: usize,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uid: None,
            kind,
            parent: None,
            lock: LockState::Unlocked,
            release: ReleaseState::Unreleased,
            incoming_references: 0,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn with_lock(mut self, lock: LockState) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_release(mut self, release: ReleaseState) -> Self {
        self.release = release;
        self
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Short code if the node has one, display name otherwise.
    pub fn display_identifier(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.name)
    }

    pub fn is_referenced(&self) -> bool {
        self.incoming_references > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_category_strings() {
        assert_eq!(Category::PageReference.as_str(), "page_reference");
        assert_eq!(Category::from_str("media_folder").unwrap(), Category::MediaFolder);
    }

    #[test]
    fn test_kind_capabilities() {
        let kind = NodeKind::PageReference { page: NodeId(7) };
        assert_eq!(kind.category(), Category::PageReference);
        assert_eq!(kind.referenced_page(), Some(NodeId(7)));
        assert_eq!(kind.start_node(), None);

        let folder = NodeKind::ReferenceFolder { start_node: Some(NodeId(3)) };
        assert_eq!(folder.start_node(), Some(NodeId(3)));
    }

    #[test]
    fn test_display_identifier_prefers_uid() {
        let node = Node::new(1, "Home Page", NodeKind::Page);
        assert_eq!(node.display_identifier(), "Home Page");
        assert_eq!(node.with_uid("home").display_identifier(), "home");
    }
}
