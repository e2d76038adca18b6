use std::fmt;

use serde::{Deserialize, Serialize};

/// A node's part in bringing the network up, derived from its index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRole {
    /// Index 0: authors the genesis state and membership roster.
    Genesis,
    /// Index > 0: joins by peering with every earlier node.
    Follower(usize),
}

impl NodeRole {
    /// Role played by the node at `index`.
    pub fn for_index(index: usize) -> Self {
        match index {
            0 => Self::Genesis,
            i => Self::Follower(i),
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, Self::Genesis)
    }

    /// Whether a node at `index` may play this role.
    pub fn matches_index(&self, index: usize) -> bool {
        match self {
            Self::Genesis => index == 0,
            Self::Follower(i) => *i == index && index > 0,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Genesis => write!(f, "genesis"),
            Self::Follower(i) => write!(f, "follower {i}"),
        }
    }
}
