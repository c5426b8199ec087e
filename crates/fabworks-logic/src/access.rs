//! Store access modes and the rules that evaluate them.
//!
//! A store carries one [`AccessMode`]; whether a given requester may view or
//! mutate it depends only on the mode and on whether the requester resolves
//! to the store's controlling identity. Identity resolution itself lives in
//! the simulation core — these rules are pure.

use serde::{Deserialize, Serialize};

/// Who may see and mutate a store's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Anyone may view and mutate.
    Public,
    /// Anyone may view; only the owner may mutate.
    ViewOnly,
    /// Only the owner may view or mutate.
    Private,
}

impl Default for AccessMode {
    fn default() -> Self {
        AccessMode::Public
    }
}

/// Whether a requester may view the contents.
pub fn mode_allows_view(mode: AccessMode, is_owner: bool) -> bool {
    match mode {
        AccessMode::Public | AccessMode::ViewOnly => true,
        AccessMode::Private => is_owner,
    }
}

/// Whether a requester may mutate the contents.
pub fn mode_allows_modify(mode: AccessMode, is_owner: bool) -> bool {
    match mode {
        AccessMode::Public => true,
        AccessMode::ViewOnly => is_owner,
        AccessMode::Private => is_owner,
    }
}
