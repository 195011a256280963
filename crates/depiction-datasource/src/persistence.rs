//! Ledger entries.

use crate::guid::Guid;
use crate::scene::EntityHandle;
use serde::{Deserialize, Serialize};

/// The four operation kinds a datasource can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Save,
    Synchronize,
    Delete,
    Load,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::Synchronize => "synchronize",
            Self::Delete => "delete",
            Self::Load => "load",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Save/synchronize/delete support flags. Load has no flag: every
/// datasource can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCapabilities {
    pub save: bool,
    pub synchronize: bool,
    pub delete: bool,
}

impl Default for OperationCapabilities {
    fn default() -> Self {
        Self::ALL
    }
}

impl OperationCapabilities {
    pub const ALL: Self = Self {
        save: true,
        synchronize: true,
        delete: true,
    };

    pub const NONE: Self = Self {
        save: false,
        synchronize: false,
        delete: false,
    };

    pub fn supports(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Save => self.save,
            OperationKind::Synchronize => self.synchronize,
            OperationKind::Delete => self.delete,
            OperationKind::Load => true,
        }
    }
}

/// What a datasource knows about one tracked entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceData {
    handle: EntityHandle,
    id: Guid,
    capabilities: OperationCapabilities,
    out_of_sync: bool,
}

impl PersistenceData {
    pub fn new(handle: EntityHandle, id: Guid, capabilities: OperationCapabilities) -> Self {
        Self {
            handle,
            id,
            capabilities,
            out_of_sync: false,
        }
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn id(&self) -> Guid {
        self.id
    }

    pub fn capabilities(&self) -> OperationCapabilities {
        self.capabilities
    }

    /// Local changes not yet confirmed by the datasource.
    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync
    }

    pub fn set_out_of_sync(&mut self, out_of_sync: bool) {
        self.out_of_sync = out_of_sync;
    }

    /// Entries holding unsaved changes are never evicted.
    pub fn can_be_auto_disposed(&self) -> bool {
        !self.out_of_sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_is_always_supported() {
        assert!(OperationCapabilities::NONE.supports(OperationKind::Load));
        assert!(!OperationCapabilities::NONE.supports(OperationKind::Save));
        let save_only = OperationCapabilities {
            save: true,
            ..OperationCapabilities::NONE
        };
        assert!(save_only.supports(OperationKind::Save));
        assert!(!save_only.supports(OperationKind::Delete));
    }
}
