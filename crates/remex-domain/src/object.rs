use serde::{Deserialize, Serialize};

use crate::ids::ObjectId;
use crate::key::VerifyKey;
use crate::permissions::PermissionMap;
use crate::value::DynValue;

/// Handle naming an operand that is resolved from the store at execution
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectReference {
    pub id_at_location: ObjectId,
}

impl ObjectReference {
    #[must_use]
    pub const fn new(id_at_location: ObjectId) -> Self {
        Self { id_at_location }
    }
}

impl From<ObjectId> for ObjectReference {
    fn from(id: ObjectId) -> Self {
        Self::new(id)
    }
}

/// Unit of storage: a payload plus who may read it.
#[derive(Clone, Debug, PartialEq)]
pub struct StorableObject {
    pub id: ObjectId,
    pub data: DynValue,
    pub read_permissions: PermissionMap,
    pub tags: Vec<String>,
    pub description: String,
}

impl StorableObject {
    pub fn new(id: ObjectId, data: impl Into<DynValue>) -> Self {
        Self {
            id,
            data: data.into(),
            read_permissions: PermissionMap::new(),
            tags: Vec::new(),
            description: String::new(),
        }
    }

    #[must_use]
    pub fn with_permissions(mut self, read_permissions: PermissionMap) -> Self {
        self.read_permissions = read_permissions;
        self
    }

    /// Grant `reader` access, recording `provenance` as the granting object.
    #[must_use]
    pub fn readable_by(mut self, reader: VerifyKey, provenance: ObjectId) -> Self {
        self.read_permissions.insert(reader, provenance);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn can_read(&self, reader: &VerifyKey) -> bool {
        self.read_permissions.contains_key(reader)
    }
}
