use serde::Deserialize;
use serde::Serialize;

/// One remote object held in a watch cache.
///
/// The payload is opaque to the engine; identity is (namespace, name) within
/// one (context, kind) cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiObject {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub resource_version: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ApiObject {
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
            uid: None,
            resource_version: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(
        mut self,
        payload: serde_json::Value,
    ) -> Self {
        self.payload = payload;
        self
    }

    pub fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
        }
    }
}

/// Identity of one object within a (context, kind) cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub name: String,
    pub namespace: Option<String>,
}

impl ObjectRef {
    pub fn new(
        name: impl Into<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }
}
