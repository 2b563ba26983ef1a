use serde::{Deserialize, Serialize};

/// Kind of metadata object an identifier-based reference points to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectType {
    DisplayForm,
    Attribute,
    Measure,
    Insight,
    Dashboard,
    Widget,
    Dataset,
}

/// Reference to a metadata object on the analytical backend
///
/// Objects can be referenced either by their identifier (optionally typed)
/// or by their URI. Two references denote the same object when
/// [`ObjRef::same_object`] says so; derived equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjRef {
    Identifier {
        identifier: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        object_type: Option<ObjectType>,
    },
    Uri {
        uri: String,
    },
}

impl ObjRef {
    /// Untyped identifier reference
    pub fn id(identifier: impl Into<String>) -> Self {
        ObjRef::Identifier {
            identifier: identifier.into(),
            object_type: None,
        }
    }

    /// Typed identifier reference
    pub fn typed(object_type: ObjectType, identifier: impl Into<String>) -> Self {
        ObjRef::Identifier {
            identifier: identifier.into(),
            object_type: Some(object_type),
        }
    }

    /// URI reference
    pub fn uri(uri: impl Into<String>) -> Self {
        ObjRef::Uri { uri: uri.into() }
    }

    /// Compare two references by the object they denote
    ///
    /// Identifier references match when the identifiers match and the types
    /// do not contradict each other (a missing type matches any type).
    pub fn same_object(&self, other: &ObjRef) -> bool {
        match (self, other) {
            (
                ObjRef::Identifier {
                    identifier: a,
                    object_type: ta,
                },
                ObjRef::Identifier {
                    identifier: b,
                    object_type: tb,
                },
            ) => a == b && (ta.is_none() || tb.is_none() || ta == tb),
            (ObjRef::Uri { uri: a }, ObjRef::Uri { uri: b }) => a == b,
            _ => false,
        }
    }

    /// Stable textual key, used for hashing and generated identifiers
    pub fn key(&self) -> String {
        match self {
            ObjRef::Identifier { identifier, .. } => format!("id:{}", identifier),
            ObjRef::Uri { uri } => format!("uri:{}", uri),
        }
    }
}

impl std::fmt::Display for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjRef::Identifier {
                identifier,
                object_type: Some(t),
            } => write!(f, "{:?}:{}", t, identifier),
            ObjRef::Identifier { identifier, .. } => write!(f, "{}", identifier),
            ObjRef::Uri { uri } => write!(f, "{}", uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_object_ignores_missing_type() {
        let typed = ObjRef::typed(ObjectType::DisplayForm, "label.region");
        let untyped = ObjRef::id("label.region");
        assert!(typed.same_object(&untyped));
        assert!(untyped.same_object(&typed));
    }

    #[test]
    fn test_same_object_rejects_conflicting_types() {
        let df = ObjRef::typed(ObjectType::DisplayForm, "x");
        let attr = ObjRef::typed(ObjectType::Attribute, "x");
        assert!(!df.same_object(&attr));
    }

    #[test]
    fn test_uri_never_matches_identifier() {
        assert!(!ObjRef::uri("/gdc/md/1").same_object(&ObjRef::id("/gdc/md/1")));
    }

    #[test]
    fn test_wire_shapes() {
        let json = serde_json::to_value(ObjRef::typed(ObjectType::DisplayForm, "a")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"identifier": "a", "type": "displayForm"})
        );

        let uri: ObjRef = serde_json::from_value(serde_json::json!({"uri": "/gdc/md/2"})).unwrap();
        assert_eq!(uri, ObjRef::uri("/gdc/md/2"));
    }
}
