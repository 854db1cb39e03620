use serde::{de::DeserializeOwned, Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(EntityId);

/// A remotely stored record that can be edited through the client editor.
///
/// An absent id marks the entity as "new": it exists only locally until the
/// remote service confirms creation and assigns an identifier.
pub trait Entity:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn id(&self) -> Option<EntityId>;

    /// Human-readable name used in prompts and notifications.
    fn label(&self) -> String;

    /// Blank instance edited in add-mode before the first save.
    fn template() -> Self;

    /// Canonical state combined with draft edits; the draft wins on every
    /// field. The draft starts as a clone of the canonical state, so fields
    /// the user never touched already match.
    fn merged_with(&self, draft: &Self) -> Self {
        draft.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Entity for Vehicle {
    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn template() -> Self {
        Self {
            id: None,
            name: String::new(),
            kind: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_template_has_no_identity_and_empty_fields() {
        let template = Vehicle::template();
        assert_eq!(template.id, None);
        assert!(template.name.is_empty());
        assert!(template.kind.is_empty());
    }

    #[test]
    fn merged_with_prefers_every_draft_field() {
        let canonical = Vehicle {
            id: Some(EntityId(5)),
            name: "Car".to_string(),
            kind: "land".to_string(),
        };
        let mut draft = canonical.clone();
        draft.name = "Truck".to_string();

        let merged = canonical.merged_with(&draft);
        assert_eq!(merged.id, Some(EntityId(5)));
        assert_eq!(merged.name, "Truck");
        assert_eq!(merged.kind, "land");
    }

    #[test]
    fn vehicle_serializes_kind_under_type_key() {
        let vehicle = Vehicle {
            id: Some(EntityId(1)),
            name: "Shuttle".to_string(),
            kind: "space".to_string(),
        };
        let json = serde_json::to_value(&vehicle).expect("serialize");
        assert_eq!(json["type"], "space");
        assert_eq!(json["id"], 1);
    }

    #[test]
    fn vehicle_without_id_omits_the_field() {
        let json = serde_json::to_value(Vehicle::template()).expect("serialize");
        assert!(json.get("id").is_none());
    }
}
