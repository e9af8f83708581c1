use serde::{Deserialize, Serialize};

/// Named entities picked out of the document text.
///
/// Every field defaults to an empty list when the model omits it; a partially
/// filled entity block is normal output, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityData {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// One table reconstructed from the document.
///
/// All cells are strings after normalization. Row width is not required to
/// match the header count; rows pass through as the model produced them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableData {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
}

/// Final outcome of normalizing one model reply.
///
/// On failure `success` is false, `entities`/`tables` hold the all-empty
/// defaults, and `error` carries a diagnostic that embeds the raw offending
/// content where it was available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub entities: EntityData,
    pub tables: Vec<TableData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn ok(entities: EntityData, tables: Vec<TableData>) -> Self {
        Self {
            success: true,
            entities,
            tables,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            entities: EntityData::default(),
            tables: Vec::new(),
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_omitted_on_success() {
        let result = ExtractionResult::ok(EntityData::default(), vec![]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failure_carries_defaults_and_message() {
        let result = ExtractionResult::failure("no content in response");
        assert!(!result.success);
        assert_eq!(result.entities, EntityData::default());
        assert!(result.tables.is_empty());
        assert_eq!(result.error.as_deref(), Some("no content in response"));
    }

    #[test]
    fn missing_fields_deserialize_to_empty() {
        let entities: EntityData = serde_json::from_str(r#"{"names":["Alice"]}"#).unwrap();
        assert_eq!(entities.names, vec!["Alice"]);
        assert!(entities.dates.is_empty());
        assert!(entities.addresses.is_empty());
    }
}
