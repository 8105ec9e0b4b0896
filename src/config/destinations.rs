use crate::domain::model::Destination;
use crate::utils::error::{BotError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive, validate_range, validate_unique, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

const EMBEDDED_TABLE: &str = include_str!("destinations.toml");

/// 有序的發送目標清單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationTable {
    pub destinations: Vec<Destination>,
}

impl DestinationTable {
    /// 內建的目標清單
    pub fn embedded() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_TABLE)
    }

    /// 從 TOML 檔案載入，取代內建清單
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: Self = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn as_slice(&self) -> &[Destination] {
        &self.destinations
    }
}

impl Validate for DestinationTable {
    fn validate(&self) -> Result<()> {
        if self.destinations.is_empty() {
            return Err(BotError::ConfigError {
                message: "destination table has no [[destinations]] entries".to_string(),
            });
        }
        for (i, d) in self.destinations.iter().enumerate() {
            validate_non_empty_string(&format!("destinations[{}].id", i), &d.id)?;
            validate_range(&format!("destinations[{}].latitude", i), d.latitude, -90.0, 90.0)?;
            validate_range(&format!("destinations[{}].longitude", i), d.longitude, -180.0, 180.0)?;
            validate_positive(&format!("destinations[{}].radius", i), d.radius)?;
        }
        validate_unique("destinations.id", self.destinations.iter().map(|d| d.id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_table_loads() {
        let table = DestinationTable::embedded().unwrap();

        assert_eq!(table.len(), 77);
        let first = &table.as_slice()[0];
        assert_eq!(first.id, "@Aeroport_Chat");
        assert_eq!(first.label, "Аэропорт");
        assert_eq!(first.radius, 1500.0);

        let fili = &table.as_slice()[2];
        assert_eq!(fili.latitude, 55.745093);
        assert_eq!(fili.longitude, 37.495266);
        assert_eq!(table.as_slice()[2].id, "@ChatFili");
    }

    #[test]
    fn test_table_from_file_accepts_integer_radius() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[destinations]]
id = "@Test_Chat"
latitude = 55.0
longitude = 37.0
radius = 800
label = "Тест"
"#
        )
        .unwrap();

        let table = DestinationTable::from_file(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.as_slice()[0].radius, 800.0);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let content = r#"
[[destinations]]
id = "@a"
latitude = 55.0
longitude = 37.0
radius = 100.0
label = "A"

[[destinations]]
id = "@a"
latitude = 55.1
longitude = 37.1
radius = 100.0
label = "A2"
"#;
        let err = DestinationTable::from_toml_str(content).unwrap_err();
        assert!(matches!(err, BotError::InvalidConfigValueError { ref value, .. } if value == "@a"));
    }

    #[test]
    fn test_non_positive_radius_is_rejected() {
        let content = r#"
[[destinations]]
id = "@a"
latitude = 55.0
longitude = 37.0
radius = 0.0
label = "A"
"#;
        assert!(DestinationTable::from_toml_str(content).is_err());
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let err = DestinationTable::from_toml_str("destinations = []").unwrap_err();
        assert!(matches!(err, BotError::ConfigError { .. }));
    }

    #[test]
    fn test_malformed_table_is_toml_error() {
        let err = DestinationTable::from_toml_str("[[destinations]]\nid = 5").unwrap_err();
        assert!(matches!(err, BotError::TomlError(_)));
    }
}
