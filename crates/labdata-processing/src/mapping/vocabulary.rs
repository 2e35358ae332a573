use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};

/// Canonical surveillance template fields, in output order.
pub const STANDARD_FIELDS: [&str; 38] = [
    "End of Year data",
    "Country",
    "Unique ID",
    "Specimen number",
    "Institution",
    "Age in years",
    "Gender",
    "Specimen type",
    "Specimen date",
    "Location type",
    "Department",
    "Organism",
    "AmpicillinSIR",
    "Amoxicillin-ClavSIR",
    "CefuroximeSIR",
    "CefotximeSIR",
    "AmikacinSIR",
    "CeftriaxoneSIR",
    "CefoxitinSIR",
    "CeftazidimeSIR",
    "AmoxicillinSIR",
    "TigecyclineSIR",
    "MeropenemSIR",
    "GentamicinSIR",
    "TetracyclineSIR",
    "CiprofloxacinSIR",
    "LEV-5",
    "PRL",
    "Co-trimoxasoleSIR",
    "FEP-30",
    "PenicillinSIR",
    "ErythromycinSIR",
    "ChloramphenicolSIR",
    "ClindamycinSIR",
    "AzithromycinSIR",
    "Neomycin",
    "Tobramycin",
    "TZP",
];

/// Ordered target field names: standard fields first, then custom fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetVocabulary {
    standard: Vec<String>,
    custom: Vec<String>,
}

impl Default for TargetVocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

impl TargetVocabulary {
    /// The surveillance template vocabulary without custom fields.
    pub fn standard() -> Self {
        Self {
            standard: STANDARD_FIELDS.iter().map(|f| f.to_string()).collect(),
            custom: Vec::new(),
        }
    }

    /// Build a vocabulary from an arbitrary ordered field list.
    pub fn new<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self {
            standard: Vec::new(),
            custom: Vec::new(),
        };
        for field in fields {
            let field = Self::checked_name(field.into())?;
            if vocabulary.contains(&field) {
                return Err(ProcessingError::InvalidMapping(format!(
                    "Duplicate target field '{}'",
                    field
                )));
            }
            vocabulary.standard.push(field);
        }
        Ok(vocabulary)
    }

    /// Append a user-defined target field after the standard ones.
    pub fn add_custom_field(&mut self, name: impl Into<String>) -> Result<()> {
        let name = Self::checked_name(name.into())?;
        if self.contains(&name) {
            return Err(ProcessingError::InvalidMapping(format!(
                "Target field '{}' already exists",
                name
            )));
        }
        self.custom.push(name);
        Ok(())
    }

    /// Builder-style variant of [`add_custom_field`](Self::add_custom_field).
    pub fn with_custom_field(mut self, name: impl Into<String>) -> Result<Self> {
        self.add_custom_field(name)?;
        Ok(self)
    }

    fn checked_name(name: String) -> Result<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ProcessingError::InvalidMapping(
                "Target field name cannot be empty".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }

    pub fn standard_fields(&self) -> &[String] {
        &self.standard
    }

    pub fn custom_fields(&self) -> &[String] {
        &self.custom
    }

    /// All fields in output order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.standard
            .iter()
            .chain(self.custom.iter())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.standard.len() + self.custom.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_vocabulary_order() {
        let vocabulary = TargetVocabulary::standard();
        assert_eq!(vocabulary.len(), 38);
        let fields: Vec<&str> = vocabulary.fields().collect();
        assert_eq!(fields[0], "End of Year data");
        assert_eq!(fields[11], "Organism");
        assert_eq!(fields[37], "TZP");
    }

    #[test]
    fn test_custom_fields_follow_standard() {
        let vocabulary = TargetVocabulary::standard()
            .with_custom_field("Ward code")
            .unwrap();
        assert_eq!(vocabulary.fields().last(), Some("Ward code"));
        assert_eq!(vocabulary.custom_fields(), &["Ward code".to_string()]);
    }

    #[test]
    fn test_custom_field_rejects_duplicates_and_blanks() {
        let mut vocabulary = TargetVocabulary::standard();
        assert!(vocabulary.add_custom_field("Organism").is_err());
        assert!(vocabulary.add_custom_field("   ").is_err());
        vocabulary.add_custom_field("Ward code").unwrap();
        assert!(vocabulary.add_custom_field("Ward code").is_err());
    }

    #[test]
    fn test_new_rejects_duplicate_fields() {
        assert!(TargetVocabulary::new(["A", "B"]).is_ok());
        assert!(TargetVocabulary::new(["A", "A"]).is_err());
    }
}
