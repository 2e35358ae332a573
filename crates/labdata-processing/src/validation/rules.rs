use serde::{Deserialize, Serialize};

/// One check applied to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// The column must exist and hold no nulls.
    Required,
    /// No non-null value may repeat.
    Unique,
    /// Values must match the regex at their start.
    Pattern(String),
    /// Values must be one of the listed strings.
    AllowedValues(Vec<String>),
    /// Values must be numeric and lie within the bounds.
    NumericRange { min: Option<f64>, max: Option<f64> },
    /// Values must parse as dates, optionally not after the reference time.
    Date { not_future: bool },
    /// Values must not be null, empty or whitespace.
    NonEmpty,
    /// Values must have at least this many characters.
    MinLength(usize),
}

/// Ordered constraints for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub constraints: Vec<Constraint>,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, constraints: Vec<Constraint>) -> Self {
        Self {
            field: field.into(),
            constraints,
        }
    }

    pub fn is_required(&self) -> bool {
        self.constraints.contains(&Constraint::Required)
    }
}

/// Ordered rule table evaluated by the [`Validator`](super::Validator).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<FieldRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field rule. A later rule for the same field replaces the earlier one.
    pub fn field(mut self, name: impl Into<String>, constraints: Vec<Constraint>) -> Self {
        let rule = FieldRule::new(name, constraints);
        match self.rules.iter_mut().find(|r| r.field == rule.field) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    /// Rules for the core surveillance fields.
    pub fn surveillance_defaults() -> Self {
        Self::new()
            .field(
                "Patient_ID",
                vec![
                    Constraint::Required,
                    Constraint::Unique,
                    Constraint::Pattern("^[A-Z0-9-]+$".to_string()),
                ],
            )
            .field(
                "Age",
                vec![
                    Constraint::Required,
                    Constraint::NumericRange {
                        min: Some(0.0),
                        max: Some(120.0),
                    },
                ],
            )
            .field(
                "Gender",
                vec![
                    Constraint::Required,
                    Constraint::AllowedValues(
                        ["M", "F", "O", "U"].iter().map(|s| s.to_string()).collect(),
                    ),
                ],
            )
            .field(
                "Date_of_Admission",
                vec![Constraint::Required, Constraint::Date { not_future: true }],
            )
            .field(
                "Specimen_Type",
                vec![Constraint::Required, Constraint::NonEmpty],
            )
            .field("Organism", vec![Constraint::Required, Constraint::NonEmpty])
    }

    pub fn get(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter()
    }

    /// Fields marked [`Constraint::Required`], in rule order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(|r| r.is_required())
            .map(|r| r.field.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
