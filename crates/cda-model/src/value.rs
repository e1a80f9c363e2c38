//! Coded and typed values as they appear in source documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::options::DEFAULT_IDENTIFIER_FORMAT;

/// A coded value (`CD`/`CE`/`CV`) exactly as seen in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodedValue {
    pub code: String,
    /// Code system OID (e.g. `2.16.840.1.113883.6.1` for LOINC).
    pub code_system: String,
    pub display_name: Option<String>,
    pub code_system_name: Option<String>,
}

impl CodedValue {
    pub fn new(code: impl Into<String>, code_system: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            code_system: code_system.into(),
            display_name: None,
            code_system_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_code_system_name(mut self, name: impl Into<String>) -> Self {
        self.code_system_name = Some(name.into());
        self
    }
}

impl fmt::Display for CodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.code_system)?;
        if let Some(display) = &self.display_name {
            write!(f, " \"{display}\"")?;
        }
        Ok(())
    }
}

/// Closed set of value shapes a clinical statement can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// Physical quantity (`PQ`, `INT`, `REAL`).
    Numeric { value: f64, unit: Option<String> },
    Coded(CodedValue),
    Text(String),
    Timestamp(DateTime<Utc>),
    /// Encapsulated data (`ED`): inline text or base64 payload.
    Complex {
        media_type: Option<String>,
        data: String,
    },
    Ratio {
        numerator: f64,
        denominator: f64,
    },
}

impl TypedValue {
    pub fn kind(&self) -> TypedValueKind {
        match self {
            TypedValue::Numeric { .. } => TypedValueKind::Numeric,
            TypedValue::Coded(_) => TypedValueKind::Coded,
            TypedValue::Text(_) => TypedValueKind::Text,
            TypedValue::Timestamp(_) => TypedValueKind::Timestamp,
            TypedValue::Complex { .. } => TypedValueKind::Complex,
            TypedValue::Ratio { .. } => TypedValueKind::Ratio,
        }
    }

    pub fn quantity(value: f64, unit: impl Into<String>) -> Self {
        TypedValue::Numeric {
            value,
            unit: Some(unit.into()),
        }
    }
}

/// Value-free shape of a [`TypedValue`]; `None` describes grouping concepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypedValueKind {
    Numeric,
    Coded,
    Text,
    Timestamp,
    Complex,
    Ratio,
    None,
}

impl fmt::Display for TypedValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TypedValueKind::Numeric => "numeric",
            TypedValueKind::Coded => "coded",
            TypedValueKind::Text => "text",
            TypedValueKind::Timestamp => "timestamp",
            TypedValueKind::Complex => "complex",
            TypedValueKind::Ratio => "ratio",
            TypedValueKind::None => "none",
        };
        f.write_str(label)
    }
}

/// `IVL_TS` effective time. A point in time is stored in `center`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub low: Option<DateTime<Utc>>,
    pub high: Option<DateTime<Utc>>,
    pub center: Option<DateTime<Utc>>,
}

impl TimeInterval {
    pub fn point(at: DateTime<Utc>) -> Self {
        Self {
            center: Some(at),
            ..Self::default()
        }
    }

    pub fn between(low: Option<DateTime<Utc>>, high: Option<DateTime<Utc>>) -> Self {
        Self {
            low,
            high,
            center: None,
        }
    }

    /// Start of the interval, preferring the point value.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.center.or(self.low)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.high
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none() && self.center.is_none()
    }
}

/// Instance identifier (`II`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId {
    pub root: String,
    pub extension: Option<String>,
}

impl ExternalId {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: None,
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Render through an identifier template with `{root}` and `{extension}`
    /// placeholders. Identifiers without an extension render as the bare root.
    pub fn format(&self, template: &str) -> String {
        match self.extension.as_deref() {
            Some(extension) if !extension.is_empty() => template
                .replace("{root}", &self.root)
                .replace("{extension}", extension),
            _ => self.root.clone(),
        }
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(DEFAULT_IDENTIFIER_FORMAT))
    }
}

/// Relationship type of an external reference (`reference/@typeCode`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceType {
    Replaces,
    Appends,
    Transforms,
    Other(String),
}

impl ReferenceType {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "RPLC" => ReferenceType::Replaces,
            "APND" => ReferenceType::Appends,
            "XFRM" => ReferenceType::Transforms,
            other => ReferenceType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ReferenceType::Replaces => "RPLC",
            ReferenceType::Appends => "APND",
            ReferenceType::Transforms => "XFRM",
            ReferenceType::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalReference {
    pub type_code: ReferenceType,
    pub id: ExternalId,
}

impl ExternalReference {
    pub fn replaces(id: ExternalId) -> Self {
        Self {
            type_code: ReferenceType::Replaces,
            id,
        }
    }

    pub fn is_replacement(&self) -> bool {
        self.type_code == ReferenceType::Replaces
    }
}

/// Act status (`statusCode/@code`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Active,
    Completed,
    Aborted,
    Suspended,
    Cancelled,
    Nullified,
    Other(String),
}

impl Status {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "active" => Status::Active,
            "completed" => Status::Completed,
            "aborted" => Status::Aborted,
            "suspended" => Status::Suspended,
            "cancelled" => Status::Cancelled,
            "nullified" => Status::Nullified,
            other => Status::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Status::Active => "active",
            Status::Completed => "completed",
            Status::Aborted => "aborted",
            Status::Suspended => "suspended",
            Status::Cancelled => "cancelled",
            Status::Nullified => "nullified",
            Status::Other(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_template_substitutes_both_parts() {
        let id = ExternalId::new("1.2.3").with_extension("A-17");
        assert_eq!(id.format("{root}^{extension}"), "1.2.3^A-17");
        assert_eq!(id.format("{extension}@{root}"), "A-17@1.2.3");
        assert_eq!(id.to_string(), "1.2.3^A-17");
    }

    #[test]
    fn identifier_without_extension_renders_root() {
        let id = ExternalId::new("9.8.7");
        assert_eq!(id.format("{root}^{extension}"), "9.8.7");
    }

    #[test]
    fn reference_type_codes_round_trip() {
        for code in ["RPLC", "APND", "XFRM"] {
            assert_eq!(ReferenceType::from_code(code).code(), code);
        }
        assert_eq!(ReferenceType::from_code("rplc"), ReferenceType::Replaces);
    }
}
