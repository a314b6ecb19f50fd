use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_COUNTRY: &str = "US";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisitorType {
    #[default]
    Individual,
    Family,
    Group,
    Educational,
    Corporate,
    Senior,
}

impl VisitorType {
    pub const ALL: [VisitorType; 6] = [
        VisitorType::Individual,
        VisitorType::Family,
        VisitorType::Group,
        VisitorType::Educational,
        VisitorType::Corporate,
        VisitorType::Senior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisitorType::Individual => "individual",
            VisitorType::Family => "family",
            VisitorType::Group => "group",
            VisitorType::Educational => "educational",
            VisitorType::Corporate => "corporate",
            VisitorType::Senior => "senior",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// Visitor details exactly as typed into the booking form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitorData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub visitor_type: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

impl VisitorData {
    /// Builds the payload sent to the backend. Blank optional fields are
    /// left out and the backend defaults are filled in.
    ///
    /// Call only after `validate_visitor_data` passed; an unknown visitor type
    /// falls back to `individual`.
    pub fn to_new_visitor(&self) -> NewVisitor {
        NewVisitor {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: non_blank(&self.phone),
            organization: non_blank(&self.organization),
            visitor_type: self
                .visitor_type
                .as_deref()
                .and_then(VisitorType::parse)
                .unwrap_or_default(),
            special_requirements: non_blank(&self.special_requirements),
            country: non_blank(&self.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewVisitor {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub visitor_type: VisitorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requirements: Option<String>,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub visitor_type: VisitorType,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_new_visitor_applies_defaults() {
        let data = VisitorData {
            name: "  Grace Hopper ".to_string(),
            email: "grace@navy.mil".to_string(),
            phone: Some("   ".to_string()),
            organization: Some(String::new()),
            special_requirements: None,
            visitor_type: None,
            country: None,
        };
        let visitor = data.to_new_visitor();
        assert_eq!(visitor.name, "Grace Hopper");
        assert_eq!(visitor.phone, None);
        assert_eq!(visitor.organization, None);
        assert_eq!(visitor.visitor_type, VisitorType::Individual);
        assert_eq!(visitor.country, "US");

        let json = serde_json::to_value(&visitor).unwrap();
        assert!(json.get("phone").is_none());
        assert_eq!(json["visitorType"], "individual");
    }

    #[test]
    fn test_to_new_visitor_keeps_values() {
        let data = VisitorData {
            name: "Class 4B".to_string(),
            email: "teacher@school.edu".to_string(),
            phone: Some("+63 912 345 6789".to_string()),
            organization: Some("Riverside Elementary".to_string()),
            special_requirements: Some("Wheelchair access".to_string()),
            visitor_type: Some("educational".to_string()),
            country: Some("PH".to_string()),
        };
        let visitor = data.to_new_visitor();
        assert_eq!(visitor.visitor_type, VisitorType::Educational);
        assert_eq!(visitor.country, "PH");
        assert_eq!(visitor.organization.as_deref(), Some("Riverside Elementary"));
    }

    #[test]
    fn test_visitor_type_parse() {
        assert_eq!(VisitorType::parse("senior"), Some(VisitorType::Senior));
        assert_eq!(VisitorType::parse("Senior"), None);
        assert_eq!(VisitorType::parse(""), None);
    }
}
