//! Canonical field resolution for arbitrary inbound payloads
//!
//! Each webhook can rename canonical fields through its alias table
//! (`settings.fieldMapping`). Resolution order for a field is: the aliased
//! key, the canonical key itself, then the field's fallback names. Values
//! that are null or blank count as missing.

use std::collections::BTreeMap;

use leadflow_domain::constants::UNKNOWN_LEAD_NAME;
use leadflow_domain::{LeadPriority, LeadStatus, UtmAttribution};
use serde_json::{Map, Value};

/// Parsed inbound payload
pub type Payload = Map<String, Value>;

/// Lead and company attributes understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Company,
    Website,
    Address,
    City,
    PostalCode,
    Country,
    Message,
    Subject,
    Status,
    Priority,
    PlaceId,
    Rating,
    ReviewCount,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmTerm,
    UtmContent,
}

impl CanonicalField {
    pub const ALL: [Self; 23] = [
        Self::FirstName,
        Self::LastName,
        Self::FullName,
        Self::Email,
        Self::Phone,
        Self::Company,
        Self::Website,
        Self::Address,
        Self::City,
        Self::PostalCode,
        Self::Country,
        Self::Message,
        Self::Subject,
        Self::Status,
        Self::Priority,
        Self::PlaceId,
        Self::Rating,
        Self::ReviewCount,
        Self::UtmSource,
        Self::UtmMedium,
        Self::UtmCampaign,
        Self::UtmTerm,
        Self::UtmContent,
    ];

    /// Key in the alias table, which is also the default payload name.
    pub const fn key(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::FullName => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Company => "company",
            Self::Website => "website",
            Self::Address => "address",
            Self::City => "city",
            Self::PostalCode => "postalCode",
            Self::Country => "country",
            Self::Message => "message",
            Self::Subject => "subject",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::PlaceId => "placeId",
            Self::Rating => "rating",
            Self::ReviewCount => "reviewCount",
            Self::UtmSource => "utmSource",
            Self::UtmMedium => "utmMedium",
            Self::UtmCampaign => "utmCampaign",
            Self::UtmTerm => "utmTerm",
            Self::UtmContent => "utmContent",
        }
    }

    /// Names tried after the default, in order.
    pub const fn fallbacks(self) -> &'static [&'static str] {
        match self {
            Self::FirstName => &["first_name", "firstname", "vorname"],
            Self::LastName => &["last_name", "lastname", "nachname"],
            Self::FullName => &["full_name", "fullName", "contact_name"],
            Self::Email => &["e-mail", "mail", "email_address", "emailAddress"],
            Self::Phone => &["telefon", "phone_number", "phoneNumber", "tel", "mobile"],
            Self::Company => {
                &["companyName", "company_name", "firma", "business_name", "organization"]
            }
            Self::Website => &["url", "homepage", "webseite"],
            Self::Address => &["street", "strasse", "adresse"],
            Self::City => &["ort", "stadt", "town"],
            Self::PostalCode => &["postal_code", "zip", "plz"],
            Self::Country => &["land"],
            Self::Message => &["nachricht", "comments", "comment", "text"],
            Self::Subject => &["betreff", "topic"],
            Self::Status => &["lead_status"],
            Self::Priority => &["prioritaet"],
            Self::PlaceId => &["place_id", "externalPlaceId", "google_place_id"],
            Self::Rating => &["bewertung"],
            Self::ReviewCount => &["review_count", "reviews"],
            Self::UtmSource => &["utm_source"],
            Self::UtmMedium => &["utm_medium"],
            Self::UtmCampaign => &["utm_campaign"],
            Self::UtmTerm => &["utm_term"],
            Self::UtmContent => &["utm_content"],
        }
    }
}

/// Resolve one canonical field.
///
/// Tries `aliases[canonical]`, then `canonical` itself, then each of
/// `fallbacks`. The first present, non-blank value wins. Never fails.
pub fn resolve<'p>(
    payload: &'p Payload,
    aliases: &BTreeMap<String, String>,
    canonical: &str,
    fallbacks: &[&str],
) -> Option<&'p Value> {
    let aliased = aliases.get(canonical).map(String::as_str);
    aliased
        .into_iter()
        .chain(std::iter::once(canonical))
        .chain(fallbacks.iter().copied())
        .find_map(|name| payload.get(name).filter(|value| is_present(value)))
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Display name from the resolved name parts.
///
/// Both first and last name → "first last"; only one → that one; else the
/// full name, then the company name, then "Unbekannt".
pub fn assemble_name(
    first: Option<&str>,
    last: Option<&str>,
    full: Option<&str>,
    company: Option<&str>,
) -> String {
    match (first, last) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(only), None) | (None, Some(only)) => only.to_string(),
        (None, None) => full.or(company).unwrap_or(UNKNOWN_LEAD_NAME).to_string(),
    }
}

/// Lead attributes extracted from a payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedLead {
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: Option<LeadStatus>,
    pub priority: Option<LeadPriority>,
    pub utm: UtmAttribution,
    pub subject: Option<String>,
    pub message: Option<String>,
}

/// Company attributes extracted from a payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedCompany {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}

/// Field mapper bound to one payload and one alias table
pub struct FieldMapper<'a> {
    payload: &'a Payload,
    aliases: &'a BTreeMap<String, String>,
}

impl<'a> FieldMapper<'a> {
    pub fn new(payload: &'a Payload, aliases: &'a BTreeMap<String, String>) -> Self {
        Self { payload, aliases }
    }

    pub fn value(&self, field: CanonicalField) -> Option<&'a Value> {
        resolve(self.payload, self.aliases, field.key(), field.fallbacks())
    }

    /// Resolved value as trimmed text. Numbers and booleans are rendered;
    /// arrays and objects are not text.
    pub fn text(&self, field: CanonicalField) -> Option<String> {
        match self.value(field)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn number(&self, field: CanonicalField) -> Option<f64> {
        match self.value(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
    }

    pub fn lead_name(&self) -> String {
        assemble_name(
            self.text(CanonicalField::FirstName).as_deref(),
            self.text(CanonicalField::LastName).as_deref(),
            self.text(CanonicalField::FullName).as_deref(),
            self.text(CanonicalField::Company).as_deref(),
        )
    }

    pub fn map_lead(&self) -> MappedLead {
        MappedLead {
            name: self.lead_name(),
            first_name: self.text(CanonicalField::FirstName),
            last_name: self.text(CanonicalField::LastName),
            email: self.text(CanonicalField::Email),
            phone: self.text(CanonicalField::Phone),
            status: self.text(CanonicalField::Status).and_then(|s| s.parse().ok()),
            priority: self.text(CanonicalField::Priority).and_then(|s| s.parse().ok()),
            utm: UtmAttribution {
                utm_source: self.text(CanonicalField::UtmSource),
                utm_medium: self.text(CanonicalField::UtmMedium),
                utm_campaign: self.text(CanonicalField::UtmCampaign),
                utm_term: self.text(CanonicalField::UtmTerm),
                utm_content: self.text(CanonicalField::UtmContent),
            },
            subject: self.text(CanonicalField::Subject),
            message: self.text(CanonicalField::Message),
        }
    }

    pub fn map_company(&self) -> MappedCompany {
        #[allow(clippy::cast_possible_truncation)]
        let review_count =
            self.number(CanonicalField::ReviewCount).filter(|n| n.is_finite()).map(|n| n as i64);

        MappedCompany {
            place_id: self.text(CanonicalField::PlaceId),
            name: self.text(CanonicalField::Company),
            email: self.text(CanonicalField::Email),
            phone: self.text(CanonicalField::Phone),
            website: self.text(CanonicalField::Website),
            address: self.text(CanonicalField::Address),
            city: self.text(CanonicalField::City),
            postal_code: self.text(CanonicalField::PostalCode),
            country: self.text(CanonicalField::Country),
            rating: self.number(CanonicalField::Rating),
            review_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test payloads are objects"),
        }
    }

    fn aliases(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    #[test]
    fn alias_wins_over_default_and_fallbacks() {
        let p = payload(json!({ "vorname": "Fallback", "firstName": "Default", "fn": "Alias" }));
        let a = aliases(&[("firstName", "fn")]);
        assert_eq!(resolve(&p, &a, "firstName", &["vorname"]), Some(&json!("Alias")));
    }

    #[test]
    fn default_name_used_when_alias_missing_from_payload() {
        let p = payload(json!({ "vorname": "Fallback", "firstName": "Default" }));
        let a = aliases(&[("firstName", "fn")]);
        assert_eq!(resolve(&p, &a, "firstName", &["vorname"]), Some(&json!("Default")));
    }

    #[test]
    fn fallbacks_tried_in_order() {
        let p = payload(json!({ "mail": "second@x.test", "e-mail": "first@x.test" }));
        let a = BTreeMap::new();
        assert_eq!(
            resolve(&p, &a, "email", CanonicalField::Email.fallbacks()),
            Some(&json!("first@x.test"))
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        let p = payload(json!({ "fn": "  ", "firstName": null, "vorname": "Max" }));
        let a = aliases(&[("firstName", "fn")]);
        assert_eq!(resolve(&p, &a, "firstName", &["vorname"]), Some(&json!("Max")));
        assert_eq!(resolve(&p, &a, "lastName", &["nachname"]), None);
    }

    #[test]
    fn name_assembly_order() {
        assert_eq!(assemble_name(Some("Max"), Some("Muster"), Some("X"), Some("Y")), "Max Muster");
        assert_eq!(assemble_name(Some("Max"), None, Some("X"), None), "Max");
        assert_eq!(assemble_name(None, Some("Muster"), None, None), "Muster");
        assert_eq!(assemble_name(None, None, Some("Max M."), Some("Acme")), "Max M.");
        assert_eq!(assemble_name(None, None, None, Some("Acme")), "Acme");
        assert_eq!(assemble_name(None, None, None, None), "Unbekannt");
    }

    #[test]
    fn maps_lead_with_aliases_and_german_fallbacks() {
        let p = payload(json!({
            "vorname": "Max",
            "nachname": "Mustermann",
            "e-mail": "max@example.com",
            "telefon": 491701234567_u64,
            "status": "contacted",
            "priority": "urgent",
            "utm_source": "newsletter"
        }));
        let a = BTreeMap::new();
        let lead = FieldMapper::new(&p, &a).map_lead();

        assert_eq!(lead.name, "Max Mustermann");
        assert_eq!(lead.email.as_deref(), Some("max@example.com"));
        assert_eq!(lead.phone.as_deref(), Some("491701234567"));
        assert_eq!(lead.status, Some(LeadStatus::Contacted));
        assert_eq!(lead.priority, None);
        assert_eq!(lead.utm.utm_source.as_deref(), Some("newsletter"));
    }

    #[test]
    fn maps_company_numbers_from_strings() {
        let p = payload(json!({ "firma": "Acme", "rating": "4,5", "reviews": 12, "plz": "10115" }));
        let a = BTreeMap::new();
        let company = FieldMapper::new(&p, &a).map_company();

        assert_eq!(company.name.as_deref(), Some("Acme"));
        assert_eq!(company.rating, Some(4.5));
        assert_eq!(company.review_count, Some(12));
        assert_eq!(company.postal_code.as_deref(), Some("10115"));
        assert_eq!(company.place_id, None);
    }

    #[test]
    fn every_canonical_field_has_distinct_key() {
        let mut keys: Vec<_> = CanonicalField::ALL.iter().map(|f| f.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), CanonicalField::ALL.len());
    }
}
