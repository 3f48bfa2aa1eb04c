//! Decrypted item content.
//!
//! An item's plaintext is a structured record: ordered sections of typed
//! fields, the web-form fields captured by the browser extensions, a list
//! of URLs, and free-text notes.  Field values are heterogeneous in JSON —
//! strings for most kinds, integers for dates, an object for addresses —
//! so the shape of `v` is driven by the sibling `k` (kind) tag.
//!
//! Order is significant everywhere and must survive a round-trip: the
//! contents hash is computed over the values in document order.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::errors::{Result, VaultError};

/// The plaintext content of a single item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ItemSection>,

    /// Web form fields, stored under the key the original apps use.
    #[serde(rename = "fields", default, skip_serializing_if = "Vec::is_empty")]
    pub form_fields: Vec<WebFormField>,

    #[serde(rename = "URLs", default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<ItemUrl>,

    #[serde(rename = "notesPlain", default, skip_serializing_if = "String::is_empty")]
    pub notes: String,

    #[serde(rename = "htmlMethod", default, skip_serializing_if = "String::is_empty")]
    pub html_method: String,

    #[serde(rename = "htmlAction", default, skip_serializing_if = "String::is_empty")]
    pub html_action: String,

    #[serde(rename = "htmlID", default, skip_serializing_if = "String::is_empty")]
    pub html_id: String,
}

/// A named, ordered group of fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemSection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ItemField>,
}

/// The kind tag that drives the JSON shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    String,
    Concealed,
    Email,
    Url,
    Date,
    MonthYear,
    Address,
    Phone,
    Cctype,
    Gender,
    Menu,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Concealed => "concealed",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Date => "date",
            FieldKind::MonthYear => "monthYear",
            FieldKind::Address => "address",
            FieldKind::Phone => "phone",
            FieldKind::Cctype => "cctype",
            FieldKind::Gender => "gender",
            FieldKind::Menu => "menu",
        }
    }
}

/// A structured street address (the one non-scalar field value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
}

/// A field value, tagged by its [`FieldKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Concealed(String),
    Email(String),
    Url(String),
    /// Unix seconds.
    Date(i64),
    /// Encoded as `yyyymm`, e.g. 201703.
    MonthYear(u32),
    Address(Address),
    Phone(String),
    CcType(String),
    Gender(String),
    Menu(String),
}

impl FieldValue {
    /// Build a value from the raw JSON `v` for a given kind.
    fn from_json(kind: FieldKind, value: Value) -> Result<FieldValue> {
        let text = |v: &Value| -> String {
            match v {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            }
        };
        Ok(match kind {
            FieldKind::String => FieldValue::String(text(&value)),
            FieldKind::Concealed => FieldValue::Concealed(text(&value)),
            FieldKind::Email => FieldValue::Email(text(&value)),
            FieldKind::Url => FieldValue::Url(text(&value)),
            FieldKind::Phone => FieldValue::Phone(text(&value)),
            FieldKind::Cctype => FieldValue::CcType(text(&value)),
            FieldKind::Gender => FieldValue::Gender(text(&value)),
            FieldKind::Menu => FieldValue::Menu(text(&value)),
            FieldKind::Date => FieldValue::Date(value.as_i64().unwrap_or_default()),
            FieldKind::MonthYear => {
                FieldValue::MonthYear(value.as_u64().unwrap_or_default() as u32)
            }
            FieldKind::Address => FieldValue::Address(
                serde_json::from_value(value)
                    .map_err(|e| VaultError::Serialization(format!("address value: {e}")))?,
            ),
        })
    }

    /// Parse a value from user input for a given kind.
    ///
    /// Dates are accepted as unix seconds, month-years as `yyyymm`.
    pub fn from_input(kind: FieldKind, input: &str) -> Result<FieldValue> {
        match kind {
            FieldKind::Date => input
                .parse::<i64>()
                .map(FieldValue::Date)
                .map_err(|_| VaultError::CommandFailed(format!("'{input}' is not a unix date"))),
            FieldKind::MonthYear => input
                .parse::<u32>()
                .map(FieldValue::MonthYear)
                .map_err(|_| {
                    VaultError::CommandFailed(format!("'{input}' is not a yyyymm month"))
                }),
            FieldKind::Address => Err(VaultError::CommandFailed(
                "address fields must be entered field by field".into(),
            )),
            _ => FieldValue::from_json(kind, Value::String(input.to_string())),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::String(s)
            | FieldValue::Concealed(s)
            | FieldValue::Email(s)
            | FieldValue::Url(s)
            | FieldValue::Phone(s)
            | FieldValue::CcType(s)
            | FieldValue::Gender(s)
            | FieldValue::Menu(s) => Value::String(s.clone()),
            FieldValue::Date(ts) => Value::from(*ts),
            FieldValue::MonthYear(ym) => Value::from(*ym),
            FieldValue::Address(a) => serde_json::to_value(a).unwrap_or(Value::Null),
        }
    }

    fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Concealed(_) => FieldKind::Concealed,
            FieldValue::Email(_) => FieldKind::Email,
            FieldValue::Url(_) => FieldKind::Url,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::MonthYear(_) => FieldKind::MonthYear,
            FieldValue::Address(_) => FieldKind::Address,
            FieldValue::Phone(_) => FieldKind::Phone,
            FieldValue::CcType(_) => FieldKind::Cctype,
            FieldValue::Gender(_) => FieldKind::Gender,
            FieldValue::Menu(_) => FieldKind::Menu,
        }
    }

    /// Render any value as a display string.
    pub fn as_display_string(&self) -> String {
        match self {
            FieldValue::String(s)
            | FieldValue::Concealed(s)
            | FieldValue::Email(s)
            | FieldValue::Url(s)
            | FieldValue::Phone(s)
            | FieldValue::CcType(s)
            | FieldValue::Gender(s)
            | FieldValue::Menu(s) => s.clone(),
            FieldValue::Date(ts) => ts.to_string(),
            FieldValue::MonthYear(ym) => ym.to_string(),
            FieldValue::Address(a) => {
                let parts: Vec<&str> = [
                    a.street.as_str(),
                    a.city.as_str(),
                    a.state.as_str(),
                    a.zip.as_str(),
                    a.country.as_str(),
                ]
                .into_iter()
                .filter(|p| !p.is_empty())
                .collect();
                parts.join(", ")
            }
        }
    }
}

/// Raw wire shape of a section field: `{k, n, t, v}`.
#[derive(Serialize, Deserialize)]
struct RawField {
    k: FieldKind,
    #[serde(default)]
    n: String,
    #[serde(default)]
    t: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    v: Option<Value>,
}

/// A single typed field inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawField", into = "RawField")]
pub struct ItemField {
    pub name: String,
    pub title: String,
    pub kind: FieldKind,
    pub value: Option<FieldValue>,
}

impl ItemField {
    pub fn value_string(&self) -> String {
        self.value
            .as_ref()
            .map(FieldValue::as_display_string)
            .unwrap_or_default()
    }
}

impl TryFrom<RawField> for ItemField {
    type Error = VaultError;

    fn try_from(raw: RawField) -> Result<ItemField> {
        let value = match raw.v {
            Some(Value::Null) | None => None,
            Some(v) => Some(FieldValue::from_json(raw.k, v)?),
        };
        Ok(ItemField {
            name: raw.n,
            title: raw.t,
            kind: raw.k,
            value,
        })
    }
}

impl From<ItemField> for RawField {
    fn from(field: ItemField) -> RawField {
        RawField {
            // A typed value always wins over a stale kind tag.
            k: field.value.as_ref().map_or(field.kind, FieldValue::kind),
            n: field.name,
            t: field.title,
            v: field.value.as_ref().map(FieldValue::to_json),
        }
    }
}

/// A field captured from a web login form.
///
/// `field_type` is the original single-letter code (`T` text, `P` password,
/// `E` email, `N` number, `C` checkbox); `designation` marks the username
/// and password fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebFormField {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub designation: String,
}

/// A labelled URL attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemUrl {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
}

impl ItemContent {
    /// The canonical string the contents hash is computed over:
    /// title, then every URL, then every designated form-field value, then
    /// every section field value, in document order.
    pub fn canonical_string(&self, title: &str) -> String {
        let mut out = String::from(title);
        for url in &self.urls {
            out.push_str(&url.url);
        }
        for field in &self.form_fields {
            if !field.designation.is_empty() {
                out.push_str(&field.value);
            }
        }
        for section in &self.sections {
            for field in &section.fields {
                out.push_str(&field.value_string());
            }
        }
        out
    }

    /// First 16 hex chars of SHA-1 over the canonical string.
    pub fn contents_hash(&self, title: &str) -> String {
        let digest = Sha1::digest(self.canonical_string(title).as_bytes());
        digest
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<String>()[..16]
            .to_string()
    }

    /// First section field whose name or title contains `pattern`
    /// (case-insensitive).
    pub fn field_by_pattern(&self, pattern: &str) -> Option<&ItemField> {
        let pattern = pattern.to_lowercase();
        self.sections.iter().flat_map(|s| &s.fields).find(|f| {
            f.name.to_lowercase().contains(&pattern) || f.title.to_lowercase().contains(&pattern)
        })
    }

    /// First web form field whose name or designation contains `pattern`.
    pub fn form_field_by_pattern(&self, pattern: &str) -> Option<&WebFormField> {
        let pattern = pattern.to_lowercase();
        self.form_fields.iter().find(|f| {
            f.name.to_lowercase().contains(&pattern)
                || f.designation.to_lowercase().contains(&pattern)
        })
    }

    /// First URL whose label contains `pattern`.
    pub fn url_by_pattern(&self, pattern: &str) -> Option<&ItemUrl> {
        let pattern = pattern.to_lowercase();
        self.urls
            .iter()
            .find(|u| u.label.to_lowercase().contains(&pattern))
    }
}

impl std::fmt::Display for ItemContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for section in &self.sections {
            if !section.title.is_empty() {
                writeln!(f, "{}:", section.title)?;
            }
            for field in &section.fields {
                writeln!(f, "  {}: {}", field.title, field.value_string())?;
            }
        }
        if !self.form_fields.is_empty() {
            writeln!(f, "Website form fields:")?;
            for field in &self.form_fields {
                if field.designation.is_empty() {
                    writeln!(f, "  {}: {}", field.name, field.value)?;
                } else {
                    writeln!(f, "  {} ({}): {}", field.name, field.designation, field.value)?;
                }
            }
        }
        if !self.urls.is_empty() {
            writeln!(f, "Websites:")?;
            for url in &self.urls {
                writeln!(f, "  {}: {}", url.label, url.url)?;
            }
        }
        if !self.notes.is_empty() {
            writeln!(f, "Notes:")?;
            writeln!(f, "  {}", self.notes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login_content() -> ItemContent {
        ItemContent {
            form_fields: vec![
                WebFormField {
                    value: "alice".into(),
                    id: "u".into(),
                    name: "username".into(),
                    field_type: "T".into(),
                    designation: "username".into(),
                },
                WebFormField {
                    value: "hunter2".into(),
                    id: "p".into(),
                    name: "password".into(),
                    field_type: "P".into(),
                    designation: "password".into(),
                },
            ],
            urls: vec![ItemUrl {
                label: "site".into(),
                url: "https://example.com".into(),
            }],
            ..ItemContent::default()
        }
    }

    #[test]
    fn json_roundtrip_preserves_order() {
        let mut content = login_content();
        content.sections = vec![ItemSection {
            name: "details".into(),
            title: "Details".into(),
            fields: vec![
                ItemField {
                    name: "b".into(),
                    title: "Second".into(),
                    kind: FieldKind::String,
                    value: Some(FieldValue::String("two".into())),
                },
                ItemField {
                    name: "a".into(),
                    title: "First".into(),
                    kind: FieldKind::Concealed,
                    value: Some(FieldValue::Concealed("one".into())),
                },
            ],
        }];

        let json = serde_json::to_string(&content).unwrap();
        let back: ItemContent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn kind_tag_drives_value_shape() {
        let json = r#"{
            "sections": [{"name": "s", "title": "S", "fields": [
                {"k": "date", "n": "d", "t": "Date", "v": 1388880000},
                {"k": "monthYear", "n": "m", "t": "Expires", "v": 201703},
                {"k": "address", "n": "a", "t": "Address",
                 "v": {"street": "1 Main St", "city": "Springfield",
                       "zip": "12345", "state": "IL", "country": "US"}}
            ]}]
        }"#;
        let content: ItemContent = serde_json::from_str(json).unwrap();
        let fields = &content.sections[0].fields;
        assert_eq!(fields[0].value, Some(FieldValue::Date(1_388_880_000)));
        assert_eq!(fields[1].value, Some(FieldValue::MonthYear(201_703)));
        match &fields[2].value {
            Some(FieldValue::Address(a)) => assert_eq!(a.city, "Springfield"),
            other => panic!("expected address, got {other:?}"),
        }
    }

    #[test]
    fn contents_hash_is_16_lower_hex() {
        let hash = login_content().contents_hash("Example");
        assert_eq!(hash.len(), 16);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_covers_title_urls_and_designated_fields() {
        let content = login_content();
        let base = content.contents_hash("Example");

        assert_ne!(base, content.contents_hash("Renamed"));

        let mut other_url = content.clone();
        other_url.urls[0].url = "https://other.example.com".into();
        assert_ne!(base, other_url.contents_hash("Example"));

        let mut other_pw = content.clone();
        other_pw.form_fields[1].value = "different".into();
        assert_ne!(base, other_pw.contents_hash("Example"));

        // An undesignated form field does not participate.
        let mut extra = content.clone();
        extra.form_fields.push(WebFormField {
            value: "ignored".into(),
            name: "csrf".into(),
            ..WebFormField::default()
        });
        assert_eq!(base, extra.contents_hash("Example"));
    }

    #[test]
    fn hash_is_field_order_sensitive() {
        let make = |first: &str, second: &str| ItemContent {
            sections: vec![ItemSection {
                name: "s".into(),
                title: "S".into(),
                fields: vec![
                    ItemField {
                        name: "1".into(),
                        title: "1".into(),
                        kind: FieldKind::String,
                        value: Some(FieldValue::String(first.into())),
                    },
                    ItemField {
                        name: "2".into(),
                        title: "2".into(),
                        kind: FieldKind::String,
                        value: Some(FieldValue::String(second.into())),
                    },
                ],
            }],
            ..ItemContent::default()
        };
        assert_ne!(
            make("one", "two").contents_hash("t"),
            make("two", "one").contents_hash("t"),
            "field order must matter"
        );
        assert_eq!(
            make("one", "two").contents_hash("t"),
            make("one", "two").contents_hash("t")
        );
    }

    #[test]
    fn pattern_accessors() {
        let content = login_content();
        assert_eq!(
            content.form_field_by_pattern("pass").unwrap().value,
            "hunter2"
        );
        assert_eq!(content.url_by_pattern("site").unwrap().url, "https://example.com");
        assert!(content.field_by_pattern("missing").is_none());
    }
}
