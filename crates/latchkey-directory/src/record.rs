//! Membership records extracted from directory contacts.

use latchkey_core::constants::{ADMITTED_MEMBERSHIP_STATUSES, AVATAR_FIELD, MEMBERSHIP_STATUS_FIELD};
use serde_json::Value;

/// Where the member picture can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarRef {
    pub file_id: String,
    pub url: String,
}

/// A member resolved from an RFID lookup.
///
/// Lives only for the duration of one access decision; the cache keeps the
/// display name alone.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub display_name: String,

    /// Value of the "Membership status" field, if the contact has one.
    pub membership_status: Option<String>,

    pub avatar: Option<AvatarRef>,

    /// Raw contact document, forwarded in sign-in telemetry.
    pub contact: Value,
}

impl AccessRecord {
    /// Build a record from a contact document.
    ///
    /// Contacts carry a `DisplayName` and a `FieldValues` list of
    /// `{"FieldName": ..., "Value": ...}` objects. A contact without a
    /// `DisplayName` is named from its first and last name, then its email,
    /// then its id.
    pub fn from_contact(contact: Value) -> Self {
        let display_name = display_name(&contact);

        let membership_status = field_value(&contact, MEMBERSHIP_STATUS_FIELD)
            .and_then(|v| v.get("Value"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let avatar = field_value(&contact, AVATAR_FIELD).and_then(|v| {
            let url = v.get("Url")?.as_str()?.to_string();
            let file_id = match v.get("Id")? {
                Value::String(id) => id.clone(),
                other => other.to_string(),
            };
            Some(AvatarRef { file_id, url })
        });

        Self {
            display_name,
            membership_status,
            avatar,
            contact,
        }
    }

    /// Whether the membership admits the holder.
    ///
    /// A contact without a membership status field is not admitted.
    pub fn is_active(&self) -> bool {
        self.membership_status
            .as_deref()
            .is_some_and(|status| ADMITTED_MEMBERSHIP_STATUSES.contains(&status))
    }
}

fn display_name(contact: &Value) -> String {
    let text = |key: &str| {
        contact
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if let Some(name) = text("DisplayName") {
        return name.to_string();
    }

    let full_name = [text("FirstName"), text("LastName")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        return full_name;
    }

    if let Some(email) = text("Email") {
        return email.to_string();
    }

    match contact.get("Id") {
        Some(Value::String(id)) => format!("Contact {id}"),
        Some(id) if !id.is_null() => format!("Contact {id}"),
        _ => "Unknown contact".to_string(),
    }
}

/// Last value of the named field, matching how repeated fields resolve.
fn field_value<'a>(contact: &'a Value, name: &str) -> Option<&'a Value> {
    contact
        .get("FieldValues")?
        .as_array()?
        .iter()
        .filter(|field| field.get("FieldName").and_then(Value::as_str) == Some(name))
        .filter_map(|field| field.get("Value"))
        .next_back()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn contact(status: Option<&str>) -> Value {
        let mut fields = vec![json!({"FieldName": "RFID", "Value": "1234"})];
        if let Some(status) = status {
            fields.push(json!({
                "FieldName": "Membership status",
                "Value": {"Id": 1, "Value": status}
            }));
        }
        json!({"Id": 7, "DisplayName": "Ann", "FieldValues": fields})
    }

    #[rstest]
    #[case::active(Some("Active"), true)]
    #[case::lapsed(Some("Lapsed"), true)]
    #[case::terminated(Some("Terminated"), false)]
    #[case::pending(Some("PendingNew"), false)]
    #[case::absent(None, false)]
    fn test_is_active(#[case] status: Option<&str>, #[case] expected: bool) {
        let record = AccessRecord::from_contact(contact(status));
        assert_eq!(record.display_name, "Ann");
        assert_eq!(record.is_active(), expected);
    }

    #[test]
    fn test_avatar_reference() {
        let contact = json!({
            "DisplayName": "Bob",
            "FieldValues": [
                {"FieldName": "Avatar", "Value": {"Id": "pic-9", "Url": "https://example.org/pic-9"}}
            ]
        });

        let record = AccessRecord::from_contact(contact);
        assert_eq!(
            record.avatar,
            Some(AvatarRef {
                file_id: "pic-9".to_string(),
                url: "https://example.org/pic-9".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_avatar_field_is_ignored() {
        let contact = json!({
            "DisplayName": "Bob",
            "FieldValues": [{"FieldName": "Avatar", "Value": null}]
        });
        assert_eq!(AccessRecord::from_contact(contact).avatar, None);
    }

    #[rstest]
    #[case::full_name(json!({"Id": 3, "FirstName": "Ann", "LastName": "Lee"}), "Ann Lee")]
    #[case::first_name_only(json!({"Id": 3, "FirstName": "Ann"}), "Ann")]
    #[case::blank_display_name(json!({"DisplayName": " ", "Email": "ann@example.org"}), "ann@example.org")]
    #[case::id_only(json!({"Id": 3}), "Contact 3")]
    #[case::nothing(json!({"FieldValues": []}), "Unknown contact")]
    fn test_display_name_fallback(#[case] contact: Value, #[case] expected: &str) {
        assert_eq!(AccessRecord::from_contact(contact).display_name, expected);
    }
}
