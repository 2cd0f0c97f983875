use crate::models::Client;

/// Validates a client before it is written to the store.
///
/// City, first name and last name are required; address is optional. All four
/// fields go through the character check when present.
pub fn validate_client(client: &Client) -> bool {
    let required = [&client.city, &client.first_name, &client.last_name];

    for value in required {
        if value.is_empty() {
            return false;
        }
    }

    let checked = [
        client.address.as_deref(),
        Some(client.city.as_str()),
        Some(client.first_name.as_str()),
        Some(client.last_name.as_str()),
    ];

    for value in checked.into_iter().flatten() {
        if is_forbidden(value) {
            return false;
        }
    }

    true
}

/// Whole-string check carried over from the legacy validator: a value is
/// rejected only when it is exactly one character that is neither a word
/// character (`[A-Za-z0-9_]`) nor whitespace. A longer value containing such
/// characters passes. Intentionally not a contains-check; see the tests.
fn is_forbidden(value: &str) -> bool {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => !(c.is_ascii_alphanumeric() || c == '_' || c.is_ascii_whitespace()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(last: &str, first: &str, address: Option<&str>, city: &str) -> Client {
        Client {
            id: 0,
            last_name: last.to_string(),
            first_name: first.to_string(),
            address: address.map(str::to_string),
            city: city.to_string(),
        }
    }

    #[test]
    fn accepts_a_complete_client() {
        let c = client("Prénom", "Beau", Some("65 rue imaginaire"), "Imaginaire");
        assert!(validate_client(&c));
    }

    #[test]
    fn accepts_a_client_without_address() {
        let c = client("Prénom", "Beau", None, "Imaginaire");
        assert!(validate_client(&c));
    }

    #[test]
    fn rejects_missing_required_fields() {
        assert!(!validate_client(&client("", "Beau", None, "Imaginaire")));
        assert!(!validate_client(&client("Prénom", "", None, "Imaginaire")));
        assert!(!validate_client(&client("Prénom", "Beau", None, "")));
    }

    #[test]
    fn rejects_a_single_forbidden_character() {
        assert!(!validate_client(&client("Prénom", "Beau", None, "@")));
        assert!(!validate_client(&client("!", "Beau", None, "Imaginaire")));
        assert!(!validate_client(&client("Prénom", "Beau", Some("?"), "Imaginaire")));
    }

    #[test]
    fn single_word_character_or_whitespace_passes() {
        assert!(validate_client(&client("_", "B", None, " ")));
    }

    // Legacy behavior: only a value that IS one forbidden character fails.
    // A longer value containing forbidden characters anywhere still passes.
    #[test]
    fn multi_character_values_with_symbols_pass() {
        let c = client("O'Neill", "Jean-Luc", Some("12, rue du Port!"), "St. Malo");
        assert!(validate_client(&c));
    }
}
