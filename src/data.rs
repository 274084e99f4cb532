//! Test data for checkout flows: faked shipping addresses, the public Stripe
//! test card set, and deliberately bad values for the validation probes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCard {
    /// Short tag (`visa`, `visa_declined`, `invalid_number`).
    pub label: String,
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub holder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidData {
    pub emails: Vec<String>,
    pub cards: Vec<PaymentCard>,
    pub phones: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TestData {
    pub addresses: Vec<Address>,
    pub cards: Vec<PaymentCard>,
    pub invalid: InvalidData,
}

impl TestData {
    /// Fake `address_count` US shipping addresses (at least one) and attach
    /// the static card sets.
    pub fn generate(address_count: usize) -> Self {
        use fake::faker::address::en::{BuildingNumber, CityName, StateAbbr, StreetName, ZipCode};
        use fake::faker::internet::en::SafeEmail;
        use fake::faker::name::en::{FirstName, LastName};
        use fake::faker::phone_number::en::PhoneNumber;
        use fake::Fake;

        let count = address_count.max(1);
        let mut addresses = Vec::with_capacity(count);
        for _ in 0..count {
            let building: String = BuildingNumber().fake();
            let street: String = StreetName().fake();
            addresses.push(Address {
                first_name: FirstName().fake(),
                last_name: LastName().fake(),
                email: SafeEmail().fake(),
                phone: PhoneNumber().fake(),
                address: format!("{} {}", building, street),
                city: CityName().fake(),
                state: StateAbbr().fake(),
                zip: ZipCode().fake(),
            });
        }

        Self {
            addresses,
            cards: stripe_test_cards(),
            invalid: invalid_data(),
        }
    }

    /// Like [`generate`](Self::generate), with CSV rows placed ahead of the
    /// faked ones so curated addresses win.
    pub fn load(addresses_csv: Option<&Path>, address_count: usize) -> Result<Self> {
        let mut data = Self::generate(address_count);
        if let Some(path) = addresses_csv {
            let mut curated = load_addresses_csv(path)?;
            curated.append(&mut data.addresses);
            data.addresses = curated;
        }
        Ok(data)
    }

    pub fn shipping_address(&self) -> Option<&Address> {
        self.addresses.first()
    }

    /// First card that is expected to charge successfully.
    pub fn checkout_card(&self) -> Option<&PaymentCard> {
        self.cards.iter().find(|c| !c.label.ends_with("_declined"))
    }
}

/// Stripe's published test numbers. Safe against any real gateway.
pub fn stripe_test_cards() -> Vec<PaymentCard> {
    vec![
        card("visa", "4242424242424242", "123"),
        card("mastercard", "5555555555554444", "123"),
        card("amex", "378282246310005", "1234"),
        card("visa_declined", "4000000000000002", "123"),
    ]
}

pub fn invalid_data() -> InvalidData {
    InvalidData {
        emails: [
            "invalid-email",
            "@invalid.com",
            "test@",
            "test..test@example.com",
            "test@.com",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        cards: vec![
            PaymentCard {
                label: "invalid_number".to_string(),
                number: "1234567890123456".to_string(),
                expiry: "12/28".to_string(),
                cvv: "123".to_string(),
                holder: "Test User".to_string(),
            },
            PaymentCard {
                label: "expired_card".to_string(),
                number: "4242424242424242".to_string(),
                expiry: "12/20".to_string(),
                cvv: "123".to_string(),
                holder: "Test User".to_string(),
            },
            PaymentCard {
                label: "invalid_cvv".to_string(),
                number: "4242424242424242".to_string(),
                expiry: "12/28".to_string(),
                cvv: "12".to_string(),
                holder: "Test User".to_string(),
            },
        ],
        phones: ["123", "abc-def-ghij", "+1-800-INVALID"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

fn card(label: &str, number: &str, cvv: &str) -> PaymentCard {
    PaymentCard {
        label: label.to_string(),
        number: number.to_string(),
        expiry: "12/28".to_string(),
        cvv: cvv.to_string(),
        holder: "Test User".to_string(),
    }
}

// CSV rows are snake_case; the JSON surface stays camelCase.
#[derive(Debug, Deserialize)]
struct AddressRow {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
    state: String,
    zip: String,
}

pub fn load_addresses_csv(path: &Path) -> Result<Vec<Address>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open address CSV {}", path.display()))?;

    let mut addresses = Vec::new();
    for row in reader.deserialize() {
        let row: AddressRow = row
            .with_context(|| format!("Failed to parse address row in {}", path.display()))?;
        addresses.push(Address {
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            city: row.city,
            state: row.state,
            zip: row.zip,
        });
    }
    Ok(addresses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_fakes_complete_addresses() {
        let data = TestData::generate(3);
        assert_eq!(data.addresses.len(), 3);
        for address in &data.addresses {
            assert!(!address.first_name.is_empty());
            assert!(!address.email.is_empty());
            assert!(!address.zip.is_empty());
        }
    }

    #[test]
    fn test_generate_clamps_count_to_one() {
        assert_eq!(TestData::generate(0).addresses.len(), 1);
    }

    #[test]
    fn test_checkout_card_skips_declined_numbers() {
        let data = TestData::generate(1);
        let card = data.checkout_card().unwrap();
        assert_eq!(card.number, "4242424242424242");
        assert!(data
            .cards
            .iter()
            .any(|c| c.label == "visa_declined" && c.number == "4000000000000002"));
    }

    #[test]
    fn test_invalid_data_leads_with_probe_values() {
        let invalid = invalid_data();
        assert_eq!(invalid.emails[0], "invalid-email");
        assert_eq!(invalid.cards[0].number, "1234567890123456");
    }

    #[test]
    fn test_csv_addresses_load_and_lead() {
        let path = std::env::temp_dir().join(format!(
            "cartwright_addresses_{}.csv",
            std::process::id()
        ));
        std::fs::write(
            &path,
            "first_name,last_name,email,phone,address,city,state,zip\n\
             Ada,Byrne,ada@example.com,555-0100,14 Elm St,Springfield,IL,62701\n",
        )
        .unwrap();

        let data = TestData::load(Some(&path), 2).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(data.addresses.len(), 3);
        assert_eq!(data.addresses[0].first_name, "Ada");
        assert_eq!(data.addresses[0].zip, "62701");
    }

    #[test]
    fn test_address_serializes_camel_case() {
        let data = TestData::generate(1);
        let value = serde_json::to_value(&data.addresses[0]).unwrap();
        assert!(value.get("firstName").is_some());
        assert!(value.get("first_name").is_none());
    }
}
