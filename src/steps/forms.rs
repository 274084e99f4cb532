//! Checkout form field maps. Every field carries the `name` attribute
//! fragments observed across storefront themes; snake_case first, camelCase
//! second.

use crate::data::{Address, PaymentCard};
use crate::locator::{Selector, SelectorChain};

#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub chain: SelectorChain,
}

fn field(label: &'static str, fragments: &[&str]) -> FormField {
    FormField {
        label,
        chain: SelectorChain::new(
            label,
            fragments
                .iter()
                .map(|f| Selector::name_contains(*f))
                .collect(),
        ),
    }
}

pub fn shipping_fields(address: &Address) -> Vec<(FormField, String)> {
    vec![
        (
            field("first name", &["first_name", "firstName"]),
            address.first_name.clone(),
        ),
        (
            field("last name", &["last_name", "lastName"]),
            address.last_name.clone(),
        ),
        (field("email", &["email"]), address.email.clone()),
        (field("phone", &["phone"]), address.phone.clone()),
        (field("address", &["address"]), address.address.clone()),
        (field("city", &["city"]), address.city.clone()),
        (field("state", &["state"]), address.state.clone()),
        (field("zip", &["zip", "postal"]), address.zip.clone()),
    ]
}

pub fn payment_fields(card: &PaymentCard) -> Vec<(FormField, String)> {
    vec![
        (
            field("card number", &["card_number", "cardNumber"]),
            card.number.clone(),
        ),
        (field("expiry", &["expiry", "exp"]), card.expiry.clone()),
        (field("cvv", &["cvv", "cvc"]), card.cvv.clone()),
        (
            field("cardholder name", &["card_name", "cardName"]),
            card.holder.clone(),
        ),
    ]
}

pub fn email_input() -> SelectorChain {
    SelectorChain::single("email input", Selector::name_contains("email"))
}

pub fn card_number_input() -> SelectorChain {
    SelectorChain::new(
        "card number input",
        vec![
            Selector::name_contains("card_number"),
            Selector::name_contains("cardNumber"),
        ],
    )
}

pub fn email_feedback() -> SelectorChain {
    SelectorChain::new(
        "email validation feedback",
        vec![
            Selector::css(".email-error"),
            Selector::css(r#"[data-field="email"] .error"#),
        ],
    )
}

pub fn card_feedback() -> SelectorChain {
    SelectorChain::new(
        "card validation feedback",
        vec![
            Selector::css(".card-error"),
            Selector::css(r#"[data-field="card"] .error"#),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TestData;

    #[test]
    fn test_shipping_fields_cover_the_address() {
        let data = TestData::generate(1);
        let fields = shipping_fields(&data.addresses[0]);

        let labels: Vec<&str> = fields.iter().map(|(f, _)| f.label).collect();
        assert_eq!(
            labels,
            vec![
                "first name",
                "last name",
                "email",
                "phone",
                "address",
                "city",
                "state",
                "zip"
            ]
        );
        assert!(fields.iter().all(|(_, value)| !value.is_empty()));
    }

    #[test]
    fn test_zip_field_accepts_postal_naming() {
        let data = TestData::generate(1);
        let fields = shipping_fields(&data.addresses[0]);
        let (zip, _) = fields.last().unwrap();
        assert_eq!(
            zip.chain.candidates,
            vec![
                Selector::name_contains("zip"),
                Selector::name_contains("postal"),
            ]
        );
    }

    #[test]
    fn test_payment_fields_use_both_naming_schemes() {
        let card = PaymentCard {
            label: "visa".to_string(),
            number: "4242424242424242".to_string(),
            expiry: "12/28".to_string(),
            cvv: "123".to_string(),
            holder: "Test User".to_string(),
        };
        let fields = payment_fields(&card);
        assert_eq!(fields.len(), 4);
        assert_eq!(
            fields[0].0.chain.candidates,
            vec![
                Selector::name_contains("card_number"),
                Selector::name_contains("cardNumber"),
            ]
        );
        assert_eq!(fields[0].1, "4242424242424242");
    }
}
