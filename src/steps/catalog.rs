//! Selector chains for the storefront widgets the scenarios touch. Order
//! matters: most specific markup first, text matching last.

use crate::locator::{Selector, SelectorChain};

pub fn search_input() -> SelectorChain {
    SelectorChain::new(
        "search input",
        vec![
            Selector::css(r#"input[name="search"]"#),
            Selector::css(r#"input[type="search"]"#),
            Selector::id("search"),
            Selector::css(".search-input"),
        ],
    )
}

/// Result tiles on a search results page. Counted, not clicked.
pub fn search_results() -> SelectorChain {
    SelectorChain::new(
        "search results",
        vec![
            Selector::css(".product-item"),
            Selector::css(".search-result"),
            Selector::test_id("product"),
        ],
    )
}

pub fn add_to_cart_button() -> SelectorChain {
    SelectorChain::new(
        "add to cart button",
        vec![
            Selector::css(r#"button[data-action="add-to-cart"]"#),
            Selector::css(".add-to-cart"),
            Selector::id("add-to-cart-button"),
            Selector::text("Add to Cart"),
        ],
    )
}

pub fn cart_link() -> SelectorChain {
    SelectorChain::new(
        "cart link",
        vec![
            Selector::css(r#"a[href*="cart"]"#),
            Selector::css(".cart-link"),
            Selector::id("cart-button"),
        ],
    )
}

pub fn quantity_input() -> SelectorChain {
    SelectorChain::new(
        "quantity input",
        vec![
            Selector::name_contains("quantity"),
            Selector::css(".quantity-input"),
            Selector::test_id("quantity"),
        ],
    )
}

pub fn remove_item_control() -> SelectorChain {
    SelectorChain::new(
        "remove item control",
        vec![
            Selector::css(".remove-item"),
            Selector::css(r#"button[data-action="remove"]"#),
            Selector::css(".delete-button"),
        ],
    )
}

pub fn submit_button() -> SelectorChain {
    SelectorChain::new(
        "submit button",
        vec![
            Selector::css(r#"button[type="submit"]"#),
            Selector::css(".submit-order"),
            Selector::id("place-order"),
            Selector::text("Place Order"),
        ],
    )
}

/// Generic validation feedback, any flavour. Counted across all candidates.
pub fn validation_errors() -> SelectorChain {
    SelectorChain::new(
        "validation errors",
        vec![
            Selector::css(".error-message"),
            Selector::css(".validation-error"),
            Selector::css(".field-error"),
            Selector::test_id("error"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chains_are_ordered_most_specific_first() {
        let chain = add_to_cart_button();
        assert_eq!(chain.target, "add to cart button");
        assert_eq!(
            chain.candidates[0],
            Selector::css(r#"button[data-action="add-to-cart"]"#)
        );
        assert_eq!(
            chain.candidates.last(),
            Some(&Selector::text("Add to Cart"))
        );
    }

    #[test]
    fn test_every_chain_has_candidates() {
        for chain in [
            search_input(),
            search_results(),
            add_to_cart_button(),
            cart_link(),
            quantity_input(),
            remove_item_control(),
            submit_button(),
            validation_errors(),
        ] {
            assert!(!chain.candidates.is_empty(), "{} is empty", chain.target);
        }
    }
}
