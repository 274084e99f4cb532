//! Scenario step library. A step is a pure function of (browser session,
//! parameters) into an outcome; diagnostics never mutate page state. Failures
//! surface as `StepError` values and the runner decides what they mean for
//! the scenario.

pub mod catalog;
pub mod forms;

use std::sync::Mutex;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::data::{Address, PaymentCard};
use crate::driver::{BrowserDriver, ElementHandle};
use crate::error::StepError;
use crate::locator::{ElementLocator, LocateOutcome, SelectorChain};

/// Everything a scenario can ask a browser session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Navigate { url: String },
    OpenProduct { url: String },
    Search { term: String },
    AddToCart,
    OpenCart,
    SetQuantity { quantity: u32 },
    RemoveItem,
    FillShippingForm,
    FillPaymentForm,
    SubmitOrder,
    ProbeEmptySubmit,
    ProbeInvalidEmail { value: String },
    ProbeInvalidCard { value: String },
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::Navigate { .. } => "navigate",
            StepKind::OpenProduct { .. } => "open_product",
            StepKind::Search { .. } => "search",
            StepKind::AddToCart => "add_to_cart",
            StepKind::OpenCart => "open_cart",
            StepKind::SetQuantity { .. } => "set_quantity",
            StepKind::RemoveItem => "remove_item",
            StepKind::FillShippingForm => "fill_shipping_form",
            StepKind::FillPaymentForm => "fill_payment_form",
            StepKind::SubmitOrder => "submit_order",
            StepKind::ProbeEmptySubmit => "probe_empty_submit",
            StepKind::ProbeInvalidEmail { .. } => "probe_invalid_email",
            StepKind::ProbeInvalidCard { .. } => "probe_invalid_card",
        }
    }

    pub fn display(&self) -> String {
        match self {
            StepKind::Navigate { url } => format!("Navigate to {}", url),
            StepKind::OpenProduct { url } => format!("Open product page {}", url),
            StepKind::Search { term } => format!("Search for \"{}\"", term),
            StepKind::AddToCart => "Add product to cart".to_string(),
            StepKind::OpenCart => "Open cart".to_string(),
            StepKind::SetQuantity { quantity } => format!("Set quantity to {}", quantity),
            StepKind::RemoveItem => "Remove item from cart".to_string(),
            StepKind::FillShippingForm => "Fill shipping form".to_string(),
            StepKind::FillPaymentForm => "Fill payment form".to_string(),
            StepKind::SubmitOrder => "Submit order".to_string(),
            StepKind::ProbeEmptySubmit => "Submit empty form".to_string(),
            StepKind::ProbeInvalidEmail { .. } => "Submit invalid email".to_string(),
            StepKind::ProbeInvalidCard { .. } => "Submit invalid card number".to_string(),
        }
    }
}

/// A step plus its failure policy within the scenario.
#[derive(Debug, Clone)]
pub struct StepSpec {
    pub kind: StepKind,
    pub required: bool,
}

impl StepSpec {
    pub fn required(kind: StepKind) -> Self {
        Self {
            kind,
            required: true,
        }
    }

    pub fn best_effort(kind: StepKind) -> Self {
        Self {
            kind,
            required: false,
        }
    }
}

/// What a step reports when it does not error. Skipping is a value here, not
/// a failure: probes skip when the page lacks the widget they would exercise.
#[derive(Debug, Clone, PartialEq)]
pub enum StepRun {
    Completed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Succeeded,
    Failed { error: String },
    Skipped { reason: String },
}

impl StepStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed { .. } | StepStatus::Skipped { .. }
        )
    }
}

/// Immutable record of one executed step, appended to the scenario result in
/// execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub name: String,
    pub display: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
}

struct FieldFill {
    filled: Vec<&'static str>,
    missed: Vec<&'static str>,
}

/// One scenario's view of its browser session. Holds the driver plus the
/// test data the steps draw from, and accumulates a details map that ends up
/// on the scenario result.
pub struct StepSession<'a> {
    driver: &'a dyn BrowserDriver,
    locator: &'a ElementLocator,
    shipping: Option<&'a Address>,
    payment: Option<&'a PaymentCard>,
    details: Mutex<Map<String, Value>>,
}

impl<'a> StepSession<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        locator: &'a ElementLocator,
        shipping: Option<&'a Address>,
        payment: Option<&'a PaymentCard>,
    ) -> Self {
        Self {
            driver,
            locator,
            shipping,
            payment,
            details: Mutex::new(Map::new()),
        }
    }

    pub fn note(&self, key: &str, value: Value) {
        if let Ok(mut details) = self.details.lock() {
            details.insert(key.to_string(), value);
        }
    }

    pub fn into_details(self) -> Map<String, Value> {
        self.details
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn run(&self, kind: &StepKind) -> Result<StepRun, StepError> {
        match kind {
            StepKind::Navigate { url } => self.navigate("pageLoadMs", url).await,
            StepKind::OpenProduct { url } => self.open_product(url).await,
            StepKind::Search { term } => self.search(term).await,
            StepKind::AddToCart => self.add_to_cart().await,
            StepKind::OpenCart => self.open_cart().await,
            StepKind::SetQuantity { quantity } => self.set_quantity(*quantity).await,
            StepKind::RemoveItem => self.remove_item().await,
            StepKind::FillShippingForm => self.fill_shipping_form().await,
            StepKind::FillPaymentForm => self.fill_payment_form().await,
            StepKind::SubmitOrder => self.submit_order().await,
            StepKind::ProbeEmptySubmit => self.probe_empty_submit().await,
            StepKind::ProbeInvalidEmail { value } => self.probe_invalid_email(value).await,
            StepKind::ProbeInvalidCard { value } => self.probe_invalid_card(value).await,
        }
    }

    async fn navigate(&self, timing_key: &str, url: &str) -> Result<StepRun, StepError> {
        let started = Instant::now();
        self.driver
            .navigate(url)
            .await
            .map_err(|e| StepError::interaction("navigate", format!("{:#}", e)))?;
        self.idle().await?;
        self.note(timing_key, json!(started.elapsed().as_millis() as u64));
        Ok(StepRun::Completed)
    }

    async fn open_product(&self, url: &str) -> Result<StepRun, StepError> {
        self.note("productUrl", json!(url));
        self.navigate("productPageLoadMs", url).await
    }

    async fn search(&self, term: &str) -> Result<StepRun, StepError> {
        let input = self.require(&catalog::search_input()).await?;
        self.fill("search input", input, term).await?;
        self.press("Enter").await?;
        self.idle().await?;

        let count = self.count_first(&catalog::search_results()).await?;
        self.note("resultCount", json!(count));
        Ok(StepRun::Completed)
    }

    async fn add_to_cart(&self) -> Result<StepRun, StepError> {
        let button = self.require(&catalog::add_to_cart_button()).await?;
        self.click("add to cart", button).await?;
        self.idle().await?;
        Ok(StepRun::Completed)
    }

    async fn open_cart(&self) -> Result<StepRun, StepError> {
        let link = self.require(&catalog::cart_link()).await?;
        self.click("open cart", link).await?;
        self.idle().await?;
        Ok(StepRun::Completed)
    }

    async fn set_quantity(&self, quantity: u32) -> Result<StepRun, StepError> {
        let input = self.require(&catalog::quantity_input()).await?;
        self.fill("quantity input", input, &quantity.to_string())
            .await?;
        self.idle().await?;
        self.note("quantity", json!(quantity));
        Ok(StepRun::Completed)
    }

    async fn remove_item(&self) -> Result<StepRun, StepError> {
        let control = self.require(&catalog::remove_item_control()).await?;
        self.click("remove item", control).await?;
        self.idle().await?;
        Ok(StepRun::Completed)
    }

    async fn fill_shipping_form(&self) -> Result<StepRun, StepError> {
        let address = self.shipping.ok_or_else(|| {
            StepError::interaction(
                "fill shipping form",
                "no shipping address attached to this scenario",
            )
        })?;
        let fill = self
            .fill_field_set("shipping form", forms::shipping_fields(address))
            .await?;
        self.note("shippingFieldsFilled", json!(fill.filled));
        if !fill.missed.is_empty() {
            self.note("shippingFieldsMissed", json!(fill.missed));
        }
        Ok(StepRun::Completed)
    }

    async fn fill_payment_form(&self) -> Result<StepRun, StepError> {
        let card = self.payment.ok_or_else(|| {
            StepError::interaction(
                "fill payment form",
                "no payment card attached to this scenario",
            )
        })?;
        let fill = self
            .fill_field_set("payment form", forms::payment_fields(card))
            .await?;
        self.note("paymentFieldsFilled", json!(fill.filled));
        if !fill.missed.is_empty() {
            self.note("paymentFieldsMissed", json!(fill.missed));
        }
        self.note("cardLabel", json!(card.label));
        Ok(StepRun::Completed)
    }

    async fn submit_order(&self) -> Result<StepRun, StepError> {
        let button = self.require(&catalog::submit_button()).await?;
        self.click("submit order", button).await?;
        self.idle().await?;
        self.note("orderSubmitted", json!(true));
        Ok(StepRun::Completed)
    }

    async fn probe_empty_submit(&self) -> Result<StepRun, StepError> {
        let submit = match self.find(&catalog::submit_button()).await? {
            Some(handle) => handle,
            None => {
                return Ok(StepRun::Skipped {
                    reason: "no submit control on page".to_string(),
                })
            }
        };
        self.click("submit empty form", submit).await?;
        self.idle().await?;

        let errors = self.count_all(&catalog::validation_errors()).await?;
        self.note("emptyFormErrors", json!(errors));
        if errors == 0 {
            return Err(StepError::interaction(
                "probe empty submit",
                "empty form was accepted without validation feedback",
            ));
        }
        Ok(StepRun::Completed)
    }

    async fn probe_invalid_email(&self, value: &str) -> Result<StepRun, StepError> {
        let input = match self.find(&forms::email_input()).await? {
            Some(handle) => handle,
            None => {
                return Ok(StepRun::Skipped {
                    reason: "no email field on page".to_string(),
                })
            }
        };
        self.fill("email input", input, value).await?;
        self.submit_and_expect(&forms::email_feedback(), "emailFeedback", || {
            StepError::interaction(
                "probe invalid email",
                format!("\"{}\" was accepted without validation feedback", value),
            )
        })
        .await
    }

    async fn probe_invalid_card(&self, value: &str) -> Result<StepRun, StepError> {
        let input = match self.find(&forms::card_number_input()).await? {
            Some(handle) => handle,
            None => {
                return Ok(StepRun::Skipped {
                    reason: "no card number field on page".to_string(),
                })
            }
        };
        self.fill("card number input", input, value).await?;
        self.submit_and_expect(&forms::card_feedback(), "cardFeedback", || {
            StepError::interaction(
                "probe invalid card",
                "invalid card number was accepted without validation feedback",
            )
        })
        .await
    }

    /// Shared tail of the validation probes: submit, settle, then demand at
    /// least one feedback element.
    async fn submit_and_expect(
        &self,
        feedback: &SelectorChain,
        note_key: &str,
        missing: impl FnOnce() -> StepError,
    ) -> Result<StepRun, StepError> {
        let submit = match self.find(&catalog::submit_button()).await? {
            Some(handle) => handle,
            None => {
                return Ok(StepRun::Skipped {
                    reason: "no submit control on page".to_string(),
                })
            }
        };
        self.click("submit form", submit).await?;
        self.idle().await?;

        let errors = self.count_all(feedback).await?;
        self.note(note_key, json!(errors));
        if errors == 0 {
            return Err(missing());
        }
        Ok(StepRun::Completed)
    }

    async fn fill_field_set(
        &self,
        form: &str,
        fields: Vec<(forms::FormField, String)>,
    ) -> Result<FieldFill, StepError> {
        let total = fields.len();
        let mut filled = Vec::new();
        let mut missed = Vec::new();
        for (field, value) in fields {
            match self.find(&field.chain).await? {
                Some(handle) => {
                    self.fill(field.label, handle, &value).await?;
                    filled.push(field.label);
                }
                None => {
                    log::warn!("{}: no input matched '{}'", form, field.label);
                    missed.push(field.label);
                }
            }
        }
        if filled.is_empty() {
            return Err(StepError::LocatorNotFound {
                target: form.to_string(),
                tried: total,
            });
        }
        Ok(FieldFill { filled, missed })
    }

    async fn require(&self, chain: &SelectorChain) -> Result<ElementHandle, StepError> {
        match self.locate(chain).await? {
            LocateOutcome::Found { handle, .. } => Ok(handle),
            LocateOutcome::NotFound { target, tried } => {
                Err(StepError::LocatorNotFound { target, tried })
            }
        }
    }

    async fn find(&self, chain: &SelectorChain) -> Result<Option<ElementHandle>, StepError> {
        Ok(self.locate(chain).await?.handle())
    }

    async fn locate(&self, chain: &SelectorChain) -> Result<LocateOutcome, StepError> {
        self.locator
            .resolve(self.driver, chain)
            .await
            .map_err(|e| StepError::interaction("locate", format!("{:#}", e)))
    }

    /// Count via the first candidate that matches anything.
    async fn count_first(&self, chain: &SelectorChain) -> Result<usize, StepError> {
        for candidate in &chain.candidates {
            let count = self
                .driver
                .count_matches(candidate)
                .await
                .map_err(|e| StepError::interaction("count matches", format!("{:#}", e)))?;
            if count > 0 {
                return Ok(count);
            }
        }
        Ok(0)
    }

    /// Count across every candidate. Used for validation feedback where the
    /// page may mix markup flavours.
    async fn count_all(&self, chain: &SelectorChain) -> Result<usize, StepError> {
        let mut total = 0;
        for candidate in &chain.candidates {
            total += self
                .driver
                .count_matches(candidate)
                .await
                .map_err(|e| StepError::interaction("count matches", format!("{:#}", e)))?;
        }
        Ok(total)
    }

    async fn fill(
        &self,
        action: &str,
        handle: ElementHandle,
        value: &str,
    ) -> Result<(), StepError> {
        self.driver
            .fill(handle, value)
            .await
            .map_err(|e| StepError::interaction(action, format!("{:#}", e)))
    }

    async fn click(&self, action: &str, handle: ElementHandle) -> Result<(), StepError> {
        self.driver
            .click(handle)
            .await
            .map_err(|e| StepError::interaction(action, format!("{:#}", e)))
    }

    async fn press(&self, key: &str) -> Result<(), StepError> {
        self.driver
            .press(key)
            .await
            .map_err(|e| StepError::interaction("press", format!("{:#}", e)))
    }

    async fn idle(&self) -> Result<(), StepError> {
        self.driver
            .wait_for_idle()
            .await
            .map_err(|e| StepError::interaction("wait for idle", format!("{:#}", e)))
    }
}
