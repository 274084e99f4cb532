//! Suite construction. A flow plus a site config expands into concrete
//! scenarios with fully parameterized steps, so the orchestrator never
//! consults the config while running.

use std::fmt::{self, Write as _};

use clap::ValueEnum;

use crate::config::{SiteConfig, TestingConfig};
use crate::data::TestData;
use crate::driver::BrowserKind;
use crate::error::ConfigError;
use crate::runner::scenario::{Scenario, ScenarioKind};
use crate::runner::suite::SuiteDefinition;
use crate::steps::{StepKind, StepSpec};

/// Which slice of the suite to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Flow {
    /// Search, cart, validation, then checkout on every configured browser.
    Full,
    /// Checkout scenarios only.
    Checkout,
    /// Form validation probes only.
    Validation,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Flow::Full => "full",
            Flow::Checkout => "checkout",
            Flow::Validation => "validation",
        };
        f.write_str(name)
    }
}

pub fn build_suite(
    flow: Flow,
    site: &SiteConfig,
    testing: &TestingConfig,
    data: &TestData,
) -> Result<SuiteDefinition, ConfigError> {
    let primary = *testing.browsers.first().ok_or(ConfigError::NoBrowsers)?;

    let mut scenarios = Vec::new();
    match flow {
        Flow::Full => {
            scenarios.push(product_search(site, primary));
            scenarios.push(cart_management(site, primary, flow)?);
            scenarios.push(form_validation(site, primary, data, flow)?);
            for browser in &testing.browsers {
                scenarios.push(checkout_flow(site, *browser, testing, data, flow)?);
            }
        }
        Flow::Checkout => {
            for browser in &testing.browsers {
                scenarios.push(checkout_flow(site, *browser, testing, data, flow)?);
            }
        }
        Flow::Validation => {
            scenarios.push(form_validation(site, primary, data, flow)?);
        }
    }

    Ok(SuiteDefinition {
        name: flow.to_string(),
        site: site.name.clone(),
        scenarios,
    })
}

fn product_search(site: &SiteConfig, browser: BrowserKind) -> Scenario {
    let term = site
        .search_terms
        .first()
        .cloned()
        .unwrap_or_else(|| "test product".to_string());
    Scenario {
        name: "product_search".to_string(),
        kind: ScenarioKind::ProductSearch,
        browser,
        steps: vec![
            StepSpec::required(StepKind::Navigate {
                url: site.base_url.clone(),
            }),
            StepSpec::required(StepKind::Search { term }),
        ],
        shipping: None,
        payment: None,
    }
}

fn cart_management(
    site: &SiteConfig,
    browser: BrowserKind,
    flow: Flow,
) -> Result<Scenario, ConfigError> {
    let product_url = first_product_url(site, flow)?;
    Ok(Scenario {
        name: "cart_management".to_string(),
        kind: ScenarioKind::CartManagement,
        browser,
        steps: vec![
            StepSpec::required(StepKind::OpenProduct { url: product_url }),
            StepSpec::required(StepKind::AddToCart),
            StepSpec::best_effort(StepKind::OpenCart),
            StepSpec::best_effort(StepKind::SetQuantity { quantity: 2 }),
            StepSpec::best_effort(StepKind::RemoveItem),
        ],
        shipping: None,
        payment: None,
    })
}

fn form_validation(
    site: &SiteConfig,
    browser: BrowserKind,
    data: &TestData,
    flow: Flow,
) -> Result<Scenario, ConfigError> {
    let checkout_url = checkout_url(site, flow)?;
    let bad_email = data
        .invalid
        .emails
        .first()
        .cloned()
        .unwrap_or_else(|| "invalid-email".to_string());
    let bad_card = data
        .invalid
        .cards
        .first()
        .map(|c| c.number.clone())
        .unwrap_or_else(|| "1234567890123456".to_string());
    Ok(Scenario {
        name: "form_validation".to_string(),
        kind: ScenarioKind::FormValidation,
        browser,
        steps: vec![
            StepSpec::required(StepKind::Navigate { url: checkout_url }),
            StepSpec::best_effort(StepKind::ProbeEmptySubmit),
            StepSpec::best_effort(StepKind::ProbeInvalidEmail { value: bad_email }),
            StepSpec::best_effort(StepKind::ProbeInvalidCard { value: bad_card }),
        ],
        shipping: None,
        payment: None,
    })
}

fn checkout_flow(
    site: &SiteConfig,
    browser: BrowserKind,
    testing: &TestingConfig,
    data: &TestData,
    flow: Flow,
) -> Result<Scenario, ConfigError> {
    let product_url = first_product_url(site, flow)?;
    let checkout_url = checkout_url(site, flow)?;

    let mut steps = vec![
        StepSpec::required(StepKind::OpenProduct { url: product_url }),
        StepSpec::required(StepKind::AddToCart),
        StepSpec::required(StepKind::Navigate { url: checkout_url }),
        StepSpec::required(StepKind::FillShippingForm),
        StepSpec::required(StepKind::FillPaymentForm),
    ];
    // Orders are only placed when explicitly opted in; otherwise the flow
    // ends after the payment form.
    if testing.submit_orders {
        steps.push(StepSpec::required(StepKind::SubmitOrder));
    }

    Ok(Scenario {
        name: format!("checkout_flow_{}", browser),
        kind: ScenarioKind::CheckoutFlow,
        browser,
        steps,
        shipping: data.shipping_address().cloned(),
        payment: data.checkout_card().cloned(),
    })
}

fn first_product_url(site: &SiteConfig, flow: Flow) -> Result<String, ConfigError> {
    site.product_urls
        .first()
        .cloned()
        .ok_or_else(|| ConfigError::MissingSiteField {
            site: site.name.clone(),
            field: "productUrls",
            flow: flow.to_string(),
        })
}

fn checkout_url(site: &SiteConfig, flow: Flow) -> Result<String, ConfigError> {
    if site.checkout_url.is_empty() {
        return Err(ConfigError::MissingSiteField {
            site: site.name.clone(),
            field: "checkoutUrl",
            flow: flow.to_string(),
        });
    }
    Ok(site.checkout_url.clone())
}

/// Human-readable plan for `--dry-run`. Required steps are marked `*`,
/// best-effort ones `-`.
pub fn render_plan(suite: &SuiteDefinition) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "suite '{}' against '{}' ({} scenarios)",
        suite.name,
        suite.site,
        suite.scenarios.len()
    );
    for (index, scenario) in suite.scenarios.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n{:>2}. {} [{}]",
            index + 1,
            scenario.name,
            scenario.browser
        );
        for step in &scenario.steps {
            let marker = if step.required { "*" } else { "-" };
            let _ = writeln!(out, "      {} {}", marker, step.kind.display());
        }
    }
    out
}
