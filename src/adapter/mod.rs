// Per-retailer adapters. A `SiteAdapter` is plain data (selectors plus policy
// enums); every operation here is generic over the page's `Dom`.

pub mod price;
pub mod quantity;
pub mod render;
pub mod sites;

pub use price::PriceFormat;
pub use quantity::{Fallback, QuantityPolicy, QuantitySource};
pub use render::{BadgeAnchor, BadgeStyle};

use crate::dom::{Dom, DomError};
use crate::units::{ConversionError, ConversionResult, StandardUnit};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("{role} element not found ({selector})")]
    MissingElement { role: &'static str, selector: String },

    #[error("price not recognized: {0:?}")]
    Price(String),

    #[error(transparent)]
    Quantity(#[from] ConversionError),

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// CSS selectors locating the parts of one product card.
/// All but `card` and `observe_root` are evaluated inside the card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectors {
    pub card: String,
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Element telling which unit the shelf price is quoted in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_root: Option<String>,
    /// Subtree watched for new cards; the whole body when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_root: Option<String>,
}

/// What processing a card put on the page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Priced {
        price: f64,
        unit_price: f64,
        unit: StandardUnit,
        text: String,
    },
    NoUnitInfo,
}

/// Which rendered parts make a card ready to process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// A price plus a name or volume
    #[default]
    PriceAndDescription,
    /// A price is enough; quantity falls back to the policy when no name is found
    PriceOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteAdapter {
    /// Registry key ("ozon", "lenta", ...)
    pub name: String,
    pub display_name: String,
    pub selectors: Selectors,
    pub price_format: PriceFormat,
    #[serde(default)]
    pub quantity: QuantityPolicy,
    #[serde(default)]
    pub badge: BadgeStyle,
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl SiteAdapter {
    pub fn card_selector(&self) -> &str {
        &self.selectors.card
    }

    /// Matches badges this adapter has already rendered
    pub fn unit_price_selector(&self) -> String {
        self.badge.selector()
    }

    /// A card is eligible once its price (and, unless the adapter is
    /// [`Eligibility::PriceOnly`], a name or volume) is rendered and it carries
    /// no badge yet.
    pub fn should_process<D: Dom>(&self, dom: &D, card: &D::Node) -> Result<bool, AdapterError> {
        let has_price = dom.query_first(card, &self.selectors.price)?.is_some()
            || match &self.selectors.discount_price {
                Some(sel) => dom.query_first(card, sel)?.is_some(),
                None => false,
            };
        if !has_price {
            return Ok(false);
        }

        let has_description = self.eligibility == Eligibility::PriceOnly
            || dom.query_first(card, &self.selectors.name)?.is_some()
            || match &self.selectors.volume {
                Some(sel) => dom.query_first(card, sel)?.is_some(),
                None => false,
            };
        if !has_description {
            return Ok(false);
        }

        Ok(dom.query_first(card, &self.unit_price_selector())?.is_none())
    }

    /// Package price; a non-empty discount price wins over the regular one
    pub fn parse_price<D: Dom>(&self, dom: &D, card: &D::Node) -> Result<f64, AdapterError> {
        if let Some(sel) = &self.selectors.discount_price {
            if let Some(node) = dom.query_first(card, sel)? {
                let text = dom.text_content(&node);
                if !text.trim().is_empty() {
                    return self.price_format.parse(&text);
                }
            }
        }

        let node = dom
            .query_first(card, &self.selectors.price)?
            .ok_or_else(|| AdapterError::MissingElement {
                role: "price",
                selector: self.selectors.price.clone(),
            })?;
        self.price_format.parse(&dom.text_content(&node))
    }

    /// Package size normalized against its standard unit.
    ///
    /// Missing texts are not errors: they fall through to the adapter's fallback.
    pub fn parse_quantity<D: Dom>(&self, dom: &D, card: &D::Node) -> Result<ConversionResult, AdapterError> {
        if let Some(sel) = &self.selectors.price_unit {
            if let Some(node) = dom.query_first(card, sel)? {
                if let Some(unit) = quantity::quoted_unit(&dom.text_content(&node)) {
                    self.log(format_args!("price already quoted per {}", unit));
                    return Ok(ConversionResult::per_standard(unit));
                }
            }
        }

        let mut texts = Vec::with_capacity(self.quantity.sources.len());
        for source in &self.quantity.sources {
            let text = match source {
                QuantitySource::Volume => match &self.selectors.volume {
                    Some(sel) => dom.query_first(card, sel)?.map(|n| dom.text_content(&n)),
                    None => None,
                },
                QuantitySource::Name => dom
                    .query_first(card, &self.selectors.name)?
                    .map(|n| dom.text_content(&n)),
                QuantitySource::NameTitle => dom
                    .query_first(card, &self.selectors.name)?
                    .and_then(|n| dom.attribute(&n, "title")),
            };
            texts.extend(text);
        }

        Ok(self.quantity.resolve(texts)?)
    }

    pub fn render_unit_price<D: Dom>(
        &self,
        dom: &mut D,
        card: &D::Node,
        unit_price: f64,
        unit_label: &str,
    ) -> Result<(), AdapterError> {
        let badge = self.badge.priced(unit_price, unit_label);
        let anchor = self.anchor(dom, card)?;
        self.clear_badges(dom, card)?;
        dom.insert_badge(&anchor, &badge)?;
        Ok(())
    }

    pub fn render_no_unit_info<D: Dom>(&self, dom: &mut D, card: &D::Node) -> Result<(), AdapterError> {
        let badge = self.badge.no_info();
        let anchor = self.anchor(dom, card)?;
        self.clear_badges(dom, card)?;
        dom.insert_badge(&anchor, &badge)?;
        Ok(())
    }

    /// Full pipeline for one card: price, quantity, badge.
    pub fn process<D: Dom>(&self, dom: &mut D, card: &D::Node) -> Result<Outcome, AdapterError> {
        let price = self.parse_price(dom, card)?;
        self.log(format_args!("price {}", price));

        match self.parse_quantity(dom, card)? {
            ConversionResult::UnitPriced { unit, multiplier } => {
                let unit_price = price * multiplier;
                if !unit_price.is_finite() {
                    return Err(AdapterError::Price(price.to_string()));
                }
                self.render_unit_price(dom, card, unit_price, unit.label())?;
                let text = self.badge.priced(unit_price, unit.label()).text;
                self.log(format_args!("rendered {:?}", text));
                Ok(Outcome::Priced {
                    price,
                    unit_price,
                    unit,
                    text,
                })
            }
            ConversionResult::NoUnitInfo => {
                self.render_no_unit_info(dom, card)?;
                self.log(format_args!("no unit information"));
                Ok(Outcome::NoUnitInfo)
            }
        }
    }

    /// Debug trace tagged with the site; silent unless a subscriber is installed
    pub fn log(&self, args: fmt::Arguments<'_>) {
        tracing::debug!(site = %self.name, "{}", args);
    }

    /// Resolve where the badge goes. Runs before any mutation so a failure
    /// leaves the card untouched.
    fn anchor<D: Dom>(&self, dom: &D, card: &D::Node) -> Result<D::Node, AdapterError> {
        let found = match &self.badge.anchor {
            BadgeAnchor::Card => Some(card.clone()),
            BadgeAnchor::Within(sel) => dom.query_first(card, sel)?,
            BadgeAnchor::RenderRoot => match &self.selectors.render_root {
                Some(sel) => dom.query_first(card, sel)?,
                None => Some(card.clone()),
            },
            BadgeAnchor::ClosestToPrice(sel) => {
                let price = dom
                    .query_first(card, &self.selectors.price)?
                    .ok_or_else(|| AdapterError::MissingElement {
                        role: "price",
                        selector: self.selectors.price.clone(),
                    })?;
                match dom.closest(&price, sel)? {
                    // an ancestor above the card would put the badge outside it
                    Some(node) if dom.closest(&node, &self.selectors.card)?.as_ref() == Some(card) => {
                        Some(node)
                    }
                    _ => None,
                }
            }
        };

        found.ok_or_else(|| AdapterError::MissingElement {
            role: "badge anchor",
            selector: self.anchor_selector(),
        })
    }

    fn anchor_selector(&self) -> String {
        match &self.badge.anchor {
            BadgeAnchor::Card => self.selectors.card.clone(),
            BadgeAnchor::Within(sel) | BadgeAnchor::ClosestToPrice(sel) => sel.clone(),
            BadgeAnchor::RenderRoot => self
                .selectors
                .render_root
                .clone()
                .unwrap_or_else(|| self.selectors.card.clone()),
        }
    }

    fn clear_badges<D: Dom>(&self, dom: &mut D, card: &D::Node) -> Result<(), AdapterError> {
        for stale in dom.query_within(card, &self.unit_price_selector())? {
            dom.remove(&stale)?;
        }
        Ok(())
    }
}
