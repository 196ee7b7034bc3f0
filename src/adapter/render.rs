use crate::dom::{Badge, Placement};
use crate::units::{format_unit_price, BadgeTemplate, Precision, NO_UNIT_INFO};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MARKER: &str = "unit-price";

pub const PRICED_CSS: &str = "display: inline-block; margin-left: 0.5em; color: #000; \
     background: var(--accent-color, #00C66A20); padding: 2px 6px; border-radius: 4px; \
     font-weight: 900";

pub const NO_INFO_CSS: &str = "display: inline-block; margin-left: 0.5em; color: #000; \
     background: var(--accent-color, rgba(0, 69, 198, 0.13)); padding: 2px 6px; \
     border-radius: 4px; font-weight: 900";

/// Block badge laid over the price column (Magnit)
pub const BLOCK_CSS: &str = "display: block; color: rgb(0, 0, 0); \
     background-color: rgb(230, 245, 239); padding: 2px 6px 2px 0.5px; border-radius: 4px; \
     font-weight: 600; font-size: 14px; margin-bottom: 4px";

/// Which element of the card receives the badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeAnchor {
    /// Nearest ancestor-or-self of the price element matching the selector
    ClosestToPrice(String),
    /// The adapter's `render_root` element (the card when none is configured)
    RenderRoot,
    /// First descendant of the card matching the selector
    Within(String),
    Card,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeStyle {
    /// `data-testid` value carried by every badge of this site
    pub marker: String,
    pub anchor: BadgeAnchor,
    #[serde(default)]
    pub placement: Placement,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default)]
    pub template: BadgeTemplate,
    pub css: String,
    pub no_info_css: String,
}

impl Default for BadgeStyle {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            anchor: BadgeAnchor::ClosestToPrice("div".to_string()),
            placement: Placement::Append,
            precision: Precision::Whole,
            template: BadgeTemplate::Za,
            css: PRICED_CSS.to_string(),
            no_info_css: NO_INFO_CSS.to_string(),
        }
    }
}

impl BadgeStyle {
    pub fn anchored(anchor: BadgeAnchor) -> Self {
        Self {
            anchor,
            ..Self::default()
        }
    }

    /// Selector matching badges already rendered with this style
    pub fn selector(&self) -> String {
        format!(r#"[data-testid="{}"]"#, self.marker)
    }

    pub fn priced(&self, unit_price: f64, unit_label: &str) -> Badge {
        Badge {
            marker: self.marker.clone(),
            text: format_unit_price(unit_price, unit_label, self.precision, self.template),
            css: self.css.clone(),
            placement: self.placement,
        }
    }

    pub fn no_info(&self) -> Badge {
        Badge {
            marker: self.marker.clone(),
            text: NO_UNIT_INFO.to_string(),
            css: self.no_info_css.clone(),
            placement: self.placement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badges() {
        let style = BadgeStyle::default();
        assert_eq!(style.selector(), r#"[data-testid="unit-price"]"#);

        let priced = style.priced(796.0, "1 кг");
        assert_eq!(priced.text, "796 ₽ за 1 кг");
        assert_eq!(priced.css, PRICED_CSS);

        let none = style.no_info();
        assert_eq!(none.text, "Нет инф.");
        assert!(none.css.contains("rgba(0, 69, 198, 0.13)"));
    }

    #[test]
    fn test_slash_template_with_cents() {
        let style = BadgeStyle {
            template: BadgeTemplate::Slash,
            precision: Precision::CentsBelow(20.0),
            ..BadgeStyle::default()
        };
        assert_eq!(style.priced(12.346, "1 шт").text, "12.35 ₽/1 шт");
        assert_eq!(style.priced(412.6, "1 кг").text, "413 ₽/1 кг");
    }
}
