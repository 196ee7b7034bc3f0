//! Built-in adapters for the supported retailers.

use crate::adapter::render::{BadgeAnchor, BadgeStyle, BLOCK_CSS};
use crate::adapter::QuantitySource::{self, Name, NameTitle, Volume};
use crate::adapter::{Eligibility, Fallback, PriceFormat, QuantityPolicy, Selectors, SiteAdapter};
use crate::dom::Placement;
use crate::units::{BadgeTemplate, Precision};

fn selectors(card: &str, price: &str, name: &str) -> Selectors {
    Selectors {
        card: card.to_string(),
        price: price.to_string(),
        name: name.to_string(),
        ..Selectors::default()
    }
}

fn sources(list: &[QuantitySource], fallback: Fallback) -> QuantityPolicy {
    QuantityPolicy {
        sources: list.to_vec(),
        fallback,
        percent_as_grams: false,
    }
}

fn closest_to_price(selector: &str) -> BadgeStyle {
    BadgeStyle::anchored(BadgeAnchor::ClosestToPrice(selector.to_string()))
}

fn adapter(
    name: &str,
    display_name: &str,
    selectors: Selectors,
    price_format: PriceFormat,
    quantity: QuantityPolicy,
    badge: BadgeStyle,
) -> SiteAdapter {
    SiteAdapter {
        name: name.to_string(),
        display_name: display_name.to_string(),
        selectors,
        price_format,
        quantity,
        badge,
        eligibility: Eligibility::default(),
    }
}

pub fn ozon() -> SiteAdapter {
    adapter(
        "ozon",
        "Ozon",
        selectors(
            r#"[class*="tile-root"]"#,
            r#"[class*="tsHeadline500Medium"]"#,
            r#"[class*="tsBody500Medium"]"#,
        ),
        PriceFormat::Digits,
        QuantityPolicy::default(),
        closest_to_price("div"),
    )
}

pub fn auchan() -> SiteAdapter {
    adapter(
        "auchan",
        "Ашан",
        Selectors {
            volume: Some(r#"[class*="productCardContentPanel_type"]"#.to_string()),
            ..selectors(
                r#"[class*="styles_productCard"][class*="styles_catalogListPage_item"],div[class*=digi-product]"#,
                r#"[class*="styles_productCardContentPanel_price"],[class*=digi-product__price]"#,
                r#"[class*="styles_productCardContentPanel_name"],[class*=digi-product__label]"#,
            )
        },
        PriceFormat::Digits,
        sources(&[Volume, Name], Fallback::NoInfo),
        closest_to_price("div"),
    )
}

pub fn delivery_club() -> SiteAdapter {
    adapter(
        "delivery_club",
        "Delivery Club",
        Selectors {
            volume: Some(".wpsxpb7".to_string()),
            ..selectors(
                r#"li[data-carousel-item="true"], li.DesktopGoodsList_item, .DesktopGoodsList_list li, div[data-testid="product-card-root"]"#,
                ".p1jdj7iy span",
                ".nsawvb6",
            )
        },
        PriceFormat::Digits,
        sources(&[Volume, Name], Fallback::NoInfo),
        BadgeStyle {
            marker: "product-card-unit-price".to_string(),
            ..closest_to_price(r#"div[aria-hidden="true"]"#)
        },
    )
}

pub fn lavka() -> SiteAdapter {
    adapter(
        "lavka",
        "Яндекс Лавка",
        selectors(
            "[class*=p19kkpiw]",
            "[class*=phcb3a1] [class*=b15aiivf][style*='color'], [class*=t18stym3][class*=bw441np][class*=r88klks][style*='color']",
            "[class*=m12g4kzj]",
        ),
        PriceFormat::Digits,
        QuantityPolicy::default(),
        closest_to_price(r#"[aria-hidden="true"]"#),
    )
}

pub fn kuper() -> SiteAdapter {
    adapter(
        "kuper",
        "Купер",
        Selectors {
            volume: Some("[data-qa$=_volume]".to_string()),
            ..selectors(
                "[class*=ProductCardGridLayout]",
                "[class*=priceText]",
                "[data-qa$=_title]",
            )
        },
        PriceFormat::DecimalComma,
        sources(&[NameTitle, Volume], Fallback::NoInfo),
        closest_to_price("div"),
    )
}

pub fn lenta() -> SiteAdapter {
    adapter(
        "lenta",
        "Лента",
        Selectors {
            volume: Some(".product-position-price .price, .card-name_package".to_string()),
            ..selectors(".product-card", ".main-price", "[automation-id='catProductName']")
        },
        PriceFormat::DecimalComma,
        sources(&[Volume, NameTitle, Name], Fallback::NoInfo),
        BadgeStyle {
            template: BadgeTemplate::Slash,
            ..BadgeStyle::anchored(BadgeAnchor::Within(".price-and-buttons".to_string()))
        },
    )
}

pub fn magnit() -> SiteAdapter {
    adapter(
        "magnit",
        "Магнит",
        selectors(
            r#"[class*="unit-catalog-product-preview"]"#,
            r#"[class*="unit-catalog-product-preview-prices__sale"] span, [class*="unit-catalog-product-preview-prices__regular"] span"#,
            r#"[class*="unit-catalog-product-preview-title"]"#,
        ),
        PriceFormat::Digits,
        sources(&[Name], Fallback::OnePiece),
        BadgeStyle {
            placement: Placement::Prepend,
            precision: Precision::CentsBelow(20.0),
            css: BLOCK_CSS.to_string(),
            ..BadgeStyle::anchored(BadgeAnchor::Within(
                r#"[class*="unit-catalog-product-preview-prices"]"#.to_string(),
            ))
        },
    )
}

pub fn perekrestok() -> SiteAdapter {
    adapter(
        "perekrestok",
        "Перекрёсток",
        Selectors {
            volume: Some("[data-testid=product-card-weight]".to_string()),
            ..selectors(
                "[data-testid=product-card-root]",
                "[data-testid=product-card-price]",
                "[data-testid=product-card-name]",
            )
        },
        PriceFormat::Rubles,
        sources(&[Volume, Name], Fallback::NoInfo),
        closest_to_price("div"),
    )
}

pub fn samberi() -> SiteAdapter {
    adapter(
        "samberi",
        "Самбери",
        selectors(
            "[class*=product-item-container]",
            "[class*=product-item-price-current]",
            "[class*=product-item-title] a",
        ),
        PriceFormat::Digits,
        QuantityPolicy {
            percent_as_grams: true,
            ..sources(&[Name], Fallback::NoInfo)
        },
        closest_to_price("[class*=product-item-info-container]"),
    )
}

pub fn pyaterochka() -> SiteAdapter {
    adapter(
        "pyaterochka",
        "Пятёрочка",
        Selectors {
            discount_price: Some(r#"[class*="priceContainer_discountContainer"]"#.to_string()),
            ..selectors(
                r#"[data-qa^="product-card-"], [class*="productFilterGrid_cardContainer"]"#,
                r#"[class*="priceContainer_totalContainer_"]"#,
                r#"[class*="mainInformation_weight"]"#,
            )
        },
        PriceFormat::Kopecks,
        sources(&[Name], Fallback::NoInfo),
        closest_to_price("div"),
    )
}

pub fn samokat() -> SiteAdapter {
    adapter(
        "samokat",
        "Самокат",
        Selectors {
            render_root: Some("[class*=ProductCard_details]".to_string()),
            ..selectors(
                "[class*=ProductCard_root]",
                "[class*=ProductCardActions_text] span span:last-child",
                "[class*=ProductCard_specification] span:first-child",
            )
        },
        PriceFormat::Digits,
        sources(&[Name], Fallback::OnePiece),
        BadgeStyle {
            precision: Precision::CentsBelow(20.0),
            ..BadgeStyle::anchored(BadgeAnchor::RenderRoot)
        },
    )
}

pub fn metro() -> SiteAdapter {
    let metro = adapter(
        "metro",
        "METRO",
        Selectors {
            price_unit: Some(".product-price__unit".to_string()),
            render_root: Some(".product-unit-prices".to_string()),
            ..selectors(
                ".product-card__content",
                r#"span.product-unit-prices__actual, div.price, [data-testid="price-value"]"#,
                r#"[class*="product-card-name__text"], a[href^="/products/"] span, [data-testid="product-name"]"#,
            )
        },
        PriceFormat::Digits,
        sources(&[Name], Fallback::OnePiece),
        BadgeStyle::anchored(BadgeAnchor::RenderRoot),
    );
    SiteAdapter {
        eligibility: Eligibility::PriceOnly,
        ..metro
    }
}

/// Every built-in adapter, in registry order
pub fn builtin() -> Vec<SiteAdapter> {
    vec![
        ozon(),
        auchan(),
        delivery_club(),
        lavka(),
        kuper(),
        lenta(),
        magnit(),
        perekrestok(),
        samberi(),
        pyaterochka(),
        samokat(),
        metro(),
    ]
}

pub fn by_name(name: &str) -> Option<SiteAdapter> {
    builtin().into_iter().find(|site| site.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_names_are_unique() {
        let sites = builtin();
        assert_eq!(sites.len(), 12);
        let names: HashSet<_> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), sites.len());
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("lenta").map(|s| s.badge.template), Some(BadgeTemplate::Slash));
        assert!(by_name("amazon").is_none());
    }

    #[test]
    fn test_builtin_selectors_parse() {
        use crate::dom::{Dom, HtmlPage};

        let page = HtmlPage::parse("<html><body></body></html>");
        for site in builtin() {
            let s = &site.selectors;
            for sel in [Some(&s.card), Some(&s.price), Some(&s.name)]
                .into_iter()
                .chain([&s.discount_price, &s.volume, &s.price_unit, &s.render_root].map(Option::as_ref))
                .flatten()
            {
                assert!(page.query_all(sel).is_ok(), "{}: bad selector {}", site.name, sel);
            }
        }
    }
}
