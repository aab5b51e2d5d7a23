//! Site profiles
//!
//! Everything site-specific lives in a [`SiteProfile`]: selectors, the
//! reviews gate, pagination mode, rating encoding and text cleanup rules.
//! Three presets ship with the crate; any other site is described in the
//! config file under `site_profile`.

use crate::infrastructure::parsing::{
    CatalogSelectors, ItemSelectors, NormalizerRules, ParsingError, ParsingResult, RatingEncoding,
    RatingFallback, RatingRule, ReviewGate, ReviewPagination, ReviewSelectors, ScrollSettings,
};
use serde::{Deserialize, Serialize};

pub const PRESET_NAMES: [&str; 3] = ["wildberries", "lamoda", "mustapp"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    #[serde(default)]
    pub catalog: CatalogSelectors,
    #[serde(default)]
    pub item: ItemSelectors,
    #[serde(default)]
    pub gate: ReviewGate,
    #[serde(default)]
    pub reviews: ReviewSelectors,
    #[serde(default)]
    pub pagination: ReviewPagination,
    #[serde(default)]
    pub rating: RatingRule,
    #[serde(default)]
    pub normalizer: NormalizerRules,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl SiteProfile {
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "wildberries" | "wb" => Some(Self::wildberries()),
            "lamoda" => Some(Self::lamoda()),
            "mustapp" | "must" => Some(Self::mustapp()),
            _ => None,
        }
    }

    pub fn presets() -> Vec<Self> {
        vec![Self::wildberries(), Self::lamoda(), Self::mustapp()]
    }

    /// Reviews live on a separate page reached through a link on the item
    /// page and load by infinite scroll. Ratings are `star<N>` classes.
    pub fn wildberries() -> Self {
        Self {
            name: "wildberries".to_string(),
            catalog: CatalogSelectors {
                landmark: ".product-card__wrapper".to_string(),
                item_links: strings(&["a.product-card__link.j-card-link", "a.product-card__link"]),
                link_path_prefix: Some("/catalog/".to_string()),
                next_page: Some("a.pagination-next".to_string()),
                scroll: Some(ScrollSettings {
                    budget_secs: 300,
                    max_scrolls: Some(10),
                    pause_ms: 3000,
                    ..ScrollSettings::default()
                }),
            },
            item: ItemSelectors {
                landmark: Some(".product-page__title".to_string()),
                name: strings(&["h1.product-page__title", ".product-page__header h1"]),
                description: strings(&["p.option__text", ".product-details p"]),
                description_reveal: Some(".j-details-btn-desktop".to_string()),
            },
            gate: ReviewGate {
                review_count: Vec::new(),
                reveal: None,
                reviews_link: strings(&["a.product-review.j-wba-card-item", "a.product-review"]),
                landmark: ".feedback__content".to_string(),
            },
            reviews: ReviewSelectors {
                container: strings(&["li.comments__item", "li.feedback", "div.feedback"]),
                text: strings(&["p.feedback__text"]),
                rating: strings(&["span.feedback__rating"]),
                title: Vec::new(),
            },
            pagination: ReviewPagination::InfiniteScroll(ScrollSettings {
                budget_secs: 3600,
                max_scrolls: None,
                stable_rounds: 2,
                pause_ms: 5000,
                stop_when_absent: None,
            }),
            rating: RatingRule {
                encoding: RatingEncoding::ClassSuffix {
                    class_prefix: "star".to_string(),
                },
                scale_max: 5,
                on_malformed: RatingFallback::Zero,
            },
            normalizer: NormalizerRules {
                labels: strings(&["Достоинства", "Недостатки", "Комментарий"]),
                trailing_markers: strings(&["Ещё", "Первоначальный отзыв"]),
            },
        }
    }

    /// Reviews sit behind a tab on the item page and are paged with a
    /// "next" arrow. Ratings are the width of the filled star bar.
    pub fn lamoda() -> Self {
        Self {
            name: "lamoda".to_string(),
            catalog: CatalogSelectors {
                landmark: "a.x-product-card__pic-catalog".to_string(),
                item_links: strings(&["a.x-product-card__pic-catalog", "a._root_aroml_2._label_aroml_17"]),
                link_path_prefix: Some("/p/".to_string()),
                next_page: None,
                scroll: Some(ScrollSettings {
                    budget_secs: 30,
                    max_scrolls: Some(3),
                    ..ScrollSettings::default()
                }),
            },
            item: ItemSelectors {
                landmark: None,
                name: strings(&["div._modelName_mnqvr_21"]),
                description: strings(&["div._description_795ct_30"]),
                description_reveal: None,
            },
            gate: ReviewGate {
                review_count: Vec::new(),
                reveal: Some("//span[contains(text(), 'Отзывы')]".to_string()),
                reviews_link: Vec::new(),
                landmark: "div._root_1dixh_6".to_string(),
            },
            reviews: ReviewSelectors {
                container: strings(&["div._root_1dixh_6"]),
                text: strings(&["div._description_1dixh_42"]),
                rating: strings(&["div._starsInner_100pf_16"]),
                title: Vec::new(),
            },
            pagination: ReviewPagination::Click {
                next: ".icon_pagination-arrow-right-black".to_string(),
                timeout_secs: 5,
                scroll: Some(ScrollSettings {
                    max_scrolls: Some(2),
                    ..ScrollSettings::default()
                }),
            },
            rating: RatingRule {
                encoding: RatingEncoding::WidthPercent,
                scale_max: 5,
                on_malformed: RatingFallback::Zero,
            },
            normalizer: NormalizerRules {
                labels: Vec::new(),
                trailing_markers: strings(&["Куплен"]),
            },
        }
    }

    /// Items are addressed by numeric id; a review counter in the meta block
    /// gates the item, and reviews load by scrolling until the spinner goes.
    pub fn mustapp() -> Self {
        Self {
            name: "mustapp".to_string(),
            catalog: CatalogSelectors {
                landmark: "body".to_string(),
                item_links: strings(&["a[href^=\"/p/\"]"]),
                link_path_prefix: Some("/p/".to_string()),
                next_page: None,
                scroll: None,
            },
            item: ItemSelectors {
                landmark: Some(".productPage__meta".to_string()),
                name: strings(&["h1.productPage__title"]),
                description: strings(&[
                    "div.productPage__overview_text.js_overview_full",
                    "div.productPage__overview_text",
                ]),
                description_reveal: None,
            },
            gate: ReviewGate {
                review_count: strings(&[
                    ".productPage__meta .productPage__meta_item:nth-child(4) .productPage__meta_value",
                ]),
                reveal: None,
                reviews_link: Vec::new(),
                landmark: ".productWatches__list".to_string(),
            },
            reviews: ReviewSelectors {
                container: strings(&[".productWatches__item_info"]),
                text: strings(&[".productWatches__item_review"]),
                rating: strings(&[".productWatches__item_rate"]),
                title: strings(&[".productWatches__item_review_title"]),
            },
            pagination: ReviewPagination::InfiniteScroll(ScrollSettings {
                budget_secs: 20,
                max_scrolls: None,
                stable_rounds: 2,
                pause_ms: 1000,
                stop_when_absent: Some(".preloader.m_big".to_string()),
            }),
            rating: RatingRule {
                encoding: RatingEncoding::ClassSuffix {
                    class_prefix: "m_rate_".to_string(),
                },
                scale_max: 10,
                on_malformed: RatingFallback::Skip,
            },
            normalizer: NormalizerRules::default(),
        }
    }

    /// Structural checks the selector compiler cannot make.
    pub fn validate(&self) -> ParsingResult<()> {
        if self.name.trim().is_empty() {
            return Err(ParsingError::configuration("name", "profile name must not be empty"));
        }
        if self.catalog.landmark.trim().is_empty() {
            return Err(ParsingError::configuration(
                "catalog.landmark",
                "catalog landmark must not be empty",
            ));
        }
        if self.gate.landmark.trim().is_empty() {
            return Err(ParsingError::configuration(
                "gate.landmark",
                "reviews landmark must not be empty",
            ));
        }
        if self.rating.scale_max == 0 {
            return Err(ParsingError::configuration(
                "rating.scale_max",
                "rating scale must be greater than 0",
            ));
        }
        match &self.pagination {
            ReviewPagination::Click {
                next,
                timeout_secs,
                scroll,
            } => {
                if next.trim().is_empty() || *timeout_secs == 0 {
                    return Err(ParsingError::configuration(
                        "pagination.next",
                        "click pagination needs a selector and a non-zero timeout",
                    ));
                }
                if scroll.as_ref().is_some_and(|scroll| scroll.stable_rounds == 0) {
                    return Err(ParsingError::configuration(
                        "pagination.scroll.stable_rounds",
                        "stable_rounds must be at least 1",
                    ));
                }
            }
            ReviewPagination::InfiniteScroll(scroll) if scroll.stable_rounds == 0 => {
                return Err(ParsingError::configuration(
                    "pagination.stable_rounds",
                    "stable_rounds must be at least 1",
                ));
            }
            _ => {}
        }
        Ok(())
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            catalog: CatalogSelectors::default(),
            item: ItemSelectors::default(),
            gate: ReviewGate::default(),
            reviews: ReviewSelectors::default(),
            pagination: ReviewPagination::default(),
            rating: RatingRule::default(),
            normalizer: NormalizerRules::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("wildberries")]
    #[case("WB")]
    #[case(" Lamoda ")]
    #[case("mustapp")]
    fn test_preset_lookup(#[case] name: &str) {
        assert!(SiteProfile::preset(name).is_some());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(SiteProfile::preset("ozon").is_none());
    }

    #[test]
    fn test_presets_validate() {
        for profile in SiteProfile::presets() {
            profile.validate().unwrap();
        }
        assert_eq!(SiteProfile::presets().len(), PRESET_NAMES.len());
    }

    #[test]
    fn test_rating_policy_per_site() {
        assert_eq!(SiteProfile::lamoda().rating.on_malformed, RatingFallback::Zero);
        assert_eq!(SiteProfile::mustapp().rating.on_malformed, RatingFallback::Skip);
        assert_eq!(SiteProfile::mustapp().rating.scale_max, 10);
    }

    #[test]
    fn test_custom_profile_from_json() {
        let json = r#"{
            "name": "shop",
            "gate": {"landmark": ".reviews"},
            "reviews": {"container": [".r"], "text": [".t"], "rating": []},
            "pagination": {"mode": "click", "next": "a.next"},
            "rating": {"encoding": "class_suffix", "class_prefix": "score-", "scale_max": 10}
        }"#;
        let profile: SiteProfile = serde_json::from_str(json).unwrap();

        profile.validate().unwrap();
        assert_eq!(profile.rating.scale_max, 10);
        assert_eq!(profile.rating.on_malformed, RatingFallback::Zero);
        assert_eq!(profile.catalog, CatalogSelectors::default());
    }

    #[test]
    fn test_zero_timeout_click_pagination_is_rejected() {
        let mut profile = SiteProfile::lamoda();
        profile.pagination = ReviewPagination::Click {
            next: ".next".to_string(),
            timeout_secs: 0,
            scroll: None,
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_lamoda_scrolls_each_review_page() {
        match SiteProfile::lamoda().pagination {
            ReviewPagination::Click { scroll, .. } => {
                assert_eq!(scroll.and_then(|scroll| scroll.max_scrolls), Some(2));
            }
            other => panic!("unexpected pagination {other:?}"),
        }
    }
}
