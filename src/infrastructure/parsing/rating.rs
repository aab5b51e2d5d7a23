//! Rating decoding
//!
//! Sites encode the score either as a class name suffix (`star4`,
//! `m_rate_8`) or as the width of a filled star bar (`width: 80%`).

use super::{ParsingError, ParsingResult};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

static WIDTH_PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*width\s*:\s*(-?[0-9]+(?:\.[0-9]+)?)\s*%").expect("static regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
pub enum RatingEncoding {
    /// Integer suffix of the first class starting with `class_prefix`.
    ClassSuffix { class_prefix: String },
    /// Percentage in the inline `width` style.
    WidthPercent,
}

/// What to do when the rating is missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingFallback {
    /// Keep the review with rating 0.
    #[default]
    Zero,
    /// Drop the review.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRule {
    #[serde(flatten)]
    pub encoding: RatingEncoding,
    #[serde(default = "default_scale_max")]
    pub scale_max: u8,
    #[serde(default)]
    pub on_malformed: RatingFallback,
}

const fn default_scale_max() -> u8 {
    5
}

impl Default for RatingRule {
    fn default() -> Self {
        Self {
            encoding: RatingEncoding::WidthPercent,
            scale_max: default_scale_max(),
            on_malformed: RatingFallback::Zero,
        }
    }
}

impl RatingRule {
    /// Decode the rating carried by `element`.
    pub fn decode(&self, element: &ElementRef) -> ParsingResult<u8> {
        match &self.encoding {
            RatingEncoding::ClassSuffix { class_prefix } => {
                let classes: Vec<&str> = element.value().classes().collect();
                rating_from_classes(&classes, class_prefix, self.scale_max)
            }
            RatingEncoding::WidthPercent => {
                let style = element
                    .value()
                    .attr("style")
                    .ok_or_else(|| ParsingError::malformed_rating("", "no style attribute"))?;
                let percent = parse_width_percent(style)?;
                Ok(rating_from_width_percent(percent, self.scale_max))
            }
        }
    }

    /// Apply the fallback policy to a decode result. `None` means drop the review.
    pub const fn resolve(&self, decoded: Option<u8>) -> Option<u8> {
        match (decoded, self.on_malformed) {
            (Some(rating), _) => Some(rating),
            (None, RatingFallback::Zero) => Some(0),
            (None, RatingFallback::Skip) => None,
        }
    }
}

/// `round(percent / (100 / scale_max))`, percent clamped to `[0, 100]`,
/// ties to even.
pub fn rating_from_width_percent(percent: f64, scale_max: u8) -> u8 {
    let clamped = if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    };
    let scaled = (clamped * f64::from(scale_max) / 100.0).round_ties_even();
    // scaled lies in [0, scale_max]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rating = scaled as u8;
    rating
}

pub fn parse_width_percent(style: &str) -> ParsingResult<f64> {
    let caps = WIDTH_PERCENT
        .captures(style)
        .ok_or_else(|| ParsingError::malformed_rating(style, "no width percentage"))?;
    caps[1]
        .parse::<f64>()
        .map_err(|e| ParsingError::malformed_rating(style, e))
}

pub fn rating_from_classes(classes: &[&str], class_prefix: &str, scale_max: u8) -> ParsingResult<u8> {
    let suffix = classes
        .iter()
        .filter_map(|class| class.strip_prefix(class_prefix))
        .find(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| {
            ParsingError::malformed_rating(
                &classes.join(" "),
                format!("no class with numeric suffix after '{class_prefix}'"),
            )
        })?;

    let rating: u8 = suffix
        .parse()
        .map_err(|e| ParsingError::malformed_rating(suffix, e))?;
    if rating > scale_max {
        return Err(ParsingError::malformed_rating(
            suffix,
            format!("outside 0..={scale_max}"),
        ));
    }
    Ok(rating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use scraper::{Html, Selector};

    #[rstest]
    #[case(0.0, 0)]
    #[case(10.0, 0)]
    #[case(20.0, 1)]
    #[case(30.0, 2)]
    #[case(50.0, 2)]
    #[case(80.0, 4)]
    #[case(100.0, 5)]
    #[case(140.0, 5)]
    #[case(-5.0, 0)]
    fn test_width_percent_on_five_point_scale(#[case] percent: f64, #[case] expected: u8) {
        assert_eq!(rating_from_width_percent(percent, 5), expected);
    }

    #[test]
    fn test_width_percent_on_ten_point_scale() {
        assert_eq!(rating_from_width_percent(70.0, 10), 7);
    }

    #[rstest]
    #[case("width: 80%;", 80.0)]
    #[case("color: red; width:60.5%", 60.5)]
    #[case("WIDTH : 100 %", 100.0)]
    fn test_parse_width_percent(#[case] style: &str, #[case] expected: f64) {
        assert!((parse_width_percent(style).unwrap() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_width_percent_ignores_max_width() {
        assert!(parse_width_percent("max-width: 50%").is_err());
    }

    #[test]
    fn test_class_suffix_skips_non_numeric_matches() {
        let classes = ["feedback__rating", "stars-line", "star4"];
        assert_eq!(rating_from_classes(&classes, "star", 5).unwrap(), 4);
    }

    #[test]
    fn test_class_suffix_out_of_range_is_malformed() {
        assert!(rating_from_classes(&["star7"], "star", 5).is_err());
        assert_eq!(rating_from_classes(&["m_rate_10"], "m_rate_", 10).unwrap(), 10);
    }

    #[test]
    fn test_decode_and_fallback() {
        let html = Html::parse_fragment(
            r#"<div class="bar" style="width: 60%"></div><div class="bar"></div>"#,
        );
        let selector = Selector::parse(".bar").unwrap();
        let mut bars = html.select(&selector);
        let rule = RatingRule::default();

        assert_eq!(rule.decode(&bars.next().unwrap()).unwrap(), 3);
        assert!(rule.decode(&bars.next().unwrap()).is_err());

        assert_eq!(rule.resolve(None), Some(0));
        let skip = RatingRule {
            on_malformed: RatingFallback::Skip,
            ..RatingRule::default()
        };
        assert_eq!(skip.resolve(None), None);
    }

    proptest! {
        #[test]
        fn width_rating_stays_in_scale(percent in 0.0f64..=100.0) {
            let rating = rating_from_width_percent(percent, 5);
            prop_assert!(rating <= 5);
        }

        #[test]
        fn width_rating_is_monotonic(a in 0.0f64..=100.0, b in 0.0f64..=100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(rating_from_width_percent(lo, 5) <= rating_from_width_percent(hi, 5));
        }
    }
}
