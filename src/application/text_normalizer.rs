//! Review text normalization
//!
//! 1. Collapse whitespace runs to single spaces and trim.
//! 2. Cut at the earliest trailing marker ("Ещё", "Куплен", ...).
//! 3. Strip the run of structural labels at the head ("Pros:", "Cons:").
//!    Labels match as whole words only and each may be removed once; a
//!    run that repeats a label is ambiguous and left in place.
//! 4. Trim.
//!
//! The result is idempotent: normalizing twice equals normalizing once.

use crate::domain::ReviewRecord;
use crate::infrastructure::parsing::NormalizerRules;
use std::collections::HashSet;

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    /// Longest first, so "Comment" never shadows "Comments"
    labels: Vec<String>,
    markers: Vec<String>,
}

impl TextNormalizer {
    pub fn new(rules: &NormalizerRules) -> Self {
        let mut labels: Vec<String> = rules
            .labels
            .iter()
            .map(|l| collapse_whitespace(l))
            .filter(|l| !l.is_empty())
            .collect();
        labels.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        labels.dedup();

        let markers = rules
            .trailing_markers
            .iter()
            .map(|m| collapse_whitespace(m))
            .filter(|m| !m.is_empty())
            .collect();

        Self { labels, markers }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let collapsed = collapse_whitespace(raw);
        let truncated = self.truncate_at_marker(&collapsed).trim_end();
        self.strip_head_labels(truncated).trim().to_string()
    }

    /// Normalize each review's text, dropping those left empty.
    pub fn normalize_reviews(&self, reviews: Vec<ReviewRecord>) -> Vec<ReviewRecord> {
        reviews
            .into_iter()
            .filter_map(|review| {
                let text = self.normalize(review.text());
                (!text.is_empty()).then(|| review.with_text(text))
            })
            .collect()
    }

    fn truncate_at_marker<'a>(&self, text: &'a str) -> &'a str {
        self.markers
            .iter()
            .filter_map(|marker| text.find(marker.as_str()))
            .min()
            .map_or(text, |cut| &text[..cut])
    }

    fn strip_head_labels<'a>(&self, text: &'a str) -> &'a str {
        let mut rest = text;
        let mut seen = HashSet::new();
        while let Some(label) = self.label_at_head(rest) {
            if !seen.insert(label) {
                return text;
            }
            rest = rest[label.len()..].trim_start_matches(|c: char| c == ':' || c.is_whitespace());
        }
        rest
    }

    fn label_at_head(&self, text: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| {
                text.strip_prefix(label.as_str()).is_some_and(|after| {
                    after
                        .chars()
                        .next()
                        .is_none_or(|c| c.is_whitespace() || !c.is_alphanumeric())
                })
            })
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(&NormalizerRules {
            labels: vec!["Pros".into(), "Cons".into(), "Comment".into()],
            trailing_markers: vec!["More".into(), "Original review".into()],
        })
    }

    #[rstest]
    #[case("  fits\n\n well\t", "fits well")]
    #[case("Pros: light Cons: none", "light Cons: none")]
    #[case("Pros: Cons: Comment: all good", "all good")]
    #[case("Pros:light", "light")]
    #[case("Prose is fine", "Prose is fine")]
    #[case("Pros: Pros: twice", "Pros: Pros: twice")]
    #[case("great boots More", "great boots")]
    #[case("ok Original review: bad", "ok")]
    #[case("Comment: nice More text Original review", "nice")]
    #[case("Pros:", "")]
    #[case("More", "")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalizer().normalize(raw), expected);
    }

    #[test]
    fn test_cyrillic_labels_and_markers() {
        let normalizer = TextNormalizer::new(&NormalizerRules {
            labels: vec!["Достоинства".into(), "Недостатки".into(), "Комментарий".into()],
            trailing_markers: vec!["Ещё".into(), "Куплен".into()],
        });
        assert_eq!(
            normalizer.normalize("Достоинства: тёплые\nНедостатки: нет Ещё"),
            "тёплые Недостатки: нет"
        );
        assert_eq!(normalizer.normalize("Отличные Куплен 12 мая"), "Отличные");
    }

    #[test]
    fn test_longest_label_wins() {
        let normalizer = TextNormalizer::new(&NormalizerRules {
            labels: vec!["Comment".into(), "Comment from buyer".into()],
            trailing_markers: Vec::new(),
        });
        assert_eq!(normalizer.normalize("Comment from buyer: fine"), "fine");
    }

    #[test]
    fn test_normalize_reviews_drops_empty() {
        let reviews = vec![
            ReviewRecord::new("Pros: warm", 5),
            ReviewRecord::new("  More  ", 3),
        ];
        let normalized = normalizer().normalize_reviews(reviews);
        assert_eq!(normalized, vec![ReviewRecord::new("warm", 5)]);
    }

    fn token() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "Pros", "Pros:", "Cons", "Comment:", "More", "Original review", "good", "bad", "fits",
            ":", " ", "  ", "\n", "\t", "Prose", "Проблем", "",
        ])
    }

    fn text() -> impl Strategy<Value = String> {
        prop::collection::vec(token(), 0..12).prop_map(|tokens| tokens.concat())
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in text()) {
            let n = normalizer();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_any_string(raw in "\\PC{0,40}") {
            let n = normalizer();
            let once = n.normalize(&raw);
            prop_assert_eq!(n.normalize(&once), once);
        }

        #[test]
        fn each_label_removed_at_most_once(raw in text()) {
            prop_assume!(!raw.contains("More") && !raw.contains("Original review"));
            let out = normalizer().normalize(&raw);
            for label in ["Pros", "Cons", "Comment"] {
                prop_assert!(out.matches(label).count() + 1 >= raw.matches(label).count());
            }
        }

        #[test]
        fn output_has_no_marker(raw in text()) {
            let out = normalizer().normalize(&raw);
            prop_assert!(!out.contains("More"));
            prop_assert!(!out.contains("Original review"));
        }
    }
}
