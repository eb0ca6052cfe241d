//! Tests for softmax normalisation and top-K ranking.

use doodle_classifier::{
    labels::{LabelSet, PaddingRule},
    ranking::{PaddingMode, RankError, rank},
};
use proptest::prelude::*;
use rstest::{fixture, rstest};
mod support;
use support::approx_eq;

#[fixture]
fn cat_dog_labels() -> LabelSet {
    LabelSet::parse("cat\ndog\nnothing1\nnothing2\n", PaddingRule::default())
        .unwrap_or_else(|e| panic!("parse labels: {e}"))
}

#[rstest]
fn cat_outranks_dog_with_padding_excluded(cat_dog_labels: LabelSet) {
    let result = rank(
        &[2.0, 1.0, 0.0, 0.0],
        &cat_dog_labels,
        PaddingMode::from_exclude_padding(true),
        10,
    )
    .unwrap_or_else(|e| panic!("rank: {e}"));
    let labels: Vec<_> = result.ranked().iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, vec!["cat", "dog"]);
    let cat = result.scores().get("cat").unwrap_or_else(|| panic!("cat score"));
    assert!(approx_eq(cat, 0.731, 1e-3), "cat probability was {cat}");
}

#[rstest]
fn empty_label_set_yields_empty_result() {
    let labels = LabelSet::parse("", PaddingRule::default())
        .unwrap_or_else(|e| panic!("parse labels: {e}"));
    let result = rank(&[], &labels, PaddingMode::default(), 10)
        .unwrap_or_else(|e| panic!("rank: {e}"));
    assert!(result.ranked().is_empty());
    assert!(result.scores().is_empty());
}

#[rstest]
fn only_padding_yields_empty_result() {
    let labels = LabelSet::parse("nothing\nnothing_1", PaddingRule::default())
        .unwrap_or_else(|e| panic!("parse labels: {e}"));
    let result = rank(&[1.0, 2.0], &labels, PaddingMode::default(), 10)
        .unwrap_or_else(|e| panic!("rank: {e}"));
    assert!(result.scores().is_empty());
}

#[rstest]
#[case(0, 0)]
#[case(1, 1)]
#[case(5, 2)]
fn limit_truncates_ranking_but_not_map(
    cat_dog_labels: LabelSet,
    #[case] limit: usize,
    #[case] expected: usize,
) {
    let result = rank(&[0.3, 0.2, 0.1, 0.0], &cat_dog_labels, PaddingMode::default(), limit)
        .unwrap_or_else(|e| panic!("rank: {e}"));
    assert_eq!(result.ranked().len(), expected);
    assert_eq!(result.scores().len(), 2);
}

#[rstest]
fn mismatched_lengths_are_a_consistency_error(cat_dog_labels: LabelSet) {
    assert_eq!(
        rank(&[1.0, 2.0, 3.0], &cat_dog_labels, PaddingMode::default(), 10),
        Err(RankError::LengthMismatch {
            labels: 4,
            scores: 3
        })
    );
}

fn labels_with_padding(count: usize, padding_every: usize) -> LabelSet {
    let text: Vec<String> = (0..count)
        .map(|i| {
            if i % padding_every == padding_every - 1 {
                format!("nothing_{i}")
            } else {
                format!("class_{i}")
            }
        })
        .collect();
    LabelSet::parse(&text.join("\n"), PaddingRule::default())
        .unwrap_or_else(|e| panic!("parse labels: {e}"))
}

proptest! {
    #[test]
    fn ranking_is_a_sorted_distribution(
        raw in prop::collection::vec(-50.0f32..50.0, 1..40),
        padding_every in 2usize..6,
        limit in 0usize..12,
    ) {
        let labels = labels_with_padding(raw.len(), padding_every);
        let result = rank(&raw, &labels, PaddingMode::ExcludeBeforeNormalise, limit)
            .unwrap_or_else(|e| panic!("rank: {e}"));

        prop_assert!(result.ranked().len() <= limit);
        prop_assert!(result.scores().iter().all(|s| !s.label.starts_with("nothing")));
        prop_assert!(result
            .scores()
            .iter()
            .zip(result.scores().iter().skip(1))
            .all(|(a, b)| a.probability >= b.probability));
        if !result.scores().is_empty() {
            prop_assert!(approx_eq(result.scores().total(), 1.0, 1e-5));
        }
        let ranked_labels: Vec<_> = result.ranked().iter().map(|s| &s.label).collect();
        let map_prefix: Vec<_> = result.scores().iter().take(limit).map(|s| &s.label).collect();
        prop_assert_eq!(ranked_labels, map_prefix);
    }
}
