//! Level convergence detection.
//!
//! Groups computed levels whose values land within a tolerance band and
//! reports the groups that reach the convergence threshold.
//!
//! Known limitation: grouping is greedy and single-pass. Each level is
//! compared only against the FIRST-INSERTED member of each existing group, in
//! group creation order, and joins the first match. A level can therefore sit
//! within tolerance of a later group member yet still open a new group. The
//! result depends on input order and is not a globally optimal clustering.
//! This behavior is load-bearing for compatibility with prior output and must
//! not be "fixed" without revisiting every stored result.

use itertools::Itertools;
use log::debug;

use crate::data::{ComputedLevel, ConvergenceCluster, LevelType};

/// Cluster `levels` by numeric proximity.
///
/// `tolerance` is the absolute price half-width for two levels to be
/// considered converging; `threshold` is the minimum member count for a group
/// to be reported. Output is sorted by representative value, descending.
pub fn cluster(
    levels: &[ComputedLevel],
    tolerance: f64,
    threshold: usize,
) -> Vec<ConvergenceCluster> {
    let mut groups: Vec<Vec<&ComputedLevel>> = Vec::new();

    for level in levels {
        let joined = groups
            .iter_mut()
            .find(|group| (group[0].value - level.value).abs() <= tolerance);
        match joined {
            Some(group) => group.push(level),
            None => groups.push(vec![level]),
        }
    }

    debug!(
        "formed {} raw groups from {} levels (tolerance {}, threshold {})",
        groups.len(),
        levels.len(),
        tolerance,
        threshold
    );

    let mut clusters: Vec<ConvergenceCluster> = groups
        .into_iter()
        .filter(|group| group.len() >= threshold)
        .map(|group| summarize(&group))
        .collect();

    clusters.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    clusters
}

fn summarize(group: &[&ComputedLevel]) -> ConvergenceCluster {
    let value = group.iter().map(|lv| lv.value).sum::<f64>() / group.len() as f64;

    let labels: Vec<String> = group
        .iter()
        .map(|lv| lv.label.clone())
        .unique()
        .sorted()
        .collect();
    let formulas: Vec<String> = group
        .iter()
        .map(|lv| lv.formula.clone())
        .unique()
        .sorted()
        .collect();

    ConvergenceCluster {
        value,
        count: group.len(),
        labels,
        formulas,
        level_type: dominant_type(group),
    }
}

/// Majority vote over member types. Counting preserves first-seen order and
/// the comparison is strictly greater, so on a tie the type seen earliest in
/// the group wins.
fn dominant_type(group: &[&ComputedLevel]) -> LevelType {
    let mut counts: Vec<(LevelType, usize)> = Vec::new();
    for lv in group {
        match counts.iter_mut().find(|(ty, _)| *ty == lv.level_type) {
            Some((_, n)) => *n += 1,
            None => counts.push((lv.level_type, 1)),
        }
    }

    let mut best = counts[0].0;
    let mut max = 0usize;
    for (ty, n) in counts {
        if n > max {
            max = n;
            best = ty;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(formula: &str, label: &str, value: f64) -> ComputedLevel {
        ComputedLevel {
            formula: formula.to_string(),
            label: label.to_string(),
            value,
            level_type: LevelType::from_label(label),
        }
    }

    #[test]
    fn empty_input_yields_no_clusters() {
        assert!(cluster(&[], 0.5, 3).is_empty());
    }

    #[test]
    fn threshold_above_level_count_yields_no_clusters() {
        let levels = vec![level("A", "PP", 100.0), level("B", "PP", 100.0)];
        assert!(cluster(&levels, 0.5, 3).is_empty());
    }

    #[test]
    fn zero_tolerance_groups_exact_matches_only() {
        let levels = vec![
            level("A", "R1", 100.00),
            level("B", "R1", 100.00),
            level("C", "R1", 100.01),
        ];
        let clusters = cluster(&levels, 0.0, 2);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[0].value, 100.00);
    }

    #[test]
    fn greedy_grouping_compares_against_first_member_only() {
        // 100.4 joins 100.0 (diff 0.4); 100.8 is within tolerance of 100.4
        // but not of the group's first member, so it opens its own group.
        let levels = vec![
            level("A", "PP", 100.0),
            level("B", "PP", 100.4),
            level("C", "PP", 100.8),
        ];
        let clusters = cluster(&levels, 0.5, 1);
        assert_eq!(clusters.len(), 2);
        // Descending by value: the singleton 100.8 group first.
        assert_eq!(clusters[0].count, 1);
        assert_eq!(clusters[0].value, 100.8);
        assert_eq!(clusters[1].count, 2);
        assert!((clusters[1].value - 100.2).abs() < 1e-9);
    }

    #[test]
    fn cluster_reports_sorted_distinct_labels_and_formulas() {
        let levels = vec![
            level("ZETA", "R2", 100.1),
            level("ALPHA", "R1", 100.2),
            level("ALPHA", "R1", 100.3),
        ];
        let clusters = cluster(&levels, 0.5, 3);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 3);
        assert_eq!(clusters[0].labels, vec!["R1", "R2"]);
        assert_eq!(clusters[0].formulas, vec!["ALPHA", "ZETA"]);
    }

    #[test]
    fn dominant_type_is_majority_with_first_seen_tiebreak() {
        let levels = vec![
            level("A", "R1", 100.0),
            level("B", "S1", 100.1),
            level("C", "S2", 100.2),
        ];
        let clusters = cluster(&levels, 0.5, 3);
        assert_eq!(clusters[0].level_type, LevelType::Support);

        // 1-1 tie between resistance (seen first) and support.
        let levels = vec![level("A", "R1", 100.0), level("B", "S1", 100.1)];
        let clusters = cluster(&levels, 0.5, 2);
        assert_eq!(clusters[0].level_type, LevelType::Resistance);
    }

    #[test]
    fn clustering_is_idempotent() {
        let levels = vec![
            level("A", "PP", 100.0),
            level("B", "R1", 100.3),
            level("C", "S1", 99.8),
            level("D", "R2", 104.0),
            level("E", "R2", 104.2),
            level("F", "S3", 91.0),
        ];
        let first = cluster(&levels, 0.5, 2);
        let second = cluster(&levels, 0.5, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn results_sorted_by_value_descending() {
        let levels = vec![
            level("A", "S1", 90.0),
            level("B", "S1", 90.1),
            level("C", "R1", 110.0),
            level("D", "R1", 110.1),
            level("E", "PP", 100.0),
            level("F", "PP", 100.1),
        ];
        let clusters = cluster(&levels, 0.5, 2);
        assert_eq!(clusters.len(), 3);
        assert!(clusters[0].value > clusters[1].value);
        assert!(clusters[1].value > clusters[2].value);
    }
}
