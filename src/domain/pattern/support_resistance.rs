//! Support and resistance levels from clustered swing points.
//!
//! A bar is a swing high when its high strictly exceeds every other high in
//! the symmetric `±window` neighbourhood; swing lows mirror this on lows.
//! Swing values are clustered greedily after sorting, and each cluster's
//! mean becomes a level. Levels are ranked by cluster size, then by level.

use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, PartialEq)]
pub struct SupportResistanceConfig {
    pub window: usize,
    /// Relative distance from the last grouped value that still joins a cluster.
    pub tolerance: f64,
    pub max_levels: usize,
}

impl Default for SupportResistanceConfig {
    fn default() -> Self {
        SupportResistanceConfig {
            window: 5,
            tolerance: 0.005,
            max_levels: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Levels {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

pub fn find_levels(bars: &[PriceBar], config: &SupportResistanceConfig) -> Levels {
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let swing_highs = swing_points(&highs, config.window, |candidate, other| candidate > other);
    let swing_lows = swing_points(&lows, config.window, |candidate, other| candidate < other);

    Levels {
        support: cluster_levels(&swing_lows, config.tolerance, config.max_levels),
        resistance: cluster_levels(&swing_highs, config.tolerance, config.max_levels),
    }
}

/// Values at indices that beat every neighbour within `window` on both sides.
pub fn swing_points<F>(values: &[f64], window: usize, beats: F) -> Vec<f64>
where
    F: Fn(f64, f64) -> bool,
{
    if window == 0 || values.len() < 2 * window + 1 {
        return Vec::new();
    }

    (window..values.len() - window)
        .filter(|&i| {
            (i - window..=i + window)
                .filter(|&j| j != i)
                .all(|j| beats(values[i], values[j]))
        })
        .map(|i| values[i])
        .collect()
}

/// Group sorted values and return up to `max_levels` cluster means.
pub fn cluster_levels(values: &[f64], tolerance: f64, max_levels: usize) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in sorted {
        match clusters.last_mut() {
            Some(cluster) if within_tolerance(cluster, value, tolerance) => cluster.push(value),
            _ => clusters.push(vec![value]),
        }
    }

    let mut ranked: Vec<(usize, f64)> = clusters
        .iter()
        .map(|c| (c.len(), c.iter().sum::<f64>() / c.len() as f64))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.total_cmp(&a.1)));

    ranked
        .into_iter()
        .take(max_levels)
        .map(|(_, level)| level)
        .collect()
}

fn within_tolerance(cluster: &[f64], value: f64, tolerance: f64) -> bool {
    match cluster.last() {
        Some(&last) if last != 0.0 => ((value - last) / last).abs() <= tolerance,
        Some(&last) => value == last,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn make_bars(data: &[(f64, f64)]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(high, low))| PriceBar {
                code: "TEST".into(),
                exchange: "ASX".into(),
                date: start + chrono::Duration::days(i as i64),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn swing_high_needs_strict_dominance() {
        let values = [1.0, 2.0, 5.0, 2.0, 1.0];
        assert_eq!(swing_points(&values, 2, |a, b| a > b), vec![5.0]);

        let tied = [1.0, 5.0, 5.0, 2.0, 1.0];
        assert!(swing_points(&tied, 2, |a, b| a > b).is_empty());
    }

    #[test]
    fn swing_points_ignore_edges() {
        let values = [9.0, 1.0, 2.0, 1.0, 9.0];
        assert_eq!(swing_points(&values, 1, |a, b| a > b), vec![2.0]);
    }

    #[test]
    fn clusters_merge_within_tolerance() {
        let levels = cluster_levels(&[100.0, 100.4, 110.0], 0.005, 5);
        assert_eq!(levels.len(), 2);
        assert_abs_diff_eq!(levels[0], 100.2, epsilon = 1e-9);
        assert_abs_diff_eq!(levels[1], 110.0, epsilon = 1e-9);
    }

    #[test]
    fn clusters_chain_from_last_grouped_value() {
        // each step is within 0.5% of the previous value, not of the first
        let levels = cluster_levels(&[100.0, 100.4, 100.8, 101.2], 0.005, 5);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn equal_sized_clusters_rank_by_level_desc() {
        let levels = cluster_levels(&[50.0, 70.0, 60.0], 0.005, 2);
        assert_eq!(levels, vec![70.0, 60.0]);
    }

    #[test]
    fn find_levels_over_bars() {
        let mut data = vec![(10.0, 9.0); 11];
        data[5] = (15.0, 9.5);
        data[3] = (10.5, 5.0);
        let levels = find_levels(
            &make_bars(&data),
            &SupportResistanceConfig {
                window: 2,
                ..Default::default()
            },
        );
        assert_eq!(levels.resistance, vec![15.0]);
        assert_eq!(levels.support, vec![5.0]);
    }

    proptest! {
        #[test]
        fn clustering_is_idempotent(values in prop::collection::vec(1.0f64..500.0, 0..40)) {
            let first = cluster_levels(&values, 0.005, 5);
            let second = cluster_levels(&values, 0.005, 5);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn clustering_respects_max_levels(values in prop::collection::vec(1.0f64..500.0, 0..40)) {
            prop_assert!(cluster_levels(&values, 0.005, 3).len() <= 3);
        }
    }
}
