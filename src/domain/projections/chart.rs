//! Chart series derived from the statistics aggregate.

use std::collections::BTreeMap;

use crate::domain::civic::{AreaCount, StatisticsSnapshot};

/// Label/value arrays for one chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u64>,
}

impl ChartSeries {
    fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let (labels, values) = pairs.into_iter().map(|(l, v)| (l.into(), v)).unzip();
        Self { labels, values }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Everything the statistics dashboard renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsCharts {
    pub headline: ChartSeries,
    pub by_status: ChartSeries,
    pub by_category: ChartSeries,
    pub hotspots: Vec<AreaCount>,
}

/// Recomputes every series from scratch.
pub fn project_charts(stats: Option<&StatisticsSnapshot>) -> StatisticsCharts {
    let Some(stats) = stats else {
        return StatisticsCharts::default();
    };

    let by_status = if stats.complaints_by_status.is_empty() {
        ChartSeries::from_pairs(stats.headline().into_iter().skip(1))
    } else {
        ChartSeries::from_pairs(
            stats
                .complaints_by_status
                .iter()
                .map(|(k, v)| (k.clone(), *v)),
        )
    };

    StatisticsCharts {
        headline: ChartSeries::from_pairs(stats.headline()),
        by_status,
        by_category: ChartSeries::from_pairs(largest_first(&stats.complaints_by_category)),
        hotspots: stats.top_areas.clone(),
    }
}

fn largest_first(counts: &BTreeMap<String, u64>) -> Vec<(String, u64)> {
    let mut pairs: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}
