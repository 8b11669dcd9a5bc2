use crate::models::DashboardStats;
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardRange {
    Week,
    #[default]
    Month,
    HalfYear,
    Year,
    All,
}

impl DashboardRange {
    pub const ALL: [DashboardRange; 5] = [
        DashboardRange::Week,
        DashboardRange::Month,
        DashboardRange::HalfYear,
        DashboardRange::Year,
        DashboardRange::All,
    ];

    pub fn days(self) -> Option<i64> {
        match self {
            DashboardRange::Week => Some(7),
            DashboardRange::Month => Some(30),
            DashboardRange::HalfYear => Some(180),
            DashboardRange::Year => Some(360),
            DashboardRange::All => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DashboardRange::Week => "7 Days",
            DashboardRange::Month => "30 Days",
            DashboardRange::HalfYear => "6 Months",
            DashboardRange::Year => "1 Year",
            DashboardRange::All => "All",
        }
    }

    /// Query value: the day count, or `all`.
    pub fn key(self) -> String {
        self.days()
            .map(|days| days.to_string())
            .unwrap_or_else(|| "all".to_string())
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|range| range.key() == key.trim())
    }
}

/// `(fromDate, toDate)` for a range ending today; `All` has no lower bound.
pub fn range_window_at(today: NaiveDate, range: DashboardRange) -> (Option<NaiveDate>, NaiveDate) {
    let from = range.days().map(|days| today - Duration::days(days - 1));
    (from, today)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub chanting_rounds: u32,
    pub committed_rounds: u32,
    pub ideal_rounds: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub ideal_rounds: u32,
    pub committed_rounds: u32,
    pub average_rounds: f64,
    pub current_streak: u32,
    pub met_commitment_days: usize,
    pub recorded_days: usize,
    pub points: Vec<ChartPoint>,
}

impl DashboardSummary {
    pub fn peak_rounds(&self) -> u32 {
        self.points
            .iter()
            .map(|point| point.chanting_rounds)
            .chain([self.ideal_rounds, self.committed_rounds])
            .max()
            .unwrap_or(0)
    }
}

pub fn summarize(stats: &DashboardStats) -> DashboardSummary {
    let mut points: Vec<ChartPoint> = stats
        .chanting_dto_list
        .iter()
        .map(|entry| ChartPoint {
            date: entry.chanting_date,
            chanting_rounds: entry.chanting_rounds,
            committed_rounds: stats.committed_rounds,
            ideal_rounds: stats.ideal_rounds,
        })
        .collect();
    points.sort_by_key(|point| point.date);

    let met_commitment_days = points
        .iter()
        .filter(|point| point.chanting_rounds >= stats.committed_rounds)
        .count();

    DashboardSummary {
        ideal_rounds: stats.ideal_rounds,
        committed_rounds: stats.committed_rounds,
        average_rounds: (stats.average_rounds * 100.0).round() / 100.0,
        current_streak: stats.current_streak,
        met_commitment_days,
        recorded_days: points.len(),
        points,
    }
}
