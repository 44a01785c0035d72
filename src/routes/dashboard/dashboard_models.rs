use serde::{Deserialize, Serialize};

use crate::models::task::{TaskPriority, TaskStatus};

#[derive(Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub todo: i64,
    pub in_progress: i64,
    pub in_review: i64,
    pub done: i64,
}

impl StatusBreakdown {
    pub fn from_rows(rows: &[(TaskStatus, i64)]) -> Self {
        let mut breakdown = StatusBreakdown::default();
        for &(status, count) in rows {
            match status {
                TaskStatus::Todo => breakdown.todo += count,
                TaskStatus::InProgress => breakdown.in_progress += count,
                TaskStatus::InReview => breakdown.in_review += count,
                TaskStatus::Done => breakdown.done += count,
            }
        }
        breakdown
    }

    pub fn total(&self) -> i64 {
        self.todo + self.in_progress + self.in_review + self.done
    }
}

#[derive(Debug, Default, Serialize, PartialEq)]
pub struct PriorityBreakdown {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub urgent: i64,
}

impl PriorityBreakdown {
    pub fn from_rows(rows: &[(TaskPriority, i64)]) -> Self {
        let mut breakdown = PriorityBreakdown::default();
        for &(priority, count) in rows {
            match priority {
                TaskPriority::Low => breakdown.low += count,
                TaskPriority::Medium => breakdown.medium += count,
                TaskPriority::High => breakdown.high += count,
                TaskPriority::Urgent => breakdown.urgent += count,
            }
        }
        breakdown
    }
}

/// Percentage of done tasks, rounded to two decimals; 0 when there are no tasks.
pub fn completion_rate(done: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    (done as f64 / total as f64 * 10_000.0).round() / 100.0
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: i64,
    pub total_tasks: i64,
    pub tasks_by_status: StatusBreakdown,
    pub tasks_by_priority: PriorityBreakdown,
    pub overdue_tasks: i64,
    pub my_open_tasks: i64,
    pub completed_this_week: i64,
    pub unread_notifications: i64,
    pub completion_rate: f64,
}

#[derive(Deserialize)]
pub struct RecentTasksQuery {
    pub limit: Option<i64>,
}

impl RecentTasksQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(5).clamp(1, 20)
    }
}

#[derive(Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

impl UpcomingQuery {
    pub fn days(&self) -> i64 {
        self.days.unwrap_or(7).clamp(1, 90)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_is_a_rounded_percentage() {
        assert_eq!(completion_rate(0, 0), 0.0);
        assert_eq!(completion_rate(1, 4), 25.0);
        assert_eq!(completion_rate(2, 3), 66.67);
        assert_eq!(completion_rate(5, 5), 100.0);
    }

    #[test]
    fn breakdown_fills_missing_statuses_with_zero() {
        let breakdown = StatusBreakdown::from_rows(&[(TaskStatus::Done, 4), (TaskStatus::Todo, 2)]);
        assert_eq!(
            breakdown,
            StatusBreakdown {
                todo: 2,
                in_progress: 0,
                in_review: 0,
                done: 4
            }
        );
        assert_eq!(breakdown.total(), 6);
    }

    #[test]
    fn priority_breakdown_serializes_lowercase_keys() {
        let breakdown = PriorityBreakdown::from_rows(&[(TaskPriority::Urgent, 1)]);
        let json = serde_json::to_value(&breakdown).unwrap();
        assert_eq!(json["urgent"], 1);
        assert_eq!(json["low"], 0);
    }

    #[test]
    fn window_parameters_are_clamped() {
        assert_eq!(RecentTasksQuery { limit: None }.limit(), 5);
        assert_eq!(RecentTasksQuery { limit: Some(500) }.limit(), 20);
        assert_eq!(UpcomingQuery { days: Some(0) }.days(), 1);
        assert_eq!(UpcomingQuery { days: None }.days(), 7);
    }
}
