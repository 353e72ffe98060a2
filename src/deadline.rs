//! Deadline-driven task state, derived at read time.
//!
//! Everything in here is a pure function over already-fetched rows:
//! the stored priority is never overwritten, the bump is recomputed on
//! every read, and the caller supplies `now` so the same snapshot
//! always evaluates the same way.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::entities::task::{self, TaskPriority, TaskStatus};

/// Tasks due within this many calendar days (or already past) are
/// shown as High regardless of the stored priority.
pub const HIGH_BUMP_DAYS: i64 = 1;

/// Lookahead window given to new accounts until they change it.
pub const DEFAULT_DUE_SOON_DAYS: i32 = 3;

/// The due date and time combined into the single ordering key used
/// for every urgency comparison.
pub fn due_datetime(task: &task::Model) -> NaiveDateTime {
    task.due_date.and_time(task.due_time)
}

/// Whole calendar days between now and the due date. Negative for
/// overdue tasks; the time-of-day component is deliberately discarded
/// so that "due tomorrow" means the same thing all day long.
pub fn days_until_due(task: &task::Model, now: NaiveDateTime) -> i64 {
    (task.due_date - now.date()).num_days()
}

/// The priority the user should see: the stored value, possibly bumped
/// for deadline proximity. Completed tasks keep their stored priority;
/// nothing chases finished work.
pub fn effective_priority(
    task: &task::Model,
    due_soon_days: i32,
    now: NaiveDateTime,
) -> TaskPriority {
    if task.status == TaskStatus::Completed {
        return task.priority;
    }

    let days = days_until_due(task, now);

    // Overdue or nearly due: High, whatever was stored. A deadline
    // earlier today counts (days == 0 covers the tie).
    if days <= HIGH_BUMP_DAYS {
        return TaskPriority::High;
    }

    // Inside the user's lookahead window, a Low task gets nudged up so
    // it stays visible without sounding the alarm.
    if days <= i64::from(due_soon_days) && task.priority == TaskPriority::Low {
        return TaskPriority::Medium;
    }

    task.priority
}

/// True when the wall-clock deadline has passed and the task is not
/// done. Time-aware: a task due at 09:00 is overdue at 09:01.
pub fn is_overdue(task: &task::Model, now: NaiveDateTime) -> bool {
    task.status != TaskStatus::Completed && due_datetime(task) < now
}

/// True when an unfinished task falls inside the user's lookahead
/// window. Already-overdue tasks count as due soon too; they need the
/// attention even more.
pub fn is_due_soon(task: &task::Model, due_soon_days: i32, now: NaiveDateTime) -> bool {
    task.status != TaskStatus::Completed && days_until_due(task, now) <= i64::from(due_soon_days)
}

/// Badge shown next to a task row. States are checked from most to
/// least urgent, so an overdue task never reads as merely "due soon".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineState {
    Completed,
    Overdue,
    DueToday,
    DueSoon,
    Normal,
}

impl DeadlineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineState::Completed => "completed",
            DeadlineState::Overdue => "overdue",
            DeadlineState::DueToday => "due_today",
            DeadlineState::DueSoon => "due_soon",
            DeadlineState::Normal => "normal",
        }
    }
}

pub fn deadline_state(task: &task::Model, due_soon_days: i32, now: NaiveDateTime) -> DeadlineState {
    if task.status == TaskStatus::Completed {
        return DeadlineState::Completed;
    }
    if due_datetime(task) < now {
        return DeadlineState::Overdue;
    }

    let days = days_until_due(task, now);
    if days == 0 {
        DeadlineState::DueToday
    } else if days <= i64::from(due_soon_days) {
        DeadlineState::DueSoon
    } else {
        DeadlineState::Normal
    }
}

/// Fraction of the given tasks that are completed; 0 for no tasks at
/// all (an empty module is "not started", not "done").
pub fn module_progress<'a>(tasks: impl IntoIterator<Item = &'a task::Model>) -> f64 {
    let mut total = 0usize;
    let mut completed = 0usize;
    for task in tasks {
        total += 1;
        if task.status == TaskStatus::Completed {
            completed += 1;
        }
    }
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}

fn round_percent(fraction: f64) -> u32 {
    (fraction * 100.0).round() as u32
}

/// Counters backing the dashboard progress panel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub completion_percent: u32,
}

/// One pass over all of a user's tasks. `due_soon` counts unfinished
/// tasks due today or within the window but not yet overdue, matching
/// the badge states rather than `is_due_soon` (which folds overdue in).
pub fn summarize(tasks: &[task::Model], due_soon_days: i32, now: NaiveDateTime) -> DashboardStats {
    let mut stats = DashboardStats::default();

    for task in tasks {
        stats.total += 1;
        match task.status {
            TaskStatus::ToDo => stats.todo += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
        }
        match deadline_state(task, due_soon_days, now) {
            DeadlineState::Overdue => stats.overdue += 1,
            DeadlineState::DueToday | DeadlineState::DueSoon => stats.due_soon += 1,
            _ => {}
        }
    }

    stats.completion_percent = round_percent(module_progress(tasks));
    stats
}

/// Per-module completion, sorted by module name. Rows with an empty
/// module label (possible in data imported from older exports) are
/// left out rather than grouped under a blank heading.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModuleSummary {
    pub module_name: String,
    pub total: usize,
    pub completed: usize,
    pub percent: u32,
}

pub fn module_summaries(tasks: &[task::Model]) -> Vec<ModuleSummary> {
    let mut groups: BTreeMap<&str, Vec<&task::Model>> = BTreeMap::new();
    for task in tasks {
        let module_name = task.module_name.trim();
        if module_name.is_empty() {
            continue;
        }
        groups.entry(module_name).or_default().push(task);
    }

    groups
        .into_iter()
        .map(|(module_name, group)| {
            let completed = group
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count();
            ModuleSummary {
                module_name: module_name.to_string(),
                total: group.len(),
                completed,
                percent: round_percent(module_progress(group.iter().copied())),
            }
        })
        .collect()
}

/// Dashboard filter criteria. Empty strings mean "no criterion", the
/// same as omitting the query parameter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskFilter<'a> {
    /// Exact module-name match.
    pub module: Option<&'a str>,
    /// Exact match against the *effective* priority, so a Low task due
    /// tomorrow is found under High.
    pub priority: Option<TaskPriority>,
    /// Case-insensitive substring of title or description.
    pub query: Option<&'a str>,
}

/// Stable filter: keeps the subsequence of `tasks` matching every
/// provided criterion, in the original order.
pub fn filter_tasks<'a>(
    tasks: &'a [task::Model],
    filter: &TaskFilter<'_>,
    due_soon_days: i32,
    now: NaiveDateTime,
) -> Vec<&'a task::Model> {
    let module = filter.module.map(str::trim).filter(|m| !m.is_empty());
    let query = filter
        .query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    tasks
        .iter()
        .filter(|task| {
            if let Some(module) = module {
                if task.module_name != module {
                    return false;
                }
            }
            if let Some(priority) = filter.priority {
                if effective_priority(task, due_soon_days, now) != priority {
                    return false;
                }
            }
            if let Some(query) = &query {
                let in_title = task.title.to_lowercase().contains(query.as_str());
                let in_description = task
                    .description
                    .as_deref()
                    .map(|d| d.to_lowercase().contains(query.as_str()))
                    .unwrap_or(false);
                if !in_title && !in_description {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveTime};

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    /// Jan 10th 2024, mid-morning: baseline for the dated scenarios.
    fn baseline_now() -> NaiveDateTime {
        at(2024, 1, 10, 10, 0)
    }

    fn task_due(
        (y, m, d): (i32, u32, u32),
        (hh, mm): (u32, u32),
        status: TaskStatus,
        priority: TaskPriority,
    ) -> task::Model {
        task::Model {
            id: 1,
            user_id: 1,
            module_name: "CS101".to_string(),
            title: "Networks essay".to_string(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            due_time: NaiveTime::from_hms_opt(hh, mm, 0).unwrap(),
            status,
            priority,
            created_at: DateTime::parse_from_rfc3339("2024-01-01T00:00:00+00:00").unwrap(),
        }
    }

    #[test]
    fn completed_keeps_stored_priority_for_any_now() {
        let task = task_due((2024, 1, 5), (23, 59), TaskStatus::Completed, TaskPriority::Low);

        for now in [at(2020, 1, 1, 0, 0), baseline_now(), at(2030, 12, 31, 23, 59)] {
            assert_eq!(effective_priority(&task, 3, now), TaskPriority::Low);
        }
    }

    #[test]
    fn due_within_one_day_is_high() {
        // Due tomorrow at end of day, stored Low, window 3.
        let task = task_due((2024, 1, 11), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::High);
        assert!(is_due_soon(&task, 3, baseline_now()));

        // Due later today.
        let today = task_due((2024, 1, 10), (18, 0), TaskStatus::ToDo, TaskPriority::Medium);
        assert_eq!(effective_priority(&today, 3, baseline_now()), TaskPriority::High);
    }

    #[test]
    fn deadline_passed_earlier_today_is_high() {
        let task = task_due((2024, 1, 10), (9, 0), TaskStatus::ToDo, TaskPriority::Low);
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::High);
        assert!(is_overdue(&task, baseline_now()));
    }

    #[test]
    fn low_inside_window_is_medium() {
        // Three days out with a window of three, stored Low.
        let task = task_due((2024, 1, 13), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::Medium);
        assert!(is_due_soon(&task, 3, baseline_now()));
    }

    #[test]
    fn bump_to_medium_only_lifts_low() {
        let medium = task_due((2024, 1, 13), (23, 59), TaskStatus::ToDo, TaskPriority::Medium);
        assert_eq!(effective_priority(&medium, 3, baseline_now()), TaskPriority::Medium);

        let high = task_due((2024, 1, 13), (23, 59), TaskStatus::ToDo, TaskPriority::High);
        assert_eq!(effective_priority(&high, 3, baseline_now()), TaskPriority::High);
    }

    #[test]
    fn outside_window_keeps_stored_priority() {
        let task = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::Low);
        assert!(!is_due_soon(&task, 3, baseline_now()));
    }

    #[test]
    fn past_due_date_is_overdue_and_high() {
        let task = task_due((2024, 1, 5), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(is_overdue(&task, baseline_now()));
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::High);
        // Overdue also counts as due soon.
        assert!(is_due_soon(&task, 3, baseline_now()));
    }

    #[test]
    fn completed_is_never_overdue_or_due_soon() {
        let task = task_due((2024, 1, 5), (23, 59), TaskStatus::Completed, TaskPriority::Medium);
        assert!(!is_overdue(&task, baseline_now()));
        assert!(!is_due_soon(&task, 3, baseline_now()));
        assert_eq!(effective_priority(&task, 3, baseline_now()), TaskPriority::Medium);
    }

    #[test]
    fn overdue_comparison_is_time_aware() {
        // Due today 23:59: not yet overdue at 10:00.
        let tonight = task_due((2024, 1, 10), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(!is_overdue(&tonight, baseline_now()));
        assert_eq!(deadline_state(&tonight, 3, baseline_now()), DeadlineState::DueToday);

        // Due today 09:00: overdue at 10:00.
        let this_morning = task_due((2024, 1, 10), (9, 0), TaskStatus::ToDo, TaskPriority::Low);
        assert!(is_overdue(&this_morning, baseline_now()));
        assert_eq!(
            deadline_state(&this_morning, 3, baseline_now()),
            DeadlineState::Overdue
        );
    }

    #[test]
    fn window_edge_is_inclusive() {
        let task = task_due((2024, 1, 13), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(is_due_soon(&task, 3, baseline_now()));

        let beyond = task_due((2024, 1, 14), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(!is_due_soon(&beyond, 3, baseline_now()));
        assert_eq!(deadline_state(&beyond, 3, baseline_now()), DeadlineState::Normal);
    }

    #[test]
    fn zero_window_still_flags_today_and_overdue() {
        let today = task_due((2024, 1, 10), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(is_due_soon(&today, 0, baseline_now()));
        assert_eq!(deadline_state(&today, 0, baseline_now()), DeadlineState::DueToday);

        let tomorrow = task_due((2024, 1, 11), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        assert!(!is_due_soon(&tomorrow, 0, baseline_now()));
    }

    #[test]
    fn module_progress_of_nothing_is_zero() {
        let tasks: Vec<task::Model> = Vec::new();
        assert_eq!(module_progress(&tasks), 0.0);
    }

    #[test]
    fn module_progress_counts_completed_fraction() {
        let tasks = vec![
            task_due((2024, 1, 20), (23, 59), TaskStatus::Completed, TaskPriority::Low),
            task_due((2024, 1, 21), (23, 59), TaskStatus::ToDo, TaskPriority::Low),
        ];
        assert_eq!(module_progress(&tasks), 0.5);

        let all_done = vec![
            task_due((2024, 1, 20), (23, 59), TaskStatus::Completed, TaskPriority::Low),
            task_due((2024, 1, 21), (23, 59), TaskStatus::Completed, TaskPriority::High),
        ];
        assert_eq!(module_progress(&all_done), 1.0);
    }

    #[test]
    fn summarize_counts_states_and_percent() {
        let tasks = vec![
            // Overdue.
            task_due((2024, 1, 5), (23, 59), TaskStatus::ToDo, TaskPriority::Low),
            // Due today.
            task_due((2024, 1, 10), (23, 59), TaskStatus::InProgress, TaskPriority::Medium),
            // Due within the window.
            task_due((2024, 1, 12), (23, 59), TaskStatus::ToDo, TaskPriority::Low),
            // Done.
            task_due((2024, 1, 30), (23, 59), TaskStatus::Completed, TaskPriority::High),
        ];

        let stats = summarize(&tasks, 3, baseline_now());
        assert_eq!(stats.total, 4);
        assert_eq!(stats.todo, 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.due_soon, 2);
        assert_eq!(stats.completion_percent, 25);
    }

    #[test]
    fn module_summaries_group_and_sort() {
        let mut maths = task_due((2024, 1, 20), (23, 59), TaskStatus::Completed, TaskPriority::Low);
        maths.module_name = "MA202".to_string();
        let mut maths2 = task_due((2024, 1, 21), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        maths2.module_name = "MA202".to_string();
        let cs = task_due((2024, 1, 22), (23, 59), TaskStatus::Completed, TaskPriority::Low);
        let mut unlabelled = task_due((2024, 1, 23), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        unlabelled.module_name = "  ".to_string();

        let summaries = module_summaries(&[maths, maths2, cs, unlabelled]);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].module_name, "CS101");
        assert_eq!(summaries[0].percent, 100);
        assert_eq!(summaries[1].module_name, "MA202");
        assert_eq!(summaries[1].total, 2);
        assert_eq!(summaries[1].completed, 1);
        assert_eq!(summaries[1].percent, 50);
    }

    #[test]
    fn filter_matches_all_provided_criteria() {
        let mut report = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        report.title = "Final report".to_string();
        let mut maths = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        maths.module_name = "MA202".to_string();
        maths.title = "Problem sheet".to_string();
        let tasks = vec![report, maths];

        let filter = TaskFilter {
            module: Some("CS101"),
            priority: None,
            query: Some("REPORT"),
        };
        let hits = filter_tasks(&tasks, &filter, 3, baseline_now());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Final report");
    }

    #[test]
    fn filter_query_searches_description_too() {
        let mut task = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        task.description = Some("Bring the LAB notebook".to_string());
        let tasks = vec![task];

        let filter = TaskFilter {
            query: Some("lab"),
            ..Default::default()
        };
        assert_eq!(filter_tasks(&tasks, &filter, 3, baseline_now()).len(), 1);

        let miss = TaskFilter {
            query: Some("workshop"),
            ..Default::default()
        };
        assert!(filter_tasks(&tasks, &miss, 3, baseline_now()).is_empty());
    }

    #[test]
    fn filter_priority_uses_effective_value() {
        // Stored Low but due tomorrow: effectively High.
        let task = task_due((2024, 1, 11), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        let tasks = vec![task];

        let as_high = TaskFilter {
            priority: Some(TaskPriority::High),
            ..Default::default()
        };
        assert_eq!(filter_tasks(&tasks, &as_high, 3, baseline_now()).len(), 1);

        let as_low = TaskFilter {
            priority: Some(TaskPriority::Low),
            ..Default::default()
        };
        assert!(filter_tasks(&tasks, &as_low, 3, baseline_now()).is_empty());
    }

    #[test]
    fn filter_ignores_empty_criteria_and_preserves_order() {
        let first = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        let mut second = task_due((2024, 1, 21), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        second.title = "Second".to_string();
        let tasks = vec![first, second];

        let filter = TaskFilter {
            module: Some(""),
            priority: None,
            query: Some("   "),
        };
        let hits = filter_tasks(&tasks, &filter, 3, baseline_now());
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Networks essay");
        assert_eq!(hits[1].title, "Second");
    }

    #[test]
    fn filtering_twice_with_same_criteria_changes_nothing() {
        let mut report = task_due((2024, 1, 20), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        report.title = "Final report".to_string();
        let other = task_due((2024, 1, 21), (23, 59), TaskStatus::ToDo, TaskPriority::Low);
        let tasks = vec![report, other];

        let filter = TaskFilter {
            query: Some("report"),
            ..Default::default()
        };
        let once: Vec<task::Model> = filter_tasks(&tasks, &filter, 3, baseline_now())
            .into_iter()
            .cloned()
            .collect();
        let twice = filter_tasks(&once, &filter, 3, baseline_now());

        assert_eq!(once.len(), twice.len());
        assert!(once.iter().zip(twice.iter()).all(|(a, b)| a.id == b.id && a.title == b.title));
    }
}
