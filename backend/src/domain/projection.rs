//! # View Projection
//!
//! Pure derivations of the three display modes (flat, calendar,
//! timetable) from one flat todo collection. Nothing here mutates the
//! source collection or errors; malformed input is filtered silently.

use std::collections::HashSet;

use chrono::NaiveDate;

use shared::{DateGroup, SlotGroup, TimetableDay, TodoItem};

const NO_DATE_LABEL: &str = "No Date";

fn date_label(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => NO_DATE_LABEL.to_string(),
    }
}

/// Partition todos by date in encounter order; the undated todos form
/// their own "No Date" group. Flattening the groups yields the input
/// multiset, so this is a partition, never a filter.
pub fn group_by_date(todos: &[TodoItem]) -> Vec<DateGroup> {
    let mut groups: Vec<DateGroup> = Vec::new();

    for todo in todos {
        match groups.iter_mut().find(|g| g.date == todo.date) {
            Some(group) => group.items.push(todo.clone()),
            None => groups.push(DateGroup {
                date: todo.date,
                label: date_label(todo.date),
                items: vec![todo.clone()],
            }),
        }
    }

    groups
}

/// Calendar view: dated todos only, groups sorted ascending by date.
pub fn calendar_view(todos: &[TodoItem]) -> Vec<DateGroup> {
    let dated: Vec<TodoItem> = todos.iter().filter(|t| t.date.is_some()).cloned().collect();

    let mut groups = group_by_date(&dated);
    groups.sort_by_key(|g| g.date);
    groups
}

/// Timetable view: todos carrying a time slot, grouped by date and then
/// by time slot value.
///
/// The input is deduplicated twice, first by `id` and then by the
/// `(id, title, time_slot.id)` triple: the remote listener can deliver
/// overlapping snapshots under rapid consecutive writes, and this
/// projection is the last line of defense against rendering the same
/// task twice. A todo with a slot but no date is omitted, not an error.
/// The group for `today` always renders expanded; other dates follow
/// the caller's toggle set.
pub fn timetable_view(
    todos: &[TodoItem],
    today: NaiveDate,
    expanded: &HashSet<NaiveDate>,
) -> Vec<TimetableDay> {
    let mut seen_ids: HashSet<i64> = HashSet::new();
    let mut seen_keys: HashSet<(i64, String, i32)> = HashSet::new();

    let mut slotted: Vec<&TodoItem> = Vec::new();
    for todo in todos {
        let slot = match &todo.time_slot {
            Some(slot) => slot,
            None => continue,
        };
        if !seen_ids.insert(todo.id) {
            continue;
        }
        if !seen_keys.insert((todo.id, todo.title.clone(), slot.id)) {
            continue;
        }
        slotted.push(todo);
    }

    // One bucket per date, ascending.
    let mut dates: Vec<NaiveDate> = slotted.iter().filter_map(|t| t.date).collect();
    dates.sort_unstable();
    dates.dedup();

    dates
        .into_iter()
        .map(|date| {
            let mut slots: Vec<SlotGroup> = Vec::new();
            for todo in slotted.iter().filter(|t| t.date == Some(date)) {
                let slot = match todo.time_slot.clone() {
                    Some(slot) => slot,
                    None => continue,
                };
                // Slots group by full value equality, not just id: two
                // slots sharing an id but differing in times or name
                // render separately.
                match slots.iter_mut().find(|g| g.time_slot == slot) {
                    Some(group) => group.items.push((*todo).clone()),
                    None => slots.push(SlotGroup {
                        time_slot: slot,
                        items: vec![(*todo).clone()],
                    }),
                }
            }

            TimetableDay {
                date,
                is_expanded: date == today || expanded.contains(&date),
                slots,
            }
        })
        .collect()
}
