//! Snapshot → per-class rendering models.
//!
//! The snapshot is keyed by teacher row (`occupant-period-day`); a class can
//! appear under several rows and share a slot with other classes. Everything
//! here is recomputed from scratch for every snapshot.

use crate::config::TimetableConfig;
use crate::schedule::{standard_periods, MergedStub, PeriodDef, ScheduleCell, Snapshot, Weekday};
use crate::slot_key::SlotKey;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Minimum distance between the first and last visible period.
pub const MIN_WINDOW_SPAN: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDescriptor {
    pub name: String,
    pub id: Option<String>,
    pub main_teacher: Option<String>,
    pub main_room: Option<String>,
    pub start_period: u32,
    pub schedule: BTreeMap<u32, BTreeMap<Weekday, ScheduleCell>>,
    pub weekend_shift: u32,
    pub visible_periods: Vec<PeriodDef>,
    pub days: Vec<Weekday>,
    pub room_summary: String,
    pub teacher_counts: BTreeMap<String, u32>,
    pub weekday_min: Option<u32>,
    pub weekend_min: Option<u32>,
    pub compressed: bool,
}

impl ClassDescriptor {
    /// Cell rendered at nominal `period` in the `day` column. Weekend columns
    /// are read `weekend_shift` periods earlier.
    pub fn cell_at(&self, period: u32, day: Weekday) -> Option<&ScheduleCell> {
        let stored = if day.is_weekend() {
            period.checked_sub(self.weekend_shift)?
        } else {
            period
        };
        self.schedule.get(&stored)?.get(&day)
    }

    pub fn cell_count(&self) -> usize {
        self.schedule.values().map(|m| m.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroupView {
    pub key: String,
    pub label: String,
    pub compressed: bool,
    pub classes: Vec<ClassDescriptor>,
}

#[derive(Default)]
struct ClassAcc {
    id: Option<String>,
    compressed: bool,
    schedule: BTreeMap<u32, BTreeMap<Weekday, ScheduleCell>>,
    rooms: BTreeMap<(u32, Weekday), String>,
    room_tally: HashMap<String, (u32, (u32, Weekday))>,
    teacher_counts: BTreeMap<String, u32>,
    weekday_min: Option<u32>,
    weekend_min: Option<u32>,
}

struct Entry {
    name: String,
    class_id: Option<String>,
    room: Option<String>,
    teacher: Option<String>,
    emphasis: bool,
}

fn non_empty(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Primary class of the cell plus its distinct merged stubs.
fn slot_entries(cell: &ScheduleCell, occupant: &str) -> Vec<Entry> {
    let Some(primary) = non_empty(cell.class_name.as_deref()) else {
        return Vec::new();
    };
    let row_teacher = non_empty(cell.teacher.as_deref()).or_else(|| Some(occupant.to_string()));
    let mut out = vec![Entry {
        name: primary,
        class_id: non_empty(cell.class_id.as_deref()),
        room: non_empty(cell.room.as_deref()),
        teacher: row_teacher.clone(),
        emphasis: cell.emphasis,
    }];
    for stub in cell.distinct_merged() {
        out.push(Entry {
            name: stub.class_name.trim().to_string(),
            class_id: non_empty(stub.class_id.as_deref()),
            room: non_empty(stub.room.as_deref()),
            teacher: non_empty(stub.teacher.as_deref()).or_else(|| row_teacher.clone()),
            emphasis: stub.emphasis,
        });
    }
    out
}

fn fold_period(period: u32, pairs: &[(u32, u32)]) -> u32 {
    pairs
        .iter()
        .find(|(_, folded)| *folded == period)
        .map(|(keep, _)| *keep)
        .unwrap_or(period)
}

fn merge_stubs(into: &mut Vec<MergedStub>, own: &str, extra: Vec<MergedStub>) {
    for stub in extra {
        if stub.class_name == own || into.iter().any(|s| s.class_name == stub.class_name) {
            continue;
        }
        into.push(stub);
    }
}

fn min_opt(cur: Option<u32>, v: u32) -> Option<u32> {
    Some(cur.map_or(v, |c| c.min(v)))
}

/// Builds one descriptor per class found in `snapshot`.
///
/// `primary_teachers` maps class id → teacher name and comes from the class
/// roster, not from the timetable itself.
pub fn aggregate(
    snapshot: &Snapshot,
    config: &TimetableConfig,
    primary_teachers: &HashMap<String, String>,
) -> Vec<ClassDescriptor> {
    let mut slots: Vec<(u32, Weekday, Vec<Entry>)> = Vec::new();
    for (key, cell) in snapshot {
        let Some(slot) = SlotKey::parse(key) else {
            tracing::trace!(key = %key, "skipping malformed slot key");
            continue;
        };
        let Ok(period) = slot.period_id.parse::<u32>() else {
            tracing::trace!(key = %key, "skipping non-numeric period");
            continue;
        };
        let Some(day) = Weekday::parse(&slot.day) else {
            tracing::trace!(key = %key, "skipping unknown weekday");
            continue;
        };
        let entries = slot_entries(cell, &slot.occupant);
        if !entries.is_empty() {
            slots.push((period, day, entries));
        }
    }

    // A class id may only be written on some of its cells.
    let mut ids: HashMap<String, String> = HashMap::new();
    for (_, _, entries) in &slots {
        for e in entries {
            if let Some(id) = &e.class_id {
                ids.entry(e.name.clone()).or_insert_with(|| id.clone());
            }
        }
    }

    let mut classes: BTreeMap<String, ClassAcc> = BTreeMap::new();
    for (raw_period, day, entries) in &slots {
        let all_stubs: Vec<MergedStub> = entries
            .iter()
            .map(|e| MergedStub {
                class_name: e.name.clone(),
                class_id: e.class_id.clone(),
                room: e.room.clone(),
                teacher: e.teacher.clone(),
                emphasis: e.emphasis,
            })
            .collect();

        for entry in entries {
            let class_id = entry
                .class_id
                .clone()
                .or_else(|| ids.get(&entry.name).cloned());
            let compressed = config
                .group_for_class(class_id.as_deref(), &entry.name)
                .map(|g| g.compress_periods)
                .unwrap_or(false);
            let period = if compressed {
                fold_period(*raw_period, &config.compressed_pairs)
            } else {
                *raw_period
            };

            let acc = classes.entry(entry.name.clone()).or_default();
            if acc.id.is_none() {
                acc.id = class_id.clone();
            }
            acc.compressed |= compressed;

            let others: Vec<MergedStub> = all_stubs
                .iter()
                .filter(|s| s.class_name != entry.name)
                .cloned()
                .collect();
            let day_map = acc.schedule.entry(period).or_default();
            match day_map.get_mut(day) {
                Some(existing) => merge_stubs(&mut existing.merged, &entry.name, others),
                None => {
                    day_map.insert(
                        *day,
                        ScheduleCell {
                            class_name: Some(entry.name.clone()),
                            class_id: class_id.clone(),
                            room: entry.room.clone(),
                            teacher: entry.teacher.clone(),
                            emphasis: entry.emphasis,
                            merged: others,
                        },
                    );
                }
            }

            let hidden = entry
                .teacher
                .as_deref()
                .map(|t| config.is_hidden_teacher(t))
                .unwrap_or(false);
            if !hidden {
                if let Some(room) = &entry.room {
                    acc.rooms.entry((period, *day)).or_insert_with(|| room.clone());
                    let tally = acc
                        .room_tally
                        .entry(room.clone())
                        .or_insert((0, (period, *day)));
                    tally.0 += 1;
                    if (period, *day) < tally.1 {
                        tally.1 = (period, *day);
                    }
                }
                if let Some(teacher) = &entry.teacher {
                    *acc.teacher_counts.entry(teacher.clone()).or_insert(0) += 1;
                }
            }

            if day.is_weekend() {
                acc.weekend_min = min_opt(acc.weekend_min, period);
            } else {
                acc.weekday_min = min_opt(acc.weekday_min, period);
            }
        }
    }

    let mut out: Vec<ClassDescriptor> = classes
        .into_iter()
        .filter(|(_, acc)| acc.schedule.values().any(|m| !m.is_empty()))
        .map(|(name, acc)| finish_class(name, acc, config, primary_teachers))
        .collect();
    out.sort_by(|a, b| {
        a.start_period
            .cmp(&b.start_period)
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

fn finish_class(
    name: String,
    acc: ClassAcc,
    config: &TimetableConfig,
    primary_teachers: &HashMap<String, String>,
) -> ClassDescriptor {
    let weekend_shift = match (acc.weekday_min, acc.weekend_min) {
        (Some(wd), Some(we)) if wd > we => wd - we,
        _ => 0,
    };

    let mut eff_min = u32::MAX;
    let mut eff_max = 0;
    let mut active_days: BTreeSet<Weekday> = BTreeSet::new();
    for (period, day_map) in &acc.schedule {
        for day in day_map.keys() {
            active_days.insert(*day);
            let eff = if day.is_weekend() {
                period + weekend_shift
            } else {
                *period
            };
            eff_min = eff_min.min(eff);
            eff_max = eff_max.max(eff);
        }
    }
    if eff_min == u32::MAX {
        eff_min = config.first_period;
        eff_max = config.first_period;
    }

    let (start, end) = visible_window(eff_min, eff_max, config.first_period, config.last_period);
    let table = if acc.compressed {
        compressed_periods(&config.compressed_pairs)
    } else {
        standard_periods()
    };
    let visible_periods = table
        .into_iter()
        .filter(|p| p.id >= start && p.id <= end)
        .collect();

    let main_room = acc
        .room_tally
        .iter()
        .max_by(|(ra, (ca, fa)), (rb, (cb, fb))| {
            ca.cmp(cb)
                .then_with(|| fb.cmp(fa))
                .then_with(|| rb.cmp(ra))
        })
        .map(|(room, _)| room.clone());
    let main_teacher = acc
        .id
        .as_ref()
        .and_then(|id| primary_teachers.get(id))
        .cloned();

    ClassDescriptor {
        name,
        id: acc.id,
        main_teacher,
        main_room,
        start_period: eff_min,
        schedule: acc.schedule,
        weekend_shift,
        visible_periods,
        days: compact_days(&active_days),
        room_summary: format_room_summary(&acc.rooms),
        teacher_counts: acc.teacher_counts,
        weekday_min: acc.weekday_min,
        weekend_min: acc.weekend_min,
        compressed: acc.compressed,
    }
}

/// Covering window of `[min, max]` widened to `MIN_WINDOW_SPAN` and clamped to `[first, last]`.
pub fn visible_window(min: u32, max: u32, first: u32, last: u32) -> (u32, u32) {
    let span = i64::from(MIN_WINDOW_SPAN);
    let (first, last) = (i64::from(first), i64::from(last));
    let mut start = i64::from(min);
    let mut end = i64::from(max.max(min));

    if end - start < span {
        end = start + span;
    }
    start = start.clamp(first, last);
    end = end.clamp(first, last);

    // Clamping at an edge shrank the window; grow it on the other side.
    if end - start < span {
        if start > first {
            start = first.max(end - span);
        }
        if end < last {
            end = last.min(start + span);
        }
    }
    (start as u32, end as u32)
}

/// Standard periods with every folded period of a compressed pair removed.
pub fn compressed_periods(pairs: &[(u32, u32)]) -> Vec<PeriodDef> {
    standard_periods()
        .into_iter()
        .filter(|p| !pairs.iter().any(|(_, folded)| *folded == p.id))
        .collect()
}

/// Mon–Fri with occupied weekend days swapped into free weekdays.
pub fn compact_days(active: &BTreeSet<Weekday>) -> Vec<Weekday> {
    let mut days = Weekday::STANDARD.to_vec();
    for weekend in [Weekday::Sat, Weekday::Sun] {
        if !active.contains(&weekend) || days.contains(&weekend) {
            continue;
        }
        match days.iter().position(|d| !active.contains(d)) {
            Some(i) => days[i] = weekend,
            None => {
                let last = days.len() - 1;
                days[last] = weekend;
            }
        }
    }
    days.sort_by_key(|d| d.index());
    days
}

/// `{(1,월):301, (1,수):301, (1,목):202}` → `"월수 301 / 목 202"`.
pub fn format_room_summary(rooms: &BTreeMap<(u32, Weekday), String>) -> String {
    let mut per_day: BTreeMap<Weekday, Vec<&str>> = BTreeMap::new();
    for ((_, day), room) in rooms {
        let list = per_day.entry(*day).or_default();
        if list.last() != Some(&room.as_str()) {
            list.push(room.as_str());
        }
    }

    // BTreeMap iteration is period-major, so each day's list is already period ordered.
    let mut groups: Vec<(String, Vec<Weekday>)> = Vec::new();
    for (day, list) in per_day {
        let pattern = list.join("-");
        match groups.iter_mut().find(|(p, _)| *p == pattern) {
            Some((_, days)) => days.push(day),
            None => groups.push((pattern, vec![day])),
        }
    }
    groups
        .into_iter()
        .map(|(pattern, days)| {
            let label: String = days.iter().map(|d| d.code()).collect();
            format!("{label} {pattern}")
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn filter_by_name(classes: &[ClassDescriptor], term: &str) -> Vec<ClassDescriptor> {
    let term = term.trim();
    classes
        .iter()
        .filter(|c| term.is_empty() || c.name.contains(term))
        .cloned()
        .collect()
}

pub fn group_by_start_period(classes: &[ClassDescriptor]) -> Vec<ClassGroupView> {
    let mut groups: BTreeMap<u32, Vec<ClassDescriptor>> = BTreeMap::new();
    for c in classes {
        groups.entry(c.start_period).or_default().push(c.clone());
    }
    groups
        .into_iter()
        .map(|(period, classes)| ClassGroupView {
            key: format!("period-{period}"),
            label: format!("{period}교시 시작"),
            compressed: false,
            classes,
        })
        .collect()
}

/// Configured groups in order, then everything else under `ungrouped`.
pub fn group_by_custom_groups(
    classes: &[ClassDescriptor],
    config: &TimetableConfig,
) -> Vec<ClassGroupView> {
    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();
    for group in &config.custom_groups {
        let members: Vec<ClassDescriptor> = group
            .class_ids
            .iter()
            .filter_map(|id| {
                classes
                    .iter()
                    .find(|c| c.id.as_deref() == Some(id.as_str()) || c.name == *id)
            })
            .cloned()
            .collect();
        for c in &members {
            placed.insert(c.name.clone());
        }
        out.push(ClassGroupView {
            key: group.id.clone(),
            label: group.title.clone(),
            compressed: group.compress_periods,
            classes: members,
        });
    }
    let rest: Vec<ClassDescriptor> = classes
        .iter()
        .filter(|c| !placed.contains(&c.name))
        .cloned()
        .collect();
    if !rest.is_empty() {
        out.push(ClassGroupView {
            key: "ungrouped".into(),
            label: "기타".into(),
            compressed: false,
            classes: rest,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CustomGroup, Teacher};
    use crate::slot_key::encode;

    fn cell(class: &str, room: &str) -> ScheduleCell {
        ScheduleCell {
            class_name: Some(class.to_string()),
            room: Some(room.to_string()),
            ..Default::default()
        }
    }

    fn with_id(mut c: ScheduleCell, id: &str) -> ScheduleCell {
        c.class_id = Some(id.to_string());
        c
    }

    fn put(snap: &mut Snapshot, teacher: &str, period: &str, day: &str, c: ScheduleCell) {
        snap.insert(encode(teacher, period, day), c);
    }

    fn find<'a>(classes: &'a [ClassDescriptor], name: &str) -> &'a ClassDescriptor {
        classes
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("class {name} missing"))
    }

    #[test]
    fn weekend_occurrence_is_shifted_onto_weekday_grid() {
        let mut snap = Snapshot::new();
        put(&mut snap, "T1", "5", "월", cell("DP3", "301"));
        put(&mut snap, "T1", "1", "토", cell("DP3", "301"));

        let classes = aggregate(&snap, &TimetableConfig::default(), &HashMap::new());
        let dp3 = find(&classes, "DP3");
        assert_eq!(dp3.weekday_min, Some(5));
        assert_eq!(dp3.weekend_min, Some(1));
        assert_eq!(dp3.weekend_shift, 4);
        assert_eq!(dp3.start_period, 5);

        let sat = dp3.cell_at(5, Weekday::Sat).expect("weekend cell at nominal 5");
        assert_eq!(sat.class_name.as_deref(), Some("DP3"));
        assert!(dp3.cell_at(1, Weekday::Sat).is_none());
        assert!(dp3.cell_at(5, Weekday::Mon).is_some());
        // storage keeps the raw weekend period
        assert!(dp3.schedule[&1].contains_key(&Weekday::Sat));
    }

    #[test]
    fn duplicate_class_in_same_slot_is_not_merged_twice() {
        let mut snap = Snapshot::new();
        let mut shared = cell("DP3", "301");
        shared.merged = vec![
            MergedStub {
                class_name: "PL1".into(),
                room: Some("302".into()),
                ..Default::default()
            },
            MergedStub {
                class_name: "PL1".into(),
                ..Default::default()
            },
        ];
        put(&mut snap, "T1", "1", "월", shared.clone());
        put(&mut snap, "T2", "1", "월", shared);

        let classes = aggregate(&snap, &TimetableConfig::default(), &HashMap::new());
        let dp3 = find(&classes, "DP3");
        let c = dp3.cell_at(1, Weekday::Mon).expect("cell");
        let names: Vec<&str> = c.merged.iter().map(|s| s.class_name.as_str()).collect();
        assert_eq!(names, vec!["PL1"]);

        let pl1 = find(&classes, "PL1");
        let c = pl1.cell_at(1, Weekday::Mon).expect("cell");
        assert_eq!(c.room.as_deref(), Some("302"));
        let names: Vec<&str> = c.merged.iter().map(|s| s.class_name.as_str()).collect();
        assert_eq!(names, vec!["DP3"]);
        assert_eq!(pl1.teacher_counts.get("T1"), Some(&1));
    }

    #[test]
    fn hidden_teacher_keeps_cells_but_not_counts_or_rooms() {
        let mut cfg = TimetableConfig::default();
        cfg.teachers.push(Teacher {
            name: "Ghost".into(),
            hidden: true,
            ..Default::default()
        });
        let mut snap = Snapshot::new();
        put(&mut snap, "Kim", "1", "월", cell("LE2", "301"));
        put(&mut snap, "Ghost", "2", "월", cell("LE2", "999"));
        put(&mut snap, "Ghost", "2", "화", cell("LE2", "999"));

        let classes = aggregate(&snap, &cfg, &HashMap::new());
        let le2 = find(&classes, "LE2");
        assert_eq!(le2.cell_count(), 3);
        assert_eq!(le2.teacher_counts.len(), 1);
        assert_eq!(le2.teacher_counts.get("Kim"), Some(&1));
        assert_eq!(le2.main_room.as_deref(), Some("301"));
        assert_eq!(le2.room_summary, "월 301");
    }

    #[test]
    fn compressed_group_folds_sixth_period_into_fifth() {
        let mut cfg = TimetableConfig::default();
        cfg.custom_groups.push(CustomGroup {
            id: "injae".into(),
            title: "인재원".into(),
            class_ids: vec!["c-1".into()],
            compress_periods: true,
        });
        let mut snap = Snapshot::new();
        put(&mut snap, "T1", "5", "월", with_id(cell("중등E_중2", "401"), "c-1"));
        put(&mut snap, "T1", "6", "월", with_id(cell("중등E_중2", "401"), "c-1"));
        put(&mut snap, "T1", "6", "화", cell("DP3", "301"));

        let classes = aggregate(&snap, &cfg, &HashMap::new());
        let grouped = find(&classes, "중등E_중2");
        assert!(grouped.compressed);
        assert_eq!(grouped.schedule.keys().copied().collect::<Vec<_>>(), vec![5]);
        assert!(grouped.visible_periods.iter().all(|p| p.id != 6));

        let plain = find(&classes, "DP3");
        assert!(!plain.compressed);
        assert!(plain.schedule.contains_key(&6));
    }

    #[test]
    fn primary_teacher_comes_from_roster_not_counts() {
        let mut snap = Snapshot::new();
        put(&mut snap, "Lee", "1", "월", with_id(cell("DP3", "301"), "c-9"));
        put(&mut snap, "Lee", "1", "수", cell("DP3", "301"));
        put(&mut snap, "Park", "2", "월", cell("DP3", "301"));
        let mut roster = HashMap::new();
        roster.insert("c-9".to_string(), "Park".to_string());

        let classes = aggregate(&snap, &TimetableConfig::default(), &roster);
        let dp3 = find(&classes, "DP3");
        assert_eq!(dp3.id.as_deref(), Some("c-9"));
        assert_eq!(dp3.main_teacher.as_deref(), Some("Park"));
        assert_eq!(dp3.teacher_counts.get("Lee"), Some(&2));

        let none = aggregate(&snap, &TimetableConfig::default(), &HashMap::new());
        assert_eq!(find(&none, "DP3").main_teacher, None);
    }

    #[test]
    fn malformed_keys_and_empty_cells_are_skipped() {
        let mut snap = Snapshot::new();
        snap.insert("broken".into(), cell("DP3", "301"));
        snap.insert("T1-x-월".into(), cell("DP3", "301"));
        snap.insert("T1-1-X".into(), cell("DP3", "301"));
        put(&mut snap, "T1", "1", "월", ScheduleCell::default());
        assert!(aggregate(&snap, &TimetableConfig::default(), &HashMap::new()).is_empty());
    }

    #[test]
    fn window_is_widened_and_clamped() {
        assert_eq!(visible_window(1, 1, 1, 10), (1, 5));
        assert_eq!(visible_window(3, 4, 1, 10), (3, 7));
        assert_eq!(visible_window(9, 10, 1, 10), (6, 10));
        assert_eq!(visible_window(10, 10, 1, 10), (6, 10));
        assert_eq!(visible_window(2, 9, 1, 10), (2, 9));
        assert_eq!(visible_window(1, 2, 1, 3), (1, 3));
    }

    #[test]
    fn weekend_days_take_free_weekday_columns() {
        let active: BTreeSet<Weekday> = [Weekday::Mon, Weekday::Tue, Weekday::Sat].into();
        assert_eq!(
            compact_days(&active),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Thu, Weekday::Fri, Weekday::Sat]
        );

        let full: BTreeSet<Weekday> = Weekday::STANDARD
            .into_iter()
            .chain([Weekday::Sun])
            .collect();
        assert_eq!(
            compact_days(&full),
            vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Sun]
        );

        let both: BTreeSet<Weekday> = [Weekday::Mon, Weekday::Sat, Weekday::Sun].into();
        assert_eq!(
            compact_days(&both),
            vec![Weekday::Mon, Weekday::Thu, Weekday::Fri, Weekday::Sat, Weekday::Sun]
        );
    }

    #[test]
    fn room_summary_groups_days_by_pattern() {
        let mut rooms = BTreeMap::new();
        rooms.insert((1, Weekday::Mon), "301".to_string());
        rooms.insert((1, Weekday::Wed), "301".to_string());
        rooms.insert((1, Weekday::Thu), "202".to_string());
        assert_eq!(format_room_summary(&rooms), "월수 301 / 목 202");

        rooms.insert((2, Weekday::Thu), "302".to_string());
        rooms.insert((2, Weekday::Mon), "301".to_string());
        assert_eq!(format_room_summary(&rooms), "월수 301 / 목 202-302");
        assert_eq!(format_room_summary(&BTreeMap::new()), "");
    }

    #[test]
    fn grouping_by_start_period_and_custom_group() {
        let mut snap = Snapshot::new();
        put(&mut snap, "T1", "1", "월", with_id(cell("DP3", "301"), "a"));
        put(&mut snap, "T1", "3", "월", with_id(cell("PL1", "302"), "b"));
        put(&mut snap, "T2", "1", "화", with_id(cell("LE2", "303"), "c"));
        let mut cfg = TimetableConfig::default();
        cfg.custom_groups.push(CustomGroup {
            id: "g1".into(),
            title: "Group".into(),
            class_ids: vec!["b".into(), "a".into()],
            compress_periods: false,
        });
        let classes = aggregate(&snap, &cfg, &HashMap::new());

        let by_period = group_by_start_period(&classes);
        assert_eq!(by_period.len(), 2);
        assert_eq!(by_period[0].label, "1교시 시작");
        assert_eq!(by_period[0].classes.len(), 2);

        let by_group = group_by_custom_groups(&classes, &cfg);
        assert_eq!(by_group[0].classes[0].name, "PL1");
        assert_eq!(by_group[0].classes[1].name, "DP3");
        assert_eq!(by_group[1].key, "ungrouped");
        assert_eq!(by_group[1].classes[0].name, "LE2");

        assert_eq!(filter_by_name(&classes, "DP").len(), 1);
        assert_eq!(filter_by_name(&classes, "").len(), 3);
    }
}
