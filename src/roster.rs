use crate::schedule::Weekday;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Withdrawn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub status: StudentStatus,
}

/// One student's enrolment in one class. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(default)]
    pub id: String,
    pub student_id: String,
    pub class_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_date: Option<String>,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub emphasis: bool,
    #[serde(default)]
    pub attendance_days: Vec<Weekday>,
}

impl Membership {
    pub fn is_ended(&self) -> bool {
        self.end_date.is_some() || self.withdrawal_date.is_some()
    }
}

/// A student as listed under one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub emphasis: bool,
    #[serde(default)]
    pub enrollment_date: Option<String>,
    #[serde(default)]
    pub withdrawal_date: Option<String>,
    #[serde(default)]
    pub on_hold: bool,
    #[serde(default)]
    pub attendance_days: Vec<Weekday>,
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub transferred_out: bool,
    #[serde(default)]
    pub transferred_in: bool,
    /// Shown here only because of an uncommitted move.
    #[serde(default)]
    pub provisional: bool,
}

impl RosterEntry {
    pub fn is_withdrawn(&self) -> bool {
        self.withdrawal_date.is_some()
    }

    pub fn is_active(&self) -> bool {
        !self.is_withdrawn() && !self.on_hold
    }
}

/// Open memberships outrank ended ones; among equals the later start wins.
fn membership_rank(m: &Membership) -> (bool, Option<&str>) {
    (!m.is_ended(), m.start_date.as_deref())
}

/// Builds the confirmed roster of each requested class from raw membership records.
pub fn derive_class_rosters(
    students: &[Student],
    memberships: &[Membership],
    class_names: &[String],
    today: &str,
) -> BTreeMap<String, Vec<RosterEntry>> {
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut active_in: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    let mut ended_in: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for m in memberships {
        let target = if m.is_ended() {
            &mut ended_in
        } else {
            &mut active_in
        };
        target
            .entry(m.student_id.as_str())
            .or_default()
            .insert(m.class_name.as_str());
    }

    let mut out: BTreeMap<String, Vec<RosterEntry>> = class_names
        .iter()
        .map(|c| (c.clone(), Vec::new()))
        .collect();

    // A student may have several rows for one class (left, then came back).
    let mut chosen: BTreeMap<(&str, &str), &Membership> = BTreeMap::new();
    for m in memberships {
        if !out.contains_key(&m.class_name) {
            continue;
        }
        let slot = chosen
            .entry((m.class_name.as_str(), m.student_id.as_str()))
            .or_insert(m);
        if membership_rank(m) >= membership_rank(*slot) {
            *slot = m;
        }
    }

    for ((class_name, student_id), m) in chosen {
        let Some(list) = out.get_mut(class_name) else {
            continue;
        };
        let Some(student) = by_id.get(student_id) else {
            continue;
        };
        if student.status != StudentStatus::Active {
            continue;
        }

        let elsewhere = |map: &HashMap<&str, BTreeSet<&str>>| {
            map.get(student.id.as_str())
                .map(|set| set.iter().any(|c| *c != class_name))
                .unwrap_or(false)
        };
        let ended = m.is_ended();

        list.push(RosterEntry {
            student_id: student.id.clone(),
            name: student.name.clone(),
            english_name: student.english_name.clone(),
            school: student.school.clone(),
            grade: student.grade.clone(),
            emphasis: m.emphasis,
            enrollment_date: m.start_date.clone(),
            withdrawal_date: m.withdrawal_date.clone().or_else(|| m.end_date.clone()),
            on_hold: m.on_hold,
            attendance_days: m.attendance_days.clone(),
            scheduled: m.start_date.as_deref().map(|d| d > today).unwrap_or(false),
            transferred_out: ended && elsewhere(&active_in),
            transferred_in: !ended && elsewhere(&ended_in),
            provisional: false,
        });
    }

    for list in out.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.student_id.cmp(&b.student_id)));
    }
    out
}

/// A student as listed in a stats tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentBrief {
    pub id: String,
    pub name: String,
    pub school: String,
    pub grade: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_date: Option<String>,
}

/// Headcounts over every class on the timetable, each student counted once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStats {
    pub active: usize,
    /// Active and enrolled within the last 30 days.
    pub new1: usize,
    /// Active and enrolled 31 to 60 days ago.
    pub new2: usize,
    /// Withdrawn within the last 30 days.
    pub withdrawn: usize,
    pub withdrawn_future: usize,
    /// On hold.
    pub waiting: usize,
    pub waiting_students: Vec<StudentBrief>,
    pub withdrawn_students: Vec<StudentBrief>,
    pub withdrawn_future_students: Vec<StudentBrief>,
}

pub const NEW1_DAYS: i64 = 30;
pub const NEW2_DAYS: i64 = 60;
pub const RECENT_WITHDRAWAL_DAYS: i64 = 30;

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

/// Student statistics for the classes in `class_names`.
///
/// Each student is judged by one membership: their open one if any, else
/// their latest withdrawal. Rows closed by a class move carry no withdrawal
/// and are ignored.
pub fn class_stats(
    students: &[Student],
    memberships: &[Membership],
    class_names: &BTreeSet<String>,
    today: NaiveDate,
) -> ClassStats {
    let by_id: HashMap<&str, &Student> = students.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut chosen: BTreeMap<&str, &Membership> = BTreeMap::new();
    for m in memberships {
        if !class_names.contains(&m.class_name) {
            continue;
        }
        if m.end_date.is_some() && m.withdrawal_date.is_none() {
            continue;
        }
        let slot = chosen.entry(m.student_id.as_str()).or_insert(m);
        if membership_rank(m) >= membership_rank(*slot) {
            *slot = m;
        }
    }

    let mut stats = ClassStats::default();
    for (student_id, m) in chosen {
        let Some(student) = by_id.get(student_id) else {
            continue;
        };
        let brief = StudentBrief {
            id: student.id.clone(),
            name: student.name.clone(),
            school: student.school.clone(),
            grade: student.grade.clone(),
            enrollment_date: m.start_date.clone(),
            withdrawal_date: m.withdrawal_date.clone(),
        };

        if let Some(raw) = m.withdrawal_date.as_deref() {
            match parse_date(Some(raw)) {
                Some(date) if date > today => {
                    stats.withdrawn_future += 1;
                    stats.withdrawn_future_students.push(brief);
                }
                Some(date) if (today - date).num_days() <= RECENT_WITHDRAWAL_DAYS => {
                    stats.withdrawn += 1;
                    stats.withdrawn_students.push(brief);
                }
                Some(_) => {}
                None => tracing::warn!(student_id = %student_id, date = %raw, "unreadable withdrawal date"),
            }
            continue;
        }

        if m.on_hold {
            stats.waiting += 1;
            stats.waiting_students.push(brief);
            continue;
        }

        if student.status != StudentStatus::Active {
            continue;
        }
        stats.active += 1;
        if let Some(start) = parse_date(m.start_date.as_deref()) {
            let days = (today - start).num_days();
            if days <= NEW1_DAYS {
                stats.new1 += 1;
            } else if days <= NEW2_DAYS {
                stats.new2 += 1;
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.into(),
            name: name.into(),
            english_name: String::new(),
            school: String::new(),
            grade: String::new(),
            status: StudentStatus::Active,
        }
    }

    fn membership(id: &str, student: &str, class: &str) -> Membership {
        Membership {
            id: id.into(),
            student_id: student.into(),
            class_name: class.into(),
            start_date: Some("2026-03-02".into()),
            end_date: None,
            withdrawal_date: None,
            on_hold: false,
            emphasis: false,
            attendance_days: Vec::new(),
        }
    }

    #[test]
    fn transfer_flags_follow_membership_history() {
        let students = vec![student("s1", "나"), student("s2", "가")];
        let mut old = membership("m1", "s1", "DP3");
        old.end_date = Some("2026-09-01".into());
        let memberships = vec![old, membership("m2", "s1", "PL1"), membership("m3", "s2", "DP3")];

        let rosters = derive_class_rosters(
            &students,
            &memberships,
            &["DP3".to_string(), "PL1".to_string()],
            "2026-10-19",
        );

        let dp3 = &rosters["DP3"];
        assert_eq!(dp3.len(), 2);
        assert_eq!(dp3[0].student_id, "s2");
        let moved = dp3.iter().find(|e| e.student_id == "s1").expect("s1");
        assert!(moved.transferred_out);
        assert!(moved.is_withdrawn());

        let pl1 = &rosters["PL1"];
        assert!(pl1[0].transferred_in);
        assert!(pl1[0].is_active());
    }

    #[test]
    fn inactive_students_and_unrequested_classes_are_skipped() {
        let mut gone = student("s1", "A");
        gone.status = StudentStatus::Withdrawn;
        let mut future = membership("m3", "s2", "DP3");
        future.start_date = Some("2026-11-01".into());
        let rosters = derive_class_rosters(
            &[gone, student("s2", "B")],
            &[membership("m1", "s1", "DP3"), membership("m2", "s2", "LE1"), future],
            &["DP3".to_string()],
            "2026-10-19",
        );
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters["DP3"].len(), 1);
        assert!(rosters["DP3"][0].scheduled);
    }

    #[test]
    fn returning_student_is_listed_from_the_open_membership() {
        let students = vec![student("s1", "가")];
        let mut first = membership("m1", "s1", "DP3");
        first.end_date = Some("2026-05-01".into());
        let mut detour = membership("m2", "s1", "PL1");
        detour.start_date = Some("2026-05-01".into());
        detour.end_date = Some("2026-09-01".into());
        let mut back = membership("m3", "s1", "DP3");
        back.start_date = Some("2026-09-01".into());

        let rosters = derive_class_rosters(
            &students,
            &[first, detour, back],
            &["DP3".to_string()],
            "2026-10-19",
        );
        let dp3 = &rosters["DP3"];
        assert_eq!(dp3.len(), 1);
        assert!(dp3[0].is_active());
        assert_eq!(dp3[0].enrollment_date.as_deref(), Some("2026-09-01"));
        assert!(dp3[0].transferred_in);
        assert!(!dp3[0].transferred_out);
    }

    #[test]
    fn ended_rows_fall_back_to_the_latest_start() {
        let mut old = membership("m1", "s1", "DP3");
        old.end_date = Some("2026-04-01".into());
        let mut later = membership("m2", "s1", "DP3");
        later.start_date = Some("2026-06-01".into());
        later.withdrawal_date = Some("2026-08-01".into());
        let rosters = derive_class_rosters(
            &[student("s1", "가")],
            &[later, old],
            &["DP3".to_string()],
            "2026-10-19",
        );
        assert_eq!(rosters["DP3"][0].withdrawal_date.as_deref(), Some("2026-08-01"));
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    #[test]
    fn class_stats_buckets_each_student_once() {
        let students: Vec<Student> = ["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"]
            .iter()
            .map(|id| student(id, id))
            .collect();
        let classes: BTreeSet<String> = ["DP3", "PL1"].iter().map(|c| c.to_string()).collect();

        let mut fresh = membership("m1", "s1", "DP3");
        fresh.start_date = Some("2026-10-01".into());
        let mut fresh_twice = membership("m1b", "s1", "PL1");
        fresh_twice.start_date = Some("2026-10-01".into());
        let mut second_month = membership("m2", "s2", "DP3");
        second_month.start_date = Some("2026-08-30".into());
        let veteran = membership("m3", "s3", "DP3");
        let mut gone = membership("m4", "s4", "DP3");
        gone.withdrawal_date = Some("2026-10-01".into());
        let mut long_gone = membership("m5", "s5", "DP3");
        long_gone.withdrawal_date = Some("2026-06-01".into());
        let mut leaving = membership("m6", "s6", "PL1");
        leaving.withdrawal_date = Some("2026-11-30".into());
        let mut held = membership("m7", "s7", "PL1");
        held.on_hold = true;
        let elsewhere = membership("m8", "s8", "LE1");

        let stats = class_stats(
            &students,
            &[
                fresh,
                fresh_twice,
                second_month,
                veteran,
                gone,
                long_gone,
                leaving,
                held,
                elsewhere,
            ],
            &classes,
            day("2026-10-19"),
        );

        assert_eq!(stats.active, 3);
        assert_eq!(stats.new1, 1);
        assert_eq!(stats.new2, 1);
        assert_eq!(stats.withdrawn, 1);
        assert_eq!(stats.withdrawn_students[0].id, "s4");
        assert_eq!(stats.withdrawn_future, 1);
        assert_eq!(stats.withdrawn_future_students[0].id, "s6");
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.waiting_students[0].id, "s7");
    }

    #[test]
    fn class_stats_ignores_moves_and_inactive_students() {
        let mut inactive = student("s2", "나");
        inactive.status = StudentStatus::Inactive;
        let mut moved_out = membership("m1", "s1", "DP3");
        moved_out.end_date = Some("2026-09-01".into());
        let moved_in = membership("m2", "s1", "PL1");
        let classes: BTreeSet<String> = ["DP3", "PL1"].iter().map(|c| c.to_string()).collect();

        let stats = class_stats(
            &[student("s1", "가"), inactive],
            &[moved_out, moved_in, membership("m3", "s2", "DP3")],
            &classes,
            day("2026-10-19"),
        );
        assert_eq!(stats.active, 1);
        assert_eq!(stats.withdrawn, 0);
        assert_eq!(stats.new1 + stats.new2, 0);
    }
}
