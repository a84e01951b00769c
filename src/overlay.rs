//! Uncommitted student moves layered over the live roster.
//!
//! Entries are keyed by student id and always remember the class the student
//! was in when the first move was staged, so A→B→C collapses to A→C and
//! A→B→A disappears.

use crate::roster::RosterEntry;
use crate::schedule::Weekday;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingMove {
    pub student: RosterEntry,
    pub from_class: String,
    pub to_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipClose {
    pub student_id: String,
    pub class_name: String,
    pub end_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipOpen {
    pub student_id: String,
    pub class_name: String,
    pub start_date: String,
    pub attendance_days: Vec<Weekday>,
    pub emphasis: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOperation {
    pub student_id: String,
    pub closed: MembershipClose,
    pub opened: MembershipOpen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRoster {
    pub class_name: String,
    pub students: Vec<RosterEntry>,
    pub active_count: usize,
}

impl DisplayRoster {
    pub fn active(&self) -> impl Iterator<Item = &RosterEntry> {
        self.students.iter().filter(|s| s.is_active())
    }

    pub fn on_hold(&self) -> impl Iterator<Item = &RosterEntry> {
        self.students
            .iter()
            .filter(|s| s.on_hold && !s.is_withdrawn())
    }

    pub fn withdrawn(&self) -> impl Iterator<Item = &RosterEntry> {
        self.students.iter().filter(|s| s.is_withdrawn())
    }
}

#[derive(Debug, Default)]
pub struct PendingMoves {
    moves: BTreeMap<String, PendingMove>,
    unsaved: bool,
}

impl PendingMoves {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved && !self.moves.is_empty()
    }

    pub fn get(&self, student_id: &str) -> Option<&PendingMove> {
        self.moves.get(student_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMove> {
        self.moves.values()
    }

    pub fn move_student(&mut self, student: RosterEntry, from: &str, to: &str) {
        if from == to {
            return;
        }
        match self.moves.get_mut(&student.student_id) {
            Some(existing) if existing.from_class == to => {
                self.moves.remove(&student.student_id);
            }
            Some(existing) => {
                existing.to_class = to.to_string();
            }
            None => {
                self.moves.insert(
                    student.student_id.clone(),
                    PendingMove {
                        student,
                        from_class: from.to_string(),
                        to_class: to.to_string(),
                    },
                );
            }
        }
        self.unsaved = true;
    }

    /// Live roster of `class_name` with pending moves applied.
    ///
    /// Members whose enrolment starts after `today` are not shown yet.
    pub fn display_roster(&self, class_name: &str, live: &[RosterEntry], today: &str) -> DisplayRoster {
        let mut students: Vec<RosterEntry> = live
            .iter()
            .filter(|s| s.enrollment_date.as_deref().map(|d| d <= today).unwrap_or(true))
            .filter(|s| {
                self.moves
                    .get(&s.student_id)
                    .map(|m| m.from_class != class_name)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        for m in self.moves.values() {
            if m.to_class != class_name {
                continue;
            }
            if students.iter().any(|s| s.student_id == m.student.student_id) {
                continue;
            }
            let mut incoming = m.student.clone();
            incoming.provisional = true;
            students.push(incoming);
        }

        let active_count = students.iter().filter(|s| s.is_active()).count();
        DisplayRoster {
            class_name: class_name.to_string(),
            students,
            active_count,
        }
    }

    pub fn plan_commit(&self, today: &str) -> Vec<MoveOperation> {
        self.moves
            .values()
            .map(|m| MoveOperation {
                student_id: m.student.student_id.clone(),
                closed: MembershipClose {
                    student_id: m.student.student_id.clone(),
                    class_name: m.from_class.clone(),
                    end_date: today.to_string(),
                },
                opened: MembershipOpen {
                    student_id: m.student.student_id.clone(),
                    class_name: m.to_class.clone(),
                    start_date: today.to_string(),
                    attendance_days: m.student.attendance_days.clone(),
                    emphasis: m.student.emphasis,
                },
            })
            .collect()
    }

    /// Applies every pending move through `apply`.
    ///
    /// Each move leaves the overlay as soon as it is applied. On the first
    /// failure the remaining moves stay staged and the unsaved flag is re-armed,
    /// so calling again retries only what is left.
    pub fn commit_with<F>(&mut self, today: &str, mut apply: F) -> anyhow::Result<Vec<MoveOperation>>
    where
        F: FnMut(&MoveOperation) -> anyhow::Result<()>,
    {
        let ops = self.plan_commit(today);
        let mut applied = Vec::with_capacity(ops.len());
        for op in ops {
            if let Err(e) = apply(&op) {
                self.unsaved = true;
                tracing::warn!(
                    student_id = %op.student_id,
                    applied = applied.len(),
                    remaining = self.moves.len(),
                    error = %e,
                    "move commit failed"
                );
                return Err(e);
            }
            self.moves.remove(&op.student_id);
            applied.push(op);
        }
        self.unsaved = false;
        Ok(applied)
    }

    /// Drops all pending moves, but only once the user has confirmed.
    pub fn cancel(&mut self, confirmed: bool) -> bool {
        if !confirmed || self.moves.is_empty() {
            return false;
        }
        self.moves.clear();
        self.unsaved = false;
        true
    }
}
