use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub type UserId = u32;

/// Score returned by the sentinel grade lookups when nothing is recorded.
pub const UNGRADED: f64 = -1.0;

pub const DEFAULT_MAX_SCORE: f64 = 100.0;

/// student id -> item name -> score
pub type GradeTable = BTreeMap<UserId, BTreeMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Assignment,
    Report,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Assignment => "assignment",
            ItemKind::Report => "report",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assignment" => Ok(ItemKind::Assignment),
            "report" => Ok(ItemKind::Report),
            other => Err(format!("unknown item kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Pending and approved submissions block a fresh submission of the same item.
    pub fn is_active(&self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    name: String,
    code: String,
    professor_id: UserId,
    enrolled: BTreeSet<UserId>,
    assignments: Vec<String>,
    reports: Vec<String>,
    assignment_grades: GradeTable,
    report_grades: GradeTable,
}

impl Subject {
    pub fn new(name: impl Into<String>, code: impl Into<String>, professor_id: UserId) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            professor_id,
            enrolled: BTreeSet::new(),
            assignments: Vec::new(),
            reports: Vec::new(),
            assignment_grades: GradeTable::new(),
            report_grades: GradeTable::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn professor_id(&self) -> UserId {
        self.professor_id
    }

    pub fn is_professor(&self, professor_id: UserId) -> bool {
        self.professor_id == professor_id
    }

    /// Returns true when the student was not enrolled before.
    pub fn enroll(&mut self, student_id: UserId) -> bool {
        self.enrolled.insert(student_id)
    }

    pub fn is_enrolled(&self, student_id: UserId) -> bool {
        self.enrolled.contains(&student_id)
    }

    /// Enrolled student ids in ascending order.
    pub fn enrolled_students(&self) -> Vec<UserId> {
        self.enrolled.iter().copied().collect()
    }

    pub fn add_assignment(&mut self, name: impl Into<String>) {
        self.assignments.push(name.into());
    }

    pub fn add_report(&mut self, topic: impl Into<String>) {
        self.reports.push(topic.into());
    }

    pub fn remove_report(&mut self, topic: &str) -> bool {
        match self.reports.iter().position(|r| r == topic) {
            Some(index) => {
                self.reports.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn has_assignment(&self, name: &str) -> bool {
        self.assignments.iter().any(|a| a == name)
    }

    pub fn has_report(&self, topic: &str) -> bool {
        self.reports.iter().any(|r| r == topic)
    }

    pub fn assignments(&self) -> &[String] {
        &self.assignments
    }

    pub fn reports(&self) -> &[String] {
        &self.reports
    }

    /// Silently ignored unless the student is enrolled and the assignment declared.
    pub fn grade_assignment(&mut self, student_id: UserId, name: &str, score: f64) {
        if self.is_enrolled(student_id) && self.has_assignment(name) {
            self.assignment_grades
                .entry(student_id)
                .or_default()
                .insert(name.to_string(), score);
        }
    }

    /// Records a report grade for one enrolled student. The topic does not need
    /// to be declared any more: graded reports are removed from the subject.
    pub fn grade_report(&mut self, student_id: UserId, topic: &str, score: f64) {
        if self.is_enrolled(student_id) {
            self.report_grades
                .entry(student_id)
                .or_default()
                .insert(topic.to_string(), score);
        }
    }

    /// Grades every enrolled student when `participants` is empty, otherwise the
    /// enrolled subset of `participants`.
    pub fn grade_all_reports(&mut self, topic: &str, score: f64, participants: &[UserId]) {
        if !self.has_report(topic) {
            return;
        }

        let targets: Vec<UserId> = if participants.is_empty() {
            self.enrolled_students()
        } else {
            participants
                .iter()
                .copied()
                .filter(|id| self.is_enrolled(*id))
                .collect()
        };

        for student_id in targets {
            self.grade_report(student_id, topic, score);
        }
    }

    pub fn assignment_grade(&self, student_id: UserId, name: &str) -> Option<f64> {
        self.assignment_grades
            .get(&student_id)
            .and_then(|grades| grades.get(name))
            .copied()
    }

    pub fn report_grade(&self, student_id: UserId, topic: &str) -> Option<f64> {
        self.report_grades
            .get(&student_id)
            .and_then(|grades| grades.get(topic))
            .copied()
    }

    /// Sentinel form of [`Subject::assignment_grade`]: negative means ungraded.
    pub fn student_assignment_grade(&self, student_id: UserId, name: &str) -> f64 {
        self.assignment_grade(student_id, name).unwrap_or(UNGRADED)
    }

    /// Sentinel form of [`Subject::report_grade`]: negative means ungraded.
    pub fn student_report_grade(&self, student_id: UserId, topic: &str) -> f64 {
        self.report_grade(student_id, topic).unwrap_or(UNGRADED)
    }

    pub fn assignment_grades(&self) -> &GradeTable {
        &self.assignment_grades
    }

    pub fn report_grades(&self) -> &GradeTable {
        &self.report_grades
    }

    /// All grades of one student, assignments first, each group ordered by item name.
    pub fn grades_for(&self, student_id: UserId) -> Vec<(ItemKind, String, f64)> {
        let mut lines = Vec::new();
        for (kind, table) in [
            (ItemKind::Assignment, &self.assignment_grades),
            (ItemKind::Report, &self.report_grades),
        ] {
            if let Some(grades) = table.get(&student_id) {
                lines.extend(grades.iter().map(|(item, score)| (kind, item.clone(), *score)));
            }
        }
        lines
    }

    /// Moves enrollment, declared items and both grade tables to a new subject
    /// owned by `professor_id`. The previous instance is consumed.
    pub fn take_over(self, professor_id: UserId, code: impl Into<String>) -> Subject {
        Subject {
            code: code.into(),
            professor_id,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub subject_name: String,
    pub max_score: f64,
}

impl Assignment {
    pub fn new(name: impl Into<String>, subject_name: impl Into<String>, max_score: f64) -> Self {
        Self {
            name: name.into(),
            subject_name: subject_name.into(),
            max_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    topic: String,
    subject_name: String,
    max_participants: usize,
    signed_up: BTreeSet<UserId>,
    completed: bool,
    #[serde(with = "timestamp")]
    created_at: NaiveDateTime,
}

impl Report {
    pub fn new(
        topic: impl Into<String>,
        subject_name: impl Into<String>,
        max_participants: usize,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            topic: topic.into(),
            subject_name: subject_name.into(),
            max_participants,
            signed_up: BTreeSet::new(),
            completed: false,
            created_at,
        }
    }

    /// Rebuilds a stored report without re-running the sign-up checks.
    pub fn restore(
        topic: impl Into<String>,
        subject_name: impl Into<String>,
        max_participants: usize,
        signed_up: impl IntoIterator<Item = UserId>,
        completed: bool,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            topic: topic.into(),
            subject_name: subject_name.into(),
            max_participants,
            signed_up: signed_up.into_iter().collect(),
            completed,
            created_at,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }

    pub fn is_full(&self) -> bool {
        self.signed_up.len() >= self.max_participants
    }

    pub fn has_student(&self, student_id: UserId) -> bool {
        self.signed_up.contains(&student_id)
    }

    pub fn add_student(&mut self, student_id: UserId) -> bool {
        if self.is_full() || self.completed {
            return false;
        }
        self.signed_up.insert(student_id)
    }

    pub fn remove_student(&mut self, student_id: UserId) -> bool {
        self.signed_up.remove(&student_id)
    }

    /// Signed-up student ids in ascending order.
    pub fn signed_up_students(&self) -> Vec<UserId> {
        self.signed_up.iter().copied().collect()
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub student_id: UserId,
    pub subject_name: String,
    pub item_name: String,
    pub kind: ItemKind,
    pub status: SubmissionStatus,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
}

impl SubmissionRecord {
    pub fn matches(
        &self,
        student_id: UserId,
        subject_name: &str,
        item_name: &str,
        kind: ItemKind,
    ) -> bool {
        self.student_id == student_id
            && self.subject_name == subject_name
            && self.item_name == item_name
            && self.kind == kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub student_id: UserId,
    pub subject_name: String,
    pub item_name: String,
    pub kind: ItemKind,
    pub score: f64,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
}

/// `YYYY-MM-DD HH:MM:SS` timestamps for stored records.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
