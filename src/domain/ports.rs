use crate::domain::model::{
    Assignment, GradeRecord, ItemKind, Report, SubmissionRecord, UserId,
};
use crate::domain::user::User;
use crate::utils::error::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subject row as stored; rosters, items and grades are kept in their own collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub name: String,
    pub code: String,
    pub professor_id: UserId,
}

/// One entry of a subject's grade table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectGradeRow {
    pub kind: ItemKind,
    pub subject_name: String,
    pub student_id: UserId,
    pub item_name: String,
    pub score: f64,
}

/// student id -> subject names, in subject order.
pub type EnrollmentIndex = BTreeMap<UserId, Vec<String>>;

/// Everything the system persists between runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub next_user_id: UserId,
    pub users: Vec<User>,
    pub subjects: Vec<SubjectRecord>,
    pub assignments: Vec<Assignment>,
    pub reports: Vec<Report>,
    pub enrollments: EnrollmentIndex,
    pub submissions: Vec<SubmissionRecord>,
    pub grades: Vec<GradeRecord>,
    pub subject_grades: Vec<SubjectGradeRow>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            next_user_id: 1,
            users: Vec::new(),
            subjects: Vec::new(),
            assignments: Vec::new(),
            reports: Vec::new(),
            enrollments: EnrollmentIndex::new(),
            submissions: Vec::new(),
            grades: Vec::new(),
            subject_grades: Vec::new(),
        }
    }
}

/// Persistence collaborator. A collection that was never saved loads as empty.
pub trait Store {
    fn load_users(&self) -> Result<Vec<User>>;
    fn save_users(&self, users: &[User]) -> Result<()>;

    fn load_subjects(&self) -> Result<Vec<SubjectRecord>>;
    fn save_subjects(&self, subjects: &[SubjectRecord]) -> Result<()>;

    fn load_assignments(&self) -> Result<Vec<Assignment>>;
    fn save_assignments(&self, assignments: &[Assignment]) -> Result<()>;

    fn load_reports(&self) -> Result<Vec<Report>>;
    fn save_reports(&self, reports: &[Report]) -> Result<()>;

    fn load_enrollments(&self) -> Result<EnrollmentIndex>;
    fn save_enrollments(&self, enrollments: &EnrollmentIndex) -> Result<()>;

    fn load_submissions(&self) -> Result<Vec<SubmissionRecord>>;
    fn save_submissions(&self, submissions: &[SubmissionRecord]) -> Result<()>;

    fn load_grades(&self) -> Result<Vec<GradeRecord>>;
    fn save_grades(&self, grades: &[GradeRecord]) -> Result<()>;

    fn load_subject_grades(&self) -> Result<Vec<SubjectGradeRow>>;
    fn save_subject_grades(&self, rows: &[SubjectGradeRow]) -> Result<()>;

    fn load_next_user_id(&self) -> Result<UserId>;
    fn save_next_user_id(&self, next_id: UserId) -> Result<()>;

    fn load_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            next_user_id: self.load_next_user_id()?,
            users: self.load_users()?,
            subjects: self.load_subjects()?,
            assignments: self.load_assignments()?,
            reports: self.load_reports()?,
            enrollments: self.load_enrollments()?,
            submissions: self.load_submissions()?,
            grades: self.load_grades()?,
            subject_grades: self.load_subject_grades()?,
        })
    }

    fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.save_users(&snapshot.users)?;
        self.save_subjects(&snapshot.subjects)?;
        self.save_assignments(&snapshot.assignments)?;
        self.save_reports(&snapshot.reports)?;
        self.save_enrollments(&snapshot.enrollments)?;
        self.save_submissions(&snapshot.submissions)?;
        self.save_grades(&snapshot.grades)?;
        self.save_subject_grades(&snapshot.subject_grades)?;
        self.save_next_user_id(snapshot.next_user_id)
    }
}

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Grade announcement delivered to a student.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeNotice {
    pub student_id: UserId,
    pub student_name: String,
    pub subject_name: String,
    pub item_name: String,
    pub kind: ItemKind,
    pub score: f64,
}

pub trait GradeObserver {
    fn grade_updated(&mut self, notice: &GradeNotice);
}
