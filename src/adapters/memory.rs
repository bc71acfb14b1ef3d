use crate::domain::model::{Assignment, GradeRecord, Report, SubmissionRecord, UserId};
use crate::domain::ports::{EnrollmentIndex, Snapshot, Store, SubjectGradeRow, SubjectRecord};
use crate::domain::user::User;
use crate::utils::error::Result;
use std::cell::RefCell;

/// Keeps the last saved state in process. Used for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<Snapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of what has been saved so far.
    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().clone()
    }
}

impl Store for MemoryStore {
    fn load_users(&self) -> Result<Vec<User>> {
        Ok(self.state.borrow().users.clone())
    }

    fn save_users(&self, users: &[User]) -> Result<()> {
        self.state.borrow_mut().users = users.to_vec();
        Ok(())
    }

    fn load_subjects(&self) -> Result<Vec<SubjectRecord>> {
        Ok(self.state.borrow().subjects.clone())
    }

    fn save_subjects(&self, subjects: &[SubjectRecord]) -> Result<()> {
        self.state.borrow_mut().subjects = subjects.to_vec();
        Ok(())
    }

    fn load_assignments(&self) -> Result<Vec<Assignment>> {
        Ok(self.state.borrow().assignments.clone())
    }

    fn save_assignments(&self, assignments: &[Assignment]) -> Result<()> {
        self.state.borrow_mut().assignments = assignments.to_vec();
        Ok(())
    }

    fn load_reports(&self) -> Result<Vec<Report>> {
        Ok(self.state.borrow().reports.clone())
    }

    fn save_reports(&self, reports: &[Report]) -> Result<()> {
        self.state.borrow_mut().reports = reports.to_vec();
        Ok(())
    }

    fn load_enrollments(&self) -> Result<EnrollmentIndex> {
        Ok(self.state.borrow().enrollments.clone())
    }

    fn save_enrollments(&self, enrollments: &EnrollmentIndex) -> Result<()> {
        self.state.borrow_mut().enrollments = enrollments.clone();
        Ok(())
    }

    fn load_submissions(&self) -> Result<Vec<SubmissionRecord>> {
        Ok(self.state.borrow().submissions.clone())
    }

    fn save_submissions(&self, submissions: &[SubmissionRecord]) -> Result<()> {
        self.state.borrow_mut().submissions = submissions.to_vec();
        Ok(())
    }

    fn load_grades(&self) -> Result<Vec<GradeRecord>> {
        Ok(self.state.borrow().grades.clone())
    }

    fn save_grades(&self, grades: &[GradeRecord]) -> Result<()> {
        self.state.borrow_mut().grades = grades.to_vec();
        Ok(())
    }

    fn load_subject_grades(&self) -> Result<Vec<SubjectGradeRow>> {
        Ok(self.state.borrow().subject_grades.clone())
    }

    fn save_subject_grades(&self, rows: &[SubjectGradeRow]) -> Result<()> {
        self.state.borrow_mut().subject_grades = rows.to_vec();
        Ok(())
    }

    fn load_next_user_id(&self) -> Result<UserId> {
        Ok(self.state.borrow().next_user_id)
    }

    fn save_next_user_id(&self, next_id: UserId) -> Result<()> {
        self.state.borrow_mut().next_user_id = next_id;
        Ok(())
    }
}
