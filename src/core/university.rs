use crate::domain::model::{
    Assignment, GradeRecord, ItemKind, Report, Subject, SubmissionRecord, SubmissionStatus,
    UserId, DEFAULT_MAX_SCORE,
};
use crate::domain::ports::{
    Clock, EnrollmentIndex, GradeNotice, GradeObserver, Snapshot, Store, SubjectGradeRow,
    SubjectRecord,
};
use crate::domain::user::{Role, User, UserRegistry};
use crate::utils::error::{RecordsError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range};

/// Tunables of the workflow, filled from the application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSettings {
    pub code_prefix: String,
    pub default_max_score: f64,
    pub report_max_score: f64,
    pub password_salt: String,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            code_prefix: "$".to_string(),
            default_max_score: DEFAULT_MAX_SCORE,
            report_max_score: 100.0,
            password_salt: "uni-records".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    Resubmitted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TakeoverSummary {
    pub subject: String,
    pub previous_professor: UserId,
    pub students: usize,
    pub assignments: usize,
    pub reports: usize,
}

/// Owns every record of the application and enforces the enrollment,
/// submission and grading rules. Each successful mutation is followed by a
/// full save through the store.
pub struct UniversitySystem<S: Store> {
    store: S,
    clock: Box<dyn Clock>,
    settings: SystemSettings,
    users: UserRegistry,
    subjects: Vec<Subject>,
    assignments: Vec<Assignment>,
    reports: Vec<Report>,
    submissions: Vec<SubmissionRecord>,
    grades: Vec<GradeRecord>,
    observers: Vec<Box<dyn GradeObserver>>,
}

impl<S: Store> UniversitySystem<S> {
    /// Loads whatever the store holds and rebuilds the in-memory model.
    pub fn open(store: S, clock: Box<dyn Clock>, settings: SystemSettings) -> Result<Self> {
        let snapshot = store.load_snapshot()?;
        let mut system = Self {
            store,
            clock,
            users: UserRegistry::new(settings.password_salt.clone()),
            settings,
            subjects: Vec::new(),
            assignments: Vec::new(),
            reports: Vec::new(),
            submissions: Vec::new(),
            grades: Vec::new(),
            observers: Vec::new(),
        };
        system.restore(snapshot);
        tracing::info!(
            "Loaded {} users, {} subjects, {} assignments, {} reports",
            system.users.len(),
            system.subjects.len(),
            system.assignments.len(),
            system.reports.len()
        );
        Ok(system)
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.users.set_next_id(snapshot.next_user_id);
        for user in snapshot.users {
            self.users.restore(user);
        }

        for record in snapshot.subjects {
            if self.find_subject(&record.name).is_some() {
                tracing::warn!("Skipping duplicate subject '{}'", record.name);
                continue;
            }
            self.subjects
                .push(Subject::new(record.name, record.code, record.professor_id));
        }

        for assignment in snapshot.assignments {
            match self.subject_mut(&assignment.subject_name) {
                Some(subject) if !subject.has_assignment(&assignment.name) => {
                    subject.add_assignment(assignment.name.clone())
                }
                Some(_) => {}
                None => tracing::warn!(
                    "Assignment '{}' refers to unknown subject '{}'",
                    assignment.name,
                    assignment.subject_name
                ),
            }
            self.assignments.push(assignment);
        }

        for report in snapshot.reports {
            match self.subject_mut(report.subject_name()) {
                Some(subject) if !subject.has_report(report.topic()) => {
                    subject.add_report(report.topic())
                }
                Some(_) => {}
                None => tracing::warn!(
                    "Report '{}' refers to unknown subject '{}'",
                    report.topic(),
                    report.subject_name()
                ),
            }
            self.reports.push(report);
        }

        for (student_id, subject_names) in snapshot.enrollments {
            for name in subject_names {
                match self.subject_mut(&name) {
                    Some(subject) => {
                        subject.enroll(student_id);
                    }
                    None => tracing::warn!(
                        "Dropping enrollment of student {} in unknown subject '{}'",
                        student_id,
                        name
                    ),
                }
            }
        }

        self.submissions = snapshot.submissions;
        self.grades = snapshot.grades;

        for row in snapshot.subject_grades {
            let Some(subject) = self.subject_mut(&row.subject_name) else {
                tracing::warn!("Dropping grade for unknown subject '{}'", row.subject_name);
                continue;
            };
            if subject.enroll(row.student_id) {
                tracing::warn!(
                    "Student {} had grades in '{}' without enrollment; enrolled",
                    row.student_id,
                    row.subject_name
                );
            }
            match row.kind {
                ItemKind::Assignment if !subject.has_assignment(&row.item_name) => {
                    tracing::warn!(
                        "Dropping grade of student {} for undeclared assignment '{}' in '{}'",
                        row.student_id,
                        row.item_name,
                        row.subject_name
                    )
                }
                ItemKind::Assignment => {
                    subject.grade_assignment(row.student_id, &row.item_name, row.score)
                }
                ItemKind::Report => {
                    subject.grade_report(row.student_id, &row.item_name, row.score)
                }
            }
        }
    }

    /// Flat view of the whole model in the shape the store persists.
    pub fn snapshot(&self) -> Snapshot {
        let mut subject_grades = Vec::new();
        for subject in &self.subjects {
            for (kind, table) in [
                (ItemKind::Assignment, subject.assignment_grades()),
                (ItemKind::Report, subject.report_grades()),
            ] {
                for (student_id, items) in table {
                    for (item_name, score) in items {
                        subject_grades.push(SubjectGradeRow {
                            kind,
                            subject_name: subject.name().to_string(),
                            student_id: *student_id,
                            item_name: item_name.clone(),
                            score: *score,
                        });
                    }
                }
            }
        }

        Snapshot {
            next_user_id: self.users.next_id(),
            users: self.users.users().into_iter().cloned().collect(),
            subjects: self
                .subjects
                .iter()
                .map(|s| SubjectRecord {
                    name: s.name().to_string(),
                    code: s.code().to_string(),
                    professor_id: s.professor_id(),
                })
                .collect(),
            assignments: self.assignments.clone(),
            reports: self.reports.clone(),
            enrollments: self.enrollment_index(),
            submissions: self.submissions.clone(),
            grades: self.grades.clone(),
            subject_grades,
        }
    }

    /// Saves everything. In-memory changes stay applied when this fails.
    pub fn persist(&self) -> Result<()> {
        tracing::debug!("Persisting full snapshot");
        self.store.save_snapshot(&self.snapshot()).map_err(|e| {
            tracing::error!("Failed to persist records: {}", e);
            e
        })
    }

    pub fn add_observer(&mut self, observer: Box<dyn GradeObserver>) {
        self.observers.push(observer);
    }

    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn submissions(&self) -> &[SubmissionRecord] {
        &self.submissions
    }

    pub fn grades(&self) -> &[GradeRecord] {
        &self.grades
    }

    // ---- lookups ----

    pub fn find_subject(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name() == name)
    }

    fn subject_mut(&mut self, name: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| s.name() == name)
    }

    /// Resolves `$CODE` tokens by code, anything else (or an unmatched code) by name.
    pub fn find_subject_by_name_or_code(&self, identifier: &str) -> Option<&Subject> {
        self.subject_position(identifier).map(|i| &self.subjects[i])
    }

    fn subject_position(&self, identifier: &str) -> Option<usize> {
        if let Some(code) = identifier.strip_prefix(self.settings.code_prefix.as_str()) {
            if let Some(index) = self.subjects.iter().position(|s| s.code() == code) {
                return Some(index);
            }
        }
        self.subjects.iter().position(|s| s.name() == identifier)
    }

    fn resolve_subject(&self, identifier: &str) -> Result<usize> {
        self.subject_position(identifier)
            .ok_or_else(|| RecordsError::not_found("subject", identifier))
    }

    fn owned_subject(&self, professor_id: UserId, identifier: &str) -> Result<usize> {
        self.users.professor(professor_id)?;
        let index = self.resolve_subject(identifier)?;
        let subject = &self.subjects[index];
        if !subject.is_professor(professor_id) {
            return Err(RecordsError::NotSubjectOwner {
                professor_id,
                subject: subject.name().to_string(),
            });
        }
        Ok(index)
    }

    pub fn find_assignment(&self, subject_name: &str, name: &str) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|a| a.subject_name == subject_name && a.name == name)
    }

    /// Maximum score of an assignment, or the configured default when its record is missing.
    pub fn max_score_for(&self, subject_name: &str, name: &str) -> f64 {
        self.find_assignment(subject_name, name)
            .map(|a| a.max_score)
            .unwrap_or(self.settings.default_max_score)
    }

    fn report_position(&self, subject_name: &str, topic: &str) -> Option<usize> {
        self.reports
            .iter()
            .position(|r| r.subject_name() == subject_name && r.topic() == topic)
    }

    pub fn find_report(&self, subject_name: &str, topic: &str) -> Option<&Report> {
        self.report_position(subject_name, topic)
            .map(|i| &self.reports[i])
    }

    fn report_graded(&self, subject_name: &str, topic: &str) -> bool {
        self.grades.iter().any(|g| {
            g.kind == ItemKind::Report && g.subject_name == subject_name && g.item_name == topic
        })
    }

    // ---- users ----

    pub fn register(&mut self, name: &str, password: &str, role: Role) -> Result<UserId> {
        let id = self.users.register(name, password, role)?.id;
        self.persist()?;
        Ok(id)
    }

    pub fn login(&self, name: &str, password: &str) -> Result<&User> {
        let user = self.users.authenticate(name, password)?;
        tracing::info!("{} logged in as {}", user.name, user.role);
        Ok(user)
    }

    // ---- subjects ----

    pub fn create_subject(&mut self, professor_id: UserId, name: &str, code: &str) -> Result<()> {
        self.users.professor(professor_id)?;
        validate_non_empty_string("subject name", name)?;
        validate_non_empty_string("subject code", code)?;

        if let Some(existing) = self.find_subject(name) {
            return Err(RecordsError::SubjectExists {
                name: name.to_string(),
                professor_id: existing.professor_id(),
            });
        }
        self.ensure_code_free(code, None)?;

        self.subjects.push(Subject::new(name, code, professor_id));
        tracing::info!("Professor {} created subject '{}' ({})", professor_id, name, code);
        self.persist()
    }

    /// Hands an existing subject to another professor, keeping its students,
    /// items and grades.
    pub fn take_over_subject(
        &mut self,
        professor_id: UserId,
        name: &str,
        code: &str,
    ) -> Result<TakeoverSummary> {
        self.users.professor(professor_id)?;
        validate_non_empty_string("subject code", code)?;
        let index = self
            .subjects
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| RecordsError::not_found("subject", name))?;
        self.ensure_code_free(code, Some(index))?;

        let previous = self.subjects.remove(index);
        let previous_professor = previous.professor_id();
        let subject = previous.take_over(professor_id, code);
        let summary = TakeoverSummary {
            subject: subject.name().to_string(),
            previous_professor,
            students: subject.enrolled_students().len(),
            assignments: subject.assignments().len(),
            reports: subject.reports().len(),
        };
        self.subjects.insert(index, subject);

        tracing::info!(
            "Professor {} took over '{}' from professor {}",
            professor_id,
            name,
            previous_professor
        );
        self.persist()?;
        Ok(summary)
    }

    /// Codes are lookup keys, so no two subjects may share one. `keep` is the
    /// subject allowed to hold the code already.
    fn ensure_code_free(&self, code: &str, keep: Option<usize>) -> Result<()> {
        let taken = self
            .subjects
            .iter()
            .enumerate()
            .find(|(i, s)| Some(*i) != keep && s.code() == code);
        match taken {
            Some((_, existing)) => Err(RecordsError::ValidationError {
                message: format!("code '{}' is already used by '{}'", code, existing.name()),
            }),
            None => Ok(()),
        }
    }

    pub fn professor_subjects(&self, professor_id: UserId) -> Vec<&Subject> {
        self.subjects
            .iter()
            .filter(|s| s.is_professor(professor_id))
            .collect()
    }

    pub fn create_assignment(
        &mut self,
        professor_id: UserId,
        subject: &str,
        name: &str,
        max_score: Option<f64>,
    ) -> Result<f64> {
        let index = self.owned_subject(professor_id, subject)?;
        validate_non_empty_string("assignment name", name)?;
        let max_score = max_score.unwrap_or(self.settings.default_max_score);
        if !max_score.is_finite() || max_score <= 0.0 {
            return Err(RecordsError::ValidationError {
                message: format!("maximum score must be positive, got {}", max_score),
            });
        }

        let subject = &mut self.subjects[index];
        if subject.has_assignment(name) {
            return Err(RecordsError::DuplicateItem {
                kind: ItemKind::Assignment,
                subject: subject.name().to_string(),
                name: name.to_string(),
            });
        }
        subject.add_assignment(name);
        let subject_name = subject.name().to_string();
        self.assignments
            .push(Assignment::new(name, subject_name.clone(), max_score));

        tracing::info!(
            "Assignment '{}' created in '{}' (max {})",
            name,
            subject_name,
            max_score
        );
        self.persist()?;
        Ok(max_score)
    }

    pub fn create_report(
        &mut self,
        professor_id: UserId,
        subject: &str,
        topic: &str,
        max_participants: usize,
    ) -> Result<()> {
        let index = self.owned_subject(professor_id, subject)?;
        validate_non_empty_string("report topic", topic)?;
        if max_participants == 0 {
            return Err(RecordsError::ValidationError {
                message: "a report needs room for at least one participant".to_string(),
            });
        }

        let subject_name = self.subjects[index].name().to_string();
        if self.subjects[index].has_report(topic)
            || self.report_position(&subject_name, topic).is_some()
            || self.report_graded(&subject_name, topic)
        {
            return Err(RecordsError::DuplicateItem {
                kind: ItemKind::Report,
                subject: subject_name,
                name: topic.to_string(),
            });
        }

        self.subjects[index].add_report(topic);
        self.reports.push(Report::new(
            topic,
            subject_name.clone(),
            max_participants,
            self.clock.now(),
        ));

        tracing::info!(
            "Report '{}' created in '{}' for up to {} students",
            topic,
            subject_name,
            max_participants
        );
        self.persist()
    }

    // ---- enrollment ----

    pub fn enroll(&mut self, student_id: UserId, subject: &str) -> Result<()> {
        self.users.student(student_id)?;
        let index = self.resolve_subject(subject)?;
        let subject = &mut self.subjects[index];

        if !subject.enroll(student_id) {
            tracing::info!(
                "Student {} is already enrolled in '{}'",
                student_id,
                subject.name()
            );
            return Err(RecordsError::AlreadyEnrolled {
                student_id,
                subject: subject.name().to_string(),
            });
        }

        tracing::info!("Student {} enrolled in '{}'", student_id, subject.name());
        self.persist()
    }

    pub fn enroll_by_professor(
        &mut self,
        professor_id: UserId,
        student_id: UserId,
        subject: &str,
    ) -> Result<()> {
        let index = self.owned_subject(professor_id, subject)?;
        let name = self.subjects[index].name().to_string();
        self.enroll(student_id, &name)
    }

    /// student id -> enrolled subject names, derived from the subjects' rosters.
    pub fn enrollment_index(&self) -> EnrollmentIndex {
        let mut index = EnrollmentIndex::new();
        for subject in &self.subjects {
            for student_id in subject.enrolled_students() {
                index
                    .entry(student_id)
                    .or_default()
                    .push(subject.name().to_string());
            }
        }
        index
    }

    pub fn student_subjects(&self, student_id: UserId) -> Vec<&Subject> {
        self.subjects
            .iter()
            .filter(|s| s.is_enrolled(student_id))
            .collect()
    }

    pub fn subject_students(&self, subject: &str) -> Result<Vec<UserId>> {
        let index = self.resolve_subject(subject)?;
        Ok(self.subjects[index].enrolled_students())
    }

    // ---- submissions ----

    pub fn submit_assignment(
        &mut self,
        student_id: UserId,
        subject: &str,
        assignment: &str,
    ) -> Result<SubmitOutcome> {
        self.users.student(student_id)?;
        let index = self.resolve_subject(subject)?;
        let subject = &self.subjects[index];
        let subject_name = subject.name().to_string();

        if !subject.is_enrolled(student_id) {
            return Err(RecordsError::NotEnrolled {
                student_id,
                subject: subject_name,
            });
        }
        if !subject.has_assignment(assignment) {
            return Err(RecordsError::UnknownItem {
                kind: ItemKind::Assignment,
                subject: subject_name,
                name: assignment.to_string(),
            });
        }

        let existing = self
            .submissions
            .iter()
            .position(|s| s.matches(student_id, &subject_name, assignment, ItemKind::Assignment));
        let status = existing.map(|i| self.submissions[i].status);

        if status == Some(SubmissionStatus::Pending) {
            return Err(RecordsError::DuplicateSubmission {
                subject: subject_name,
                item: assignment.to_string(),
            });
        }
        if subject.student_assignment_grade(student_id, assignment) >= 0.0
            || status == Some(SubmissionStatus::Approved)
        {
            return Err(RecordsError::AlreadyGraded {
                subject: subject_name,
                item: assignment.to_string(),
            });
        }

        let now = self.clock.now();
        let outcome = match existing {
            Some(i) => {
                let record = &mut self.submissions[i];
                record.status = SubmissionStatus::Pending;
                record.timestamp = now;
                SubmitOutcome::Resubmitted
            }
            None => {
                self.submissions.push(SubmissionRecord {
                    student_id,
                    subject_name: subject_name.clone(),
                    item_name: assignment.to_string(),
                    kind: ItemKind::Assignment,
                    status: SubmissionStatus::Pending,
                    timestamp: now,
                });
                SubmitOutcome::Submitted
            }
        };

        tracing::info!(
            "Student {} submitted '{}' in '{}' ({:?})",
            student_id,
            assignment,
            subject_name,
            outcome
        );
        self.persist()?;
        Ok(outcome)
    }

    /// Pending submissions in subjects taught by `professor_id`, oldest first.
    pub fn pending_submissions(&self, professor_id: UserId) -> Vec<&SubmissionRecord> {
        self.submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .filter(|s| {
                self.find_subject(&s.subject_name)
                    .is_some_and(|subject| subject.is_professor(professor_id))
            })
            .collect()
    }

    pub fn reject_submission(
        &mut self,
        professor_id: UserId,
        student_id: UserId,
        subject: &str,
        assignment: &str,
    ) -> Result<()> {
        let index = self.owned_subject(professor_id, subject)?;
        let subject_name = self.subjects[index].name().to_string();

        let record = self
            .submissions
            .iter_mut()
            .find(|s| {
                s.matches(student_id, &subject_name, assignment, ItemKind::Assignment)
                    && s.status == SubmissionStatus::Pending
            })
            .ok_or_else(|| RecordsError::NoPendingSubmission {
                student_id,
                subject: subject_name.clone(),
                item: assignment.to_string(),
            })?;
        record.status = SubmissionStatus::Rejected;

        tracing::info!(
            "Submission of '{}' by student {} in '{}' rejected",
            assignment,
            student_id,
            subject_name
        );
        self.persist()
    }

    // ---- grading ----

    pub fn grade_assignment(
        &mut self,
        student_id: UserId,
        subject: &str,
        assignment: &str,
        score: f64,
    ) -> Result<()> {
        let index = self.resolve_subject(subject)?;
        let subject_name = self.subjects[index].name().to_string();
        let subject = &self.subjects[index];

        if !subject.is_enrolled(student_id) {
            return Err(RecordsError::NotEnrolled {
                student_id,
                subject: subject_name,
            });
        }
        if !subject.has_assignment(assignment) {
            return Err(RecordsError::UnknownItem {
                kind: ItemKind::Assignment,
                subject: subject_name,
                name: assignment.to_string(),
            });
        }
        let max_score = self.max_score_for(&subject_name, assignment);
        validate_score(score, max_score)?;
        if subject.student_assignment_grade(student_id, assignment) >= 0.0 {
            return Err(RecordsError::AlreadyGraded {
                subject: subject_name,
                item: assignment.to_string(),
            });
        }

        let now = self.clock.now();
        match self
            .submissions
            .iter_mut()
            .find(|s| s.matches(student_id, &subject_name, assignment, ItemKind::Assignment))
        {
            Some(record) => record.status = SubmissionStatus::Approved,
            None => self.submissions.push(SubmissionRecord {
                student_id,
                subject_name: subject_name.clone(),
                item_name: assignment.to_string(),
                kind: ItemKind::Assignment,
                status: SubmissionStatus::Approved,
                timestamp: now,
            }),
        }

        self.subjects[index].grade_assignment(student_id, assignment, score);
        self.grades.push(GradeRecord {
            student_id,
            subject_name: subject_name.clone(),
            item_name: assignment.to_string(),
            kind: ItemKind::Assignment,
            score,
            timestamp: now,
        });

        tracing::info!(
            "Graded '{}' in '{}' for student {}: {:.2}/{:.1}",
            assignment,
            subject_name,
            student_id,
            score,
            max_score
        );
        self.notify(student_id, &subject_name, assignment, ItemKind::Assignment, score);
        self.persist()
    }

    /// Ownership-checked variant used by the professor menu.
    pub fn grade_assignment_by_professor(
        &mut self,
        professor_id: UserId,
        student_id: UserId,
        subject: &str,
        assignment: &str,
        score: f64,
    ) -> Result<()> {
        let index = self.owned_subject(professor_id, subject)?;
        let name = self.subjects[index].name().to_string();
        self.grade_assignment(student_id, &name, assignment, score)
    }

    /// Grades every signed-up, enrolled participant with the same score and
    /// removes the report. Returns how many students were graded.
    pub fn grade_report(&mut self, subject: &str, topic: &str, score: f64) -> Result<usize> {
        let index = self.resolve_subject(subject)?;
        let subject_name = self.subjects[index].name().to_string();

        let report_index = self
            .report_position(&subject_name, topic)
            .filter(|_| self.subjects[index].has_report(topic))
            .ok_or_else(|| RecordsError::not_found("report", topic))?;
        validate_score(score, self.settings.report_max_score)?;
        if self.report_graded(&subject_name, topic) {
            return Err(RecordsError::AlreadyGraded {
                subject: subject_name,
                item: topic.to_string(),
            });
        }

        let participants = self.reports[report_index].signed_up_students();
        if participants.is_empty() {
            return Err(RecordsError::EmptyRoster {
                topic: topic.to_string(),
            });
        }

        let subject = &mut self.subjects[index];
        subject.grade_all_reports(topic, score, &participants);
        let graded: Vec<UserId> = participants
            .into_iter()
            .filter(|id| subject.is_enrolled(*id))
            .collect();

        let now = self.clock.now();
        for student_id in &graded {
            self.grades.push(GradeRecord {
                student_id: *student_id,
                subject_name: subject_name.clone(),
                item_name: topic.to_string(),
                kind: ItemKind::Report,
                score,
                timestamp: now,
            });
        }
        for student_id in &graded {
            self.notify(*student_id, &subject_name, topic, ItemKind::Report, score);
        }

        let mut report = self.reports.remove(report_index);
        report.mark_completed();
        self.subjects[index].remove_report(topic);

        tracing::info!(
            "Report '{}' in '{}' graded {:.2} for {} students and closed",
            topic,
            subject_name,
            score,
            graded.len()
        );
        self.persist()?;
        Ok(graded.len())
    }

    pub fn grade_report_by_professor(
        &mut self,
        professor_id: UserId,
        subject: &str,
        topic: &str,
        score: f64,
    ) -> Result<usize> {
        let index = self.owned_subject(professor_id, subject)?;
        let name = self.subjects[index].name().to_string();
        self.grade_report(&name, topic, score)
    }

    /// Open reports of subjects taught by `professor_id` that have no grades yet.
    pub fn gradable_reports(&self, professor_id: UserId) -> Vec<&Report> {
        self.reports
            .iter()
            .filter(|r| !r.is_completed())
            .filter(|r| {
                self.find_subject(r.subject_name())
                    .is_some_and(|s| s.is_professor(professor_id))
            })
            .filter(|r| !self.report_graded(r.subject_name(), r.topic()))
            .collect()
    }

    fn notify(
        &mut self,
        student_id: UserId,
        subject: &str,
        item: &str,
        kind: ItemKind,
        score: f64,
    ) {
        let Some(student) = self.users.by_id(student_id) else {
            return;
        };
        let notice = GradeNotice {
            student_id,
            student_name: student.name.clone(),
            subject_name: subject.to_string(),
            item_name: item.to_string(),
            kind,
            score,
        };
        for observer in self.observers.iter_mut() {
            observer.grade_updated(&notice);
        }
    }

    // ---- report sign-up ----

    pub fn sign_up_for_report(
        &mut self,
        student_id: UserId,
        subject: &str,
        topic: &str,
    ) -> Result<()> {
        self.users.student(student_id)?;
        let index = self.resolve_subject(subject)?;
        let subject_name = self.subjects[index].name().to_string();
        if !self.subjects[index].is_enrolled(student_id) {
            return Err(RecordsError::NotEnrolled {
                student_id,
                subject: subject_name,
            });
        }

        let report_index = self
            .report_position(&subject_name, topic)
            .ok_or_else(|| RecordsError::not_found("report", topic))?;
        let report = &mut self.reports[report_index];
        let topic = topic.to_string();
        if report.is_completed() {
            return Err(RecordsError::ReportCompleted { topic });
        }
        if report.has_student(student_id) {
            return Err(RecordsError::AlreadySignedUp { student_id, topic });
        }
        if !report.add_student(student_id) {
            return Err(RecordsError::ReportFull { topic });
        }

        tracing::info!("Student {} signed up for '{}' in '{}'", student_id, topic, subject_name);
        self.persist()
    }

    pub fn withdraw_from_report(
        &mut self,
        student_id: UserId,
        subject: &str,
        topic: &str,
    ) -> Result<()> {
        let index = self.resolve_subject(subject)?;
        let subject_name = self.subjects[index].name().to_string();
        let report_index = self
            .report_position(&subject_name, topic)
            .ok_or_else(|| RecordsError::not_found("report", topic))?;
        let report = &mut self.reports[report_index];

        if !report.remove_student(student_id) {
            return Err(RecordsError::NotSignedUp {
                student_id,
                topic: topic.to_string(),
            });
        }

        tracing::info!(
            "Student {} withdrew from '{}' in '{}'",
            student_id,
            topic,
            subject_name
        );
        self.persist()
    }

    /// Reports in the student's subjects with a free seat the student has not taken.
    pub fn available_reports(&self, student_id: UserId) -> Vec<&Report> {
        self.reports
            .iter()
            .filter(|r| !r.is_full() && !r.is_completed() && !r.has_student(student_id))
            .filter(|r| {
                self.find_subject(r.subject_name())
                    .is_some_and(|s| s.is_enrolled(student_id))
            })
            .collect()
    }

    pub fn student_reports(&self, student_id: UserId) -> Vec<&Report> {
        self.reports
            .iter()
            .filter(|r| r.has_student(student_id))
            .collect()
    }
}

fn validate_score(score: f64, max: f64) -> Result<()> {
    if score.is_nan() || validate_range("score", score, 0.0, max).is_err() {
        return Err(RecordsError::ScoreOutOfRange { score, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::{ManualClock, SystemClock};
    use chrono::NaiveDate;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn system() -> UniversitySystem<MemoryStore> {
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 9, 2)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        );
        UniversitySystem::open(MemoryStore::new(), Box::new(clock), SystemSettings::default())
            .unwrap()
    }

    /// Ana (1, student), Bob (2, professor), CS101/$100 with HW1 max 50, Ana enrolled.
    fn seeded() -> UniversitySystem<MemoryStore> {
        let mut sys = system();
        sys.register("Ana", "pw", Role::Student).unwrap();
        sys.register("Bob", "pw", Role::Professor).unwrap();
        sys.create_subject(2, "CS101", "100").unwrap();
        sys.enroll(1, "$100").unwrap();
        sys.create_assignment(2, "CS101", "HW1", Some(50.0)).unwrap();
        sys
    }

    struct Recorder(Rc<RefCell<Vec<GradeNotice>>>);

    impl GradeObserver for Recorder {
        fn grade_updated(&mut self, notice: &GradeNotice) {
            self.0.borrow_mut().push(notice.clone());
        }
    }

    #[test]
    fn test_enroll_twice_keeps_one_entry() {
        let mut sys = seeded();
        let err = sys.enroll(1, "CS101").unwrap_err();
        assert!(matches!(err, RecordsError::AlreadyEnrolled { .. }));
        assert_eq!(sys.enrollment_index()[&1], vec!["CS101".to_string()]);
        assert_eq!(sys.subject_students("CS101").unwrap(), vec![1]);
    }

    #[test]
    fn test_enroll_unknown_subject_or_professor() {
        let mut sys = seeded();
        assert!(matches!(sys.enroll(1, "$999"), Err(RecordsError::NotFound { .. })));
        assert!(matches!(sys.enroll(2, "CS101"), Err(RecordsError::NotFound { .. })));
    }

    #[test]
    fn test_code_prefix_falls_back_to_name() {
        let mut sys = seeded();
        sys.create_subject(2, "$odd", "7").unwrap();
        assert_eq!(sys.find_subject_by_name_or_code("$7").unwrap().name(), "$odd");
        assert_eq!(sys.find_subject_by_name_or_code("$odd").unwrap().name(), "$odd");
        assert!(sys.find_subject_by_name_or_code("100").is_none());
    }

    #[test]
    fn test_submit_then_grade_flow() {
        let mut sys = seeded();
        let notices = Rc::new(RefCell::new(Vec::new()));
        sys.add_observer(Box::new(Recorder(notices.clone())));

        assert_eq!(sys.submit_assignment(1, "CS101", "HW1").unwrap(), SubmitOutcome::Submitted);
        assert_eq!(sys.submissions()[0].status, SubmissionStatus::Pending);

        sys.grade_assignment(1, "CS101", "HW1", 45.0).unwrap();

        let subject = sys.find_subject("CS101").unwrap();
        assert_eq!(subject.student_assignment_grade(1, "HW1"), 45.0);
        assert_eq!(sys.submissions()[0].status, SubmissionStatus::Approved);
        assert_eq!(sys.grades().len(), 1);
        assert_eq!(notices.borrow().len(), 1);
        assert_eq!(notices.borrow()[0].student_name, "Ana");

        let err = sys.grade_assignment(1, "CS101", "HW1", 10.0).unwrap_err();
        assert!(matches!(err, RecordsError::AlreadyGraded { .. }));
        assert_eq!(sys.find_subject("CS101").unwrap().assignment_grade(1, "HW1"), Some(45.0));
        assert_eq!(sys.grades().len(), 1);
    }

    #[test]
    fn test_duplicate_pending_submission_fails() {
        let mut sys = seeded();
        sys.submit_assignment(1, "CS101", "HW1").unwrap();
        let err = sys.submit_assignment(1, "CS101", "HW1").unwrap_err();
        assert!(matches!(err, RecordsError::DuplicateSubmission { .. }));
        assert_eq!(sys.submissions().len(), 1);
    }

    #[test]
    fn test_submission_preconditions() {
        let mut sys = seeded();
        sys.register("Carl", "pw", Role::Student).unwrap();
        assert!(matches!(
            sys.submit_assignment(3, "CS101", "HW1"),
            Err(RecordsError::NotEnrolled { .. })
        ));
        assert!(matches!(
            sys.submit_assignment(1, "CS101", "HW9"),
            Err(RecordsError::UnknownItem { .. })
        ));
    }

    #[test]
    fn test_graded_without_submission_blocks_submit() {
        let mut sys = seeded();
        sys.grade_assignment(1, "CS101", "HW1", 30.0).unwrap();
        assert_eq!(sys.submissions().len(), 1);
        assert_eq!(sys.submissions()[0].status, SubmissionStatus::Approved);

        let err = sys.submit_assignment(1, "CS101", "HW1").unwrap_err();
        assert!(matches!(err, RecordsError::AlreadyGraded { .. }));
    }

    #[test]
    fn test_reject_then_resubmit_reuses_row() {
        let mut sys = seeded();
        sys.submit_assignment(1, "CS101", "HW1").unwrap();
        sys.reject_submission(2, 1, "CS101", "HW1").unwrap();
        assert_eq!(sys.submissions()[0].status, SubmissionStatus::Rejected);
        assert!(sys.pending_submissions(2).is_empty());

        assert_eq!(
            sys.submit_assignment(1, "$100", "HW1").unwrap(),
            SubmitOutcome::Resubmitted
        );
        assert_eq!(sys.submissions().len(), 1);
        assert_eq!(sys.pending_submissions(2).len(), 1);
    }

    #[test]
    fn test_reject_requires_pending() {
        let mut sys = seeded();
        assert!(matches!(
            sys.reject_submission(2, 1, "CS101", "HW1"),
            Err(RecordsError::NoPendingSubmission { .. })
        ));
    }

    #[test]
    fn test_grade_assignment_score_range() {
        let mut sys = seeded();
        for score in [-1.0, 50.5, f64::NAN] {
            assert!(matches!(
                sys.grade_assignment(1, "CS101", "HW1", score),
                Err(RecordsError::ScoreOutOfRange { .. })
            ));
        }
        sys.grade_assignment(1, "CS101", "HW1", 50.0).unwrap();
    }

    #[test]
    fn test_only_owner_may_change_subject() {
        let mut sys = seeded();
        sys.register("Eve", "pw", Role::Professor).unwrap();
        assert!(matches!(
            sys.create_assignment(3, "CS101", "HW2", None),
            Err(RecordsError::NotSubjectOwner { .. })
        ));
        assert!(matches!(
            sys.grade_assignment_by_professor(3, 1, "CS101", "HW1", 10.0),
            Err(RecordsError::NotSubjectOwner { .. })
        ));
    }

    #[test]
    fn test_create_subject_collision_and_take_over() {
        let mut sys = seeded();
        sys.register("Eve", "pw", Role::Professor).unwrap();
        sys.grade_assignment(1, "CS101", "HW1", 40.0).unwrap();

        let err = sys.create_subject(3, "CS101", "300").unwrap_err();
        assert!(matches!(err, RecordsError::SubjectExists { professor_id: 2, .. }));

        let summary = sys.take_over_subject(3, "CS101", "300").unwrap();
        assert_eq!(summary.previous_professor, 2);
        assert_eq!((summary.students, summary.assignments, summary.reports), (1, 1, 0));

        let subject = sys.find_subject_by_name_or_code("$300").unwrap();
        assert!(subject.is_professor(3));
        assert_eq!(subject.assignment_grade(1, "HW1"), Some(40.0));
        assert_eq!(sys.subjects().len(), 1);
    }

    #[test]
    fn test_duplicate_assignment_rejected() {
        let mut sys = seeded();
        assert!(matches!(
            sys.create_assignment(2, "CS101", "HW1", None),
            Err(RecordsError::DuplicateItem { .. })
        ));
        assert_eq!(sys.create_assignment(2, "CS101", "HW2", None).unwrap(), 100.0);
        assert!(sys.create_assignment(2, "CS101", "HW3", Some(0.0)).is_err());
    }

    #[test]
    fn test_report_signup_and_grading_consumes_report() {
        let mut sys = seeded();
        sys.register("Carl", "pw", Role::Student).unwrap();
        sys.enroll(3, "CS101").unwrap();
        sys.create_report(2, "CS101", "Topic A", 1).unwrap();

        sys.sign_up_for_report(1, "CS101", "Topic A").unwrap();
        assert!(matches!(
            sys.sign_up_for_report(3, "CS101", "Topic A"),
            Err(RecordsError::ReportFull { .. })
        ));
        assert!(sys.available_reports(3).is_empty());

        assert_eq!(sys.grade_report("CS101", "Topic A", 90.0).unwrap(), 1);

        let subject = sys.find_subject("CS101").unwrap();
        assert_eq!(subject.report_grade(1, "Topic A"), Some(90.0));
        assert!(subject.report_grade(3, "Topic A").is_none());
        assert!(!subject.has_report("Topic A"));
        assert!(sys.reports().is_empty());
        assert_eq!(
            sys.grades().iter().filter(|g| g.kind == ItemKind::Report).count(),
            1
        );
        assert!(matches!(
            sys.grade_report("CS101", "Topic A", 90.0),
            Err(RecordsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_grade_report_with_empty_roster_keeps_report() {
        let mut sys = seeded();
        sys.create_report(2, "CS101", "Topic B", 3).unwrap();
        assert!(matches!(
            sys.grade_report("CS101", "Topic B", 80.0),
            Err(RecordsError::EmptyRoster { .. })
        ));
        assert_eq!(sys.reports().len(), 1);
        assert_eq!(sys.gradable_reports(2).len(), 1);
    }

    #[test]
    fn test_grade_report_score_range() {
        let mut sys = seeded();
        sys.create_report(2, "CS101", "Topic C", 2).unwrap();
        sys.sign_up_for_report(1, "CS101", "Topic C").unwrap();
        assert!(matches!(
            sys.grade_report("CS101", "Topic C", 101.0),
            Err(RecordsError::ScoreOutOfRange { .. })
        ));
        assert_eq!(sys.reports().len(), 1);
    }

    #[test]
    fn test_withdraw_from_report() {
        let mut sys = seeded();
        sys.create_report(2, "CS101", "Topic A", 2).unwrap();
        sys.sign_up_for_report(1, "CS101", "Topic A").unwrap();
        assert!(matches!(
            sys.sign_up_for_report(1, "CS101", "Topic A"),
            Err(RecordsError::AlreadySignedUp { .. })
        ));
        sys.withdraw_from_report(1, "$100", "Topic A").unwrap();
        assert!(matches!(
            sys.withdraw_from_report(1, "CS101", "Topic A"),
            Err(RecordsError::NotSignedUp { .. })
        ));
        assert_eq!(sys.available_reports(1).len(), 1);
    }

    #[test]
    fn test_withdraw_targets_the_named_subject() {
        let mut sys = seeded();
        sys.create_subject(2, "Math", "200").unwrap();
        sys.enroll(1, "Math").unwrap();
        sys.create_report(2, "CS101", "Topic A", 2).unwrap();
        sys.create_report(2, "Math", "Topic A", 2).unwrap();
        sys.sign_up_for_report(1, "Math", "Topic A").unwrap();

        sys.withdraw_from_report(1, "Math", "Topic A").unwrap();

        assert!(!sys.find_report("Math", "Topic A").unwrap().has_student(1));
        assert!(matches!(
            sys.withdraw_from_report(1, "CS101", "Topic A"),
            Err(RecordsError::NotSignedUp { .. })
        ));
        assert!(matches!(
            sys.withdraw_from_report(1, "Math", "Topic B"),
            Err(RecordsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_take_over_cannot_reuse_another_subjects_code() {
        let mut sys = seeded();
        sys.register("Eve", "pw", Role::Professor).unwrap();
        sys.create_subject(2, "Math", "200").unwrap();

        let err = sys.take_over_subject(3, "Math", "100").unwrap_err();
        assert!(matches!(err, RecordsError::ValidationError { .. }));
        assert!(sys.find_subject("Math").unwrap().is_professor(2));
        assert_eq!(sys.find_subject_by_name_or_code("$200").unwrap().name(), "Math");
        assert_eq!(sys.find_subject_by_name_or_code("$100").unwrap().name(), "CS101");

        sys.take_over_subject(3, "Math", "200").unwrap();
        assert!(sys.find_subject("Math").unwrap().is_professor(3));
    }

    #[test]
    fn test_restore_skips_grades_for_undeclared_assignments() {
        let mut sys = seeded();
        sys.grade_assignment(1, "CS101", "HW1", 30.0).unwrap();
        let mut snapshot = sys.snapshot();
        let mut stray = snapshot.subject_grades[0].clone();
        stray.item_name = "HW9".to_string();
        snapshot.subject_grades.push(stray);

        let mut reopened = UniversitySystem::open(
            MemoryStore::new(),
            Box::new(SystemClock),
            SystemSettings::default(),
        )
        .unwrap();
        reopened.restore(snapshot);

        let subject = reopened.find_subject("CS101").unwrap();
        assert_eq!(subject.assignment_grade(1, "HW1"), Some(30.0));
        assert!(subject.assignment_grade(1, "HW9").is_none());
    }

    #[test]
    fn test_every_mutation_persists() {
        let mut sys = seeded();
        sys.submit_assignment(1, "CS101", "HW1").unwrap();
        let stored = sys.store().snapshot();
        assert_eq!(stored.submissions.len(), 1);
        assert_eq!(stored.enrollments[&1], vec!["CS101".to_string()]);
        assert_eq!(stored.next_user_id, 3);
    }
}
