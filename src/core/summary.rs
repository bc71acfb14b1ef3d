use crate::core::university::UniversitySystem;
use crate::domain::model::{ItemKind, SubmissionStatus, UserId};
use crate::domain::ports::Store;
use crate::utils::error::{RecordsError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectStatistics {
    pub subject: String,
    pub code: String,
    pub enrolled: usize,
    pub submitted: usize,
    pub pending: usize,
    pub graded: usize,
    pub total: f64,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeLine {
    pub kind: ItemKind,
    pub item: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGrades {
    pub student_id: UserId,
    pub student_name: Option<String>,
    pub lines: Vec<GradeLine>,
}

impl StudentGrades {
    pub fn total(&self) -> f64 {
        self.lines.iter().map(|l| l.score).sum()
    }

    pub fn average(&self) -> Option<f64> {
        average(self.total(), self.lines.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReport {
    pub subject: String,
    pub code: String,
    pub professor_id: UserId,
    pub students: Vec<StudentGrades>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub subject: String,
    pub code: String,
    pub grades: StudentGrades,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub student_id: UserId,
    pub student_name: String,
    pub subjects: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn grade_count(&self) -> usize {
        self.subjects.iter().map(|s| s.grades.lines.len()).sum()
    }

    pub fn total(&self) -> f64 {
        self.subjects.iter().map(|s| s.grades.total()).sum()
    }

    /// Mean over every individual grade, not over subject averages.
    pub fn average(&self) -> Option<f64> {
        average(self.total(), self.grade_count())
    }
}

fn average(total: f64, count: usize) -> Option<f64> {
    (count > 0).then(|| total / count as f64)
}

impl<S: Store> UniversitySystem<S> {
    fn student_grades(&self, subject: &str, student_id: UserId) -> StudentGrades {
        let lines = self
            .find_subject(subject)
            .map(|s| s.grades_for(student_id))
            .unwrap_or_default()
            .into_iter()
            .map(|(kind, item, score)| GradeLine { kind, item, score })
            .collect();

        StudentGrades {
            student_id,
            student_name: self.users().by_id(student_id).map(|u| u.name.clone()),
            lines,
        }
    }

    pub fn subject_statistics(&self, subject: &str) -> Result<SubjectStatistics> {
        let subject = self
            .find_subject_by_name_or_code(subject)
            .ok_or_else(|| RecordsError::not_found("subject", subject))?;
        let name = subject.name();

        let submitted = self
            .submissions()
            .iter()
            .filter(|s| s.subject_name == name && s.kind == ItemKind::Assignment)
            .count();
        let pending = self
            .submissions()
            .iter()
            .filter(|s| s.subject_name == name && s.status == SubmissionStatus::Pending)
            .count();
        let scores: Vec<f64> = self
            .grades()
            .iter()
            .filter(|g| g.subject_name == name)
            .map(|g| g.score)
            .collect();
        let total: f64 = scores.iter().sum();

        Ok(SubjectStatistics {
            subject: name.to_string(),
            code: subject.code().to_string(),
            enrolled: subject.enrolled_students().len(),
            submitted,
            pending,
            graded: scores.len(),
            total,
            average: average(total, scores.len()),
        })
    }

    pub fn final_report(&self, subject: &str) -> Result<FinalReport> {
        let subject = self
            .find_subject_by_name_or_code(subject)
            .ok_or_else(|| RecordsError::not_found("subject", subject))?;

        Ok(FinalReport {
            subject: subject.name().to_string(),
            code: subject.code().to_string(),
            professor_id: subject.professor_id(),
            students: subject
                .enrolled_students()
                .into_iter()
                .map(|id| self.student_grades(subject.name(), id))
                .collect(),
        })
    }

    pub fn student_transcript(&self, student_id: UserId) -> Result<Transcript> {
        let student = self.users().student(student_id)?;

        Ok(Transcript {
            student_id,
            student_name: student.name.clone(),
            subjects: self
                .student_subjects(student_id)
                .into_iter()
                .map(|s| TranscriptEntry {
                    subject: s.name().to_string(),
                    code: s.code().to_string(),
                    grades: self.student_grades(s.name(), student_id),
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::SystemClock;
    use crate::core::university::{SystemSettings, UniversitySystem};
    use crate::domain::user::Role;

    fn graded_system() -> UniversitySystem<MemoryStore> {
        let mut sys = UniversitySystem::open(
            MemoryStore::new(),
            Box::new(SystemClock),
            SystemSettings::default(),
        )
        .unwrap();
        sys.register("Ana", "pw", Role::Student).unwrap();
        sys.register("Bob", "pw", Role::Professor).unwrap();
        sys.register("Carl", "pw", Role::Student).unwrap();
        sys.create_subject(2, "CS101", "100").unwrap();
        sys.enroll(1, "CS101").unwrap();
        sys.enroll(3, "CS101").unwrap();
        sys.create_assignment(2, "CS101", "HW1", Some(50.0)).unwrap();
        sys.create_assignment(2, "CS101", "HW2", None).unwrap();
        sys.create_report(2, "CS101", "Topic A", 2).unwrap();
        sys.submit_assignment(3, "CS101", "HW2").unwrap();
        sys.grade_assignment(1, "CS101", "HW1", 40.0).unwrap();
        sys.grade_assignment(1, "CS101", "HW2", 80.0).unwrap();
        sys.sign_up_for_report(1, "CS101", "Topic A").unwrap();
        sys.grade_report("CS101", "Topic A", 90.0).unwrap();
        sys
    }

    #[test]
    fn test_subject_statistics() {
        let sys = graded_system();
        let stats = sys.subject_statistics("$100").unwrap();
        assert_eq!(stats.enrolled, 2);
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.graded, 3);
        assert_eq!(stats.total, 210.0);
        assert_eq!(stats.average, Some(70.0));
    }

    #[test]
    fn test_final_report_lists_every_enrolled_student() {
        let sys = graded_system();
        let report = sys.final_report("CS101").unwrap();
        assert_eq!(report.students.len(), 2);

        let ana = &report.students[0];
        assert_eq!(ana.student_name.as_deref(), Some("Ana"));
        assert_eq!(ana.lines.len(), 3);
        assert_eq!(ana.total(), 210.0);
        assert_eq!(ana.average(), Some(70.0));

        let carl = &report.students[1];
        assert!(carl.lines.is_empty());
        assert_eq!(carl.average(), None);
    }

    #[test]
    fn test_student_transcript() {
        let sys = graded_system();
        let transcript = sys.student_transcript(1).unwrap();
        assert_eq!(transcript.subjects.len(), 1);
        assert_eq!(transcript.grade_count(), 3);
        assert_eq!(transcript.average(), Some(70.0));
        assert!(sys.student_transcript(2).is_err());
    }
}
