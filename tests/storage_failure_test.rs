use std::cell::Cell;
use std::io::{self, Cursor};
use std::rc::Rc;
use uni_records::adapters::{MemoryStore, SystemClock};
use uni_records::domain::model::{Assignment, GradeRecord, Report, SubmissionRecord, UserId};
use uni_records::domain::ports::{EnrollmentIndex, Store, SubjectGradeRow, SubjectRecord};
use uni_records::domain::user::{Role, User};
use uni_records::utils::error::ErrorCategory;
use uni_records::{Console, RecordsError, SystemSettings, UniversitySystem};

/// In-memory store whose saves start failing once the switch is flipped.
struct BrokenDisk {
    inner: MemoryStore,
    failing: Rc<Cell<bool>>,
}

impl BrokenDisk {
    fn check(&self) -> uni_records::Result<()> {
        if self.failing.get() {
            let denied = io::Error::new(io::ErrorKind::PermissionDenied, "disk is read-only");
            return Err(denied.into());
        }
        Ok(())
    }
}

impl Store for BrokenDisk {
    fn load_users(&self) -> uni_records::Result<Vec<User>> {
        self.inner.load_users()
    }
    fn save_users(&self, users: &[User]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_users(users)
    }
    fn load_subjects(&self) -> uni_records::Result<Vec<SubjectRecord>> {
        self.inner.load_subjects()
    }
    fn save_subjects(&self, subjects: &[SubjectRecord]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_subjects(subjects)
    }
    fn load_assignments(&self) -> uni_records::Result<Vec<Assignment>> {
        self.inner.load_assignments()
    }
    fn save_assignments(&self, assignments: &[Assignment]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_assignments(assignments)
    }
    fn load_reports(&self) -> uni_records::Result<Vec<Report>> {
        self.inner.load_reports()
    }
    fn save_reports(&self, reports: &[Report]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_reports(reports)
    }
    fn load_enrollments(&self) -> uni_records::Result<EnrollmentIndex> {
        self.inner.load_enrollments()
    }
    fn save_enrollments(&self, enrollments: &EnrollmentIndex) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_enrollments(enrollments)
    }
    fn load_submissions(&self) -> uni_records::Result<Vec<SubmissionRecord>> {
        self.inner.load_submissions()
    }
    fn save_submissions(&self, submissions: &[SubmissionRecord]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_submissions(submissions)
    }
    fn load_grades(&self) -> uni_records::Result<Vec<GradeRecord>> {
        self.inner.load_grades()
    }
    fn save_grades(&self, grades: &[GradeRecord]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_grades(grades)
    }
    fn load_subject_grades(&self) -> uni_records::Result<Vec<SubjectGradeRow>> {
        self.inner.load_subject_grades()
    }
    fn save_subject_grades(&self, rows: &[SubjectGradeRow]) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_subject_grades(rows)
    }
    fn load_next_user_id(&self) -> uni_records::Result<UserId> {
        self.inner.load_next_user_id()
    }
    fn save_next_user_id(&self, next_id: UserId) -> uni_records::Result<()> {
        self.check()?;
        self.inner.save_next_user_id(next_id)
    }
}

/// Ana (1) is a student, Bob (2) teaches CS101 / $100. Saves fail afterwards.
fn campus_on_broken_disk() -> anyhow::Result<UniversitySystem<BrokenDisk>> {
    let failing = Rc::new(Cell::new(false));
    let store = BrokenDisk {
        inner: MemoryStore::new(),
        failing: failing.clone(),
    };
    let mut sys =
        UniversitySystem::open(store, Box::new(SystemClock), SystemSettings::default())?;
    sys.register("Ana", "pw", Role::Student)?;
    sys.register("Bob", "pw", Role::Professor)?;
    sys.create_subject(2, "CS101", "100")?;
    failing.set(true);
    Ok(sys)
}

#[test]
fn test_failed_save_is_returned_and_memory_keeps_the_change() -> anyhow::Result<()> {
    let mut sys = campus_on_broken_disk()?;

    let err = sys.enroll(1, "$100").unwrap_err();
    assert!(matches!(err, RecordsError::IoError(_)));
    assert_eq!(err.category(), ErrorCategory::Storage);

    assert!(sys.find_subject("CS101").unwrap().is_enrolled(1));
    assert!(sys.store().inner.snapshot().enrollments.is_empty());
    Ok(())
}

#[test]
fn test_failed_save_ends_the_console_session() -> anyhow::Result<()> {
    let sys = campus_on_broken_disk()?;
    let script = "1\nAna\npw\n2\n$100\n7\n3\n";
    let mut console = Console::new(sys, Cursor::new(script.to_string()), Vec::new());

    let result = console.run();

    let err = result.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Storage);
    let (sys, output) = console.into_parts();
    let output = String::from_utf8(output)?;
    assert!(output.contains("Welcome, Ana (Student)"));
    assert!(!output.contains("Enrolled in"));
    assert!(!output.contains("Goodbye!"));
    assert!(sys.find_subject("CS101").unwrap().is_enrolled(1));
    Ok(())
}
