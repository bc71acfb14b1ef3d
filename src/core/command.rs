use crate::core::university::{SubmitOutcome, TakeoverSummary, UniversitySystem};
use crate::domain::model::UserId;
use crate::domain::ports::Store;
use crate::domain::user::{Role, User};
use crate::utils::error::{RecordsError, Result};

/// Who is issuing commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<(UserId, String, Role)>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            user: Some((user.id, user.name.clone(), user.role)),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|(id, _, _)| *id)
    }

    pub fn name(&self) -> Option<&str> {
        self.user.as_ref().map(|(_, name, _)| name.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|(_, _, role)| *role)
    }

    fn describe(&self) -> String {
        match &self.user {
            Some((id, name, role)) => format!("{} {} (ID: {})", role, name, id),
            None => "anonymous user".to_string(),
        }
    }
}

/// A mutating request against the records.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register {
        name: String,
        password: String,
        role: Role,
    },
    Login {
        name: String,
        password: String,
    },
    CreateSubject {
        name: String,
        code: String,
    },
    TakeOverSubject {
        name: String,
        code: String,
    },
    CreateAssignment {
        subject: String,
        name: String,
        max_score: Option<f64>,
    },
    CreateReport {
        subject: String,
        topic: String,
        max_participants: usize,
    },
    EnrollStudent {
        student_id: UserId,
        subject: String,
    },
    GradeAssignment {
        student_id: UserId,
        subject: String,
        assignment: String,
        score: f64,
    },
    RejectSubmission {
        student_id: UserId,
        subject: String,
        assignment: String,
    },
    GradeReport {
        subject: String,
        topic: String,
        score: f64,
    },
    Enroll {
        subject: String,
    },
    SubmitAssignment {
        subject: String,
        assignment: String,
    },
    SignUpForReport {
        subject: String,
        topic: String,
    },
    WithdrawFromReport {
        subject: String,
        topic: String,
    },
}

impl Command {
    /// Role allowed to run the command; `None` means logged-out users only.
    pub fn required_role(&self) -> Option<Role> {
        use Command::*;
        match self {
            Register { .. } | Login { .. } => None,
            CreateSubject { .. }
            | TakeOverSubject { .. }
            | CreateAssignment { .. }
            | CreateReport { .. }
            | EnrollStudent { .. }
            | GradeAssignment { .. }
            | RejectSubmission { .. }
            | GradeReport { .. } => Some(Role::Professor),
            Enroll { .. }
            | SubmitAssignment { .. }
            | SignUpForReport { .. }
            | WithdrawFromReport { .. } => Some(Role::Student),
        }
    }

    pub fn action(&self) -> &'static str {
        use Command::*;
        match self {
            Register { .. } => "register",
            Login { .. } => "log in",
            CreateSubject { .. } => "create subjects",
            TakeOverSubject { .. } => "take over subjects",
            CreateAssignment { .. } => "create assignments",
            CreateReport { .. } => "create reports",
            EnrollStudent { .. } => "enroll students",
            GradeAssignment { .. } => "grade assignments",
            RejectSubmission { .. } => "reject submissions",
            GradeReport { .. } => "grade reports",
            Enroll { .. } => "enroll in subjects",
            SubmitAssignment { .. } => "submit assignments",
            SignUpForReport { .. } => "sign up for reports",
            WithdrawFromReport { .. } => "withdraw from reports",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Registered { user_id: UserId },
    LoggedIn(Session),
    SubjectCreated { name: String },
    SubjectTakenOver(TakeoverSummary),
    AssignmentCreated { name: String, max_score: f64 },
    ReportCreated { topic: String },
    Enrolled { student_id: UserId, subject: String },
    Graded { student_id: UserId, item: String, score: f64 },
    SubmissionRejected { student_id: UserId, item: String },
    ReportGraded { topic: String, graded: usize },
    Submitted(SubmitOutcome),
    SignedUp { topic: String },
    Withdrawn { topic: String },
}

impl<S: Store> UniversitySystem<S> {
    /// Runs one command on behalf of `session` after checking its role.
    pub fn execute(&mut self, session: &Session, command: Command) -> Result<Outcome> {
        if session.role() != command.required_role() {
            tracing::warn!("{} tried to {}", session.describe(), command.action());
            return Err(RecordsError::PermissionDenied {
                actor: session.describe(),
                action: command.action().to_string(),
            });
        }
        let actor = session.user_id().unwrap_or_default();
        tracing::debug!("{} is allowed to {}", session.describe(), command.action());

        use Command::*;
        let outcome = match command {
            Register {
                name,
                password,
                role,
            } => Outcome::Registered {
                user_id: self.register(&name, &password, role)?,
            },
            Login { name, password } => {
                Outcome::LoggedIn(Session::for_user(self.login(&name, &password)?))
            }
            CreateSubject { name, code } => {
                self.create_subject(actor, &name, &code)?;
                Outcome::SubjectCreated { name }
            }
            TakeOverSubject { name, code } => {
                Outcome::SubjectTakenOver(self.take_over_subject(actor, &name, &code)?)
            }
            CreateAssignment {
                subject,
                name,
                max_score,
            } => {
                let max_score = self.create_assignment(actor, &subject, &name, max_score)?;
                Outcome::AssignmentCreated { name, max_score }
            }
            CreateReport {
                subject,
                topic,
                max_participants,
            } => {
                self.create_report(actor, &subject, &topic, max_participants)?;
                Outcome::ReportCreated { topic }
            }
            EnrollStudent {
                student_id,
                subject,
            } => {
                self.enroll_by_professor(actor, student_id, &subject)?;
                Outcome::Enrolled {
                    student_id,
                    subject: self.subject_display_name(subject),
                }
            }
            GradeAssignment {
                student_id,
                subject,
                assignment,
                score,
            } => {
                self.grade_assignment_by_professor(
                    actor,
                    student_id,
                    &subject,
                    &assignment,
                    score,
                )?;
                Outcome::Graded {
                    student_id,
                    item: assignment,
                    score,
                }
            }
            RejectSubmission {
                student_id,
                subject,
                assignment,
            } => {
                self.reject_submission(actor, student_id, &subject, &assignment)?;
                Outcome::SubmissionRejected {
                    student_id,
                    item: assignment,
                }
            }
            GradeReport {
                subject,
                topic,
                score,
            } => {
                let graded = self.grade_report_by_professor(actor, &subject, &topic, score)?;
                Outcome::ReportGraded { topic, graded }
            }
            Enroll { subject } => {
                self.enroll(actor, &subject)?;
                Outcome::Enrolled {
                    student_id: actor,
                    subject: self.subject_display_name(subject),
                }
            }
            SubmitAssignment {
                subject,
                assignment,
            } => Outcome::Submitted(self.submit_assignment(actor, &subject, &assignment)?),
            SignUpForReport { subject, topic } => {
                self.sign_up_for_report(actor, &subject, &topic)?;
                Outcome::SignedUp { topic }
            }
            WithdrawFromReport { subject, topic } => {
                self.withdraw_from_report(actor, &subject, &topic)?;
                Outcome::Withdrawn { topic }
            }
        };
        Ok(outcome)
    }

    fn subject_display_name(&self, identifier: String) -> String {
        self.find_subject_by_name_or_code(&identifier)
            .map(|s| s.name().to_string())
            .unwrap_or(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::adapters::SystemClock;
    use crate::core::university::SystemSettings;

    fn system() -> UniversitySystem<MemoryStore> {
        UniversitySystem::open(MemoryStore::new(), Box::new(SystemClock), SystemSettings::default())
            .unwrap()
    }

    fn login(sys: &mut UniversitySystem<MemoryStore>, name: &str) -> Session {
        match sys
            .execute(
                &Session::anonymous(),
                Command::Login {
                    name: name.to_string(),
                    password: "pw".to_string(),
                },
            )
            .unwrap()
        {
            Outcome::LoggedIn(session) => session,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    fn register(sys: &mut UniversitySystem<MemoryStore>, name: &str, role: Role) {
        sys.execute(
            &Session::anonymous(),
            Command::Register {
                name: name.to_string(),
                password: "pw".to_string(),
                role,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_role_gating() {
        let mut sys = system();
        register(&mut sys, "Ana", Role::Student);
        register(&mut sys, "Bob", Role::Professor);
        let ana = login(&mut sys, "Ana");
        let bob = login(&mut sys, "Bob");
        assert_eq!(ana.role(), Some(Role::Student));

        let create = Command::CreateSubject {
            name: "CS101".to_string(),
            code: "100".to_string(),
        };
        let err = sys.execute(&ana, create.clone()).unwrap_err();
        assert!(matches!(err, RecordsError::PermissionDenied { .. }));
        assert!(sys.execute(&Session::anonymous(), create.clone()).is_err());
        assert_eq!(
            sys.execute(&bob, create).unwrap(),
            Outcome::SubjectCreated {
                name: "CS101".to_string()
            }
        );

        let again = Command::Login {
            name: "Ana".to_string(),
            password: "pw".to_string(),
        };
        assert!(sys.execute(&bob, again).is_err());
    }

    #[test]
    fn test_commands_drive_the_workflow() {
        let mut sys = system();
        register(&mut sys, "Ana", Role::Student);
        register(&mut sys, "Bob", Role::Professor);
        let ana = login(&mut sys, "Ana");
        let bob = login(&mut sys, "Bob");

        for command in [
            Command::CreateSubject {
                name: "CS101".to_string(),
                code: "100".to_string(),
            },
            Command::EnrollStudent {
                student_id: 1,
                subject: "$100".to_string(),
            },
            Command::CreateAssignment {
                subject: "$100".to_string(),
                name: "HW1".to_string(),
                max_score: Some(50.0),
            },
        ] {
            sys.execute(&bob, command).unwrap();
        }

        let submitted = sys
            .execute(
                &ana,
                Command::SubmitAssignment {
                    subject: "CS101".to_string(),
                    assignment: "HW1".to_string(),
                },
            )
            .unwrap();
        assert_eq!(submitted, Outcome::Submitted(SubmitOutcome::Submitted));

        let graded = sys
            .execute(
                &bob,
                Command::GradeAssignment {
                    student_id: 1,
                    subject: "CS101".to_string(),
                    assignment: "HW1".to_string(),
                    score: 45.0,
                },
            )
            .unwrap();
        assert!(matches!(graded, Outcome::Graded { score, .. } if score == 45.0));
    }
}
