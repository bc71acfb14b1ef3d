//! Line-oriented menus over any reader/writer pair. Input is only parsed into
//! [`Command`]s here; every rule lives in the core.

mod views;

use crate::core::command::{Command, Outcome, Session};
use crate::core::university::{SubmitOutcome, UniversitySystem};
use crate::domain::model::{Report, SubmissionRecord, UserId};
use crate::domain::ports::{GradeNotice, GradeObserver, Store};
use crate::domain::user::{Role, User};
use crate::utils::error::{ErrorCategory, RecordsError, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::str::FromStr;

/// Collects grade notices until the console gets to print them.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    queue: Rc<RefCell<VecDeque<GradeNotice>>>,
}

impl NoticeBoard {
    pub fn drain(&self) -> Vec<GradeNotice> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

impl GradeObserver for NoticeBoard {
    fn grade_updated(&mut self, notice: &GradeNotice) {
        self.queue.borrow_mut().push_back(notice.clone());
    }
}

pub struct Console<S: Store, R: BufRead, W: Write> {
    system: UniversitySystem<S>,
    input: R,
    output: W,
    session: Session,
    notices: NoticeBoard,
}

impl<S: Store, R: BufRead, W: Write> Console<S, R, W> {
    pub fn new(mut system: UniversitySystem<S>, input: R, output: W) -> Self {
        let notices = NoticeBoard::default();
        system.add_observer(Box::new(notices.clone()));
        Self {
            system,
            input,
            output,
            session: Session::anonymous(),
            notices,
        }
    }

    pub fn system(&self) -> &UniversitySystem<S> {
        &self.system
    }

    pub fn into_parts(self) -> (UniversitySystem<S>, W) {
        (self.system, self.output)
    }

    /// Runs until the user exits or the input ends. Only storage failures
    /// end the session with an error; everything else is shown and the menu
    /// comes back.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let keep_going = match self.step() {
                Ok(keep_going) => keep_going,
                Err(RecordsError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => false,
                Err(e) => return Err(e),
            };
            if !keep_going {
                writeln!(self.output, "Goodbye!")?;
                self.output.flush()?;
                return Ok(());
            }
        }
    }

    fn step(&mut self) -> Result<bool> {
        match self.session.role() {
            None => self.anonymous_menu(),
            Some(Role::Student) => self.student_menu(),
            Some(Role::Professor) => self.professor_menu(),
        }
    }

    // ---- input helpers ----

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input").into());
        }
        Ok(line.trim().to_string())
    }

    fn prompt(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        self.read_line()
    }

    fn prompt_number<T: FromStr>(&mut self, label: &str) -> Result<T> {
        let raw = self.prompt(label)?;
        raw.parse().map_err(|_| RecordsError::ValidationError {
            message: format!("'{}' is not a valid number", raw),
        })
    }

    /// Zero-based index into a list of `len` entries shown as 1..=len.
    fn pick(&mut self, label: &str, len: usize) -> Result<usize> {
        let choice: usize = self.prompt_number(label)?;
        if choice == 0 || choice > len {
            return Err(RecordsError::ValidationError {
                message: format!("choose a number between 1 and {}", len),
            });
        }
        Ok(choice - 1)
    }

    fn current_id(&self) -> UserId {
        self.session.user_id().unwrap_or_default()
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// Shows a failed action to the user; storage failures and the end of
    /// input are passed up instead.
    fn settle(&mut self, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                for notice in self.notices.drain() {
                    views::notice(&mut self.output, &notice)?;
                }
                Ok(())
            }
            Err(e) if e.category() == ErrorCategory::Storage => Err(e),
            Err(e) => {
                tracing::debug!("Action failed: {}", e);
                writeln!(self.output, "{}", e.user_friendly_message())?;
                Ok(())
            }
        }
    }

    fn run_command(&mut self, command: Command) -> Result<Outcome> {
        self.system.execute(&self.session, command)
    }

    // ---- anonymous ----

    fn anonymous_menu(&mut self) -> Result<bool> {
        self.say("\n=== UNIVERSITY RECORDS ===\n1. Log in\n2. Register\n3. Exit")?;
        let result = match self.prompt("Choose an action: ")?.as_str() {
            "1" => self.login(),
            "2" => self.register(),
            "3" => return Ok(false),
            _ => self.say("Invalid choice!"),
        };
        self.settle(result)?;
        Ok(true)
    }

    fn login(&mut self) -> Result<()> {
        let name = self.prompt("Name: ")?;
        let password = self.prompt("Password: ")?;
        if let Outcome::LoggedIn(session) = self.run_command(Command::Login { name, password })? {
            let role = self
                .session_user(&session)
                .map(|u| u.role_string())
                .unwrap_or_default();
            writeln!(
                self.output,
                "Welcome, {} ({})",
                session.name().unwrap_or_default(),
                role
            )?;
            self.session = session;
        }
        Ok(())
    }

    fn session_user(&self, session: &Session) -> Option<&User> {
        session.user_id().and_then(|id| self.system.users().by_id(id))
    }

    fn register(&mut self) -> Result<()> {
        let name = self.prompt("Name: ")?;
        let password = self.prompt("Password: ")?;
        self.say("Choose a role:\n1. Student\n2. Professor")?;
        let role = match self.prompt("Choice: ")?.as_str() {
            "1" => Role::Student,
            "2" => Role::Professor,
            _ => return self.say("Invalid choice!"),
        };
        if let Outcome::Registered { user_id } = self.run_command(Command::Register {
            name: name.clone(),
            password,
            role,
        })? {
            writeln!(self.output, "User {} registered with ID {}", name, user_id)?;
        }
        Ok(())
    }

    fn logout(&mut self) -> Result<()> {
        writeln!(
            self.output,
            "Logging out {}",
            self.session.name().unwrap_or_default()
        )?;
        self.session = Session::anonymous();
        Ok(())
    }

    // ---- student ----

    fn student_menu(&mut self) -> Result<bool> {
        self.say(
            "\n=== STUDENT MENU ===\n\
             1. My subjects\n\
             2. Enroll in a subject\n\
             3. Submit an assignment\n\
             4. Sign up for a report\n\
             5. Withdraw from a report\n\
             6. My grades\n\
             7. Log out",
        )?;
        let result = match self.prompt("Choose an action: ")?.as_str() {
            "1" => self.show_student_subjects().map(|_| ()),
            "2" => self.enroll_self(),
            "3" => self.submit_assignment(),
            "4" => self.sign_up_for_report(),
            "5" => self.withdraw_from_report(),
            "6" => self.show_transcript(),
            "7" => self.logout(),
            _ => self.say("Invalid choice!"),
        };
        self.settle(result)?;
        Ok(true)
    }

    /// Prints the student's subjects and returns how many there are.
    fn show_student_subjects(&mut self) -> Result<usize> {
        let subjects = self.system.student_subjects(self.current_id());
        if subjects.is_empty() {
            writeln!(self.output, "You are not enrolled in any subject.")?;
            return Ok(0);
        }
        writeln!(self.output, "Your subjects ({}):", subjects.len())?;
        for subject in &subjects {
            views::subject_line(&mut self.output, subject)?;
        }
        Ok(subjects.len())
    }

    fn enroll_self(&mut self) -> Result<()> {
        let subject = self.prompt("Subject name or code (e.g. $100): ")?;
        if let Outcome::Enrolled { subject, .. } = self.run_command(Command::Enroll { subject })? {
            writeln!(self.output, "Enrolled in {}", subject)?;
        }
        Ok(())
    }

    fn submit_assignment(&mut self) -> Result<()> {
        if self.show_student_subjects()? == 0 {
            return Ok(());
        }
        let identifier = self.prompt("Subject name or code (e.g. $100): ")?;
        let Some(subject) = self.system.find_subject_by_name_or_code(&identifier) else {
            return self.say("Subject not found! Use the name or the $code.");
        };
        let subject_name = subject.name().to_string();
        let assignments = subject.assignments().to_vec();
        if assignments.is_empty() {
            return self.say("This subject has no assignments.");
        }

        writeln!(self.output, "Assignments:")?;
        for name in &assignments {
            let max = self.system.max_score_for(&subject_name, name);
            writeln!(self.output, "- {} (max {:.1})", name, max)?;
        }
        let assignment = self.prompt("Assignment name: ")?;
        let outcome = self.run_command(Command::SubmitAssignment {
            subject: subject_name,
            assignment: assignment.clone(),
        })?;
        match outcome {
            Outcome::Submitted(SubmitOutcome::Resubmitted) => {
                writeln!(self.output, "Assignment '{}' resubmitted for review.", assignment)?
            }
            _ => writeln!(self.output, "Assignment '{}' submitted for review.", assignment)?,
        }
        Ok(())
    }

    fn sign_up_for_report(&mut self) -> Result<()> {
        let reports: Vec<Report> = self
            .system
            .available_reports(self.current_id())
            .into_iter()
            .cloned()
            .collect();
        if reports.is_empty() {
            return self.say("No reports open in your subjects.");
        }

        writeln!(self.output, "Open reports:")?;
        for (i, report) in reports.iter().enumerate() {
            writeln!(
                self.output,
                "{}. {} (subject: {}, participants: {}/{})",
                i + 1,
                report.topic(),
                report.subject_name(),
                report.signed_up_students().len(),
                report.max_participants()
            )?;
        }
        let report = &reports[self.pick("Report number: ", reports.len())?];
        self.run_command(Command::SignUpForReport {
            subject: report.subject_name().to_string(),
            topic: report.topic().to_string(),
        })?;
        writeln!(self.output, "Signed up for report: {}", report.topic())?;
        Ok(())
    }

    fn withdraw_from_report(&mut self) -> Result<()> {
        let reports: Vec<(String, String)> = self
            .system
            .student_reports(self.current_id())
            .into_iter()
            .map(|r| (r.subject_name().to_string(), r.topic().to_string()))
            .collect();
        if reports.is_empty() {
            return self.say("You are not signed up for any report.");
        }
        writeln!(self.output, "Your reports:")?;
        for (i, (subject, topic)) in reports.iter().enumerate() {
            writeln!(self.output, "{}. {} (subject: {})", i + 1, topic, subject)?;
        }

        let (subject, topic) = reports[self.pick("Report number: ", reports.len())?].clone();
        self.run_command(Command::WithdrawFromReport {
            subject,
            topic: topic.clone(),
        })?;
        writeln!(self.output, "Withdrew from report: {}", topic)?;
        Ok(())
    }

    fn show_transcript(&mut self) -> Result<()> {
        let transcript = self.system.student_transcript(self.current_id())?;
        views::transcript(&mut self.output, &transcript)?;
        Ok(())
    }

    // ---- professor ----

    fn professor_menu(&mut self) -> Result<bool> {
        self.say(
            "\n=== PROFESSOR MENU ===\n\
             1. Create a subject\n\
             2. Create an assignment\n\
             3. Create a report\n\
             4. Enroll a student\n\
             5. Review submissions\n\
             6. Grade a report\n\
             7. Subject statistics\n\
             8. Final report\n\
             9. Log out",
        )?;
        let result = match self.prompt("Choose an action: ")?.as_str() {
            "1" => self.create_subject(),
            "2" => self.create_assignment(),
            "3" => self.create_report(),
            "4" => self.enroll_student(),
            "5" => self.review_submissions(),
            "6" => self.grade_report(),
            "7" => self.subject_statistics(),
            "8" => self.final_report(),
            "9" => self.logout(),
            _ => self.say("Invalid choice!"),
        };
        self.settle(result)?;
        Ok(true)
    }

    /// Prints the professor's subjects; false when there are none.
    fn show_professor_subjects(&mut self) -> Result<bool> {
        let subjects = self.system.professor_subjects(self.current_id());
        if subjects.is_empty() {
            writeln!(self.output, "You have no subjects. Create one first.")?;
            return Ok(false);
        }
        writeln!(self.output, "Your subjects:")?;
        for subject in &subjects {
            views::subject_line(&mut self.output, subject)?;
        }
        Ok(true)
    }

    fn create_subject(&mut self) -> Result<()> {
        let name = self.prompt("Subject name: ")?;
        let code = self.prompt("Subject code: ")?;
        let created = self.run_command(Command::CreateSubject {
            name: name.clone(),
            code: code.clone(),
        });

        match created {
            Ok(_) => writeln!(self.output, "Subject '{}' created.", name)?,
            Err(RecordsError::SubjectExists { professor_id, .. }) => {
                writeln!(self.output, "\nSubject '{}' already exists!", name)?;
                writeln!(self.output, "Current professor: ID {}", professor_id)?;
                self.say(
                    "Do you want to take it over?\n\
                     1. Yes, replace the professor\n\
                     2. No, cancel",
                )?;
                if self.prompt("Choose: ")? != "1" {
                    return self.say("Subject creation cancelled.");
                }
                if let Outcome::SubjectTakenOver(summary) =
                    self.run_command(Command::TakeOverSubject { name, code })?
                {
                    writeln!(self.output, "You now teach '{}'.", summary.subject)?;
                    writeln!(
                        self.output,
                        "Kept {} students, {} assignments, {} reports.",
                        summary.students, summary.assignments, summary.reports
                    )?;
                }
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn create_assignment(&mut self) -> Result<()> {
        if !self.show_professor_subjects()? {
            return Ok(());
        }
        let subject = self.prompt("Subject name or code: ")?;
        let name = self.prompt("Assignment name: ")?;
        let raw = self.prompt("Maximum score (blank for default): ")?;
        let max_score = if raw.is_empty() {
            None
        } else {
            Some(raw.parse::<f64>().map_err(|_| RecordsError::ValidationError {
                message: format!("'{}' is not a valid score", raw),
            })?)
        };

        if let Outcome::AssignmentCreated { name, max_score } =
            self.run_command(Command::CreateAssignment {
                subject,
                name,
                max_score,
            })?
        {
            writeln!(
                self.output,
                "Assignment '{}' created with maximum score {:.1}",
                name, max_score
            )?;
        }
        Ok(())
    }

    fn create_report(&mut self) -> Result<()> {
        if !self.show_professor_subjects()? {
            return Ok(());
        }
        let subject = self.prompt("Subject name or code: ")?;
        let topic = self.prompt("Report topic: ")?;
        let max_participants = self.prompt_number("Maximum participants: ")?;
        self.run_command(Command::CreateReport {
            subject,
            topic: topic.clone(),
            max_participants,
        })?;
        writeln!(self.output, "Report '{}' created.", topic)?;
        Ok(())
    }

    fn enroll_student(&mut self) -> Result<()> {
        let students: Vec<String> = self
            .system
            .users()
            .students()
            .into_iter()
            .map(|u| u.display_info())
            .collect();
        if students.is_empty() {
            return self.say("No students are registered.");
        }
        writeln!(self.output, "Students:")?;
        for line in &students {
            writeln!(self.output, "- {}", line)?;
        }
        let student_id = self.prompt_number("Student ID: ")?;

        if !self.show_professor_subjects()? {
            return Ok(());
        }
        let subject = self.prompt("Subject name or code: ")?;
        if let Outcome::Enrolled { subject, .. } = self.run_command(Command::EnrollStudent {
            student_id,
            subject,
        })? {
            writeln!(self.output, "Student {} enrolled in {}", student_id, subject)?;
        }
        Ok(())
    }

    fn review_submissions(&mut self) -> Result<()> {
        let pending: Vec<SubmissionRecord> = self
            .system
            .pending_submissions(self.current_id())
            .into_iter()
            .cloned()
            .collect();
        if pending.is_empty() {
            return self.say("No submissions waiting for review.");
        }

        writeln!(self.output, "Submissions to review ({}):", pending.len())?;
        for (i, submission) in pending.iter().enumerate() {
            let student = self.student_name(submission.student_id);
            let max = self
                .system
                .max_score_for(&submission.subject_name, &submission.item_name);
            writeln!(
                self.output,
                "{}. Student: {} (ID: {}), subject: {}, assignment: {} (max {:.1}) (sent: {})",
                i + 1,
                student,
                submission.student_id,
                submission.subject_name,
                submission.item_name,
                max,
                submission.timestamp.format("%Y-%m-%d %H:%M:%S")
            )?;
        }

        let submission = &pending[self.pick("\nSubmission number: ", pending.len())?];
        let max_score = self
            .system
            .max_score_for(&submission.subject_name, &submission.item_name);
        self.say("1. Approve and grade\n2. Reject")?;
        match self.prompt("Choose: ")?.as_str() {
            "1" => {
                let score = self.prompt_number(&format!("Score (0-{:.1}): ", max_score))?;
                self.run_command(Command::GradeAssignment {
                    student_id: submission.student_id,
                    subject: submission.subject_name.clone(),
                    assignment: submission.item_name.clone(),
                    score,
                })?;
                self.say("Grade recorded.")
            }
            "2" => {
                self.run_command(Command::RejectSubmission {
                    student_id: submission.student_id,
                    subject: submission.subject_name.clone(),
                    assignment: submission.item_name.clone(),
                })?;
                self.say("Submission rejected. The student may resubmit.")
            }
            _ => self.say("Invalid choice!"),
        }
    }

    fn student_name(&self, id: UserId) -> String {
        self.system
            .users()
            .by_id(id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn grade_report(&mut self) -> Result<()> {
        let reports: Vec<Report> = self
            .system
            .gradable_reports(self.current_id())
            .into_iter()
            .cloned()
            .collect();
        if reports.is_empty() {
            return self.say("No reports to grade in your subjects.");
        }

        writeln!(self.output, "Reports ready for grading:")?;
        for (i, report) in reports.iter().enumerate() {
            writeln!(
                self.output,
                "{}. {} (subject: {}, participants: {})",
                i + 1,
                report.topic(),
                report.subject_name(),
                report.signed_up_students().len()
            )?;
        }

        let report = &reports[self.pick("Report number: ", reports.len())?];
        let participants = report.signed_up_students();
        if participants.is_empty() {
            return self.say("Nobody is signed up for this report.");
        }
        writeln!(self.output, "Students signed up for '{}':", report.topic())?;
        for id in &participants {
            let name = self.student_name(*id);
            writeln!(self.output, "- {} (ID: {})", name, id)?;
        }

        let max = self.system.settings().report_max_score;
        let score: f64 =
            self.prompt_number(&format!("Score for all participants (0-{:.1}): ", max))?;
        if let Outcome::ReportGraded { topic, graded } = self.run_command(Command::GradeReport {
            subject: report.subject_name().to_string(),
            topic: report.topic().to_string(),
            score,
        })? {
            writeln!(
                self.output,
                "Score {:.2} recorded for '{}' ({} students)",
                score, topic, graded
            )?;
        }
        Ok(())
    }

    /// Name of an owned subject picked by name or code.
    fn owned_subject(&mut self) -> Result<Option<String>> {
        if !self.show_professor_subjects()? {
            return Ok(None);
        }
        let identifier = self.prompt("Subject name or code: ")?;
        let professor_id = self.current_id();
        match self.system.find_subject_by_name_or_code(&identifier) {
            Some(subject) if subject.is_professor(professor_id) => {
                Ok(Some(subject.name().to_string()))
            }
            Some(subject) => Err(RecordsError::NotSubjectOwner {
                professor_id,
                subject: subject.name().to_string(),
            }),
            None => Err(RecordsError::not_found("subject", identifier)),
        }
    }

    fn subject_statistics(&mut self) -> Result<()> {
        if let Some(subject) = self.owned_subject()? {
            let stats = self.system.subject_statistics(&subject)?;
            views::statistics(&mut self.output, &stats)?;
        }
        Ok(())
    }

    fn final_report(&mut self) -> Result<()> {
        if let Some(subject) = self.owned_subject()? {
            let report = self.system.final_report(&subject)?;
            views::final_report(&mut self.output, &report)?;
        }
        Ok(())
    }
}
