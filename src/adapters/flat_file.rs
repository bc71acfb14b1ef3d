use crate::domain::model::{timestamp, Assignment, GradeRecord, Report, SubmissionRecord, UserId};
use crate::domain::ports::{EnrollmentIndex, Store, SubjectGradeRow, SubjectRecord};
use crate::domain::user::User;
use crate::utils::error::{RecordsError, Result};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const USERS: &str = "users.csv";
const SUBJECTS: &str = "subjects.csv";
const ASSIGNMENTS: &str = "assignments.csv";
const REPORTS: &str = "reports.csv";
const ENROLLMENTS: &str = "enrollments.csv";
const SUBMISSIONS: &str = "submissions.csv";
const GRADES: &str = "grades.csv";
const SUBJECT_GRADES: &str = "subject_grades.csv";
const NEXT_ID: &str = "next_id.txt";

/// One headerless comma-separated file per collection under `base_path`.
///
/// Fixed-width rows go through serde. Report and enrollment rows carry a
/// variable tail of ids or names and are read as flexible records.
#[derive(Debug, Clone)]
pub struct FlatFileStore {
    base_path: PathBuf,
}

impl FlatFileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path(&self, file: &str) -> PathBuf {
        self.base_path.join(file)
    }

    /// `None` when the file has never been written.
    fn open(&self, file: &str) -> Result<Option<File>> {
        match File::open(self.path(file)) {
            Ok(handle) => Ok(Some(handle)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("{} not found, starting empty", file);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>> {
        let Some(handle) = self.open(file)? else {
            return Ok(Vec::new());
        };
        let mut reader = ReaderBuilder::new().has_headers(false).from_reader(handle);

        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row.map_err(|e| corrupt(file, e))?);
        }
        tracing::debug!("Loaded {} rows from {}", rows.len(), file);
        Ok(rows)
    }

    fn read_records(&self, file: &str) -> Result<Vec<StringRecord>> {
        let Some(handle) = self.open(file)? else {
            return Ok(Vec::new());
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(handle);

        let mut records = Vec::new();
        for record in reader.records() {
            records.push(record.map_err(|e| corrupt(file, e))?);
        }
        tracing::debug!("Loaded {} rows from {}", records.len(), file);
        Ok(records)
    }

    /// Writes next to the target and renames, so a failed save leaves the old file intact.
    fn replace<F>(&self, file: &str, flexible: bool, write: F) -> Result<()>
    where
        F: FnOnce(&mut csv::Writer<File>) -> Result<()>,
    {
        fs::create_dir_all(&self.base_path)?;
        let target = self.path(file);
        let staging = self.path(&format!("{}.tmp", file));

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .flexible(flexible)
            .from_path(&staging)?;
        write(&mut writer)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&staging, &target)?;
        Ok(())
    }

    fn write_rows<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<()> {
        self.replace(file, false, |writer| {
            for row in rows {
                writer.serialize(row)?;
            }
            Ok(())
        })?;
        tracing::debug!("Saved {} rows to {}", rows.len(), file);
        Ok(())
    }
}

fn corrupt(file: &str, error: csv::Error) -> RecordsError {
    if error.is_io_error() {
        return RecordsError::CsvError(error);
    }
    RecordsError::CorruptRecord {
        file: file.to_string(),
        line: error.position().map(|p| p.line()).unwrap_or(0),
        reason: error.to_string(),
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn field<'r>(file: &str, record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str> {
    record.get(index).ok_or_else(|| RecordsError::CorruptRecord {
        file: file.to_string(),
        line: line_of(record),
        reason: format!("missing {}", name),
    })
}

fn parse_field<T>(file: &str, record: &StringRecord, index: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = field(file, record, index, name)?;
    raw.trim().parse().map_err(|e: T::Err| RecordsError::CorruptRecord {
        file: file.to_string(),
        line: line_of(record),
        reason: format!("bad {} '{}': {}", name, raw, e),
    })
}

fn parse_timestamp(file: &str, record: &StringRecord, index: usize) -> Result<NaiveDateTime> {
    let raw = field(file, record, index, "timestamp")?;
    NaiveDateTime::parse_from_str(raw, timestamp::FORMAT).map_err(|e| RecordsError::CorruptRecord {
        file: file.to_string(),
        line: line_of(record),
        reason: format!("bad timestamp '{}': {}", raw, e),
    })
}

impl Store for FlatFileStore {
    fn load_users(&self) -> Result<Vec<User>> {
        self.read_rows(USERS)
    }

    fn save_users(&self, users: &[User]) -> Result<()> {
        self.write_rows(USERS, users)
    }

    fn load_subjects(&self) -> Result<Vec<SubjectRecord>> {
        self.read_rows(SUBJECTS)
    }

    fn save_subjects(&self, subjects: &[SubjectRecord]) -> Result<()> {
        self.write_rows(SUBJECTS, subjects)
    }

    fn load_assignments(&self) -> Result<Vec<Assignment>> {
        self.read_rows(ASSIGNMENTS)
    }

    fn save_assignments(&self, assignments: &[Assignment]) -> Result<()> {
        self.write_rows(ASSIGNMENTS, assignments)
    }

    // topic,subject,max_participants,completed,created_at[,student_id...]
    fn load_reports(&self) -> Result<Vec<Report>> {
        self.read_records(REPORTS)?
            .iter()
            .map(|record| -> Result<Report> {
                let signed_up = (5..record.len())
                    .map(|i| parse_field::<UserId>(REPORTS, record, i, "student id"))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Report::restore(
                    field(REPORTS, record, 0, "topic")?,
                    field(REPORTS, record, 1, "subject")?,
                    parse_field(REPORTS, record, 2, "max participants")?,
                    signed_up,
                    parse_field(REPORTS, record, 3, "completed flag")?,
                    parse_timestamp(REPORTS, record, 4)?,
                ))
            })
            .collect()
    }

    fn save_reports(&self, reports: &[Report]) -> Result<()> {
        self.replace(REPORTS, true, |writer| {
            for report in reports {
                let mut row = vec![
                    report.topic().to_string(),
                    report.subject_name().to_string(),
                    report.max_participants().to_string(),
                    report.is_completed().to_string(),
                    report.created_at().format(timestamp::FORMAT).to_string(),
                ];
                row.extend(report.signed_up_students().iter().map(|id| id.to_string()));
                writer.write_record(&row)?;
            }
            Ok(())
        })
    }

    // student_id[,subject...]
    fn load_enrollments(&self) -> Result<EnrollmentIndex> {
        let mut index = EnrollmentIndex::new();
        for record in self.read_records(ENROLLMENTS)? {
            let student_id: UserId = parse_field(ENROLLMENTS, &record, 0, "student id")?;
            let subjects = index.entry(student_id).or_default();
            subjects.extend(record.iter().skip(1).map(str::to_string));
        }
        Ok(index)
    }

    fn save_enrollments(&self, enrollments: &EnrollmentIndex) -> Result<()> {
        self.replace(ENROLLMENTS, true, |writer| {
            for (student_id, subjects) in enrollments {
                let mut row = vec![student_id.to_string()];
                row.extend(subjects.iter().cloned());
                writer.write_record(&row)?;
            }
            Ok(())
        })
    }

    fn load_submissions(&self) -> Result<Vec<SubmissionRecord>> {
        self.read_rows(SUBMISSIONS)
    }

    fn save_submissions(&self, submissions: &[SubmissionRecord]) -> Result<()> {
        self.write_rows(SUBMISSIONS, submissions)
    }

    fn load_grades(&self) -> Result<Vec<GradeRecord>> {
        self.read_rows(GRADES)
    }

    fn save_grades(&self, grades: &[GradeRecord]) -> Result<()> {
        self.write_rows(GRADES, grades)
    }

    fn load_subject_grades(&self) -> Result<Vec<SubjectGradeRow>> {
        self.read_rows(SUBJECT_GRADES)
    }

    fn save_subject_grades(&self, rows: &[SubjectGradeRow]) -> Result<()> {
        self.write_rows(SUBJECT_GRADES, rows)
    }

    fn load_next_user_id(&self) -> Result<UserId> {
        let raw = match fs::read_to_string(self.path(NEXT_ID)) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(1),
            Err(e) => return Err(e.into()),
        };
        raw.trim().parse().map_err(|e| RecordsError::CorruptRecord {
            file: NEXT_ID.to_string(),
            line: 1,
            reason: format!("bad id '{}': {}", raw.trim(), e),
        })
    }

    fn save_next_user_id(&self, next_id: UserId) -> Result<()> {
        fs::create_dir_all(&self.base_path)?;
        fs::write(self.path(NEXT_ID), format!("{}\n", next_id))?;
        Ok(())
    }
}
