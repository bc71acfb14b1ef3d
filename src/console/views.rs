use crate::core::summary::{FinalReport, GradeLine, StudentGrades, SubjectStatistics, Transcript};
use crate::domain::model::Subject;
use crate::domain::ports::GradeNotice;
use std::io::{self, Write};

pub fn subject_line(out: &mut impl Write, subject: &Subject) -> io::Result<()> {
    writeln!(out, "- {} (code: {})", subject.name(), subject.code())
}

pub fn notice(out: &mut impl Write, notice: &GradeNotice) -> io::Result<()> {
    writeln!(
        out,
        "[notice] {} (ID: {}) got {:.2} for {} '{}' in {}",
        notice.student_name,
        notice.student_id,
        notice.score,
        notice.kind,
        notice.item_name,
        notice.subject_name
    )
}

fn grade_lines(out: &mut impl Write, lines: &[GradeLine]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "  - {} ({}): {:.2}", line.item, line.kind, line.score)?;
    }
    Ok(())
}

fn student_block(out: &mut impl Write, grades: &StudentGrades) -> io::Result<()> {
    if grades.lines.is_empty() {
        return writeln!(out, "  No grades");
    }
    grade_lines(out, &grades.lines)?;
    if let Some(average) = grades.average() {
        writeln!(out, "  Average: {:.2}", average)?;
    }
    writeln!(out, "  Total: {:.2}", grades.total())
}

pub fn transcript(out: &mut impl Write, transcript: &Transcript) -> io::Result<()> {
    writeln!(
        out,
        "\n=== GRADES OF {} (ID: {}) ===",
        transcript.student_name, transcript.student_id
    )?;
    if transcript.subjects.is_empty() {
        return writeln!(out, "Not enrolled in any subject.");
    }

    for entry in &transcript.subjects {
        writeln!(out, "\nSubject: {} (code: {})", entry.subject, entry.code)?;
        student_block(out, &entry.grades)?;
    }

    if let Some(average) = transcript.average() {
        writeln!(out, "\n=== OVERALL ===")?;
        writeln!(out, "Subjects: {}", transcript.subjects.len())?;
        writeln!(out, "Grades: {}", transcript.grade_count())?;
        writeln!(out, "Average: {:.2}", average)?;
        writeln!(out, "Total: {:.2}", transcript.total())?;
    }
    Ok(())
}

pub fn statistics(out: &mut impl Write, stats: &SubjectStatistics) -> io::Result<()> {
    writeln!(out, "\n=== STATISTICS: {} (code: {}) ===", stats.subject, stats.code)?;
    writeln!(out, "Enrolled students: {}", stats.enrolled)?;
    writeln!(out, "Submissions: {} ({} pending)", stats.submitted, stats.pending)?;
    writeln!(out, "Grades recorded: {}", stats.graded)?;
    match stats.average {
        Some(average) => writeln!(out, "Average grade: {:.2} (total {:.2})", average, stats.total),
        None => writeln!(out, "Average grade: n/a"),
    }
}

pub fn final_report(out: &mut impl Write, report: &FinalReport) -> io::Result<()> {
    writeln!(out, "\n=== FINAL REPORT: {} (code: {}) ===", report.subject, report.code)?;
    if report.students.is_empty() {
        return writeln!(out, "No students enrolled.");
    }
    for student in &report.students {
        let name = student.student_name.as_deref().unwrap_or("<unknown>");
        writeln!(out, "\nStudent: {} (ID: {})", name, student.student_id)?;
        student_block(out, student)?;
    }
    Ok(())
}
