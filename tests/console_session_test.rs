use std::io::Cursor;
use tempfile::TempDir;
use uni_records::adapters::{FlatFileStore, SystemClock};
use uni_records::domain::model::SubmissionStatus;
use uni_records::{Console, SystemSettings, UniversitySystem};

fn open(dir: &TempDir) -> UniversitySystem<FlatFileStore> {
    UniversitySystem::open(
        FlatFileStore::new(dir.path()),
        Box::new(SystemClock),
        SystemSettings::default(),
    )
    .unwrap()
}

fn run_session(dir: &TempDir, script: &[&str]) -> String {
    let mut input = script.join("\n");
    input.push('\n');
    let mut console = Console::new(open(dir), Cursor::new(input), Vec::new());
    console.run().unwrap();
    let (_, output) = console.into_parts();
    String::from_utf8(output).unwrap()
}

const SETUP: &[&str] = &[
    // register Bob (professor, id 1) and Ana (student, id 2)
    "2", "Bob", "pw", "2",
    "2", "Ana", "pw", "1",
    // Bob: subject, assignment, enrollment, report
    "1", "Bob", "pw",
    "1", "CS101", "100",
    "2", "$100", "HW1", "50",
    "4", "2", "$100",
    "3", "$100", "Topic A", "2",
    "9",
    // Ana: submit HW1, sign up for the first open report
    "1", "Ana", "pw",
    "3", "$100", "HW1",
    "4", "1",
    "7",
    "3",
];

#[test]
fn test_full_session_through_the_menus() {
    let dir = TempDir::new().unwrap();
    let output = run_session(&dir, SETUP);

    assert!(output.contains("User Bob registered with ID 1"));
    assert!(output.contains("Subject 'CS101' created."));
    assert!(output.contains("Assignment 'HW1' created with maximum score 50.0"));
    assert!(output.contains("Student 2 enrolled in CS101"));
    assert!(output.contains("Report 'Topic A' created."));
    assert!(output.contains("Assignment 'HW1' submitted for review."));
    assert!(output.contains("1. Topic A (subject: CS101, participants: 0/2)"));
    assert!(output.contains("Signed up for report: Topic A"));

    let grading = run_session(
        &dir,
        &[
            "1", "Bob", "pw",
            "5", "1", "1", "45",
            "6", "1", "90",
            "8", "$100",
            "9",
            "1", "Ana", "pw",
            "6",
            "7",
            "3",
        ],
    );

    assert!(grading.contains("Student: Ana (ID: 2), subject: CS101, assignment: HW1 (max 50.0)"));
    assert!(grading.contains("Grade recorded."));
    assert!(grading.contains("[notice] Ana (ID: 2) got 45.00 for assignment 'HW1' in CS101"));
    assert!(grading.contains("Score 90.00 recorded for 'Topic A' (1 students)"));
    assert!(grading.contains("=== FINAL REPORT: CS101 (code: 100) ==="));
    assert!(grading.contains("=== GRADES OF Ana (ID: 2) ==="));
    assert!(grading.contains("Average: 67.50"));

    let system = open(&dir);
    let subject = system.find_subject("CS101").unwrap();
    assert_eq!(subject.assignment_grade(2, "HW1"), Some(45.0));
    assert_eq!(subject.report_grade(2, "Topic A"), Some(90.0));
    assert_eq!(system.submissions()[0].status, SubmissionStatus::Approved);
    assert!(system.reports().is_empty());
}

#[test]
fn test_rejected_work_can_be_resubmitted_from_the_menu() {
    let dir = TempDir::new().unwrap();
    run_session(&dir, SETUP);

    let output = run_session(
        &dir,
        &[
            "1", "Bob", "pw",
            "5", "1", "2",
            "9",
            "1", "Ana", "pw",
            "3", "CS101", "HW1",
            "7",
            "3",
        ],
    );

    assert!(output.contains("Submission rejected. The student may resubmit."));
    assert!(output.contains("Assignment 'HW1' resubmitted for review."));
    assert_eq!(open(&dir).submissions().len(), 1);
}

#[test]
fn test_mistakes_are_reported_and_the_menu_continues() {
    let dir = TempDir::new().unwrap();
    run_session(&dir, SETUP);

    let output = run_session(
        &dir,
        &[
            "1", "Ana", "pw",
            // already signed up; no other report open
            "4",
            // unknown subject code
            "2", "$999",
            // pending submission blocks a second one
            "3", "$100", "HW1",
            "7",
            "1", "Bob", "pw",
            "5", "7",
            "5", "1", "1", "80",
            "9",
            "3",
        ],
    );

    assert!(output.contains("No reports open in your subjects."));
    assert!(output.contains("subject '$999' not found"));
    assert!(output.contains("is already awaiting review"));
    assert!(output.contains("choose a number between 1 and 1"));
    assert!(output.contains("Score 80 is outside 0..=50"));
    assert!(output.ends_with("Goodbye!\n"));
}
