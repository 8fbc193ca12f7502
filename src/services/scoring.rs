// src/services/scoring.rs

use crate::{
    models::{
        attempt::AttemptScore, question::McqOption, submission::Submission, test::Test,
    },
    services::grader::{GradeResult, round2},
};

/// MCQ answer check. Returns `(is_correct, score)`; an option id that is not
/// on the question simply scores 0.
pub fn grade_mcq(options: &[McqOption], selected_option: &str, marks: i32) -> (bool, f64) {
    let is_correct = options
        .iter()
        .find(|o| o.id == selected_option)
        .is_some_and(|o| o.is_correct);

    (is_correct, if is_correct { f64::from(marks) } else { 0.0 })
}

/// Partial credit of a graded coding answer, scaled to the question's marks.
pub fn coding_score(grade: &GradeResult, marks: i32) -> f64 {
    round2(grade.ratio() * f64::from(marks))
}

/// Percentage and verdict for a given total.
pub fn rescore(total_score: f64, total_marks: i32, passing_score: f64) -> AttemptScore {
    let percentage = if total_marks > 0 {
        round2(total_score / f64::from(total_marks) * 100.0)
    } else {
        0.0
    };

    AttemptScore {
        total_score: round2(total_score),
        percentage,
        passed: percentage >= passing_score,
    }
}

/// Final score of an attempt: the sum of every graded submission's score.
///
/// Ungraded rows (code saved but never submitted for grading) count as 0,
/// so one question's sandbox trouble never blocks the rest.
pub fn score_attempt(submissions: &[Submission], test: &Test) -> AttemptScore {
    let total: f64 = submissions.iter().filter_map(|s| s.score).sum();
    rescore(total, test.total_marks, test.passing_score)
}
