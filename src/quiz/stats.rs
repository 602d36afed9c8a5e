//! Derived statistics of a finished quiz.

use chrono::{DateTime, Utc};

use super::store::QuizState;
use super::{Outcome, Question};

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;

/// Formats the time between `start` and `end` as "MM minutes and SS seconds".
///
/// Components between 1 and 9 are zero padded. Spans where `end` does not come after
/// `start` count as zero.
pub fn format_duration(start: i64, end: i64) -> String {
    let duration = (end - start).max(0);

    let mut minutes = duration / MILLIS_PER_MINUTE;
    let mut seconds =
        ((duration % MILLIS_PER_MINUTE) + MILLIS_PER_SECOND / 2) / MILLIS_PER_SECOND;
    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }

    format!(
        "{} {} and {} {}",
        pad(minutes),
        if minutes == 1 { "minute" } else { "minutes" },
        pad(seconds),
        if seconds == 1 { "second" } else { "seconds" },
    )
}

fn pad(value: i64) -> String {
    if value > 0 && value < 10 {
        format!("0{}", value)
    } else {
        value.to_string()
    }
}

pub fn correct_count(questions: &[Question]) -> usize {
    questions
        .iter()
        .filter(|q| q.outcome() == Outcome::Correct)
        .count()
}

/// Share of correct answers as a percentage with two decimals, e.g. "50.00 %".
/// An empty quiz scores "0.00 %".
pub fn final_score(questions: &[Question]) -> String {
    let percentage = if questions.is_empty() {
        0.0
    } else {
        correct_count(questions) as f64 / questions.len() as f64 * 100.0
    };
    format!("{:.2} %", percentage)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSlice {
    pub outcome: Outcome,
    pub count: usize,
}

impl ChartSlice {
    pub fn label(&self) -> &'static str {
        self.outcome.label()
    }

    pub fn color(&self) -> &'static str {
        self.outcome.color()
    }
}

/// Unanswered, correct and incorrect counts, in that order, leaving out empty groups.
pub fn breakdown(questions: &[Question]) -> Vec<ChartSlice> {
    [Outcome::Unanswered, Outcome::Correct, Outcome::Incorrect]
        .into_iter()
        .map(|outcome| ChartSlice {
            outcome,
            count: questions.iter().filter(|q| q.outcome() == outcome).count(),
        })
        .filter(|slice| slice.count > 0)
        .collect()
}

/// Renders epoch millis as "2024-05-01 at 13:37:00 UTC".
pub fn format_timestamp(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(time) => time.format("%Y-%m-%d at %H:%M:%S UTC").to_string(),
        None => "-".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizReport {
    pub started: String,
    pub submitted: String,
    pub duration: String,
    pub score: String,
    pub correct: usize,
    pub total: usize,
    pub breakdown: Vec<ChartSlice>,
}

impl QuizReport {
    pub fn new(state: &QuizState) -> Self {
        Self {
            started: format_timestamp(state.start),
            submitted: if state.is_submitted() {
                format_timestamp(state.end)
            } else {
                "-".to_string()
            },
            duration: format_duration(state.start, state.end),
            score: final_score(&state.questions),
            correct: correct_count(&state.questions),
            total: state.questions.len(),
            breakdown: breakdown(&state.questions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answered(correct: &str, given: &str) -> Question {
        let mut question = Question::new(
            "Q".to_string(),
            vec!["A".to_string(), "B".to_string()],
            correct.to_string(),
        );
        question.given_answer = given.to_string();
        question
    }

    #[test]
    fn duration_pluralizes_and_pads() {
        assert_eq!(format_duration(0, 65_000), "01 minute and 05 seconds");
        assert_eq!(format_duration(0, 61_000), "01 minute and 01 second");
        assert_eq!(format_duration(0, 754_000), "12 minutes and 34 seconds");
        assert_eq!(format_duration(0, 30_000), "0 minutes and 30 seconds");
        assert_eq!(format_duration(0, 120_000), "02 minutes and 0 seconds");
    }

    #[test]
    fn duration_rounds_to_nearest_second() {
        assert_eq!(format_duration(1_000, 3_400), "0 minutes and 02 seconds");
        assert_eq!(format_duration(1_000, 3_600), "0 minutes and 03 seconds");
        assert_eq!(format_duration(0, 59_700), "01 minute and 0 seconds");
    }

    #[test]
    fn duration_of_unset_span_is_zero() {
        assert_eq!(format_duration(5_000, 0), "0 minutes and 0 seconds");
        assert_eq!(format_duration(5_000, 5_000), "0 minutes and 0 seconds");
    }

    #[test]
    fn score_has_two_decimals() {
        let questions = vec![
            answered("A", "A"),
            answered("A", "B"),
            answered("A", "A"),
            answered("A", ""),
        ];
        assert_eq!(final_score(&questions), "50.00 %");

        let questions = vec![answered("A", "A"), answered("A", "B"), answered("A", "")];
        assert_eq!(final_score(&questions), "33.33 %");

        assert_eq!(final_score(&[answered("A", "A")]), "100.00 %");
    }

    #[test]
    fn empty_quiz_scores_zero() {
        assert_eq!(final_score(&[]), "0.00 %");
    }

    #[test]
    fn breakdown_skips_empty_groups() {
        let questions = vec![
            answered("A", ""),
            answered("A", "A"),
            answered("A", "A"),
            answered("A", "B"),
        ];
        let slices = breakdown(&questions);
        assert_eq!(
            slices,
            vec![
                ChartSlice { outcome: Outcome::Unanswered, count: 1 },
                ChartSlice { outcome: Outcome::Correct, count: 2 },
                ChartSlice { outcome: Outcome::Incorrect, count: 1 },
            ]
        );
        assert_eq!(
            slices.iter().map(|s| (s.label(), s.color())).collect::<Vec<_>>(),
            vec![("Unanswered", "gold"), ("Right", "green"), ("Wrong", "crimson")]
        );

        let slices = breakdown(&[answered("A", "B"), answered("A", "B")]);
        assert_eq!(slices, vec![ChartSlice { outcome: Outcome::Incorrect, count: 2 }]);

        assert!(breakdown(&[]).is_empty());
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 at 00:00:00 UTC");
        assert_eq!(
            format_timestamp(1_714_570_620_000),
            "2024-05-01 at 13:37:00 UTC"
        );
    }

    #[test]
    fn report_summarizes_state() {
        let state = QuizState {
            questions: vec![answered("A", "A"), answered("A", "B")],
            start: 1_000,
            end: 91_000,
            ..QuizState::default()
        };

        let report = QuizReport::new(&state);
        assert_eq!(report.duration, "01 minute and 30 seconds");
        assert_eq!(report.score, "50.00 %");
        assert_eq!((report.correct, report.total), (1, 2));
        assert_eq!(report.breakdown.len(), 2);
        assert_eq!(report.submitted, "1970-01-01 at 00:01:31 UTC");

        let unsubmitted = QuizReport::new(&QuizState { end: 0, ..state });
        assert_eq!(unsubmitted.submitted, "-");
        assert_eq!(unsubmitted.duration, "0 minutes and 0 seconds");
    }
}
