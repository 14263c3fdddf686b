//! Result aggregation for a finished attempt.
//!
//! Inputs are plain slices so the arithmetic can be checked without a
//! database; `services::attempts` loads the rows and persists the summary.

#[derive(Debug, Clone, Copy)]
pub(crate) struct QuestionScore<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) score: i32,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ResponseMark<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) has_selection: bool,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResultSummary {
    pub(crate) total_questions: i32,
    pub(crate) correct_answers: i32,
    pub(crate) wrong_answers: i32,
    pub(crate) unanswered: i32,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: f64,
    pub(crate) passed: bool,
}

pub(crate) fn compute(
    questions: &[QuestionScore<'_>],
    responses: &[ResponseMark<'_>],
    passing_score: i32,
) -> ResultSummary {
    // Responses for questions deleted since they were saved do not count.
    let responses: Vec<&ResponseMark<'_>> = responses
        .iter()
        .filter(|response| questions.iter().any(|q| q.question_id == response.question_id))
        .collect();

    let total_questions = count(questions.len());
    let correct_answers = count(responses.iter().filter(|r| r.is_correct).count());
    let wrong_answers = count(responses.iter().filter(|r| r.has_selection && !r.is_correct).count());
    let recorded = count(responses.len());
    let unanswered = (total_questions - recorded).max(0);

    let max_score: i32 = questions.iter().map(|q| q.score).sum();
    let total_score: i32 = questions
        .iter()
        .filter(|question| {
            responses.iter().any(|r| r.question_id == question.question_id && r.is_correct)
        })
        .map(|question| question.score)
        .sum();

    let percentage = percentage(total_score, max_score);

    ResultSummary {
        total_questions,
        correct_answers,
        wrong_answers,
        unanswered,
        total_score,
        max_score,
        percentage,
        passed: percentage >= f64::from(passing_score),
    }
}

/// `total / max * 100` rounded to two decimals; zero for an empty quiz.
pub(crate) fn percentage(total_score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    let raw = f64::from(total_score.max(0)) / f64::from(max_score) * 100.0;
    round2(raw)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Five-point grade shown next to a percentage.
pub(crate) fn grade(percentage: f64) -> u8 {
    if percentage >= 86.0 {
        5
    } else if percentage >= 71.0 {
        4
    } else if percentage >= 60.0 {
        3
    } else {
        2
    }
}

fn count(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions() -> Vec<QuestionScore<'static>> {
        vec![
            QuestionScore { question_id: "q1", score: 1 },
            QuestionScore { question_id: "q2", score: 1 },
        ]
    }

    #[test]
    fn one_correct_one_unanswered_is_fifty_percent() {
        let responses =
            [ResponseMark { question_id: "q1", has_selection: true, is_correct: true }];

        let summary = compute(&questions(), &responses, 60);

        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.wrong_answers, 0);
        assert_eq!(summary.unanswered, 1);
        assert_eq!(summary.total_score, 1);
        assert_eq!(summary.max_score, 2);
        assert_eq!(summary.percentage, 50.0);
        assert!(!summary.passed);

        assert!(compute(&questions(), &responses, 50).passed);
    }

    #[test]
    fn counts_always_add_up() {
        let questions = vec![
            QuestionScore { question_id: "a", score: 2 },
            QuestionScore { question_id: "b", score: 3 },
            QuestionScore { question_id: "c", score: 5 },
            QuestionScore { question_id: "d", score: 1 },
        ];
        let responses = [
            ResponseMark { question_id: "a", has_selection: true, is_correct: true },
            ResponseMark { question_id: "b", has_selection: true, is_correct: false },
            ResponseMark { question_id: "c", has_selection: true, is_correct: true },
        ];

        let summary = compute(&questions, &responses, 60);

        assert_eq!(
            summary.correct_answers + summary.wrong_answers + summary.unanswered,
            summary.total_questions
        );
        assert_eq!(summary.total_score, 7);
        assert_eq!(summary.max_score, 11);
        assert_eq!(summary.percentage, 63.64);
        assert!(summary.passed);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let summary = compute(&[], &[], 0);

        assert_eq!(summary.percentage, 0.0);
        assert_eq!(summary.max_score, 0);
        assert_eq!(summary.unanswered, 0);
        assert!(summary.passed);
    }

    #[test]
    fn responses_for_unknown_questions_are_ignored() {
        let responses = [
            ResponseMark { question_id: "gone", has_selection: true, is_correct: true },
            ResponseMark { question_id: "q2", has_selection: true, is_correct: false },
        ];

        let summary = compute(&questions(), &responses, 60);

        assert_eq!(summary.correct_answers, 0);
        assert_eq!(summary.wrong_answers, 1);
        assert_eq!(summary.unanswered, 1);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn percentage_rounds_to_two_places() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(grade(100.0), 5);
        assert_eq!(grade(86.0), 5);
        assert_eq!(grade(85.99), 4);
        assert_eq!(grade(71.0), 4);
        assert_eq!(grade(60.0), 3);
        assert_eq!(grade(59.99), 2);
    }
}
