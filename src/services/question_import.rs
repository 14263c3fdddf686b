//! Bulk question ingestion from the delimited text format admins paste in:
//!
//! ```text
//! What is 2 + 2?
//! =====
//! 3
//! =====
//! #4
//! +++++
//! Next question...
//! ```
//!
//! Records are separated by `+++++`, the question text and its options by
//! `=====`, and the correct option carries a leading `#`.

use rand::seq::SliceRandom;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::metrics::QUESTION_BATCH_IMPORTED_TOTAL;
use crate::core::time::primitive_now_utc;
use crate::repositories;

pub(crate) const QUESTION_DELIMITER: &str = "+++++";
pub(crate) const OPTION_DELIMITER: &str = "=====";
pub(crate) const CORRECT_MARKER: char = '#';

#[derive(Debug, Error)]
pub(crate) enum ImportError {
    #[error("question batch {0} not found")]
    BatchNotFound(String),
    #[error("database error during question import: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedOption {
    pub(crate) text: String,
    pub(crate) correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedQuestion {
    pub(crate) text: String,
    pub(crate) options: Vec<ParsedOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParseReport {
    pub(crate) questions: Vec<ParsedQuestion>,
    pub(crate) skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) batch_id: String,
    pub(crate) imported: usize,
    pub(crate) skipped: usize,
    pub(crate) already_processed: bool,
}

pub(crate) fn parse_batch(raw: &str) -> ParseReport {
    let mut report = ParseReport::default();

    for record in raw.split(QUESTION_DELIMITER) {
        let record = record.trim();
        if record.is_empty() {
            continue;
        }

        match parse_record(record) {
            Some(question) => report.questions.push(question),
            None => report.skipped += 1,
        }
    }

    report
}

/// `None` for a record without question text, without options, or without
/// an option marked correct.
fn parse_record(record: &str) -> Option<ParsedQuestion> {
    let mut parts = record.split(OPTION_DELIMITER);
    let text = parts.next()?.trim();
    if text.is_empty() {
        return None;
    }

    let options: Vec<ParsedOption> = parts
        .filter_map(|part| {
            let part = part.trim();
            let (body, correct) = match part.strip_prefix(CORRECT_MARKER) {
                Some(rest) => (rest.trim(), true),
                None => (part, false),
            };
            (!body.is_empty()).then(|| ParsedOption { text: body.to_string(), correct })
        })
        .collect();

    if options.is_empty() || !options.iter().any(|option| option.correct) {
        return None;
    }

    Some(ParsedQuestion { text: text.to_string(), options })
}

/// Imports an unprocessed batch into questions and options. The batch row
/// is locked for the duration; a processed batch is left alone.
pub(crate) async fn process_batch(
    pool: &PgPool,
    batch_id: &str,
) -> Result<ImportSummary, ImportError> {
    let mut tx = pool.begin().await?;

    let batch = repositories::question_batches::lock_by_id(&mut *tx, batch_id)
        .await?
        .ok_or_else(|| ImportError::BatchNotFound(batch_id.to_string()))?;

    if batch.is_processed {
        tx.rollback().await?;
        return Ok(ImportSummary {
            batch_id: batch.id,
            imported: 0,
            skipped: 0,
            already_processed: true,
        });
    }

    let ParseReport { mut questions, skipped } = parse_batch(&batch.raw_text);
    {
        let mut rng = rand::thread_rng();
        for question in &mut questions {
            question.options.shuffle(&mut rng);
        }
    }

    let now = primitive_now_utc();
    let existing = repositories::questions::count_for_quiz(&mut *tx, &batch.quiz_id).await?;
    let first_order = i32::try_from(existing).unwrap_or(i32::MAX);

    for (offset, parsed) in questions.iter().enumerate() {
        let question_id = Uuid::new_v4().to_string();
        let order_index = first_order.saturating_add(i32::try_from(offset).unwrap_or(i32::MAX));
        repositories::questions::create(
            &mut *tx,
            repositories::questions::NewQuestion {
                id: &question_id,
                quiz_id: &batch.quiz_id,
                question_text: &parsed.text,
                score: batch.score,
                order_index,
                created_at: now,
            },
        )
        .await?;

        for (position, option) in parsed.options.iter().enumerate() {
            let option_id = Uuid::new_v4().to_string();
            repositories::question_options::create(
                &mut *tx,
                repositories::question_options::NewOption {
                    id: &option_id,
                    question_id: &question_id,
                    option_text: &option.text,
                    is_correct: option.correct,
                    position: i32::try_from(position).unwrap_or(i32::MAX),
                },
            )
            .await?;
        }
    }

    repositories::question_batches::mark_processed(&mut *tx, &batch.id, now).await?;
    tx.commit().await?;

    metrics::counter!(QUESTION_BATCH_IMPORTED_TOTAL).increment(questions.len() as u64);
    tracing::info!(
        batch_id = %batch.id,
        quiz_id = %batch.quiz_id,
        imported = questions.len(),
        skipped,
        "Question batch imported"
    );

    Ok(ImportSummary {
        batch_id: batch.id,
        imported: questions.len(),
        skipped,
        already_processed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(text: &str, correct: bool) -> ParsedOption {
        ParsedOption { text: text.to_string(), correct }
    }

    #[test]
    fn parses_questions_and_marks_correct_option() {
        let raw = "Capital of Uzbekistan?\n=====\nSamarkand\n=====\n# Tashkent \n=====\nBukhara\n\
                   +++++\n2 + 2?\n=====\n#4\n=====\n5\n";

        let report = parse_batch(raw);

        assert_eq!(report.skipped, 0);
        assert_eq!(
            report.questions,
            vec![
                ParsedQuestion {
                    text: "Capital of Uzbekistan?".to_string(),
                    options: vec![
                        option("Samarkand", false),
                        option("Tashkent", true),
                        option("Bukhara", false),
                    ],
                },
                ParsedQuestion {
                    text: "2 + 2?".to_string(),
                    options: vec![option("4", true), option("5", false)],
                },
            ]
        );
    }

    #[test]
    fn skips_records_without_correct_option_or_options() {
        let raw = "No marker\n=====\nA\n=====\nB\n+++++\nNo options at all\n+++++\n\
                   Valid\n=====\n#Yes\n";

        let report = parse_batch(raw);

        assert_eq!(report.skipped, 2);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.questions[0].text, "Valid");
    }

    #[test]
    fn blank_records_and_options_are_dropped() {
        let raw = "+++++\n   \n+++++\nQ\n=====\n\n=====\n#\n=====\n#A\n=====\n  \n";

        let report = parse_batch(raw);

        assert_eq!(report.skipped, 0);
        assert_eq!(report.questions, vec![ParsedQuestion {
            text: "Q".to_string(),
            options: vec![option("A", true)],
        }]);
    }

    #[test]
    fn record_without_question_text_is_skipped() {
        let report = parse_batch("=====\n#A\n=====\nB");

        assert!(report.questions.is_empty());
        assert_eq!(report.skipped, 1);
    }
}
