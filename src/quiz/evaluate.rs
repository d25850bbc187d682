//! Answer evaluation.
//!
//! K_i: Evaluation is a pure function of (answers, quiz).
//! K_i: Unanswered questions are wrong, never an error.

use crate::models::{AnswerRecord, Evaluation, FeedbackEntry, Outcome, Question, Quiz};

/// Compare one recorded answer with the question's ground truth.
///
/// Both sides are trimmed and uppercased before comparison.
pub fn check_answer(question: &Question, answer: Option<&str>) -> Outcome {
    let correct = normalize(question.correct.as_str());
    match answer.map(normalize) {
        Some(given) if given == correct => Outcome::Correct,
        _ => Outcome::Wrong {
            correct: question.correct,
        },
    }
}

/// Score every question in basic → intermediate → hard order.
pub fn evaluate_answers(answers: &AnswerRecord, quiz: &Quiz) -> Evaluation {
    let mut score = 0;
    let mut feedback = Vec::with_capacity(quiz.total_questions());

    for (key, question) in quiz.iter() {
        let result = check_answer(question, answers.get(key));
        if result.is_correct() {
            score += 1;
        }
        feedback.push(FeedbackEntry {
            question: question.question.clone(),
            result,
            explanation: question.explanation.clone(),
        });
    }

    Evaluation {
        score,
        total: feedback.len(),
        feedback,
    }
}

fn normalize(letter: &str) -> String {
    letter.trim().to_uppercase()
}
