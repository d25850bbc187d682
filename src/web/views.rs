//! HTML rendering of the session page.
//!
//! K_i: Rendering is a pure function of (session state, config).
//! Every control is a plain form that posts and redirects back to `/`.

use crate::models::{Config, Evaluation, Letter, Outcome, Question, QuestionKey, Tier};
use crate::session::{Alert, Progress, SessionState};
use maud::{html, Markup, PreEscaped, DOCTYPE};

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; display: flex; color: #222; }
aside { width: 18rem; padding: 1rem; background: #f4f5f7; min-height: 100vh; box-sizing: border-box; }
main { flex: 1; padding: 1.5rem 2rem; max-width: 52rem; }
label { display: block; margin: 0.4rem 0; }
fieldset { border: none; padding: 0; margin: 0.5rem 0; }
.card { border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin: 0.75rem 0; }
.info { background: #e7f1fb; border-left: 4px solid #3b82f6; padding: 0.6rem 1rem; }
.error { background: #fdecec; border-left: 4px solid #dc2626; padding: 0.6rem 1rem; }
.correct { color: #15803d; font-weight: 600; }
.wrong { color: #b91c1c; font-weight: 600; }
.suggestion { background: #fff7e0; border-left: 4px solid #f59e0b; padding: 0.6rem 1rem; }
.muted { color: #666; font-size: 0.9rem; }
progress { width: 100%; }
table { border-collapse: collapse; width: 100%; }
td, th { border-bottom: 1px solid #eee; padding: 0.4rem; text-align: left; vertical-align: top; }
"#;

/// Locks the button and reveals the status line while the model runs.
const GENERATING_SCRIPT: &str =
    "this.querySelector('button').disabled=true;document.getElementById('generating').hidden=false";

/// Full page for one session.
pub fn page(state: &SessionState, config: &Config) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "QuizForge" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                (sidebar(state, config))
                main {
                    h1 { "QuizForge" }
                    p.muted { "Upload a PDF, generate a three-level quiz, answer and get feedback." }
                    @if let Some(alert) = state.alert() {
                        (alert_panel(alert))
                    }
                    @if let Some(info) = state.material_info() {
                        p.info { (info) }
                    }
                    @if state.quiz().is_some() {
                        (progress_bar(state.progress()))
                        (quiz_view(state))
                        form method="post" action="/finish" {
                            button type="submit" { "Finish quiz" }
                        }
                    } @else if state.upload().is_none() {
                        p { "Upload a PDF to get started." }
                    } @else {
                        p { "Adjust the settings if needed, then generate a quiz." }
                    }
                    @if let Some(evaluation) = state.results() {
                        (results_view(evaluation))
                    }
                }
            }
        }
    }
}

fn sidebar(state: &SessionState, config: &Config) -> Markup {
    let settings = state.settings();
    let size = config.chunking.chunk_size;
    let overlap = config.chunking.chunk_overlap;
    let per_level = config.quiz.questions_per_level;

    html! {
        aside {
            h3 { "Document" }
            form method="post" action="/upload" enctype="multipart/form-data" {
                input type="file" name="pdf" accept="application/pdf,.pdf" required;
                button type="submit" { "Upload" }
            }
            @if let Some(upload) = state.upload() {
                p.muted { "Loaded: " strong { (upload.file_name) } " (" (upload.len() / 1024) " KiB)" }
            }

            h3 { "Settings" }
            form method="post" action="/settings" {
                label {
                    "Chunk size"
                    input type="number" name="chunk_size" value=(settings.chunk_size)
                        min=(size.min) max=(size.max) step=(size.step);
                }
                label {
                    "Chunk overlap"
                    input type="number" name="chunk_overlap" value=(settings.chunk_overlap)
                        min=(overlap.min) max=(overlap.max) step=(overlap.step);
                }
                label {
                    "Questions per level"
                    input type="number" name="questions_per_level" value=(settings.questions_per_level)
                        min=(per_level.min) max=(per_level.max) step=(per_level.step);
                }
                button type="submit" { "Apply" }
            }

            h3 { "Quiz" }
            form method="post" action="/generate" onsubmit=(GENERATING_SCRIPT) {
                button type="submit" disabled[state.upload().is_none()] { "Generate quiz" }
            }
            p.muted #generating hidden { "Generating quiz, this can take a minute..." }
            form method="post" action="/retry" {
                button type="submit" { "Retry with same file" }
            }
            form method="post" action="/reset" {
                button type="submit" { "Start over" }
            }
        }
    }
}

fn alert_panel(alert: &Alert) -> Markup {
    html! {
        div.error {
            @match alert {
                Alert::Message(text) => {
                    p { (text) }
                }
                Alert::GenerationFailed(detail) => {
                    p { strong { "Quiz generation failed." } " Try generating again or adjust the settings." }
                    details {
                        summary { "Error details" }
                        pre { (detail) }
                    }
                }
            }
        }
    }
}

fn progress_bar(progress: Progress) -> Markup {
    html! {
        div.card {
            p {
                "Answered " strong { (progress.answered) } " of " (progress.total)
                " | Correct so far: " strong { (progress.provisional_score) }
                " | Remaining: " (progress.remaining)
            }
            progress value=(format!("{:.0}", progress.fraction() * 100.0)) max="100" {}
        }
    }
}

fn quiz_view(state: &SessionState) -> Markup {
    let Some(quiz) = state.quiz() else {
        return html! {};
    };
    html! {
        @for tier in Tier::ALL {
            section {
                h2 { (tier.label()) " questions" }
                @for (index, question) in quiz.tier(tier).iter().enumerate() {
                    (question_card(state, QuestionKey::new(tier, index), question))
                }
            }
        }
    }
}

fn question_card(state: &SessionState, key: QuestionKey, question: &Question) -> Markup {
    let locked = state.is_locked(key);
    let chosen = if locked {
        state.answers().get(key).and_then(Letter::from_exact)
    } else {
        state.pending(key)
    };

    html! {
        div.card id=(key.to_string()) {
            p { strong { "Q" (key.index + 1) ". " } (question.question) }
            form method="post" action=(format!("/question/{key}/select")) {
                fieldset disabled[locked] {
                    @for letter in Letter::ALL {
                        label {
                            input type="radio" name="letter" value=(letter.as_str())
                                checked[chosen == Some(letter)];
                            " " strong { (letter.as_str()) } ". " (question.option_text(letter))
                        }
                    }
                }
                @if !locked {
                    button type="submit" { "Choose" }
                    " "
                    button type="submit" formaction=(format!("/question/{key}/submit")) { "Submit" }
                    " "
                    button type="submit" formaction=(format!("/question/{key}/clear")) { "Clear" }
                }
            }
            @if let Some(outcome) = state.outcome(key) {
                (outcome_line(outcome))
                @if let (Outcome::Wrong { correct }) = outcome {
                    p {
                        "Correct answer: " strong { (correct.as_str()) } ": "
                        (question.option_text(correct))
                    }
                }
                p.muted { (question.explanation) }
            }
        }
    }
}

fn outcome_line(outcome: Outcome) -> Markup {
    html! {
        @match outcome {
            Outcome::Correct => {
                p.correct { (outcome.to_string()) }
            }
            Outcome::Wrong { .. } => {
                p.wrong { (outcome.to_string()) }
            }
        }
    }
}

fn results_view(evaluation: &Evaluation) -> Markup {
    let pct = evaluation.percentage() * 100.0;
    html! {
        section.card id="results" {
            h2 { "Results" }
            p { "Score: " strong { (evaluation.score) " / " (evaluation.total) } " (" (format!("{pct:.0}%")) ")" }
            progress value=(format!("{pct:.0}")) max="100" {}
            table {
                thead { tr { th { "#" } th { "Question" } th { "Result" } th { "Explanation" } } }
                tbody {
                    @for (n, entry) in evaluation.feedback.iter().enumerate() {
                        tr {
                            td { (n + 1) }
                            td { (entry.question) }
                            td { (outcome_line(entry.result)) }
                            td { (entry.explanation) }
                        }
                    }
                }
            }
            p.suggestion { (evaluation.suggestion().message()) }
        }
    }
}
