//! Prompt construction for quiz generation.

/// Render the generation prompt for `content` with `per_level`
/// questions in each tier.
///
/// K_i: the model is told the exact top-level keys, option letters and
/// per-tier count that validation will later enforce.
pub fn build_quiz_prompt(content: &str, per_level: usize) -> String {
    format!(
        r#"You are an AI quiz generator. Based on the study material, create a STRICT JSON object with exactly:
- {per_level} Basic questions (easy)
- {per_level} Intermediate questions
- {per_level} Hard questions

Each question MUST be an object with:
- "question": string
- "options": {{ "A": string, "B": string, "C": string, "D": string }}
- "correct": one of "A","B","C","D"
- "explanation": string (1–2 lines)

Important rules:
- Output JSON ONLY, no prose before or after.
- Do NOT include backticks.
- All values must be plain strings (no nested JSON inside strings).
- The JSON top-level keys must be exactly: "basic", "intermediate", "hard".

Study material:
{content}

Output JSON ONLY:
{{
  "basic": [ {{ "question": "...", "options": {{ "A": "...", "B": "...", "C": "...", "D": "..." }}, "correct": "A", "explanation": "..." }} ],
  "intermediate": [],
  "hard": []
}}
"#
    )
}
