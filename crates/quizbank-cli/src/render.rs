//! Plain-text rendering for terminal output.

use std::fmt::Write as _;

use quizbank_core::{
  paper::GeneratedPaper,
  question::{Question, QuestionCollection},
  role::Role,
};

/// Render a generated paper as numbered text, one block per question.
pub fn paper(title: &str, paper: &GeneratedPaper) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{title}");
  let _ = writeln!(
    out,
    "Questions: {}  Total score: {}",
    paper.questions.len(),
    paper.total_score
  );
  if let Some(short) = paper.shortfall {
    let _ = writeln!(out, "Short of target by {short} points");
  }

  for (i, q) in paper.questions.iter().enumerate() {
    out.push('\n');
    question(&mut out, i + 1, q);
  }
  out
}

fn question(out: &mut String, number: usize, q: &Question) {
  let _ = writeln!(
    out,
    "{number}. [{}] {} ({}分)",
    q.question_type.label(),
    q.title,
    q.score
  );
  for (letter, option) in ('A'..='Z').zip(q.options.iter().flatten()) {
    let _ = writeln!(out, "   {letter}. {option}");
  }
  let _ = writeln!(out, "   Difficulty: {}  Answer: {}", q.difficulty, q.answer);
}

/// One line per question type with its count.
pub fn bank_summary(bank: &QuestionCollection) -> String {
  let mut out = String::new();
  for (t, qs) in bank.iter() {
    let _ = writeln!(out, "  {}: {}", t.label(), qs.len());
  }
  let _ = writeln!(out, "  total: {}", bank.question_count());
  out
}

pub fn role_line(role: &Role) -> String {
  format!(
    "{}\t{}\t{}",
    role.id,
    role.display_name,
    role.created_at.format("%Y-%m-%d %H:%M")
  )
}
