//! Question import: validation and normalisation of user-supplied questions.
//!
//! The import payload is a JSON array of loosely-typed question objects.
//! Validation is strict about the fields a paper needs (`type`, `title`,
//! `answer`, a positive `score`) and lenient about everything else: ids are
//! always regenerated and unknown type names fall back to single choice.

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  question::{Question, QuestionCollection, QuestionType, default_difficulty},
};

/// A question as typed by a person, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawQuestion {
  #[serde(rename = "type")]
  pub question_type: Option<QuestionType>,
  pub title:         Option<String>,
  #[serde(default)]
  pub options:       Option<Vec<String>>,
  pub answer:        Option<String>,
  pub score:         Option<f64>,
  pub difficulty:    Option<f64>,
}

/// Parse and validate a JSON array of questions.
pub fn parse_questions(input: &str) -> Result<Vec<Question>> {
  let value: serde_json::Value = serde_json::from_str(input)?;
  let serde_json::Value::Array(items) = value else {
    return Err(Error::NotAnArray);
  };

  let raws = items
    .into_iter()
    .enumerate()
    .map(|(i, item)| {
      serde_json::from_value::<RawQuestion>(item).map_err(|e| Error::InvalidQuestion {
        index:  i + 1,
        reason: e.to_string(),
      })
    })
    .collect::<Result<Vec<_>>>()?;

  validate_questions(raws)
}

/// Validate already-deserialised questions and assign fresh ids.
///
/// `InvalidQuestion::index` is 1-based, matching what a person counting the
/// entries would expect.
pub fn validate_questions(raws: Vec<RawQuestion>) -> Result<Vec<Question>> {
  if raws.is_empty() {
    return Err(Error::EmptyImport);
  }

  raws
    .into_iter()
    .enumerate()
    .map(|(i, raw)| normalize(raw, i + 1))
    .collect()
}

/// Group questions by type, preserving input order within each type.
pub fn group_by_type(questions: Vec<Question>) -> QuestionCollection {
  let mut collection = QuestionCollection::new();
  for q in questions {
    let t = q.question_type;
    collection.extend_type(t, [q]);
  }
  collection
}

/// Check a collection that arrives whole, ids and all, against the same
/// field rules as an import. Indices count from 1 across the collection in
/// type order.
pub fn validate_collection(collection: &QuestionCollection) -> Result<()> {
  let questions = collection.iter().flat_map(|(_, qs)| qs.iter());
  for (i, q) in questions.enumerate() {
    let reason = if !has_text(&q.title) {
      "missing title"
    } else if !has_text(&q.answer) {
      "missing answer"
    } else if !valid_score(q.score) {
      SCORE_REASON
    } else {
      continue;
    };
    return Err(Error::InvalidQuestion {
      index:  i + 1,
      reason: reason.to_owned(),
    });
  }
  Ok(())
}

const SCORE_REASON: &str = "score must be a number greater than 0";

fn has_text(s: &str) -> bool { !s.trim().is_empty() }

fn valid_score(score: f64) -> bool { score.is_finite() && score > 0.0 }

fn normalize(raw: RawQuestion, index: usize) -> Result<Question> {
  let invalid = |reason: &str| Error::InvalidQuestion {
    index,
    reason: reason.to_owned(),
  };

  let question_type = raw.question_type.ok_or_else(|| invalid("missing type"))?;
  let title = raw
    .title
    .filter(|t| has_text(t))
    .ok_or_else(|| invalid("missing title"))?;
  let answer = raw
    .answer
    .filter(|a| has_text(a))
    .ok_or_else(|| invalid("missing answer"))?;
  let score = raw
    .score
    .filter(|s| valid_score(*s))
    .ok_or_else(|| invalid(SCORE_REASON))?;

  Ok(Question {
    id: new_question_id(),
    question_type,
    title,
    options: raw.options,
    answer,
    score,
    difficulty: raw.difficulty.unwrap_or_else(default_difficulty),
  })
}

fn new_question_id() -> String { format!("q_{}", Uuid::new_v4().simple()) }

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn parses_and_groups_a_mixed_batch() {
    let input = r#"[
      {"type": "单选题", "title": "1 + 1", "options": ["1", "2"], "answer": "B", "score": 2},
      {"type": "judge", "title": "the sky is blue", "answer": "true", "score": 1},
      {"type": 1, "title": "2 + 2", "options": ["4", "5"], "answer": "A", "score": 2, "difficulty": 3}
    ]"#;

    let questions = parse_questions(input).unwrap();
    assert_eq!(questions.len(), 3);
    assert_eq!(questions[0].difficulty, 1.0);
    assert_eq!(questions[2].difficulty, 3.0);

    let ids: HashSet<_> = questions.iter().map(|q| q.id.clone()).collect();
    assert_eq!(ids.len(), 3);
    assert!(questions.iter().all(|q| q.id.starts_with("q_")));

    let grouped = group_by_type(questions);
    let singles = grouped.get(QuestionType::SingleChoice).unwrap();
    assert_eq!(singles.len(), 2);
    assert_eq!(singles[0].title, "1 + 1");
    assert_eq!(singles[1].title, "2 + 2");
    assert_eq!(grouped.get(QuestionType::TrueFalse).unwrap().len(), 1);
  }

  #[test]
  fn unknown_type_name_falls_back_to_single_choice() {
    let questions =
      parse_questions(r#"[{"type": "essay", "title": "t", "answer": "a", "score": 5}]"#)
        .unwrap();
    assert_eq!(questions[0].question_type, QuestionType::SingleChoice);
  }

  #[test]
  fn rejects_non_positive_score_with_index() {
    let input = r#"[
      {"type": "single", "title": "ok", "answer": "a", "score": 1},
      {"type": "single", "title": "bad", "answer": "a", "score": 0}
    ]"#;
    let err = parse_questions(input).unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion { index: 2, .. }));
  }

  #[test]
  fn rejects_missing_fields() {
    let err = parse_questions(r#"[{"title": "t", "answer": "a", "score": 1}]"#).unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion { index: 1, ref reason } if reason == "missing type"));

    let err = parse_questions(r#"[{"type": "fill", "title": "t", "score": 1}]"#).unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion { ref reason, .. } if reason == "missing answer"));

    let err =
      parse_questions(r#"[{"type": "fill", "title": "t", "answer": "a", "score": "3"}]"#)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion { index: 1, .. }));
  }

  #[test]
  fn whole_collections_keep_ids_and_follow_import_rules() {
    let questions = parse_questions(
      r#"[
        {"type": "single", "title": "a", "answer": "A", "score": 1},
        {"type": "judge", "title": "b", "answer": "true", "score": 2}
      ]"#,
    )
    .unwrap();
    let mut collection = group_by_type(questions);
    assert!(validate_collection(&collection).is_ok());
    assert!(validate_collection(&QuestionCollection::new()).is_ok());

    let mut bad = collection.get(QuestionType::TrueFalse).unwrap()[0].clone();
    bad.score = 0.0;
    collection.extend_type(QuestionType::TrueFalse, [bad]);
    let err = validate_collection(&collection).unwrap_err();
    assert!(matches!(err, Error::InvalidQuestion { index: 3, ref reason } if reason == SCORE_REASON));
  }

  #[test]
  fn rejects_empty_and_non_array_payloads() {
    assert!(matches!(parse_questions("[]"), Err(Error::EmptyImport)));
    assert!(matches!(parse_questions("{}"), Err(Error::NotAnArray)));
    assert!(matches!(parse_questions("not json"), Err(Error::Serialization(_))));
  }
}
