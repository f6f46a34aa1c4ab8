//! Question types and collections, the unit of content held in a role's question bank.
//!
//! A question is immutable once imported; a bank is replaced wholesale by
//! re-importing. Banks travel in two shapes: the external form
//! ([`QuestionCollection`], keyed by [`QuestionType`] and shown to people under
//! its label) and the internal storage form ([`StoredCollection`], keyed by a
//! short ASCII key). [`crate::codec`] converts between them.

use std::{collections::BTreeMap, fmt};

use serde::{
  Deserialize, Deserializer, Serialize, Serializer,
  ser::SerializeMap,
};

use crate::codec;

// ─── Question type ───────────────────────────────────────────────────────────

/// The five kinds of question a bank can hold.
///
/// Variant order is the canonical display order and the scan order used by
/// paper assembly.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "TypeRepr", into = "u8")]
pub enum QuestionType {
  SingleChoice,
  MultipleChoice,
  TrueFalse,
  FillBlank,
  ShortAnswer,
}

impl QuestionType {
  /// Every known type, in canonical order.
  pub const ALL: [QuestionType; 5] = [
    QuestionType::SingleChoice,
    QuestionType::MultipleChoice,
    QuestionType::TrueFalse,
    QuestionType::FillBlank,
    QuestionType::ShortAnswer,
  ];

  /// Numeric code used by older clients (1-based).
  pub fn code(self) -> u8 {
    match self {
      QuestionType::SingleChoice => 1,
      QuestionType::MultipleChoice => 2,
      QuestionType::TrueFalse => 3,
      QuestionType::FillBlank => 4,
      QuestionType::ShortAnswer => 5,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.code() == code)
  }

  /// Short ASCII key used in the storage form.
  pub fn storage_key(self) -> &'static str {
    match self {
      QuestionType::SingleChoice => "single",
      QuestionType::MultipleChoice => "multiple",
      QuestionType::TrueFalse => "judge",
      QuestionType::FillBlank => "fill",
      QuestionType::ShortAnswer => "short",
    }
  }

  pub fn from_storage_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|t| t.storage_key() == key)
  }

  /// Human-facing label.
  pub fn label(self) -> &'static str {
    match self {
      QuestionType::SingleChoice => "单选题",
      QuestionType::MultipleChoice => "多选题",
      QuestionType::TrueFalse => "判断题",
      QuestionType::FillBlank => "填空题",
      QuestionType::ShortAnswer => "简答题",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    let label = label.trim();
    Self::ALL.into_iter().find(|t| t.label() == label)
  }
}

impl fmt::Display for QuestionType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl From<QuestionType> for u8 {
  fn from(t: QuestionType) -> Self { t.code() }
}

/// Wire shapes accepted for a question type: a numeric code, a storage key or
/// a label. Anything unrecognised falls back to single choice.
#[derive(Deserialize)]
#[serde(untagged)]
enum TypeRepr {
  Code(u8),
  Name(String),
}

impl From<TypeRepr> for QuestionType {
  fn from(repr: TypeRepr) -> Self {
    match repr {
      TypeRepr::Code(code) => {
        QuestionType::from_code(code).unwrap_or(QuestionType::SingleChoice)
      }
      TypeRepr::Name(name) => codec::to_question_type(&name),
    }
  }
}

// ─── Question ────────────────────────────────────────────────────────────────

/// A single exam question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
  /// Generated at import time; unique within an import batch.
  pub id:            String,
  #[serde(rename = "type")]
  pub question_type: QuestionType,
  pub title:         String,
  /// Ordered answer options for choice questions.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub options:       Option<Vec<String>>,
  pub answer:        String,
  /// Always greater than zero for imported questions.
  pub score:         f64,
  #[serde(default = "default_difficulty")]
  pub difficulty:    f64,
}

pub(crate) fn default_difficulty() -> f64 { 1.0 }

// ─── Collections ─────────────────────────────────────────────────────────────

/// Storage form of a bank: short storage key to ordered question list.
pub type StoredCollection = BTreeMap<String, Vec<Question>>;

/// External form of a bank: question type to ordered question list.
///
/// Serialises as a JSON object keyed by type label (`"单选题"`, …).
/// Deserialisation accepts labels, storage keys or numeric codes as keys;
/// unknown keys fall back to single choice and their lists are concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionCollection(BTreeMap<QuestionType, Vec<Question>>);

impl QuestionCollection {
  pub fn new() -> Self { Self::default() }

  /// Append `questions` to the list held for `question_type`.
  pub fn extend_type(
    &mut self,
    question_type: QuestionType,
    questions: impl IntoIterator<Item = Question>,
  ) {
    self.0.entry(question_type).or_default().extend(questions);
  }

  pub fn get(&self, question_type: QuestionType) -> Option<&[Question]> {
    self.0.get(&question_type).map(Vec::as_slice)
  }

  pub fn iter(&self) -> impl Iterator<Item = (QuestionType, &[Question])> {
    self.0.iter().map(|(t, qs)| (*t, qs.as_slice()))
  }

  /// Number of question types present (including empty lists).
  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// Total number of questions across all types.
  pub fn question_count(&self) -> usize { self.0.values().map(Vec::len).sum() }

  pub fn into_inner(self) -> BTreeMap<QuestionType, Vec<Question>> { self.0 }
}

impl From<BTreeMap<QuestionType, Vec<Question>>> for QuestionCollection {
  fn from(map: BTreeMap<QuestionType, Vec<Question>>) -> Self { Self(map) }
}

impl FromIterator<(QuestionType, Vec<Question>)> for QuestionCollection {
  fn from_iter<I: IntoIterator<Item = (QuestionType, Vec<Question>)>>(
    iter: I,
  ) -> Self {
    let mut collection = Self::new();
    for (t, qs) in iter {
      collection.extend_type(t, qs);
    }
    collection
  }
}

impl Serialize for QuestionCollection {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.0.len()))?;
    for (t, qs) in &self.0 {
      map.serialize_entry(t.label(), qs)?;
    }
    map.end()
  }
}

impl<'de> Deserialize<'de> for QuestionCollection {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = BTreeMap::<String, Vec<Question>>::deserialize(deserializer)?;
    Ok(
      raw
        .into_iter()
        .map(|(key, qs)| (codec::to_question_type(&key), qs))
        .collect(),
    )
  }
}
