//! Format codec between the external and storage forms of a question bank.
//!
//! Pure and synchronous. Every function is total: unknown type names are
//! never an error. [`to_question_type`] and [`to_external_label`] fall back to
//! [`QuestionType::SingleChoice`]; callers that need strict validation check
//! [`is_known_type`] first.

use crate::question::{QuestionCollection, QuestionType, StoredCollection};

/// Resolve a label, storage key or numeric code to a question type.
///
/// Lossy: anything unrecognised becomes [`QuestionType::SingleChoice`].
pub fn to_question_type(name: &str) -> QuestionType {
  parse_known(name).unwrap_or(QuestionType::SingleChoice)
}

/// `true` if `name` is a known label, storage key or numeric code.
pub fn is_known_type(name: &str) -> bool { parse_known(name).is_some() }

/// Map a label or storage key to its storage key.
///
/// Unknown names are normalised (lower-cased, whitespace runs replaced by
/// `_`) rather than rejected, so they survive a save untouched.
pub fn to_storage_key(label_or_key: &str) -> String {
  match parse_known(label_or_key) {
    Some(t) => t.storage_key().to_owned(),
    None => label_or_key
      .to_lowercase()
      .split_whitespace()
      .collect::<Vec<_>>()
      .join("_"),
  }
}

/// Map a storage key to its external label, falling back to the single
/// choice label for unknown keys.
pub fn to_external_label(storage_key: &str) -> &'static str {
  QuestionType::from_storage_key(storage_key)
    .unwrap_or(QuestionType::SingleChoice)
    .label()
}

/// External form → storage form. Lossless.
pub fn encode_collection(collection: &QuestionCollection) -> StoredCollection {
  collection
    .iter()
    .map(|(t, qs)| (t.storage_key().to_owned(), qs.to_vec()))
    .collect()
}

/// Storage form → external form.
///
/// Lossless for the five known keys. Unknown keys fall back to single choice;
/// when several keys land on the same type their lists are concatenated in
/// key order.
pub fn decode_collection(stored: StoredCollection) -> QuestionCollection {
  let mut collection = QuestionCollection::new();
  for (key, qs) in stored {
    let t = QuestionType::from_storage_key(&key)
      .unwrap_or(QuestionType::SingleChoice);
    collection.extend_type(t, qs);
  }
  collection
}

fn parse_known(name: &str) -> Option<QuestionType> {
  let name = name.trim();
  QuestionType::from_storage_key(name)
    .or_else(|| QuestionType::from_label(name))
    .or_else(|| name.parse::<u8>().ok().and_then(QuestionType::from_code))
}
