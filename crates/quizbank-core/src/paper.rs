//! Weighted-random paper assembly.
//!
//! Questions are drawn without replacement until the cumulative score reaches
//! the target. Each draw first picks a question type with probability
//! proportional to its ratio, then a uniformly random question of that type.
//! A type whose pool runs dry has its weight zeroed, so the loop always
//! terminates: target reached, no weighted type left, or every pool empty.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result, codec,
  question::{Question, QuestionCollection, QuestionType},
};

/// Relative weight per question type. Types absent from the map, or with a
/// non-positive weight, are never drawn.
pub type RatioMap = BTreeMap<QuestionType, f64>;

/// Build a [`RatioMap`] from type names (labels, storage keys or numeric
/// codes). Unknown names and negative or non-finite weights are rejected;
/// repeated types have their weights added, and must still sum to a finite
/// number.
pub fn parse_ratios<K: AsRef<str>>(
  entries: impl IntoIterator<Item = (K, f64)>,
) -> Result<RatioMap> {
  let mut ratios = RatioMap::new();
  for (key, weight) in entries {
    let key = key.as_ref();
    if !codec::is_known_type(key) {
      return Err(Error::InvalidRatio {
        key:    key.to_owned(),
        reason: "unknown question type".to_owned(),
      });
    }
    if !weight.is_finite() || weight < 0.0 {
      return Err(Error::InvalidRatio {
        key:    key.to_owned(),
        reason: "weight must be a non-negative number".to_owned(),
      });
    }
    let slot = ratios.entry(codec::to_question_type(key)).or_default();
    *slot += weight;
    if !slot.is_finite() {
      return Err(Error::InvalidRatio {
        key:    key.to_owned(),
        reason: "combined weight is too large".to_owned(),
      });
    }
  }
  Ok(ratios)
}

/// The outcome of [`generate_paper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPaper {
  pub questions:   Vec<Question>,
  pub total_score: f64,
  /// `target - total` when the bank ran out before the target was reached.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub shortfall:   Option<f64>,
}

/// Assemble a paper from `bank`.
pub fn generate_paper<R: Rng + ?Sized>(
  bank: &QuestionCollection,
  ratios: &RatioMap,
  target_score: f64,
  rng: &mut R,
) -> GeneratedPaper {
  let mut pools: BTreeMap<QuestionType, Vec<&Question>> = bank
    .iter()
    .map(|(t, qs)| (t, qs.iter().collect()))
    .collect();

  // Scan order is the bank's type order; ties resolve to the first match.
  let mut weights: Vec<(QuestionType, f64)> = pools
    .keys()
    .filter_map(|t| {
      let w = ratios.get(t).copied().unwrap_or(0.0);
      (w.is_finite() && w > 0.0).then_some((*t, w))
    })
    .collect();

  let mut questions = Vec::new();
  let mut total = 0.0;

  while total < target_score {
    let Some(t) = pick_type(&weights, rng) else { break };
    let pool = pools.entry(t).or_default();
    if pool.is_empty() {
      weights.retain(|(ty, _)| *ty != t);
      continue;
    }

    let chosen = pool.swap_remove(rng.gen_range(0..pool.len()));
    total += chosen.score;
    questions.push(chosen.clone());

    if pools.values().all(Vec::is_empty) {
      break;
    }
  }

  let missing = target_score - total;
  GeneratedPaper {
    questions,
    total_score: total,
    shortfall: (missing > 0.0).then_some(missing),
  }
}

fn pick_type<R: Rng + ?Sized>(
  weights: &[(QuestionType, f64)],
  rng: &mut R,
) -> Option<QuestionType> {
  // Weights are scaled by the largest so their sum stays finite.
  let max = weights.iter().map(|(_, w)| *w).fold(0.0, f64::max);
  if !max.is_finite() || max <= 0.0 {
    return None;
  }
  let total: f64 = weights.iter().map(|(_, w)| w / max).sum();

  let mut roll = rng.gen_range(0.0..total);
  for (t, w) in weights {
    roll -= w / max;
    if roll <= 0.0 {
      return Some(*t);
    }
  }
  weights.last().map(|(t, _)| *t)
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use rand::{SeedableRng, rngs::StdRng};

  use super::*;

  fn one_pointers(t: QuestionType, n: usize) -> Vec<Question> {
    (0..n)
      .map(|i| Question {
        id:            format!("{}-{i}", t.storage_key()),
        question_type: t,
        title:         format!("question {i}"),
        options:       None,
        answer:        "A".into(),
        score:         1.0,
        difficulty:    1.0,
      })
      .collect()
  }

  fn bank(entries: &[(QuestionType, usize)]) -> QuestionCollection {
    entries
      .iter()
      .map(|(t, n)| (*t, one_pointers(*t, *n)))
      .collect()
  }

  #[test]
  fn stops_once_target_reached() {
    let bank = bank(&[(QuestionType::SingleChoice, 5)]);
    let ratios = RatioMap::from([(QuestionType::SingleChoice, 100.0)]);
    let mut rng = StdRng::seed_from_u64(7);

    let paper = generate_paper(&bank, &ratios, 3.0, &mut rng);
    assert_eq!(paper.questions.len(), 3);
    assert_eq!(paper.total_score, 3.0);
    assert_eq!(paper.shortfall, None);

    let ids: HashSet<_> = paper.questions.iter().map(|q| &q.id).collect();
    assert_eq!(ids.len(), 3, "drawn without replacement");
  }

  #[test]
  fn reports_shortfall_when_pool_exhausted() {
    let bank = bank(&[(QuestionType::SingleChoice, 2)]);
    let ratios = RatioMap::from([(QuestionType::SingleChoice, 100.0)]);
    let mut rng = StdRng::seed_from_u64(1);

    let paper = generate_paper(&bank, &ratios, 3.0, &mut rng);
    assert_eq!(paper.questions.len(), 2);
    assert_eq!(paper.total_score, 2.0);
    assert_eq!(paper.shortfall, Some(1.0));
  }

  #[test]
  fn exhausted_type_is_dropped_and_others_keep_drawing() {
    let bank = bank(&[
      (QuestionType::SingleChoice, 1),
      (QuestionType::TrueFalse, 10),
    ]);
    let ratios = RatioMap::from([
      (QuestionType::SingleChoice, 90.0),
      (QuestionType::TrueFalse, 10.0),
    ]);
    let mut rng = StdRng::seed_from_u64(42);

    let paper = generate_paper(&bank, &ratios, 6.0, &mut rng);
    assert_eq!(paper.total_score, 6.0);
    let singles = paper
      .questions
      .iter()
      .filter(|q| q.question_type == QuestionType::SingleChoice)
      .count();
    assert!(singles <= 1);
  }

  #[test]
  fn unweighted_types_are_never_drawn() {
    let bank = bank(&[
      (QuestionType::SingleChoice, 3),
      (QuestionType::ShortAnswer, 3),
    ]);
    let ratios = RatioMap::from([(QuestionType::ShortAnswer, 1.0)]);
    let mut rng = StdRng::seed_from_u64(3);

    let paper = generate_paper(&bank, &ratios, 10.0, &mut rng);
    assert_eq!(paper.questions.len(), 3);
    assert!(
      paper
        .questions
        .iter()
        .all(|q| q.question_type == QuestionType::ShortAnswer)
    );
    assert_eq!(paper.shortfall, Some(7.0));
  }

  #[test]
  fn ratios_accept_labels_keys_and_codes() {
    let ratios =
      parse_ratios([("单选题", 2.0), ("judge", 1.0), ("5", 3.0), ("single", 1.0)])
        .unwrap();
    assert_eq!(ratios.get(&QuestionType::SingleChoice), Some(&3.0));
    assert_eq!(ratios.get(&QuestionType::TrueFalse), Some(&1.0));
    assert_eq!(ratios.get(&QuestionType::ShortAnswer), Some(&3.0));
  }

  #[test]
  fn ratios_reject_unknown_types_and_bad_weights() {
    assert!(matches!(
      parse_ratios([("essay", 1.0)]),
      Err(Error::InvalidRatio { ref key, .. }) if key == "essay"
    ));
    assert!(parse_ratios([("fill", -1.0)]).is_err());
    assert!(parse_ratios([("fill", f64::NAN)]).is_err());
  }

  #[test]
  fn ratios_reject_weights_that_overflow_when_combined() {
    assert!(matches!(
      parse_ratios([("single", 1e308), ("1", 1e308)]),
      Err(Error::InvalidRatio { ref key, .. }) if key == "1"
    ));
    assert!(parse_ratios([("single", 1e308), ("judge", 1e308)]).is_ok());
  }

  #[test]
  fn huge_weights_still_draw() {
    let bank = bank(&[
      (QuestionType::SingleChoice, 3),
      (QuestionType::TrueFalse, 3),
    ]);
    let ratios = parse_ratios([("single", 1e308), ("judge", 1e308)]).unwrap();
    let mut rng = StdRng::seed_from_u64(11);

    let paper = generate_paper(&bank, &ratios, 4.0, &mut rng);
    assert_eq!(paper.questions.len(), 4);
    assert_eq!(paper.shortfall, None);
  }

  #[test]
  fn no_weights_yields_empty_paper() {
    let bank = bank(&[(QuestionType::FillBlank, 4)]);
    let ratios = RatioMap::from([(QuestionType::MultipleChoice, 50.0)]);
    let mut rng = StdRng::seed_from_u64(0);

    let paper = generate_paper(&bank, &ratios, 5.0, &mut rng);
    assert!(paper.questions.is_empty());
    assert_eq!(paper.shortfall, Some(5.0));

    let paper = generate_paper(&bank, &RatioMap::new(), 0.0, &mut rng);
    assert!(paper.questions.is_empty());
    assert_eq!(paper.shortfall, None);
  }
}
