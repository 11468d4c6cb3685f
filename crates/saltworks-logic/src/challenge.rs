//! Formula/name quiz construction for a cation/anion pair.
//!
//! Curated pairings supply the answer and a pool of distractors. Pairs
//! without a pairing fall back to combining each ion's own labeled mistakes.

use crate::catalog::{CompoundPairing, FeedbackEntry};
use crate::chemistry::{format_formula_segment, formula_to_html, stoichiometric_counts};
use crate::species::{CompoundKey, Species};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const CHALLENGE_PROMPT: &str = "Identify the correct formula and name.";

/// Curated distractors drawn per track.
pub const CURATED_MISTAKES: usize = 2;

/// Upper bound on options per track.
pub const MAX_OPTIONS: usize = 3;

/// Mistake tags in the order the fallback generator prefers them.
const TAG_PRIORITY: [&str; 6] = [
    "Mistake #1",
    "Mistake #4",
    "Mistake #2",
    "Mistake #5",
    "Mistake #3",
    "Mistake #7",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizTrack {
    Formula,
    Name,
}

impl QuizTrack {
    pub const ALL: [QuizTrack; 2] = [QuizTrack::Formula, QuizTrack::Name];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub value: String,
    pub display_html: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: Option<String>,
    pub html: Option<String>,
    pub option_html: Option<String>,
}

impl From<&FeedbackEntry> for Feedback {
    fn from(entry: &FeedbackEntry) -> Self {
        Self {
            text: entry.feedback.clone(),
            html: entry.feedback_html.clone(),
            option_html: entry.option_html.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChallengeError {
    #[error("That pairing is not available yet. Try another match.")]
    NoChallengeAvailable,
}

/// A fully built two-track quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub key: CompoundKey,
    pub prompt: String,
    pub difficulty: String,
    pub correct_formula: String,
    pub correct_name: String,
    pub formula_options: Vec<QuizOption>,
    pub name_options: Vec<QuizOption>,
    /// Keyed by option value and by option HTML.
    pub formula_feedback: BTreeMap<String, Feedback>,
    pub name_feedback: BTreeMap<String, Feedback>,
}

impl Challenge {
    pub fn options(&self, track: QuizTrack) -> &[QuizOption] {
        match track {
            QuizTrack::Formula => &self.formula_options,
            QuizTrack::Name => &self.name_options,
        }
    }

    pub fn correct(&self, track: QuizTrack) -> &str {
        match track {
            QuizTrack::Formula => &self.correct_formula,
            QuizTrack::Name => &self.correct_name,
        }
    }

    pub fn is_correct(&self, track: QuizTrack, value: &str) -> bool {
        self.correct(track) == value
    }

    pub fn has_option(&self, track: QuizTrack, value: &str) -> bool {
        self.options(track).iter().any(|o| o.value == value)
    }

    /// Feedback for a picked option: exact key first, then a trimmed,
    /// case-insensitive match.
    pub fn feedback_for(&self, track: QuizTrack, value: &str) -> Option<&Feedback> {
        let map = match track {
            QuizTrack::Formula => &self.formula_feedback,
            QuizTrack::Name => &self.name_feedback,
        };
        if let Some(entry) = map.get(value) {
            return Some(entry);
        }
        let wanted = normalize(value);
        map.iter()
            .find(|(k, _)| normalize(k) == wanted)
            .map(|(_, v)| v)
    }

    /// `Correct formula: X • Correct name: Y.`
    pub fn reveal_text(&self) -> String {
        format!(
            "Correct formula: {} • Correct name: {}.",
            self.correct_formula, self.correct_name
        )
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Neutral formula from stoichiometric counts, e.g. `Ca3(PO4)2`.
pub fn compute_neutral_formula(cation: &Species, anion: &Species) -> String {
    let s = stoichiometric_counts(cation.charge_magnitude, anion.charge_magnitude);
    format!(
        "{}{}",
        format_formula_segment(&cation.formula, s.cations),
        format_formula_segment(&anion.formula, s.anions)
    )
}

/// `{cation name} {anion name}`.
pub fn compute_compound_name(cation: &Species, anion: &Species) -> String {
    format!("{} {}", cation.name, anion.name).trim().to_string()
}

/// Build the quiz for one cation and one anion.
pub fn build_challenge(
    cation: &Species,
    anion: &Species,
    pairing: Option<&CompoundPairing>,
    level: u32,
    rng: &mut impl Rng,
) -> Result<Challenge, ChallengeError> {
    let computed_formula = compute_neutral_formula(cation, anion);
    let computed_name = compute_compound_name(cation, anion);

    let (correct_formula, correct_name, formula_options, name_options, formula_feedback, name_feedback) =
        match pairing {
            Some(p) => {
                let formula = p.correct.formula.clone().unwrap_or(computed_formula);
                let name = p.correct.name.clone().unwrap_or(computed_name);
                let formula_feedback = feedback_map(&p.feedback.formula);
                let name_feedback = feedback_map(&p.feedback.name);
                let formula_options = curated_options(&formula, &p.mistakes.formula, rng)
                    .into_iter()
                    .map(|value| QuizOption {
                        display_html: formula_feedback
                            .get(&value)
                            .and_then(|f| f.option_html.clone())
                            .unwrap_or_else(|| formula_to_html(&value)),
                        value,
                    })
                    .collect();
                let name_options = curated_options(&name, &p.mistakes.name, rng)
                    .into_iter()
                    .map(|value| QuizOption {
                        display_html: name_feedback
                            .get(&value)
                            .and_then(|f| f.option_html.clone())
                            .unwrap_or_else(|| value.clone()),
                        value,
                    })
                    .collect();
                (formula, name, formula_options, name_options, formula_feedback, name_feedback)
            }
            None => {
                let formula_options = plain_options(build_formula_options(cation, anion, &computed_formula, rng));
                let name_options = plain_options(build_name_options(cation, anion, &computed_name, rng));
                (
                    computed_formula,
                    computed_name,
                    formula_options,
                    name_options,
                    BTreeMap::new(),
                    BTreeMap::new(),
                )
            }
        };

    if formula_options.is_empty() || name_options.is_empty() {
        return Err(ChallengeError::NoChallengeAvailable);
    }

    Ok(Challenge {
        key: CompoundKey::new(cation.symbol.clone(), anion.symbol.clone()),
        prompt: CHALLENGE_PROMPT.to_string(),
        difficulty: format!("Level {}", level),
        correct_formula,
        correct_name,
        formula_options,
        name_options,
        formula_feedback,
        name_feedback,
    })
}

fn plain_options(values: Vec<String>) -> Vec<QuizOption> {
    values
        .into_iter()
        .map(|value| QuizOption {
            display_html: value.clone(),
            value,
        })
        .collect()
}

fn feedback_map(entries: &[FeedbackEntry]) -> BTreeMap<String, Feedback> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let feedback = Feedback::from(entry);
        if let Some(html) = &entry.option_html {
            map.insert(html.clone(), feedback.clone());
        }
        map.insert(entry.option.clone(), feedback);
    }
    map
}

/// Correct value plus up to two random curated mistakes, shuffled.
fn curated_options(correct: &str, mistakes: &[String], rng: &mut impl Rng) -> Vec<String> {
    let mut pool: Vec<&String> = Vec::new();
    for m in mistakes {
        if m != correct && !pool.contains(&m) {
            pool.push(m);
        }
    }
    pool.shuffle(rng);
    let mut values = vec![correct.to_string()];
    values.extend(pool.into_iter().take(CURATED_MISTAKES).cloned());
    values.shuffle(rng);
    values
}

/// Tags present on both ions, in priority order then any others.
pub fn shared_mistake_tags(
    cation: &BTreeMap<String, String>,
    anion: &BTreeMap<String, String>,
) -> Vec<String> {
    let shared: Vec<&String> = cation.keys().filter(|t| anion.contains_key(*t)).collect();
    let mut ordered: Vec<String> = TAG_PRIORITY
        .iter()
        .filter(|t| shared.iter().any(|s| s.as_str() == **t))
        .map(|t| t.to_string())
        .collect();
    for tag in shared {
        if !ordered.contains(tag) {
            ordered.push(tag.clone());
        }
    }
    ordered
}

/// Distinct mistake values: priority tags first, then every other tag.
fn ordered_mistake_values(mistakes: &BTreeMap<String, String>) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    let priority = TAG_PRIORITY.iter().filter_map(|tag| mistakes.get(*tag));
    for v in priority.chain(mistakes.values()) {
        if !v.is_empty() && !values.contains(v) {
            values.push(v.clone());
        }
    }
    values
}

/// Insertion-ordered set capped at [`MAX_OPTIONS`].
struct OptionSet(Vec<String>);

impl OptionSet {
    fn new(correct: &str) -> Self {
        Self(vec![correct.to_string()])
    }

    fn add(&mut self, value: String) {
        if !value.is_empty() && !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    fn full(&self) -> bool {
        self.0.len() >= MAX_OPTIONS
    }

    fn finish(self, rng: &mut impl Rng) -> Vec<String> {
        let mut values: Vec<String> = self.0.into_iter().take(MAX_OPTIONS).collect();
        values.shuffle(rng);
        values
    }
}

/// Procedural formula distractors for pairs without a curated pairing.
pub fn build_formula_options(
    cation: &Species,
    anion: &Species,
    correct: &str,
    rng: &mut impl Rng,
) -> Vec<String> {
    let join = |c: &str, a: &str| format!("{}{}", c, a);
    build_fallback(
        correct,
        (&cation.formula_mistakes, cation.formula.as_str()),
        (&anion.formula_mistakes, anion.formula.as_str()),
        join,
        |size| format!("{}{}{}", cation.formula, anion.formula, size),
        rng,
    )
}

/// Procedural name distractors for pairs without a curated pairing.
pub fn build_name_options(
    cation: &Species,
    anion: &Species,
    correct: &str,
    rng: &mut impl Rng,
) -> Vec<String> {
    let join = |c: &str, a: &str| format!("{} {}", c, a).trim().to_string();
    build_fallback(
        correct,
        (&cation.name_mistakes, cation.name.as_str()),
        (&anion.name_mistakes, anion.name.as_str()),
        join,
        |size| format!("{} {} ({})", cation.name, anion.name, size),
        rng,
    )
}

fn build_fallback(
    correct: &str,
    cation: (&BTreeMap<String, String>, &str),
    anion: (&BTreeMap<String, String>, &str),
    join: impl Fn(&str, &str) -> String,
    placeholder: impl Fn(usize) -> String,
    rng: &mut impl Rng,
) -> Vec<String> {
    let (cation_mistakes, cation_correct) = cation;
    let (anion_mistakes, anion_correct) = anion;
    let mut options = OptionSet::new(correct);

    for tag in shared_mistake_tags(cation_mistakes, anion_mistakes)
        .iter()
        .take(MAX_OPTIONS)
    {
        if let (Some(c), Some(a)) = (cation_mistakes.get(tag), anion_mistakes.get(tag)) {
            let assembled = join(c, a);
            if assembled != correct {
                options.add(assembled);
            }
        }
    }

    if options.0.len() == 1 {
        let tag = TAG_PRIORITY[0];
        if let (Some(c), Some(a)) = (cation_mistakes.get(tag), anion_mistakes.get(tag)) {
            let fallback = join(c, a);
            if fallback != correct {
                options.add(fallback);
            }
        }
    }

    let cation_values = ordered_mistake_values(cation_mistakes);
    let anion_values = ordered_mistake_values(anion_mistakes);

    for c in &cation_values {
        if options.full() {
            break;
        }
        options.add(join(c, anion_correct));
    }
    for a in &anion_values {
        if options.full() {
            break;
        }
        options.add(join(cation_correct, a));
    }
    for (c, a) in cation_values.iter().zip(anion_values.iter()) {
        if options.full() {
            break;
        }
        options.add(join(c, a));
    }

    let mut n = options.0.len();
    while !options.full() {
        options.add(placeholder(n));
        n += 1;
    }

    options.finish(rng)
}
