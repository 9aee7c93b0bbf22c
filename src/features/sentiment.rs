use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunking::{Reduction, WindowContext, WindowReducer};
use crate::error::ReduceError;
use crate::features::columns_of;
use crate::models::FeatureColumns;

const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const FAMILY: &str = "sentiment";

pub const COLUMNS: &[&str] = &[
    "negative",
    "neutral",
    "positive",
    "compound",
    "abs_overall",
    "overall",
];

/// Polarity of one piece of text. `negative`, `neutral` and `positive` are
/// proportions summing to 1 (or all 0 for text with no tokens); `compound`
/// is normalised to `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PolarityScores {
    pub negative: f64,
    pub neutral: f64,
    pub positive: f64,
    pub compound: f64,
}

/// Scores message text. Implementations must be pure so families can run
/// on several threads at once.
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> PolarityScores;
}

// Approximates the asymptote of the compound score normalisation.
const NORMALIZATION_ALPHA: f64 = 15.0;
const NEGATION_SCALAR: f64 = -0.74;
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "none", "neither", "nor", "cannot", "isnt",
    "dont", "doesnt", "didnt", "wont", "cant", "aint", "wasnt", "arent",
];

/// Minimal built-in valences; enough to score chat without a lexicon file.
const BUILTIN_LEXICON: &[(&str, f64)] = &[
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("bad", -2.5),
    ("beautiful", 2.9),
    ("best", 3.2),
    ("boring", -1.3),
    ("clutch", 1.5),
    ("cool", 1.3),
    ("cringe", -1.8),
    ("dead", -3.3),
    ("fail", -2.5),
    ("fun", 2.3),
    ("gg", 1.2),
    ("good", 1.9),
    ("great", 3.1),
    ("hate", -2.7),
    ("haha", 2.0),
    ("happy", 2.7),
    ("hype", 1.6),
    ("insane", 1.4),
    ("lmao", 2.0),
    ("lol", 1.8),
    ("love", 3.2),
    ("nice", 1.8),
    ("pog", 2.0),
    ("rip", -1.8),
    ("sad", -2.1),
    ("scam", -2.6),
    ("terrible", -2.1),
    ("thanks", 1.9),
    ("trash", -1.9),
    ("ugly", -2.3),
    ("wow", 2.8),
    ("worst", -3.1),
    ("wtf", -2.8),
];

/// Lexicon-based scorer in the VADER manner: token valences, a simple
/// negation flip, and `x / sqrt(x² + α)` normalisation.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LexiconScorer {
    pub fn builtin() -> Self {
        Self {
            lexicon: BUILTIN_LEXICON
                .iter()
                .map(|(token, valence)| (token.to_string(), *valence))
                .collect(),
        }
    }

    /// Parses VADER lexicon text: `token<TAB>mean<TAB>...` per line. Lines
    /// without a numeric second field are ignored.
    pub fn from_vader_str(text: &str) -> Result<Self> {
        let lexicon: HashMap<String, f64> = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let token = fields.next()?.trim();
                let valence = fields.next()?.trim().parse::<f64>().ok()?;
                (!token.is_empty()).then(|| (token.to_lowercase(), valence))
            })
            .collect();
        anyhow::ensure!(!lexicon.is_empty(), "lexicon has no `token<TAB>score` lines");
        Ok(Self { lexicon })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lexicon {}", path.display()))?;
        let scorer = Self::from_vader_str(&text)
            .with_context(|| format!("Failed to parse lexicon {}", path.display()))?;
        log_info!("loaded {} lexicon entries from {}", scorer.len(), path.display());
        Ok(scorer)
    }

    pub fn len(&self) -> usize {
        self.lexicon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexicon.is_empty()
    }
}

impl SentimentScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> PolarityScores {
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|raw| {
                raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                    .to_lowercase()
                    .replace('\'', "")
            })
            .filter(|token| !token.is_empty())
            .collect();

        let mut valences = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter().enumerate() {
            let mut valence = self.lexicon.get(token).copied().unwrap_or(0.0);
            let negated = tokens[i.saturating_sub(3)..i]
                .iter()
                .any(|prior| NEGATIONS.contains(&prior.as_str()));
            if valence != 0.0 && negated {
                valence *= NEGATION_SCALAR;
            }
            valences.push(valence);
        }

        if valences.is_empty() {
            return PolarityScores::default();
        }

        let sum: f64 = valences.iter().sum();
        let compound = (sum / (sum * sum + NORMALIZATION_ALPHA).sqrt()).clamp(-1.0, 1.0);

        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut neutral = 0.0;
        for valence in valences {
            if valence > 0.0 {
                positive += valence + 1.0;
            } else if valence < 0.0 {
                negative += valence - 1.0;
            } else {
                neutral += 1.0;
            }
        }
        let total = positive + negative.abs() + neutral;

        PolarityScores {
            negative: negative.abs() / total,
            neutral: neutral / total,
            positive: positive / total,
            compound,
        }
    }
}

/// Label for a mean compound score.
pub fn overall_label(compound: f64, threshold: f64) -> &'static str {
    if compound >= threshold {
        "Positive"
    } else if compound <= -threshold {
        "Negative"
    } else {
        "Neutral"
    }
}

/// Mean polarity of the window's messages.
pub struct SentimentReducer {
    scorer: Arc<dyn SentimentScorer>,
    threshold: f64,
}

impl SentimentReducer {
    pub fn new(scorer: Arc<dyn SentimentScorer>, threshold: f64) -> Self {
        Self { scorer, threshold }
    }
}

impl WindowReducer for SentimentReducer {
    fn family(&self) -> &str {
        FAMILY
    }

    fn columns(&self) -> Vec<String> {
        columns_of(COLUMNS)
    }

    fn reduce(&self, ctx: &WindowContext<'_>) -> Result<Reduction, ReduceError> {
        let mut mean = PolarityScores::default();
        for event in ctx.events {
            let scores = self.scorer.polarity(&event.body);
            mean.negative += scores.negative;
            mean.neutral += scores.neutral;
            mean.positive += scores.positive;
            mean.compound += scores.compound;
        }
        let n = ctx.events.len().max(1) as f64;
        mean.negative /= n;
        mean.neutral /= n;
        mean.positive /= n;
        mean.compound /= n;

        let mut row = FeatureColumns::new();
        row.insert("negative".into(), mean.negative.into());
        row.insert("neutral".into(), mean.neutral.into());
        row.insert("positive".into(), mean.positive.into());
        row.insert("compound".into(), mean.compound.into());
        row.insert("abs_overall".into(), mean.compound.abs().into());
        row.insert("overall".into(), overall_label(mean.compound, self.threshold).into());
        Ok(Reduction::Row(row))
    }
}
