use crate::slides::SlideFact;
use std::collections::HashSet;

/// Slides forwarded to the model per question.
pub const DEFAULT_TOP_N: usize = 5;

/// Flat bonus when a slide's key is quoted in the question.
pub const KEY_MENTION_BONUS: u32 = 5;

const MIN_TOKEN_CHARS: usize = 3;
const MAX_TOKEN_CHARS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSlide<'a> {
    pub slide: &'a SlideFact,
    pub score: u32,
}

// Latin-1 supplement and Latin Extended-A count as letters so Nordic and
// other European words survive tokenization.
fn is_token_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('\u{00C0}'..='\u{017F}').contains(&c)
}

/// Lower-cases `text` and splits it into 3..=32 character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !is_token_char(c))
        .filter(|t| {
            let len = t.chars().count();
            (MIN_TOKEN_CHARS..=MAX_TOKEN_CHARS).contains(&len)
        })
        .map(str::to_string)
        .collect()
}

/// Scores one slide against a prepared question.
///
/// Every slide token found in the question set counts, so a slide repeating a
/// question word scores once per repetition.
fn score_slide(question_lower: &str, question_tokens: &HashSet<String>, slide: &SlideFact) -> u32 {
    let haystack = format!(
        "{} {} {} {}",
        slide.name, slide.key, slide.script, slide.text
    );
    let mut score = tokenize(&haystack)
        .iter()
        .filter(|t| question_tokens.contains(*t))
        .count() as u32;

    let key = slide.key.to_lowercase();
    if !key.is_empty() && question_lower.contains(&key) {
        score += KEY_MENTION_BONUS;
    }
    score
}

/// Scores every slide and sorts by descending score; ties keep dataset order.
pub fn score_slides<'a>(question: &str, slides: &'a [SlideFact]) -> Vec<ScoredSlide<'a>> {
    let question_lower = question.to_lowercase();
    let question_tokens: HashSet<String> = tokenize(question).into_iter().collect();

    let mut scored: Vec<ScoredSlide<'a>> = slides
        .iter()
        .map(|slide| ScoredSlide {
            slide,
            score: score_slide(&question_lower, &question_tokens, slide),
        })
        .collect();
    // `sort_by` is stable.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// The `n` most relevant slides for `question`.
pub fn top_slides<'a>(question: &str, slides: &'a [SlideFact], n: usize) -> Vec<ScoredSlide<'a>> {
    let mut scored = score_slides(question, slides);
    scored.truncate(n);
    scored
}
