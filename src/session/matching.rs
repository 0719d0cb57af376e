//! Answer matching
//!
//! Answers are compared case- and whitespace-insensitively. A wrong
//! answer that is very close to an accepted one is reported as a near
//! miss so the quiz can ask the user to check their spelling.

/// How an attempt relates to the accepted answers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Match {
    /// Equal to an accepted answer after normalization
    Exact,
    /// Not equal, but at least as similar as the threshold to the best candidate
    Close { similarity: f64 },
    Wrong,
}

/// Lowercase, trim and collapse inner whitespace
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Judge an attempt against the accepted answers
pub fn judge<T: AsRef<str>>(attempt: &str, answers: &[T], threshold: f64) -> Match {
    let attempt = normalize(attempt);

    if answers.iter().any(|a| normalize(a.as_ref()) == attempt) {
        return Match::Exact;
    }

    match closest_answer(&attempt, answers) {
        Some((_, similarity)) if similarity >= threshold => Match::Close { similarity },
        _ => Match::Wrong,
    }
}

/// Index and similarity of the accepted answer closest to the attempt
pub fn closest_answer<T: AsRef<str>>(attempt: &str, answers: &[T]) -> Option<(usize, f64)> {
    let attempt = normalize(attempt);
    answers
        .iter()
        .enumerate()
        .map(|(idx, answer)| (idx, similarity(&attempt, &normalize(answer.as_ref()))))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Character-level similarity between 0.0 and 1.0, based on edit distance
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());

    if longest == 0 {
        return 1.0;
    }

    1.0 - edit_distance(&a, &b) as f64 / longest as f64
}

/// Levenshtein distance over characters, single row
fn edit_distance(a: &[char], b: &[char]) -> usize {
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.iter().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let cost = usize::from(ca != cb);
            row[j + 1] = (above + 1).min(row[j] + 1).min(diagonal + cost);
            diagonal = above;
        }
    }

    row[b.len()]
}
