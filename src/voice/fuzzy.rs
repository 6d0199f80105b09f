//! Fuzzy string scoring using Levenshtein distance
//!
//! Transcripts rarely match a command phrase exactly: words get split,
//! merged, reordered or padded with filler. [`similarity`] takes the best of
//! a whole-string ratio, a best-window partial ratio and a token-sorted
//! ratio, each in 0.0..=1.0.

/// Calculate Levenshtein distance between two strings
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    levenshtein_chars(&a, &b)
}

fn levenshtein_chars(a: &[char], b: &[char]) -> usize {
    let mut dp = vec![vec![0; b.len() + 1]; a.len() + 1];

    for (i, row) in dp.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        dp[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }
    dp[a.len()][b.len()]
}

fn ratio_chars(a: &[char], b: &[char]) -> f32 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_chars(a, b) as f32 / longest as f32
}

/// Whole-string similarity
pub fn ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best ratio of the shorter string against any equally long window of the longer
pub fn partial_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }
    long.windows(short.len())
        .map(|w| ratio_chars(&short, w))
        .fold(0.0, f32::max)
}

/// Ratio after sorting whitespace-separated tokens
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    fn sorted(s: &str) -> String {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
    ratio(&sorted(a), &sorted(b))
}

/// Best of the three scores
pub fn similarity(a: &str, b: &str) -> f32 {
    ratio(a, b)
        .max(partial_ratio(a, b))
        .max(token_sort_ratio(a, b))
}

/// Clean text for matching: lowercase, keep letters, digits and spaces
pub fn clean_for_matching(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}
