//! Natural ordering for file and folder names.
//!
//! Names are split into alternating text and digit runs so that
//! `"2 Intro"` sorts before `"10 Outro"`. Digit runs are compared by value
//! without parsing into a fixed-width integer, so arbitrarily long runs work.

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone)]
enum Run {
    Text(String),
    /// Digits with leading zeros removed
    Number(String),
}

impl Run {
    fn cmp_run(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Run::Text(a), Run::Text(b)) => a.cmp(b),
            (Run::Number(a), Run::Number(b)) => a.len().cmp(&b.len()).then_with(|| a.cmp(b)),
            // Runs alternate starting with text, so mixed pairs only occur
            // past the end of one key. Keep the order total anyway.
            (Run::Number(_), Run::Text(_)) => Ordering::Less,
            (Run::Text(_), Run::Number(_)) => Ordering::Greater,
        }
    }
}

/// Comparable key derived from a name.
///
/// Keys whose runs are identical (`"01"` and `"1"`, `"A"` and `"a"`) fall back
/// to the raw name, so sorting by this key is deterministic.
#[derive(Debug, Clone)]
pub struct NaturalKey {
    runs: Vec<Run>,
    raw: String,
}

impl NaturalKey {
    pub fn new(name: &str) -> Self {
        let normalized: String = name.nfc().collect::<String>().to_lowercase();

        let mut runs = Vec::new();
        let mut current = String::new();
        let mut in_digits = false;

        for c in normalized.chars() {
            let is_digit = c.is_ascii_digit();
            if is_digit != in_digits {
                runs.push(finish_run(std::mem::take(&mut current), in_digits));
                in_digits = is_digit;
            }
            current.push(c);
        }
        runs.push(finish_run(current, in_digits));

        Self {
            runs,
            raw: name.to_string(),
        }
    }
}

fn finish_run(run: String, digits: bool) -> Run {
    if digits {
        let trimmed = run.trim_start_matches('0');
        Run::Number(trimmed.to_string())
    } else {
        Run::Text(run)
    }
}

impl Ord for NaturalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.runs.iter().zip(other.runs.iter()) {
            let ord = a.cmp_run(b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.runs
            .len()
            .cmp(&other.runs.len())
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for NaturalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for NaturalKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NaturalKey {}

/// Compare two names in natural order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    NaturalKey::new(a).cmp(&NaturalKey::new(b))
}

/// Sort items in place by the natural order of the name `f` extracts.
pub fn sort_naturally<T, F>(items: &mut [T], f: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by_cached_key(|item| NaturalKey::new(f(item)));
}
