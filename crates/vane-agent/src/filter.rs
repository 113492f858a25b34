//! Metric selection and field/tag pruning shared by every plugin wrapper.
//!
//! Patterns are globs: `*` matches any run of characters, `?` exactly one,
//! `[abc]`, `[a-z]` and `[!abc]` one character from (or outside) a class, and
//! `{cpu,mem}` any of the comma-separated alternatives. An unterminated `[` or
//! `{` is matched literally.

use vane_core::{Configurable, Metric};

/// Selects metrics by tag value.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct TagFilter {
    /// Tag key.
    pub name: String,
    /// Globs matched against the tag value.
    pub filter: Vec<String>,
}

impl TagFilter {
    fn matches(&self, metric: &Metric) -> bool {
        metric
            .tags
            .get(&self.name)
            .is_some_and(|value| any_match(&self.filter, value))
    }
}

/// Wrapper-level metric filter.
///
/// `namepass`/`namedrop` and `tagpass`/`tagdrop` decide whether a metric is
/// kept at all; `fieldpass`/`fielddrop` and `taginclude`/`tagexclude` prune
/// it. A metric left without fields is dropped.
#[derive(Debug, Clone, Default, PartialEq, Configurable)]
pub struct Filter {
    pub namepass: Vec<String>,
    pub namedrop: Vec<String>,
    pub fieldpass: Vec<String>,
    pub fielddrop: Vec<String>,
    pub tagpass: Vec<TagFilter>,
    pub tagdrop: Vec<TagFilter>,
    pub taginclude: Vec<String>,
    pub tagexclude: Vec<String>,
}

impl Filter {
    /// Whether any rule is configured.
    pub fn is_active(&self) -> bool {
        !(self.namepass.is_empty()
            && self.namedrop.is_empty()
            && self.fieldpass.is_empty()
            && self.fielddrop.is_empty()
            && self.tagpass.is_empty()
            && self.tagdrop.is_empty()
            && self.taginclude.is_empty()
            && self.tagexclude.is_empty())
    }

    /// Whether `metric` passes the name and tag-value rules.
    pub fn select(&self, metric: &Metric) -> bool {
        if !self.namepass.is_empty() && !any_match(&self.namepass, &metric.name) {
            return false;
        }
        if any_match(&self.namedrop, &metric.name) {
            return false;
        }
        if !self.tagpass.is_empty() && !self.tagpass.iter().any(|t| t.matches(metric)) {
            return false;
        }
        !self.tagdrop.iter().any(|t| t.matches(metric))
    }

    /// Removes fields and tags excluded by the pruning rules.
    pub fn modify(&self, metric: &mut Metric) {
        if !self.fieldpass.is_empty() {
            metric.fields.retain(|k, _| any_match(&self.fieldpass, k));
        }
        metric.fields.retain(|k, _| !any_match(&self.fielddrop, k));
        if !self.taginclude.is_empty() {
            metric.tags.retain(|k, _| any_match(&self.taginclude, k));
        }
        metric.tags.retain(|k, _| !any_match(&self.tagexclude, k));
    }

    /// Applies [`select`](Self::select) and [`modify`](Self::modify).
    /// Returns `None` if the metric is dropped.
    pub fn apply(&self, mut metric: Metric) -> Option<Metric> {
        if !self.is_active() {
            return Some(metric);
        }
        if !self.select(&metric) {
            return None;
        }
        self.modify(&mut metric);
        (!metric.fields.is_empty()).then_some(metric)
    }
}

fn any_match(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, text))
}

#[derive(Debug, PartialEq)]
enum Token {
    Any,
    One,
    Class { negated: bool, ranges: Vec<(char, char)> },
    Literal(char),
}

impl Token {
    fn accepts(&self, c: char) -> bool {
        match self {
            Self::Any | Self::One => true,
            Self::Class { negated, ranges } => {
                ranges.iter().any(|&(lo, hi)| (lo..=hi).contains(&c)) != *negated
            }
            Self::Literal(l) => *l == c,
        }
    }
}

/// Parses a brace-free pattern. `[` without a closing `]` stays literal.
fn tokenize(pattern: &[char]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            '*' => tokens.push(Token::Any),
            '?' => tokens.push(Token::One),
            '[' => {
                let mut j = i + 1;
                let negated = pattern.get(j) == Some(&'!');
                if negated {
                    j += 1;
                }
                // A `]` right after the opening bracket is a member.
                let body_start = j;
                if pattern.get(j) == Some(&']') {
                    j += 1;
                }
                while j < pattern.len() && pattern[j] != ']' {
                    j += 1;
                }
                if j >= pattern.len() {
                    tokens.push(Token::Literal('['));
                    i += 1;
                    continue;
                }
                let body = &pattern[body_start..j];
                let mut ranges = Vec::new();
                let mut k = 0;
                while k < body.len() {
                    if k + 2 < body.len() && body[k + 1] == '-' {
                        ranges.push((body[k], body[k + 2]));
                        k += 3;
                    } else {
                        ranges.push((body[k], body[k]));
                        k += 1;
                    }
                }
                tokens.push(Token::Class { negated, ranges });
                i = j;
            }
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }
    tokens
}

/// Expands the first `{a,b}` group (nesting allowed) into whole patterns.
fn expand_braces(pattern: &[char]) -> Vec<Vec<char>> {
    let Some(open) = pattern.iter().position(|&c| c == '{') else {
        return vec![pattern.to_vec()];
    };

    let mut depth = 0;
    let mut splits = Vec::new();
    let mut close = None;
    for (i, &c) in pattern.iter().enumerate().skip(open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }

    let Some(close) = close else {
        // Unbalanced: keep the `{` literal and expand the remainder.
        return expand_braces(&pattern[open + 1..])
            .into_iter()
            .map(|rest| [&pattern[..=open], &rest[..]].concat())
            .collect();
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alternative = [prefix, &pattern[w[0] + 1..w[1]], suffix].concat();
            expand_braces(&alternative)
        })
        .collect()
}

fn match_tokens(tokens: &[Token], text: &[char]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position after the last `*` and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p + 1, t));
                p += 1;
            }
            Some(token) if token.accepts(text[t]) => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| *token == Token::Any)
}

/// Matches `text` against a glob pattern.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    expand_braces(&pattern)
        .iter()
        .any(|alternative| match_tokens(&tokenize(alternative), &text))
}
