//! Ignore-rule evaluation.
//!
//! A candidate path is suppressed when it matches any expression in the
//! ordered rule list. Directory candidates are tested with a trailing `/`
//! appended, so `^build/$` matches the directory `build` but not a file of
//! the same name. Rules are matched against paths as the tree composes them:
//! they inherit the form of the root the caller supplied (absolute root,
//! absolute candidates; `"."` root, relative candidates).

use once_cell::sync::Lazy;
use regex::Regex;

/// Applied when the caller supplies no rules: any path whose first segment
/// starts with `.`, or containing a `/.` separator.
static DEFAULT_IGNORE: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![Regex::new(r"(?:^\..*)|(?:/\.)").expect("default ignore rule compiles")]
});

/// An ordered list of ignore expressions.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<Regex>,
}

impl IgnoreRules {
    /// Build a rule set, substituting the default dotfile rule when `rules`
    /// is empty.
    pub fn new(rules: Vec<Regex>) -> Self {
        if rules.is_empty() {
            Self {
                rules: DEFAULT_IGNORE.clone(),
            }
        } else {
            Self { rules }
        }
    }

    /// Whether `path` matches any rule, with the trailing-`/` dressing for
    /// directories.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        let dressed;
        let candidate = if is_dir {
            dressed = format!("{}/", path);
            &dressed
        } else {
            path
        };

        self.rules.iter().any(|rx| rx.is_match(candidate))
    }
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
