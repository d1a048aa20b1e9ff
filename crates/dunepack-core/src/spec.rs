//! Spec strings: `name@version+variant~variant key=value`.
//!
//! The same grammar is used for build requests (`dune@2.7+pdelab`), for
//! upstream dependencies inside recipes (`fftw@3.3.4:+mpi precision=double`)
//! and for anonymous predicates (`@2.6+pdelab`, `+fem+python`). Tokens may
//! appear in any order after the optional leading package name.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dunepack_util::errors::DunepackError;

use crate::version::{Version, VersionConstraint};

/// A parsed spec string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spec {
    pub name: Option<String>,
    pub versions: Option<VersionConstraint>,
    /// Variants written as `+name`.
    pub enabled: BTreeSet<String>,
    /// Variants written as `~name`.
    pub disabled: BTreeSet<String>,
    /// `key=value` settings, e.g. `precision=double`.
    pub settings: BTreeMap<String, String>,
}

impl Spec {
    pub fn parse(input: &str) -> Result<Self, DunepackError> {
        Parser::new(input).parse()
    }

    /// Whether this spec, read as a predicate, holds for a package at
    /// `version` with exactly the variants in `enabled` turned on.
    ///
    /// The package name and `key=value` settings are not consulted.
    pub fn matches(&self, version: &Version, enabled: &BTreeSet<String>) -> bool {
        if let Some(c) = &self.versions {
            if !c.matches(version) {
                return false;
            }
        }
        self.enabled.is_subset(enabled) && self.disabled.is_disjoint(enabled)
    }

    /// All variant names the spec mentions, with either sigil.
    pub fn variant_names(&self) -> impl Iterator<Item = &String> {
        self.enabled.iter().chain(self.disabled.iter())
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if let Some(v) = &self.versions {
            write!(f, "@{v}")?;
        }
        for v in &self.enabled {
            write!(f, "+{v}")?;
        }
        for v in &self.disabled {
            write!(f, "~{v}")?;
        }
        for (k, v) in &self.settings {
            write!(f, " {k}={v}")?;
        }
        Ok(())
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    spec: Spec,
    seen_token: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            spec: Spec::default(),
            seen_token: false,
        }
    }

    fn parse(mut self) -> Result<Spec, DunepackError> {
        while let Some(&(pos, ch)) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '@' => {
                    self.chars.next();
                    let raw = self.take_while(|c| !matches!(c, '+' | '~' | '@') && !c.is_whitespace());
                    if self.spec.versions.is_some() {
                        return Err(self.error(format!("second version constraint at {pos}")));
                    }
                    if raw.is_empty() {
                        return Err(self.error(format!("empty version after '@' at {pos}")));
                    }
                    self.spec.versions = Some(
                        VersionConstraint::parse(raw).map_err(|_| {
                            self.error(format!("invalid version constraint '{raw}'"))
                        })?,
                    );
                }
                '+' | '~' => {
                    self.chars.next();
                    let name = self.take_while(is_variant_char);
                    if name.is_empty() {
                        return Err(self.error(format!("expected variant name after '{ch}' at {pos}")));
                    }
                    let opposite = if ch == '+' {
                        &self.spec.disabled
                    } else {
                        &self.spec.enabled
                    };
                    if opposite.contains(name) {
                        return Err(self.error(format!("variant '{name}' both enabled and disabled")));
                    }
                    if ch == '+' {
                        self.spec.enabled.insert(name.to_string());
                    } else {
                        self.spec.disabled.insert(name.to_string());
                    }
                }
                c if is_name_char(c) => {
                    let word = self.take_while(|c| !c.is_whitespace() && !matches!(c, '+' | '~' | '@'));
                    if let Some((key, value)) = word.split_once('=') {
                        if key.is_empty() || value.is_empty() {
                            return Err(self.error(format!("malformed setting '{word}'")));
                        }
                        self.spec.settings.insert(key.to_string(), value.to_string());
                    } else if !self.seen_token && word.chars().all(is_name_char) {
                        self.spec.name = Some(word.to_string());
                    } else {
                        return Err(self.error(format!("unexpected token '{word}' at {pos}")));
                    }
                }
                other => {
                    return Err(self.error(format!("unexpected character '{other}' at {pos}")));
                }
            }
            self.seen_token = true;
        }
        Ok(self.spec)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.chars.peek().map(|&(i, _)| i).unwrap_or(self.input.len());
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        &self.input[start..end]
    }

    fn error(&self, message: String) -> DunepackError {
        DunepackError::SpecParse {
            input: self.input.to_string(),
            message,
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

fn is_variant_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_')
}
