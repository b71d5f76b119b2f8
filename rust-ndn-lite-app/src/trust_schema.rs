//! Trust schema: which keys may sign which names.
//!
//! A rule pairs a data-name pattern with a key-name pattern. Pattern
//! components are literals, `<>` (any one component), `<>*` (any number of
//! components), `(<>)` (one component, captured) and `\N` (the N-th capture
//! of the data pattern, counting from 1). Patterns are written like names:
//!
//! ```text
//! data: /home/<>/CMD/(<>)/<>*
//! key:  /home/\1/KEY/<>
//! ```
//!
//! When several rules match a data name, the one with more literal
//! components wins, then the one with fewer `<>*`; remaining ties go to
//! the rule registered first. A name no rule matches is rejected.

use log::trace;
use rust_ndn_lite_common::{security::KEY_COMPONENT, Error, Name, NameComponent};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternComponent {
    Literal(NameComponent),
    Any,
    AnySequence,
    Capture,
    /// 1-based index into the captures.
    BackRef(usize),
}

impl fmt::Display for PatternComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternComponent::Literal(c) => write!(f, "{}", c),
            PatternComponent::Any => f.write_str("<>"),
            PatternComponent::AnySequence => f.write_str("<>*"),
            PatternComponent::Capture => f.write_str("(<>)"),
            PatternComponent::BackRef(i) => write!(f, "\\{}", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamePattern {
    components: Vec<PatternComponent>,
}

impl NamePattern {
    /// A pattern matching exactly `name`.
    pub fn literal(name: &Name) -> Self {
        Self {
            components: name.components().cloned().map(PatternComponent::Literal).collect(),
        }
    }

    pub fn then(mut self, component: PatternComponent) -> Self {
        self.components.push(component);
        self
    }

    pub fn then_literal(self, component: impl Into<NameComponent>) -> Self {
        self.then(PatternComponent::Literal(component.into()))
    }

    pub fn components(&self) -> &[PatternComponent] {
        &self.components
    }

    fn captures(&self) -> usize {
        self.components.iter().filter(|c| **c == PatternComponent::Capture).count()
    }

    fn max_backref(&self) -> usize {
        self.components
            .iter()
            .filter_map(|c| match c {
                PatternComponent::BackRef(i) => Some(*i),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// (literal components, negated multi-component wildcards)
    fn specificity(&self) -> (usize, isize) {
        let literals = self
            .components
            .iter()
            .filter(|c| matches!(c, PatternComponent::Literal(_)))
            .count();
        let sequences = self
            .components
            .iter()
            .filter(|c| **c == PatternComponent::AnySequence)
            .count();
        (literals, -(sequences as isize))
    }

    /// Match `name`, returning the captured components.
    pub fn matches(&self, name: &Name) -> Option<Vec<NameComponent>> {
        self.matches_with(name, Vec::new())
    }

    /// Match `name` with back-references resolved against `captures`.
    pub fn matches_with(&self, name: &Name, mut captures: Vec<NameComponent>) -> Option<Vec<NameComponent>> {
        let components: Vec<NameComponent> = name.components().cloned().collect();
        if match_at(&self.components, &components, &mut captures) {
            Some(captures)
        } else {
            None
        }
    }
}

fn match_at(pattern: &[PatternComponent], name: &[NameComponent], captures: &mut Vec<NameComponent>) -> bool {
    let Some((head, rest)) = pattern.split_first() else {
        return name.is_empty();
    };
    let mark = captures.len();

    if *head == PatternComponent::AnySequence {
        for skip in 0..=name.len() {
            if match_at(rest, &name[skip..], captures) {
                return true;
            }
            captures.truncate(mark);
        }
        return false;
    }

    let Some((first, tail)) = name.split_first() else {
        return false;
    };
    let accepted = match head {
        PatternComponent::Literal(c) => c == first,
        PatternComponent::Any | PatternComponent::AnySequence => true,
        PatternComponent::Capture => {
            captures.push(first.clone());
            true
        }
        PatternComponent::BackRef(i) => i.checked_sub(1).and_then(|i| captures.get(i)) == Some(first),
    };
    if accepted && match_at(rest, tail, captures) {
        return true;
    }
    captures.truncate(mark);
    false
}

impl FromStr for NamePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('/') {
            return Err(Error::TrustSchema(format!("pattern {:?} must start with '/'", s)));
        }
        let components = s
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|token| match token {
                "<>" => Ok(PatternComponent::Any),
                "<>*" => Ok(PatternComponent::AnySequence),
                "(<>)" => Ok(PatternComponent::Capture),
                t if t.starts_with('\\') => match t[1..].parse::<usize>() {
                    Ok(i) if i > 0 => Ok(PatternComponent::BackRef(i)),
                    _ => Err(Error::TrustSchema(format!("bad back-reference {:?}", t))),
                },
                t if t.contains('<') || t.contains('>') => {
                    Err(Error::TrustSchema(format!("bad pattern component {:?}", t)))
                }
                t => Ok(PatternComponent::Literal(NameComponent::from(t))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for c in &self.components {
            write!(f, "/{}", c)?;
        }
        Ok(())
    }
}

/// One named rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustSchemaRule {
    name: String,
    data_pattern: NamePattern,
    key_pattern: NamePattern,
}

impl TrustSchemaRule {
    pub fn new(name: impl Into<String>, data_pattern: NamePattern, key_pattern: NamePattern) -> Result<Self, Error> {
        let name = name.into();
        if key_pattern.max_backref() > data_pattern.captures() {
            return Err(Error::TrustSchema(format!(
                "rule {}: key pattern refers to a capture the data pattern lacks",
                name
            )));
        }
        Ok(Self {
            name,
            data_pattern,
            key_pattern,
        })
    }

    pub fn parse(name: impl Into<String>, data_pattern: &str, key_pattern: &str) -> Result<Self, Error> {
        Self::new(name, data_pattern.parse()?, key_pattern.parse()?)
    }

    /// Only keys of the home's trust anchor may sign anything under the
    /// home prefix.
    pub fn controller_only(home: &Name) -> Self {
        Self {
            name: "controller-only".into(),
            data_pattern: NamePattern::literal(home).then(PatternComponent::AnySequence),
            key_pattern: NamePattern::literal(home)
                .then_literal(KEY_COMPONENT)
                .then(PatternComponent::Any),
        }
    }

    /// Commands scoped to a room must be signed by that room's identity,
    /// `/<home>/<room>`. The data-id and timestamp follow the scope, so a
    /// command without a scope never matches.
    pub fn same_room(home: &Name) -> Self {
        Self {
            name: "same-room".into(),
            data_pattern: NamePattern::literal(home)
                .then(PatternComponent::Any)
                .then_literal("CMD")
                .then(PatternComponent::Capture)
                .then(PatternComponent::AnySequence)
                .then(PatternComponent::Any)
                .then(PatternComponent::Any),
            key_pattern: NamePattern::literal(home)
                .then(PatternComponent::BackRef(1))
                .then_literal(KEY_COMPONENT)
                .then(PatternComponent::Any),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_pattern(&self) -> &NamePattern {
        &self.data_pattern
    }

    pub fn key_pattern(&self) -> &NamePattern {
        &self.key_pattern
    }

    /// Whether `key_name` may sign `data_name` under this rule.
    pub fn check(&self, data_name: &Name, key_name: &Name) -> bool {
        match self.data_pattern.matches(data_name) {
            Some(captures) => self.key_pattern.matches_with(key_name, captures).is_some(),
            None => false,
        }
    }
}

/// Ordered rule storage.
#[derive(Debug, Clone, Default)]
pub struct TrustSchema {
    rules: Vec<TrustSchemaRule>,
}

impl TrustSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule, replacing one of the same name in place.
    pub fn add_rule(&mut self, rule: TrustSchemaRule) {
        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    pub fn remove_rule(&mut self, name: &str) -> Option<TrustSchemaRule> {
        let index = self.rules.iter().position(|r| r.name == name)?;
        Some(self.rules.remove(index))
    }

    pub fn rule(&self, name: &str) -> Option<&TrustSchemaRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// The rule governing `data_name`.
    pub fn select(&self, data_name: &Name) -> Option<&TrustSchemaRule> {
        let mut best: Option<&TrustSchemaRule> = None;
        for rule in self.rules.iter().filter(|r| r.data_pattern.matches(data_name).is_some()) {
            if best.map_or(true, |b| rule.data_pattern.specificity() > b.data_pattern.specificity()) {
                best = Some(rule);
            }
        }
        best
    }

    /// Accept `key_name` as signer of `data_name` or say why not.
    pub fn verify(&self, data_name: &Name, key_name: &Name) -> Result<(), Error> {
        let rule = self
            .select(data_name)
            .ok_or_else(|| Error::TrustSchema(format!("no rule covers {}", data_name)))?;
        trace!("Trust schema: {} governed by {}", data_name, rule.name);
        if rule.check(data_name, key_name) {
            Ok(())
        } else {
            Err(Error::TrustSchema(format!(
                "{} may not sign {} under rule {}",
                key_name, data_name, rule.name
            )))
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_pattern_parse_and_match() {
        let pattern: NamePattern = "/home/<>/CMD/(<>)/<>*".parse().unwrap();
        assert_eq!(pattern.to_string(), "/home/<>/CMD/(<>)/<>*");

        let captures = pattern.matches(&name("/home/led/CMD/bedroom/on/123")).unwrap();
        assert_eq!(captures, vec![NameComponent::from("bedroom")]);
        assert!(pattern.matches(&name("/home/led/CMD/bedroom")).is_some());
        assert!(pattern.matches(&name("/home/led/DATA/bedroom")).is_none());
        assert!(pattern.matches(&name("/home/led/CMD")).is_none());

        assert!("home/<>".parse::<NamePattern>().is_err());
        assert!("/home/<x>".parse::<NamePattern>().is_err());
        assert!("/home/\\0".parse::<NamePattern>().is_err());
    }

    #[test]
    fn test_sequence_backtracks() {
        let pattern: NamePattern = "/<>*/(<>)/end".parse().unwrap();
        let captures = pattern.matches(&name("/a/b/c/end")).unwrap();
        assert_eq!(captures, vec![NameComponent::from("c")]);
        assert!(pattern.matches(&name("/end")).is_none());
    }

    #[test]
    fn test_rule_backreference() {
        let rule = TrustSchemaRule::same_room(&name("/home"));
        assert!(rule.check(&name("/home/led/CMD/bedroom/on/1"), &name("/home/bedroom/KEY/abc")));
        assert!(!rule.check(&name("/home/led/CMD/bedroom/on/1"), &name("/home/kitchen/KEY/abc")));
        assert!(rule.check(&name("/home/led/CMD/bedroom/desk/on/1"), &name("/home/bedroom/KEY/abc")));
        // Unscoped: the data-id is not a room.
        assert!(!rule.check(&name("/home/temp/CMD/set/1"), &name("/home/set/KEY/abc")));
        assert!(TrustSchemaRule::parse("broken", "/home/<>", "/home/\\1/KEY/<>").is_err());
    }

    #[test]
    fn test_most_specific_rule_wins() {
        let home = name("/home");
        let mut schema = TrustSchema::new();
        schema.add_rule(TrustSchemaRule::controller_only(&home));
        schema.add_rule(TrustSchemaRule::same_room(&home));

        let command = name("/home/led/CMD/bedroom/on/1");
        assert_eq!(schema.select(&command).unwrap().name(), "same-room");
        schema.verify(&command, &name("/home/bedroom/KEY/k")).unwrap();
        // The anchor key is not enough once the more specific rule applies.
        assert!(schema.verify(&command, &name("/home/KEY/k")).is_err());

        let content = name("/home/led/DATA/dev1/state");
        assert_eq!(schema.select(&content).unwrap().name(), "controller-only");
        schema.verify(&content, &name("/home/KEY/k")).unwrap();
        assert!(matches!(
            schema.verify(&name("/elsewhere/x"), &name("/home/KEY/k")),
            Err(Error::TrustSchema(_))
        ));
    }

    #[test]
    fn test_ties_go_to_first_rule() {
        let mut schema = TrustSchema::new();
        schema.add_rule(TrustSchemaRule::parse("first", "/a/<>", "/k1/<>").unwrap());
        schema.add_rule(TrustSchemaRule::parse("second", "/a/(<>)", "/k2/<>").unwrap());
        assert_eq!(schema.select(&name("/a/b")).unwrap().name(), "first");

        schema.add_rule(TrustSchemaRule::parse("first", "/a/<>*", "/k1/<>").unwrap());
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.select(&name("/a/b")).unwrap().name(), "second");
        assert!(schema.remove_rule("second").is_some());
        assert_eq!(schema.select(&name("/a/b")).unwrap().name(), "first");
    }
}
