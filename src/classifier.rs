use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{LadingError, Result};

// ---------------------------------------------------------------------------
// Rules as data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Code group is one of a fixed set.
    CodeIn { groups: Vec<String> },
    /// Code group starts with a prefix.
    CodePrefix { prefix: String },
    /// Description contains any of `contains` and none of `excludes`,
    /// ignoring case.
    Description {
        contains: Vec<String>,
        #[serde(default)]
        excludes: Vec<String>,
    },
    /// Case-insensitive regex on the description.
    DescriptionRegex { pattern: String },
    /// Every sub-predicate holds.
    All { predicates: Vec<Predicate> },
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CodeIn { groups } => write!(f, "code group in {{{}}}", groups.join(", ")),
            Self::CodePrefix { prefix } => write!(f, "code group starts with {prefix}"),
            Self::Description { contains, excludes } => {
                write!(f, "description contains {}", contains.join("|"))?;
                if !excludes.is_empty() {
                    write!(f, ", not {}", excludes.join("|"))?;
                }
                Ok(())
            }
            Self::DescriptionRegex { pattern } => write!(f, "description ~ /{pattern}/"),
            Self::All { predicates } => {
                let parts: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    pub predicate: Predicate,
}

#[derive(Serialize, Deserialize)]
struct RuleFile {
    rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Compiled matchers
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Matcher {
    CodeIn(BTreeSet<String>),
    CodePrefix(String),
    Description {
        contains: Vec<String>,
        excludes: Vec<String>,
    },
    Regex(Regex),
    All(Vec<Matcher>),
}

impl Matcher {
    fn compile(predicate: &Predicate) -> Result<Self> {
        Ok(match predicate {
            Predicate::CodeIn { groups } => {
                Self::CodeIn(groups.iter().map(|g| g.trim().to_string()).collect())
            }
            Predicate::CodePrefix { prefix } => Self::CodePrefix(prefix.trim().to_string()),
            Predicate::Description { contains, excludes } => Self::Description {
                contains: contains.iter().map(|s| s.to_lowercase()).collect(),
                excludes: excludes.iter().map(|s| s.to_lowercase()).collect(),
            },
            Predicate::DescriptionRegex { pattern } => {
                Self::Regex(RegexBuilder::new(pattern).case_insensitive(true).build()?)
            }
            Predicate::All { predicates } => Self::All(
                predicates
                    .iter()
                    .map(Matcher::compile)
                    .collect::<Result<Vec<_>>>()?,
            ),
        })
    }

    fn matches(&self, code_group: Option<&str>, description: &str, desc_lower: &str) -> bool {
        match self {
            Self::CodeIn(groups) => code_group.is_some_and(|g| groups.contains(g)),
            Self::CodePrefix(prefix) => code_group.is_some_and(|g| g.starts_with(prefix.as_str())),
            Self::Description { contains, excludes } => {
                contains.iter().any(|s| desc_lower.contains(s.as_str()))
                    && !excludes.iter().any(|s| desc_lower.contains(s.as_str()))
            }
            Self::Regex(re) => re.is_match(description),
            Self::All(parts) => parts
                .iter()
                .all(|m| m.matches(code_group, description, desc_lower)),
        }
    }
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// An ordered list of rules. Evaluation is top-to-bottom; the first rule
/// whose predicate holds assigns the classification.
#[derive(Debug)]
pub struct RuleSet {
    rules: Vec<Rule>,
    matchers: Vec<Matcher>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let matchers = rules
            .iter()
            .map(|r| Matcher::compile(&r.predicate))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules, matchers })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Index of the first rule matching the row, if any.
    pub fn first_match(&self, code_group: Option<&str>, description: &str) -> Option<usize> {
        let desc_lower = description.to_lowercase();
        self.matchers
            .iter()
            .position(|m| m.matches(code_group, description, &desc_lower))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: RuleFile = serde_json::from_str(json)?;
        Self::new(file.rules)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| LadingError::ReadFile {
            file: file.clone(),
            source,
        })?;
        let set = Self::from_json_str(&content).map_err(|e| LadingError::InvalidRules {
            file,
            message: e.to_string(),
        })?;
        tracing::info!(path = %path.display(), rules = set.len(), "loaded classification rules");
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String> {
        let file = RuleFile {
            rules: self.rules.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Built-in rules for meat, fish, dairy and egg imports.
    pub fn default_rules() -> Result<Self> {
        let processed = || code_in(&["0210", "1601", "1602"]);
        let rules = vec![
            rule("Cattle", code_in(&["0201", "0202"])),
            rule("Pig", code_in(&["0203"])),
            rule("Sheep & Goat", code_in(&["0204"])),
            rule("Poultry", code_in(&["0207"])),
            rule("Offal", code_in(&["0206"])),
            rule("Fish", Predicate::CodePrefix { prefix: "03".to_string() }),
            rule("Fish", code_in(&["1604", "1605"])),
            rule("Dairy", code_in(&["0401", "0402", "0403", "0404", "0405", "0406"])),
            rule("Eggs", code_in(&["0407", "0408"])),
            rule(
                "Cattle",
                all(vec![processed(), description(&["beef", "corned", "bovine"], &["pork"])]),
            ),
            rule(
                "Pig",
                all(vec![processed(), description(&["pork", "ham", "bacon", "swine"], &["beef"])]),
            ),
            rule(
                "Poultry",
                all(vec![processed(), description(&["chicken", "turkey", "duck"], &[])]),
            ),
            rule(
                "Sheep & Goat",
                all(vec![processed(), description(&["mutton", "lamb", "goat"], &[])]),
            ),
            rule("Processed Meat", processed()),
        ];
        Self::new(rules)
    }
}

fn rule(label: &str, predicate: Predicate) -> Rule {
    Rule {
        label: label.to_string(),
        predicate,
    }
}

fn code_in(groups: &[&str]) -> Predicate {
    Predicate::CodeIn {
        groups: groups.iter().map(|g| g.to_string()).collect(),
    }
}

fn description(contains: &[&str], excludes: &[&str]) -> Predicate {
    Predicate::Description {
        contains: contains.iter().map(|s| s.to_string()).collect(),
        excludes: excludes.iter().map(|s| s.to_string()).collect(),
    }
}

fn all(predicates: Vec<Predicate>) -> Predicate {
    Predicate::All { predicates }
}

/// Classify one row: the label of the first matching rule, or `None`.
pub fn classify<'a>(rules: &'a RuleSet, code_group: Option<&str>, description: &str) -> Option<&'a str> {
    rules
        .first_match(code_group, description)
        .map(|i| rules.rules[i].label.as_str())
}
