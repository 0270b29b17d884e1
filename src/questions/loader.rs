// Question bank YAML loader
//
// Top-level keys are group identifiers, values are ordered sequences of
// entries. An entry is either a bare string or a mapping with `text`
// and an optional `difficulty`. Parsing goes through a manual map
// visitor so repeated group keys reach our duplicate check instead of
// being collapsed by the YAML mapping type.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use super::{BankError, Difficulty, GroupQuestions, Question};
use crate::groups;

/// The complete static mapping of groups to their ordered questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    groups: Vec<GroupQuestions>,
}

impl QuestionBank {
    /// Load a bank from a YAML file on disk.
    pub fn load(path: &Path) -> Result<Self, BankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse a bank from YAML text.
    pub fn from_str(yaml: &str) -> Result<Self, BankError> {
        let raw: RawBank = serde_yaml::from_str(yaml)?;
        Self::normalize(raw)
    }

    fn normalize(raw: RawBank) -> Result<Self, BankError> {
        let mut seen = HashSet::new();
        let mut groups = Vec::with_capacity(raw.0.len());

        for (id, value) in raw.0 {
            if id.trim().is_empty() {
                return Err(BankError::MalformedEntry {
                    group: id,
                    index: 0,
                    reason: "group identifier is empty".to_string(),
                });
            }
            if !seen.insert(id.clone()) {
                return Err(BankError::DuplicateGroup(id));
            }

            let entries = match value {
                Value::Sequence(seq) => seq,
                _ => {
                    return Err(BankError::MalformedEntry {
                        group: id,
                        index: 0,
                        reason: "group value must be a sequence of questions".to_string(),
                    })
                }
            };

            let mut questions = Vec::with_capacity(entries.len());
            for (index, entry) in entries.into_iter().enumerate() {
                questions.push(normalize_entry(&id, index, entry)?);
            }

            groups.push(GroupQuestions { id, questions });
        }

        Ok(Self { groups })
    }

    /// Questions for one group, in authored order.
    pub fn get(&self, id: &str) -> Option<&[Question]> {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.questions.as_slice())
    }

    /// Groups in authored order.
    pub fn iter(&self) -> impl Iterator<Item = &GroupQuestions> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn total_questions(&self) -> usize {
        self.groups.iter().map(|g| g.questions.len()).sum()
    }

    /// Group identifiers in the bank that are not blueprint groups.
    pub fn unknown_groups(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|g| g.id.as_str())
            .filter(|id| !groups::is_blueprint_group(id))
            .collect()
    }

    /// Blueprint groups the bank has no questions for.
    pub fn missing_blueprint_groups(&self) -> Vec<&'static str> {
        groups::BLUEPRINT_GROUPS
            .into_iter()
            .filter(|id| self.get(id).is_none())
            .collect()
    }

    /// Serialize back to the authored YAML shape: bare strings for
    /// default-difficulty questions, `{text, difficulty}` mappings
    /// otherwise. Re-parsing the output yields an identical bank.
    pub fn to_yaml_string(&self) -> Result<String, BankError> {
        let mut root = Mapping::new();
        for group in &self.groups {
            let entries: Vec<Value> = group
                .questions
                .iter()
                .map(|q| match q.difficulty {
                    Difficulty::Default => Value::String(q.text.clone()),
                    Difficulty::Hard => {
                        let mut m = Mapping::new();
                        m.insert(
                            Value::String("text".to_string()),
                            Value::String(q.text.clone()),
                        );
                        m.insert(
                            Value::String("difficulty".to_string()),
                            Value::String("hard".to_string()),
                        );
                        Value::Mapping(m)
                    }
                })
                .collect();
            root.insert(Value::String(group.id.clone()), Value::Sequence(entries));
        }
        Ok(serde_yaml::to_string(&Value::Mapping(root))?)
    }
}

fn normalize_entry(group: &str, index: usize, entry: Value) -> Result<Question, BankError> {
    let malformed = |reason: String| BankError::MalformedEntry {
        group: group.to_string(),
        index,
        reason,
    };

    let (text, difficulty) = match entry {
        Value::String(s) => (s, Difficulty::Default),
        Value::Mapping(ref m) => {
            let text = match m.get("text") {
                Some(Value::String(s)) => s.clone(),
                Some(_) => return Err(malformed("`text` must be a string".to_string())),
                None => return Err(malformed("entry is missing a `text` field".to_string())),
            };
            let difficulty = match m.get("difficulty") {
                None => Difficulty::Default,
                Some(Value::String(tag)) => Difficulty::parse(tag).ok_or_else(|| {
                    malformed(format!("unrecognized difficulty `{}`", tag))
                })?,
                Some(_) => {
                    return Err(malformed("`difficulty` must be a string".to_string()))
                }
            };
            (text, difficulty)
        }
        _ => {
            return Err(malformed(
                "entry must be a string or a mapping with a `text` field".to_string(),
            ))
        }
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(BankError::EmptyText {
            group: group.to_string(),
            index,
        });
    }

    Ok(Question { text, difficulty })
}

/// Top-level key/value pairs in document order, duplicates included so
/// normalization can reject them.
struct RawBank(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawBank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BankVisitor;

        impl<'de> Visitor<'de> for BankVisitor {
            type Value = RawBank;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of group identifiers to question lists")
            }

            // An empty document parses as null; treat it as an empty bank.
            fn visit_unit<E>(self) -> Result<RawBank, E> {
                Ok(RawBank(Vec::new()))
            }

            // serde_yaml surfaces a fully empty input as an absent
            // Option rather than a unit.
            fn visit_none<E>(self) -> Result<RawBank, E> {
                Ok(RawBank(Vec::new()))
            }

            fn visit_map<A>(self, mut access: A) -> Result<RawBank, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(RawBank(entries))
            }
        }

        deserializer.deserialize_any(BankVisitor)
    }
}
