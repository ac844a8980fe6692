use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("bucket policy is not valid JSON")]
    Json(#[from] serde_json::Error),
}

/// One statement of a bucket access policy, reduced to what the
/// permissiveness check reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub statements: Vec<PolicyStatement>,
}

impl PolicyStatement {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { actions: actions.into_iter().map(Into::into).collect() }
    }

    /// Builds a statement from its JSON form. A missing `Action` yields no actions.
    pub fn from_json(stmt: &Json) -> Self {
        let mut actions = Vec::new();
        if let Some(a) = stmt.get("Action") {
            flatten_actions(a, &mut actions);
        }
        Self { actions }
    }

    pub fn is_too_permissive(&self) -> bool {
        self.actions.iter().any(|a| action_grants_read(a))
    }
}

impl PolicyDocument {
    /// A bucket without an attached policy.
    pub fn empty() -> Self { Self::default() }

    pub fn parse(text: &str) -> Result<Self, PolicyError> {
        let doc: Json = serde_json::from_str(text)?;
        Ok(Self::from_json(&doc))
    }

    /// Normalizes a policy value. Shapes that don't look like a policy
    /// degrade to fewer statements instead of failing.
    pub fn from_json(doc: &Json) -> Self {
        let statements = match doc.get("Statement") {
            Some(Json::Array(items)) => items.iter().map(PolicyStatement::from_json).collect(),
            Some(stmt @ Json::Object(_)) => vec![PolicyStatement::from_json(stmt)],
            _ => Vec::new(),
        };
        Self { statements }
    }

    pub fn is_too_permissive(&self) -> bool {
        self.statements.iter().any(PolicyStatement::is_too_permissive)
    }
}

/// Appends every action string found in `value`, descending into nested
/// arrays at any depth. Non-string scalars are skipped.
pub fn flatten_actions(value: &Json, out: &mut Vec<String>) {
    match value {
        Json::String(s) => out.push(s.clone()),
        Json::Array(items) => {
            for item in items {
                flatten_actions(item, out);
            }
        }
        _ => {}
    }
}

fn read_action_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^s3:(Get|List|\*)").expect("static pattern compiles"))
}

/// True when the action starts with `s3:Get`, `s3:List` or `s3:*`.
pub fn action_grants_read(action: &str) -> bool {
    read_action_pattern().is_match(action)
}
