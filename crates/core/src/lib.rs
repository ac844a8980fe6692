use async_trait::async_trait;
use bucketvis_policy::PolicyDocument;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BucketId(pub String);

impl BucketId {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for BucketId {
    fn from(s: &str) -> Self { BucketId(s.to_string()) }
}

/// Splits a comma separated bucket list, trimming each name. Empty entries are dropped.
pub fn parse_bucket_list(raw: &str) -> Vec<BucketId> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(BucketId::from)
        .collect()
}

/// Resolves a string switch to a boolean: only `true`, in any case, is true.
pub fn parse_switch(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Result of a single storage lookup that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotConfigured,
    BucketNotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteConfig {
    pub index_document: Option<String>,
    pub redirect_all_to: Option<String>,
}

/// Read-only view of the object store. Errors are failures the check
/// cannot classify (credentials, network, garbled responses).
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn website_configuration(&self, bucket: &BucketId) -> anyhow::Result<Lookup<WebsiteConfig>>;
    async fn bucket_policy(&self, bucket: &BucketId) -> anyhow::Result<Lookup<PolicyDocument>>;
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to read {what} of bucket {bucket}")]
    Store {
        bucket: BucketId,
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Exposure state of one bucket. A missing bucket never carries exposure flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketFinding {
    pub id: BucketId,
    pub has_website_config: bool,
    pub policy_too_permissive: bool,
    pub bucket_missing: bool,
}

impl BucketFinding {
    pub fn missing(id: BucketId) -> Self {
        Self { id, has_website_config: false, policy_too_permissive: false, bucket_missing: true }
    }

    pub fn exposure(id: BucketId, has_website_config: bool, policy_too_permissive: bool) -> Self {
        Self { id, has_website_config, policy_too_permissive, bucket_missing: false }
    }
}

/// Looks up website hosting and the bucket policy, stopping at the first
/// lookup that reports the bucket as absent.
#[instrument(skip_all, fields(bucket = %id))]
pub async fn probe(store: &dyn BucketStore, id: &BucketId) -> Result<BucketFinding, CheckError> {
    let website = store.website_configuration(id).await
        .map_err(|source| CheckError::Store { bucket: id.clone(), what: "website configuration", source })?;
    let has_website_config = match website {
        Lookup::BucketNotFound => return Ok(BucketFinding::missing(id.clone())),
        Lookup::NotConfigured => false,
        Lookup::Found(cfg) => {
            debug!(index = ?cfg.index_document, redirect = ?cfg.redirect_all_to, "website hosting enabled");
            true
        }
    };

    let policy = match store.bucket_policy(id).await
        .map_err(|source| CheckError::Store { bucket: id.clone(), what: "bucket policy", source })?
    {
        Lookup::BucketNotFound => return Ok(BucketFinding::missing(id.clone())),
        Lookup::NotConfigured => PolicyDocument::empty(),
        Lookup::Found(doc) => doc,
    };
    let policy_too_permissive = policy.is_too_permissive();
    debug!(statements = policy.statements.len(), policy_too_permissive, "policy evaluated");

    Ok(BucketFinding::exposure(id.clone(), has_website_config, policy_too_permissive))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity { Ok, Warning, Critical }

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub severity: Severity,
    pub message: String,
}

/// Folds findings, in input order, into one outcome. The highest severity wins
/// and only its messages are reported.
pub fn resolve(ids: &[BucketId], findings: &[BucketFinding], critical_on_missing: bool) -> CheckOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for f in findings {
        if f.bucket_missing {
            let msg = format!("Bucket {} not found", f.id);
            if critical_on_missing { errors.push(msg) } else { warnings.push(msg) }
            continue;
        }
        if f.has_website_config {
            errors.push(format!("{}: website configuration found", f.id));
        }
        if f.policy_too_permissive {
            errors.push(format!("{}: bucket policy too permissive", f.id));
        }
    }

    if !errors.is_empty() {
        CheckOutcome { severity: Severity::Critical, message: errors.join("; ") }
    } else if !warnings.is_empty() {
        CheckOutcome { severity: Severity::Warning, message: warnings.join("; ") }
    } else {
        let names: Vec<&str> = ids.iter().map(BucketId::as_str).collect();
        CheckOutcome {
            severity: Severity::Ok,
            message: format!("{} not exposed via website or bucket policy", names.join(",")),
        }
    }
}

/// Probes each bucket in order and resolves the overall outcome. The first
/// unclassified store failure aborts the run.
pub async fn aggregate(store: &dyn BucketStore, ids: &[BucketId], critical_on_missing: bool) -> Result<CheckOutcome, CheckError> {
    let mut findings = Vec::with_capacity(ids.len());
    for id in ids {
        findings.push(probe(store, id).await?);
    }
    let outcome = resolve(ids, &findings, critical_on_missing);
    info!(severity = %outcome.severity, buckets = ids.len(), "check resolved");
    Ok(outcome)
}
