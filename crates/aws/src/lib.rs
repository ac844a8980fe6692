use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use serde::{Deserialize, Serialize};
use tracing::debug;

use bucketvis_core::{BucketId, BucketStore, Lookup, WebsiteConfig};
use bucketvis_policy::PolicyDocument;

pub const DEFAULT_REGION: &str = "us-east-1";

const NO_SUCH_BUCKET: &str = "NoSuchBucket";
const NO_SUCH_WEBSITE: &str = "NoSuchWebsiteConfiguration";
const NO_SUCH_POLICY: &str = "NoSuchBucketPolicy";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsProvider { pub region: String }

impl Default for AwsProvider {
    fn default() -> Self { Self { region: DEFAULT_REGION.to_string() } }
}

impl AwsProvider {
    pub fn new(region: impl Into<String>) -> Self { Self { region: region.into() } }

    /// Loads credentials from the default provider chain and builds an S3 client.
    pub async fn connect(&self) -> S3Store {
        debug!(region = %self.region, "loading aws config");
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .load()
            .await;
        S3Store { client: aws_sdk_s3::Client::new(&config) }
    }
}

pub struct S3Store { client: aws_sdk_s3::Client }

/// Maps an S3 error code to a non-failure lookup result, if it is one.
fn absence<T>(code: Option<&str>, not_configured: &str) -> Option<Lookup<T>> {
    match code {
        Some(NO_SUCH_BUCKET) => Some(Lookup::BucketNotFound),
        Some(c) if c == not_configured => Some(Lookup::NotConfigured),
        _ => None,
    }
}

#[async_trait]
impl BucketStore for S3Store {
    async fn website_configuration(&self, bucket: &BucketId) -> Result<Lookup<WebsiteConfig>> {
        match self.client.get_bucket_website().bucket(bucket.as_str()).send().await {
            Ok(out) => Ok(Lookup::Found(WebsiteConfig {
                index_document: out.index_document().map(|d| d.suffix().to_string()),
                redirect_all_to: out.redirect_all_requests_to().map(|r| r.host_name().to_string()),
            })),
            Err(err) => absence(err.code(), NO_SUCH_WEBSITE)
                .ok_or_else(|| anyhow!("GetBucketWebsite: {}", DisplayErrorContext(&err))),
        }
    }

    async fn bucket_policy(&self, bucket: &BucketId) -> Result<Lookup<PolicyDocument>> {
        match self.client.get_bucket_policy().bucket(bucket.as_str()).send().await {
            Ok(out) => match out.policy() {
                Some(text) => {
                    let doc = PolicyDocument::parse(text).context("GetBucketPolicy returned an unreadable policy")?;
                    Ok(Lookup::Found(doc))
                }
                None => Ok(Lookup::NotConfigured),
            },
            Err(err) => absence(err.code(), NO_SUCH_POLICY)
                .ok_or_else(|| anyhow!("GetBucketPolicy: {}", DisplayErrorContext(&err))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_bucket_code_wins_for_both_lookups() {
        assert_eq!(absence::<()>(Some("NoSuchBucket"), NO_SUCH_WEBSITE), Some(Lookup::BucketNotFound));
        assert_eq!(absence::<()>(Some("NoSuchBucket"), NO_SUCH_POLICY), Some(Lookup::BucketNotFound));
    }

    #[test]
    fn not_configured_codes_are_lookup_specific() {
        assert_eq!(absence::<()>(Some("NoSuchWebsiteConfiguration"), NO_SUCH_WEBSITE), Some(Lookup::NotConfigured));
        assert_eq!(absence::<()>(Some("NoSuchBucketPolicy"), NO_SUCH_POLICY), Some(Lookup::NotConfigured));
        assert_eq!(absence::<()>(Some("NoSuchBucketPolicy"), NO_SUCH_WEBSITE), None);
    }

    #[test]
    fn other_codes_stay_errors() {
        assert_eq!(absence::<()>(Some("AccessDenied"), NO_SUCH_POLICY), None);
        assert_eq!(absence::<()>(None, NO_SUCH_WEBSITE), None);
    }

    #[test]
    fn provider_defaults_to_us_east_1() {
        assert_eq!(AwsProvider::default().region, "us-east-1");
        let p: AwsProvider = serde_json::from_str(r#"{"region":"eu-west-1"}"#).unwrap();
        assert_eq!(p.region, "eu-west-1");
    }
}
