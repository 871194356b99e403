//! Dashboard lookup and embedding.
//!
//! Dashboards live in Amazon QuickSight. The service maps a semantic category such as
//! `temperature` to a dashboard and hands the frontend an embed URL for it.

use crate::cli::CommandLineArgs;
use crate::error::{with_timeout, AirwatchError};

use async_trait::async_trait;
use aws_sdk_quicksight::types::{
    AnonymousUserDashboardEmbeddingConfiguration, AnonymousUserEmbeddingExperienceConfiguration,
};
use aws_sdk_quicksight::Client;
use aws_smithy_types_convert::date_time::DateTimeExt;
use aws_types::region::Region;
use aws_types::SdkConfig;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::time::Duration;

/// Dashboard listing entry
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub dashboard_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Dashboard detail, with embedding fields when a URL could be generated
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDetail {
    pub dashboard_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_published: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A generated embed URL
#[derive(Clone, Debug, PartialEq)]
pub struct EmbedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Dashboard catalog trait.
///
/// Defines the interface to the dashboard service.
///
/// # Methods
/// * `list_dashboards`: List the dashboards in the account.
/// * `describe_dashboard`: Describe one dashboard.
/// * `generate_embed_url`: Generate a time-limited embed URL for one dashboard.
#[async_trait]
pub trait DashboardCatalog: Send + Sync {
    /// List dashboards, in the order the service returns them.
    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>, AirwatchError>;

    /// Describe one dashboard.
    ///
    /// # Arguments
    ///
    /// * `dashboard_id`: Dashboard ID
    async fn describe_dashboard(&self, dashboard_id: &str)
        -> Result<DashboardDetail, AirwatchError>;

    /// Generate an embed URL for one dashboard.
    ///
    /// # Arguments
    ///
    /// * `dashboard`: Dashboard to embed
    async fn generate_embed_url(
        &self,
        dashboard: &DashboardDetail,
    ) -> Result<EmbedUrl, AirwatchError>;
}

/// Find the first dashboard whose name, then ID, contains `category`, ignoring case.
///
/// # Arguments
///
/// * `category`: Semantic category, e.g. `temperature`
/// * `dashboards`: Candidates in listing order
pub fn find_dashboard_for<'a>(
    category: &str,
    dashboards: &'a [DashboardSummary],
) -> Option<&'a DashboardSummary> {
    let needle = category.to_lowercase();
    dashboards
        .iter()
        .find(|dashboard| dashboard.name.to_lowercase().contains(&needle))
        .or_else(|| {
            dashboards
                .iter()
                .find(|dashboard| dashboard.dashboard_id.to_lowercase().contains(&needle))
        })
}

/// Describe the dashboard for a category and attach an embed URL.
///
/// Failure to generate the URL is logged and the detail is returned without embedding fields.
///
/// # Arguments
///
/// * `catalog`: Dashboard catalog
/// * `category`: Semantic category, e.g. `temperature`
#[tracing::instrument(level = "DEBUG", skip(catalog))]
pub async fn embed_dashboard(
    catalog: &dyn DashboardCatalog,
    category: &str,
) -> Result<DashboardDetail, AirwatchError> {
    let dashboards = catalog.list_dashboards().await?;
    let summary =
        find_dashboard_for(category, &dashboards).ok_or_else(|| AirwatchError::NoDashboard {
            category: category.to_string(),
        })?;
    let mut detail = catalog.describe_dashboard(&summary.dashboard_id).await?;
    match catalog.generate_embed_url(&detail).await {
        Ok(embed) => {
            detail.embed_url = Some(embed.url);
            detail.expires_at = Some(embed.expires_at);
        }
        Err(err) => tracing::warn!(
            dashboard_id = %detail.dashboard_id,
            error = %err,
            "failed to generate embed URL"
        ),
    }
    Ok(detail)
}

/// [DashboardCatalog] backed by Amazon QuickSight.
pub struct QuickSight {
    client: Client,
    account_id: String,
    namespace: String,
    session_minutes: i64,
    timeout: Duration,
}

impl QuickSight {
    /// Create a QuickSight catalog.
    ///
    /// # Arguments
    ///
    /// * `sdk_config`: Shared AWS configuration
    /// * `account_id`: AWS account owning the dashboards
    /// * `args`: Command line arguments
    pub fn new(sdk_config: &SdkConfig, account_id: &str, args: &CommandLineArgs) -> Self {
        let config = aws_sdk_quicksight::config::Builder::from(sdk_config)
            .region(Region::new(args.quicksight_region.clone()))
            .build();
        Self {
            client: Client::from_conf(config),
            account_id: account_id.to_string(),
            namespace: args.quicksight_namespace.clone(),
            session_minutes: args.embed_session_minutes,
            timeout: Duration::from_secs(args.dashboard_timeout),
        }
    }
}

#[async_trait]
impl DashboardCatalog for QuickSight {
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>, AirwatchError> {
        let request = async {
            self.client
                .list_dashboards()
                .aws_account_id(&self.account_id)
                .send()
                .await
                .map_err(aws_sdk_quicksight::Error::from)
        };
        let output = with_timeout("list dashboards", self.timeout, request).await?;
        Ok(output
            .dashboard_summary_list()
            .iter()
            .filter_map(|summary| {
                Some(DashboardSummary {
                    dashboard_id: summary.dashboard_id()?.to_string(),
                    name: summary.name().unwrap_or_default().to_string(),
                    arn: summary.arn().map(str::to_string),
                    last_updated: summary
                        .last_updated_time()
                        .and_then(|time| time.to_chrono_utc().ok()),
                })
            })
            .collect())
    }

    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn describe_dashboard(
        &self,
        dashboard_id: &str,
    ) -> Result<DashboardDetail, AirwatchError> {
        let request = async {
            self.client
                .describe_dashboard()
                .aws_account_id(&self.account_id)
                .dashboard_id(dashboard_id)
                .send()
                .await
                .map_err(aws_sdk_quicksight::Error::from)
        };
        let output = with_timeout("describe dashboard", self.timeout, request).await?;
        let dashboard = output.dashboard();
        Ok(DashboardDetail {
            dashboard_id: dashboard
                .and_then(|d| d.dashboard_id())
                .unwrap_or(dashboard_id)
                .to_string(),
            name: dashboard
                .and_then(|d| d.name())
                .unwrap_or_default()
                .to_string(),
            arn: dashboard.and_then(|d| d.arn()).map(str::to_string),
            version: dashboard
                .and_then(|d| d.version())
                .and_then(|v| v.version_number()),
            last_published: dashboard
                .and_then(|d| d.last_published_time())
                .and_then(|time| time.to_chrono_utc().ok()),
            embed_url: None,
            expires_at: None,
        })
    }

    #[tracing::instrument(level = "DEBUG", skip(self, dashboard), fields(dashboard_id = %dashboard.dashboard_id))]
    async fn generate_embed_url(
        &self,
        dashboard: &DashboardDetail,
    ) -> Result<EmbedUrl, AirwatchError> {
        let arn = dashboard.arn.clone().ok_or(AirwatchError::NoDashboard {
            category: dashboard.dashboard_id.clone(),
        })?;
        let experience = AnonymousUserEmbeddingExperienceConfiguration::builder()
            .dashboard(
                AnonymousUserDashboardEmbeddingConfiguration::builder()
                    .initial_dashboard_id(&dashboard.dashboard_id)
                    .build()?,
            )
            .build();
        let request = async {
            self.client
                .generate_embed_url_for_anonymous_user()
                .aws_account_id(&self.account_id)
                .namespace(&self.namespace)
                .session_lifetime_in_minutes(self.session_minutes)
                .authorized_resource_arns(arn)
                .experience_configuration(experience)
                .send()
                .await
                .map_err(aws_sdk_quicksight::Error::from)
        };
        let issued = Utc::now();
        let output = with_timeout("generate embed URL", self.timeout, request).await?;
        Ok(EmbedUrl {
            url: output.embed_url().to_string(),
            expires_at: issued + ChronoDuration::minutes(self.session_minutes),
        })
    }
}
