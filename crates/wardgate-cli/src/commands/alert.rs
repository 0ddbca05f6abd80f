//! Activity alert commands.

use clap::Args;
use tabled::Tabled;

use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;
use wardgate_core::types::{AlertId, PageRequest};
use wardgate_database::store::AlertFilter;
use wardgate_entity::activity::{ActivityAlert, AlertSeverity};
use wardgate_service::RequestContext;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ListAlertsArgs {
    /// Only unresolved alerts
    #[arg(long)]
    pub open: bool,
    /// Only alerts of this severity (info, warning, error, critical)
    #[arg(long)]
    pub severity: Option<String>,
    /// Maximum number of alerts
    #[arg(long, default_value_t = 50)]
    pub limit: u64,
}

#[derive(Debug, Args)]
pub struct ResolveAlertArgs {
    /// Alert id
    #[arg(long)]
    pub id: AlertId,
    /// Resolution notes
    #[arg(long)]
    pub notes: String,
}

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Resolved")]
    resolved: bool,
    #[tabled(rename = "Raised")]
    raised: String,
    #[tabled(rename = "Message")]
    message: String,
}

impl From<&ActivityAlert> for AlertRow {
    fn from(alert: &ActivityAlert) -> Self {
        Self {
            id: alert.id.get(),
            kind: alert.alert_kind.to_string(),
            severity: alert.severity.to_string(),
            user: alert.user_id.map(|u| u.to_string()).unwrap_or_default(),
            ip: alert.ip_address.clone().unwrap_or_default(),
            resolved: alert.is_resolved,
            raised: alert.created_at.format("%Y-%m-%d %H:%M").to_string(),
            message: output::truncate(&alert.message, 60),
        }
    }
}

pub async fn list(args: &ListAlertsArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let filter = AlertFilter {
        open_only: args.open,
        severity: args
            .severity
            .as_deref()
            .map(str::parse::<AlertSeverity>)
            .transpose()?,
        ..AlertFilter::default()
    };

    let services = super::open_services(config).await?;
    let page = services
        .alerts
        .list(&filter, &PageRequest::new(1, args.limit))
        .await?;

    let rows: Vec<AlertRow> = page.items.iter().map(AlertRow::from).collect();
    output::print_list(&rows, &page.items, format);
    Ok(())
}

pub async fn resolve(
    args: &ResolveAlertArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let services = super::open_services(config).await?;
    let alert = services
        .alerts
        .resolve(&RequestContext::system(), args.id, args.notes.trim())
        .await?;

    output::print_item(&alert, &format!("Alert {} resolved", alert.id), format);
    Ok(())
}
