//! Audit log command.

use clap::Args;
use tabled::Tabled;

use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;
use wardgate_core::types::PageRequest;
use wardgate_database::store::AuditFilter;
use wardgate_entity::audit::AuditLogEntry;

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct ListAuditArgs {
    /// Maximum number of entries, newest first
    #[arg(long, default_value_t = 50)]
    pub limit: u64,
}

#[derive(Tabled)]
struct AuditRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "When")]
    when: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Actor")]
    actor: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "IP")]
    ip: String,
}

impl From<&AuditLogEntry> for AuditRow {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            id: entry.id.get(),
            when: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: entry.action.to_string(),
            actor: entry
                .actor_id
                .map_or_else(|| "system".to_string(), |id| id.to_string()),
            target: entry.target_user_id.map(|id| id.to_string()).unwrap_or_default(),
            ip: entry.ip_address.clone().unwrap_or_default(),
        }
    }
}

pub async fn list(args: &ListAuditArgs, config: &AppConfig, format: OutputFormat) -> AppResult<()> {
    let services = super::open_services(config).await?;
    let page = services
        .audit
        .list(&AuditFilter::default(), &PageRequest::new(1, args.limit))
        .await?;

    let rows: Vec<AuditRow> = page.items.iter().map(AuditRow::from).collect();
    output::print_list(&rows, &page.items, format);
    Ok(())
}
