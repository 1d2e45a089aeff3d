//! Confirm-gated lifecycle actions

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ActionBody, ActionReceipt, ApiClient, Notification, PendingAction};
use crate::commands::containers::resolve;
use crate::output::{
    color_status, print_info, print_json, print_success, print_table, print_warning, OutputFormat,
};

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Stage an action and, with `yes`, confirm it straight away
pub async fn request(
    client: &ApiClient,
    key: &str,
    action: &str,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let container = resolve(client, key).await?;
    let pending: PendingAction = client
        .post(
            &format!("api/v1/containers/{}/actions", container.id),
            &ActionBody {
                action: action.to_lowercase(),
            },
        )
        .await?;

    if yes {
        return confirm(client, format).await;
    }
    print_pending(&pending, format)
}

/// Stage deletion of a user account
pub async fn request_user_deletion(
    client: &ApiClient,
    user_id: &str,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let pending: PendingAction = client
        .post_empty(&format!("api/v1/users/{}/delete", user_id))
        .await?;

    if yes {
        return confirm(client, format).await;
    }
    print_pending(&pending, format)
}

fn print_pending(pending: &PendingAction, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(pending)?,
        OutputFormat::Table => {
            print_warning(&pending.prompt);
            print_info("Run `fleetctl confirm` to proceed or `fleetctl cancel` to abort.");
        }
    }
    Ok(())
}

pub async fn confirm(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let receipt: ActionReceipt = client.post_empty("api/v1/actions/confirm").await?;

    match format {
        OutputFormat::Json => print_json(&receipt)?,
        OutputFormat::Table => {
            print_success(&receipt.message);
            println!("  {}", receipt.audit_entry.dimmed());
        }
    }
    Ok(())
}

pub async fn cancel(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let cancelled: PendingAction = client.post_empty("api/v1/actions/cancel").await?;

    match format {
        OutputFormat::Json => print_json(&cancelled)?,
        OutputFormat::Table => print_info(&format!(
            "Cancelled {} of '{}'",
            cancelled.action, cancelled.target_name
        )),
    }
    Ok(())
}

pub async fn notifications(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let notifications: Vec<Notification> = client.get("api/v1/notifications").await?;

    match format {
        OutputFormat::Json => print_json(&notifications)?,
        OutputFormat::Table => {
            let rows: Vec<NotificationRow> = notifications
                .iter()
                .map(|n| NotificationRow {
                    id: n.id.clone(),
                    severity: color_status(&n.severity),
                    message: n.message.clone(),
                })
                .collect();
            print_table(&rows);
        }
    }
    Ok(())
}

pub async fn audit(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let trail: Vec<String> = client.get("api/v1/audit").await?;

    match format {
        OutputFormat::Json => print_json(&trail)?,
        OutputFormat::Table => {
            if trail.is_empty() {
                println!("{}", "No audited actions yet".yellow());
            }
            for entry in &trail {
                println!("{}", entry);
            }
        }
    }
    Ok(())
}
