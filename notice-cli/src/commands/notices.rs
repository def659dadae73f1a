//! Notice commands.

use clap::Subcommand;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;

use notice_api::Notice;
use notice_core::config::ConfigHandle;
use notice_core::error::NoticeResult;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum NoticesAction {
    /// List the latest notices with their read state.
    Latest,
    /// Show the number of unread notices.
    Unread,
    /// Mark a notice as read.
    Read {
        /// Notice id.
        id: i64,
    },
    /// Show one notice in full.
    Show {
        /// Notice id.
        id: i64,
    },
}

pub async fn run(config: ConfigHandle, action: NoticesAction, format: OutputFormat) -> NoticeResult<()> {
    let api = super::create_api_client(&config).await?;

    match action {
        NoticesAction::Latest => {
            let notices = api.latest_notices().await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&notices).unwrap_or_default());
                }
                OutputFormat::Text => {
                    if notices.is_empty() {
                        println!("No notices.");
                    } else {
                        println!("{}", notice_table(&notices));
                    }
                }
            }
        }
        NoticesAction::Unread => {
            let count = api.unread_count().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "unread": count })),
                OutputFormat::Text => println!("{count} unread"),
            }
        }
        NoticesAction::Read { id } => {
            api.mark_notice_read(id).await?;
            if format == OutputFormat::Text {
                println!("  {} Notice {id} marked as read.", style("OK").green().bold());
            }
        }
        NoticesAction::Show { id } => {
            let notice = api.get_notice(id).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&notice).unwrap_or_default());
                }
                OutputFormat::Text => print_notice(&notice),
            }
        }
    }

    Ok(())
}

fn created_label(notice: &Notice) -> String {
    match notice.created_at() {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => notice.create_time.clone().unwrap_or_else(|| "-".into()),
    }
}

fn notice_table(notices: &[Notice]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec!["ID", "Title", "Type", "By", "Created", ""]);

    for n in notices {
        let unread = if n.is_read() { "" } else { "*" };
        table.add_row(vec![
            n.id.to_string(),
            super::truncate(&n.title, 40),
            n.category_label().to_string(),
            n.create_by.clone().unwrap_or_else(|| "-".into()),
            created_label(n),
            unread.to_string(),
        ]);
    }
    table
}

fn print_notice(notice: &Notice) {
    println!("{}", style(&notice.title).bold().underlined());
    println!("  Type:      {}", notice.category_label());
    println!("  By:        {}", notice.create_by.as_deref().unwrap_or("-"));
    println!("  Created:   {}", created_label(notice));
    println!();
    match notice.content.as_deref() {
        Some(content) if !content.trim().is_empty() => println!("{content}"),
        _ => println!("{}", style("(no content)").dim()),
    }
}
