//! Operator console over the admin client core: list and mutate the
//! platform's admin resources from a terminal.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    load_settings, DataSource, HttpDataSource, ListEntity, ListQuery, ListView, MutationIntent,
};
use shared::domain::{
    CategorySummary, DeletionRecord, EntityId, EventSummary, FaqSummary, NotificationSummary,
    SupportTicketSummary, UserSummary,
};
use shared::protocol::resources;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Admin console for the event-ticketing platform")]
struct Cli {
    /// Override the configured API base URL.
    #[arg(long)]
    base_url: Option<String>,
    /// Override the configured bearer token.
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = 10)]
    page_size: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List users, optionally narrowed by role or status.
    Users {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one user record.
    User { id: String },
    /// List events, optionally narrowed by status or category.
    Events {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// List the category taxonomy.
    Categories {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Remove a category (and its subcategories) from the taxonomy.
    DeleteCategory { id: String },
    /// List FAQs.
    Faqs {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Remove a FAQ entry.
    DeleteFaq { id: String },
    /// List support tickets.
    Support {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        status: Option<String>,
    },
    /// List broadcast notifications.
    Notifications {
        #[command(flatten)]
        list: ListArgs,
    },
    /// List account-deletion history.
    History {
        #[command(flatten)]
        list: ListArgs,
    },
    BlockUser { id: String },
    UnblockUser { id: String },
    DeleteUser { id: String },
    ApproveEvent { id: String },
    RejectEvent {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Answer a support ticket with an admin response.
    RespondTicket { id: String, response: String },
    /// Broadcast a notification to all users.
    Broadcast { title: String, body: String },
}

async fn run_list<T: ListEntity>(
    source: Arc<HttpDataSource>,
    resource: &str,
    list: &ListArgs,
    filters: &[(&str, Option<&String>)],
    describe: impl Fn(&T) -> String,
) -> Result<()>
where
    HttpDataSource: DataSource<T>,
{
    let query = ListQuery {
        search_term: list.search.clone().unwrap_or_default(),
        filters: filters
            .iter()
            .filter_map(|&(key, value)| value.map(|v| (key.to_string(), v.clone())))
            .collect(),
        page: list.page.max(1),
        page_size: list.page_size.max(1),
    };
    let view = ListView::<T>::with_query(source, resource, query);
    view.refresh()
        .await
        .with_context(|| format!("failed to load {resource}"))?;

    let meta = view.visible_meta().await;
    for item in view.visible_items().await {
        println!("{}", describe(&item));
    }
    println!(
        "-- page {} of {} ({} total)",
        meta.page, meta.total_pages, meta.total
    );
    Ok(())
}

async fn run_mutation<T>(
    source: Arc<HttpDataSource>,
    resource: &str,
    intent: MutationIntent,
) -> Result<()>
where
    HttpDataSource: DataSource<T>,
{
    let reply: client_core::MutationReply<T> =
        DataSource::mutate(source.as_ref(), resource, &intent)
            .await
            .with_context(|| format!("{} {} failed", intent.kind.label(), intent.id))?;
    println!("{}", reply.message);
    Ok(())
}

fn describe_user(user: &UserSummary) -> String {
    let name = user
        .personal_info
        .as_ref()
        .and_then(|info| info.first_name.clone())
        .unwrap_or_else(|| "-".into());
    format!(
        "{}  {}  {}  {:?}/{:?}",
        user.id, user.email, name, user.role, user.status
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(base_url) = cli.base_url {
        settings.api_base_url = base_url;
    }
    if let Some(token) = cli.token {
        settings.bearer_token = Some(token);
    }
    tracing::debug!(base_url = %settings.api_base_url, "console starting");
    let source = Arc::new(HttpDataSource::new(&settings)?);

    match cli.command {
        Command::Users { list, role, status } => {
            run_list::<UserSummary>(
                source,
                resources::USERS,
                &list,
                &[("role", role.as_ref()), ("status", status.as_ref())],
                describe_user,
            )
            .await
        }
        Command::User { id } => {
            let user: UserSummary = source.fetch_one(resources::USERS, &id).await?;
            println!("{}", describe_user(&user));
            if let Some(address) = &user.address {
                println!(
                    "address: {} {} {}",
                    address.street.as_deref().unwrap_or("-"),
                    address.city.as_deref().unwrap_or("-"),
                    address.country.as_deref().unwrap_or("-"),
                );
            }
            Ok(())
        }
        Command::Events {
            list,
            status,
            category,
        } => {
            run_list::<EventSummary>(
                source,
                resources::EVENTS,
                &list,
                &[("status", status.as_ref()), ("category", category.as_ref())],
                |event| {
                    format!(
                        "{}  {}  {:?}  {}  {}",
                        event.id, event.title, event.status, event.venue, event.starts_at
                    )
                },
            )
            .await
        }
        Command::Categories { list } => {
            run_list::<CategorySummary>(source, resources::CATEGORIES, &list, &[], |category| {
                let subs: Vec<&str> = category
                    .subcategories
                    .iter()
                    .map(|sub| sub.name.as_str())
                    .collect();
                format!("{}  {}  [{}]", category.id, category.name, subs.join(", "))
            })
            .await
        }
        Command::Faqs { list } => {
            run_list::<FaqSummary>(source, resources::FAQS, &list, &[], |faq| {
                format!("{}  {}  published={}", faq.id, faq.question, faq.published)
            })
            .await
        }
        Command::Support { list, status } => {
            run_list::<SupportTicketSummary>(
                source,
                resources::SUPPORT_TICKETS,
                &list,
                &[("status", status.as_ref())],
                |ticket| {
                    format!(
                        "{}  {}  {:?}  {}",
                        ticket.id, ticket.subject, ticket.status, ticket.created_at
                    )
                },
            )
            .await
        }
        Command::Notifications { list } => {
            run_list::<NotificationSummary>(
                source,
                resources::NOTIFICATIONS,
                &list,
                &[],
                |notification| {
                    format!(
                        "{}  {}  {}",
                        notification.id, notification.title, notification.sent_at
                    )
                },
            )
            .await
        }
        Command::History { list } => {
            run_list::<DeletionRecord>(source, resources::DELETION_HISTORY, &list, &[], |record| {
                format!(
                    "{}  {}  {}  {}",
                    record.id,
                    record.email,
                    record.reason.as_deref().unwrap_or("-"),
                    record.deleted_at
                )
            })
            .await
        }
        Command::BlockUser { id } => {
            run_mutation::<UserSummary>(
                source,
                resources::USERS,
                MutationIntent::block(EntityId::new(id)),
            )
            .await
        }
        Command::UnblockUser { id } => {
            run_mutation::<UserSummary>(
                source,
                resources::USERS,
                MutationIntent::unblock(EntityId::new(id)),
            )
            .await
        }
        Command::DeleteUser { id } => {
            run_mutation::<UserSummary>(
                source,
                resources::USERS,
                MutationIntent::delete(EntityId::new(id)),
            )
            .await
        }
        Command::DeleteCategory { id } => {
            run_mutation::<CategorySummary>(
                source,
                resources::CATEGORIES,
                MutationIntent::delete(EntityId::new(id)),
            )
            .await
        }
        Command::DeleteFaq { id } => {
            run_mutation::<FaqSummary>(
                source,
                resources::FAQS,
                MutationIntent::delete(EntityId::new(id)),
            )
            .await
        }
        Command::ApproveEvent { id } => {
            run_mutation::<EventSummary>(
                source,
                resources::EVENTS,
                MutationIntent::approve(EntityId::new(id)),
            )
            .await
        }
        Command::RejectEvent { id, reason } => {
            run_mutation::<EventSummary>(
                source,
                resources::EVENTS,
                MutationIntent::reject(EntityId::new(id), reason.as_deref()),
            )
            .await
        }
        Command::RespondTicket { id, response } => {
            run_mutation::<SupportTicketSummary>(
                source,
                resources::SUPPORT_TICKETS,
                MutationIntent::respond(EntityId::new(id), &response),
            )
            .await
        }
        Command::Broadcast { title, body } => {
            run_mutation::<NotificationSummary>(
                source,
                resources::NOTIFICATIONS,
                MutationIntent::broadcast(EntityId::new("new"), &title, &body),
            )
            .await
        }
    }
}
