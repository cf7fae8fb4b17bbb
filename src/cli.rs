use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::PathBuf;

use cashflow::api::ListParams;
use cashflow::domain::{Domain, Entity, EntityId};
use cashflow::provider::CollectionProvider;
use cashflow::session::Session;

#[derive(Parser, Debug)]
#[command(name = "cashflow")]
#[command(about = "Cached command-line client for the cash-flow tracker API")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/cashflow/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Spending and income categories
  Categories {
    #[command(subcommand)]
    action: ListAction,
  },
  /// Merchants
  Merchants {
    #[command(subcommand)]
    action: ListAction,
  },
  /// Receipts
  Receipts {
    #[command(subcommand)]
    action: ListAction,
  },
  /// Auto-categorization rules
  Rules {
    #[command(subcommand)]
    action: ListAction,
  },
  /// Alerts
  Alerts {
    #[command(subcommand)]
    action: AlertAction,
  },
  /// The signed-in user's profile
  Profile {
    /// Skip the cache and fetch from the server
    #[arg(long)]
    refresh: bool,
  },
  /// Inspect or clear the local cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
pub enum ListAction {
  /// Print all entities (cached if fresh)
  List {
    /// Fetch from the server even when the cache is fresh
    #[arg(long)]
    refresh: bool,
    /// Extra query parameter for the server, as key=value (implies --refresh)
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<ListParams>,
  },
  /// Print one entity
  Get { id: EntityId },
  /// Delete one entity on the server
  Delete { id: EntityId },
}

#[derive(Subcommand, Debug)]
pub enum AlertAction {
  #[command(flatten)]
  Common(ListAction),
  /// Mark an alert as read
  Read { id: EntityId },
  /// Print the number of unread alerts
  Unread,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
  /// Show which domains have a fresh cached snapshot
  Status,
  /// Clear the cache of one domain, or all of them
  Clear {
    /// categories, merchants, receipts, rules, alerts or profile
    domain: Option<String>,
  },
}

pub async fn run(command: Command, session: &Session) -> Result<()> {
  match command {
    Command::Categories { action } => run_list(&session.categories, action).await,
    Command::Merchants { action } => run_list(&session.merchants, action).await,
    Command::Receipts { action } => run_list(&session.receipts, action).await,
    Command::Rules { action } => run_list(&session.rules, action).await,
    Command::Alerts { action } => match action {
      AlertAction::Common(action) => run_list(&session.alerts, action).await,
      AlertAction::Read { id } => {
        session.alerts.initialize().await.revalidated().await;
        let alert = session.alerts.mark_read(id).await?;
        print_json(&alert)
      }
      AlertAction::Unread => {
        session.alerts.initialize().await.revalidated().await;
        println!("{}", session.alerts.unread_count());
        Ok(())
      }
    },
    Command::Profile { refresh } => {
      let init = session.profile.initialize().await;
      if refresh {
        session.profile.refresh().await?;
      }
      match session.profile.profile() {
        Some(profile) => print_json(&profile)?,
        None => return Err(eyre!("Profile unavailable: server unreachable and nothing cached")),
      }
      init.revalidated().await;
      Ok(())
    }
    Command::Cache { action } => run_cache(session, action).await,
  }
}

async fn run_list<T: Entity>(provider: &CollectionProvider<T>, action: ListAction) -> Result<()> {
  let init = provider.initialize().await;

  match action {
    ListAction::List { refresh, params } => {
      let params: ListParams = params.into_iter().collect();
      if refresh || !params.is_empty() {
        provider.refresh(&params).await?;
      }
      print_json(&provider.items())?;
      // Let a cache hit finish revalidating so the next run starts fresh
      init.revalidated().await;
    }
    ListAction::Get { id } => {
      init.revalidated().await;
      let entity = match provider.get(id) {
        Some(entity) => entity,
        None => provider.fetch_by_id(id).await?,
      };
      print_json(&entity)?;
    }
    ListAction::Delete { id } => {
      init.revalidated().await;
      provider.delete(id).await?;
      println!("Deleted {} {}", T::DOMAIN, id);
    }
  }

  Ok(())
}

async fn run_cache(session: &Session, action: CacheAction) -> Result<()> {
  match action {
    CacheAction::Status => {
      for domain in Domain::ALL {
        match session.cache_expiry(domain).await {
          Some((expires_at_ms, count)) => {
            let until = DateTime::<Utc>::from_timestamp_millis(expires_at_ms)
              .map(|t| t.to_rfc3339())
              .unwrap_or_else(|| expires_at_ms.to_string());
            println!("{:<12} fresh until {} ({} items)", domain, until, count);
          }
          None => println!("{:<12} empty", domain),
        }
      }
    }
    CacheAction::Clear { domain: Some(name) } => {
      let domain =
        Domain::from_namespace(&name).ok_or_else(|| eyre!("Unknown domain '{}'", name))?;
      session.invalidate(domain).await;
      println!("Cleared {} cache", domain);
    }
    CacheAction::Clear { domain: None } => {
      session.invalidate_all().await;
      println!("Cleared all caches");
    }
  }
  Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  let json =
    serde_json::to_string_pretty(value).map_err(|e| eyre!("Failed to format output: {}", e))?;
  println!("{}", json);
  Ok(())
}
