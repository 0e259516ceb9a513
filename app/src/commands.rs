use crate::cli::{
    CheckoutCommand, Cli, Command, Format, LockArgs, MetadataArgs, PurchaserArgs, ReceiptCommand,
    SupplierArgs, SupplierCommand,
};
use crate::Services;
use anyhow::{Context, Result};
use checkout::LocksForm;
use config::AppConfig;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use unlock_dash_core::models::{Job, LockConfig, MetadataInput, Purchaser, SupplierProfile};
use unlock_dash_core::paywall::PaywallConfig;
use unlock_dash_core::recurring::RecurringEligibility;
use unlock_dash_core::Locks;

pub async fn run(cli: Cli, cfg: AppConfig) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Login { token } => {
            config::store_secret(config::LOCKSMITH_TOKEN_KEY, &token)
                .context("Failed to save access token")?;
            tracing::info!("Saved locksmith access token");
            Ok(())
        }
        Command::Logout => {
            config::delete_secret(config::LOCKSMITH_TOKEN_KEY)
                .context("Failed to remove access token")?;
            tracing::info!("Removed locksmith access token");
            Ok(())
        }
        Command::Receipt(command) => {
            let services = crate::create_services(&cfg)?;
            receipt(format, &cfg, &services, command).await
        }
        Command::Supplier(command) => {
            let services = crate::create_services(&cfg)?;
            supplier(format, &cfg, &services, command).await
        }
        Command::Status { lock, watch } => {
            let services = crate::create_services(&cfg)?;
            status(format, &services, lock, watch).await
        }
        Command::Checkout { file, command } => {
            let services = crate::create_services(&cfg)?;
            checkout(format, &cfg, &services, &file, command).await
        }
    }
}

fn emit<T: Serialize>(format: Format, value: &T) -> Result<()> {
    let out = match format {
        Format::Json => serde_json::to_string_pretty(value).context("Failed to encode JSON")?,
        Format::Yaml => serde_yaml::to_string(value).context("Failed to encode YAML")?,
    };
    println!("{}", out.trim_end());
    Ok(())
}

async fn receipt(
    format: Format,
    cfg: &AppConfig,
    services: &Services,
    command: ReceiptCommand,
) -> Result<()> {
    match command {
        ReceiptCommand::Get { lock, hash } => {
            let resp = services.receipts.get_receipt(lock.network, &lock.lock, &hash).await;
            if resp.is_empty() {
                eprintln!("No receipt found for transaction {hash}");
                return Ok(());
            }
            emit(format, &resp)
        }
        ReceiptCommand::ForKey { lock, token_id } => {
            let receipts = services
                .receipts
                .get_receipts_for_key(lock.network, &lock.lock, &token_id)
                .await?;
            if receipts.is_empty() {
                eprintln!("No receipts found for key {token_id}");
            }
            emit(format, &receipts)
        }
        ReceiptCommand::Update {
            lock,
            hash,
            purchaser,
        } => {
            let current = services.receipts.get_receipt(lock.network, &lock.lock, &hash).await;
            let edited = apply_purchaser(current.purchaser.unwrap_or_default(), purchaser);
            let saved = services
                .receipts
                .update_receipt(lock.network, &lock.lock, &hash, &edited)
                .await;
            if saved.is_empty() {
                anyhow::bail!("Receipt for transaction {hash} could not be updated");
            }
            emit(format, &saved)
        }
        ReceiptCommand::Url { lock, token_id } => {
            let receipts = services
                .receipts
                .get_receipts_for_key(lock.network, &lock.lock, &token_id)
                .await?;
            let url = receipts::receipts_url(&cfg.app_origin, &lock.lock, lock.network, &receipts)?;
            println!("{url}");
            Ok(())
        }
    }
}

async fn is_manager(cfg: &AppConfig, services: &Services, lock: &LockArgs) -> Result<bool> {
    let Some(account) = cfg.account.as_deref() else {
        tracing::warn!("No account configured, assuming not a lock manager");
        return Ok(false);
    };
    let manager = services
        .receipts
        .is_lock_manager(lock.network, &lock.lock, account)
        .await?;
    Ok(manager)
}

async fn supplier(
    format: Format,
    cfg: &AppConfig,
    services: &Services,
    command: SupplierCommand,
) -> Result<()> {
    match command {
        SupplierCommand::Get { lock } => {
            let manager = is_manager(cfg, services, &lock).await?;
            match services
                .receipts
                .get_receipts_base(lock.network, &lock.lock, manager)
                .await?
            {
                Some(profile) => emit(format, &profile),
                None => {
                    eprintln!("Only lock managers can view the supplier details of {}", lock.lock);
                    Ok(())
                }
            }
        }
        SupplierCommand::Set { lock, supplier } => {
            let manager = is_manager(cfg, services, &lock).await?;
            let current = services
                .receipts
                .get_receipts_base(lock.network, &lock.lock, manager)
                .await?
                .unwrap_or_default();
            let saved = services
                .receipts
                .update_receipts_base(lock.network, &lock.lock, manager, &apply_supplier(current, supplier))
                .await?;
            emit(format, &saved)
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusView {
    job: Option<Job>,
    polls: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    stopped: Option<&'static str>,
}

async fn status(format: Format, services: &Services, lock: LockArgs, watch: bool) -> Result<()> {
    let mut status = services
        .receipts
        .watch_receipts_status(lock.network, &lock.lock, watch);
    while status.changed().await {
        let snapshot = status.latest();
        if snapshot.stopped.is_some() {
            break;
        }
        if let Some(job) = &snapshot.job {
            tracing::info!(polls = snapshot.polls, status = ?job.payload.status, "Receipts export");
        }
    }

    let snapshot = status.latest();
    if snapshot.job.is_none() && snapshot.error.is_none() {
        eprintln!("No receipts export has been requested for {}", lock.lock);
    }
    emit(
        format,
        &StatusView {
            job: snapshot.job,
            polls: snapshot.polls,
            error: snapshot.error,
            stopped: snapshot.stopped.map(|reason| match reason {
                receipts::StopReason::Completed => "completed",
                receipts::StopReason::TimedOut => "timed_out",
                receipts::StopReason::NotPolling => "not_polling",
            }),
        },
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LockView<'a> {
    address: &'a str,
    #[serde(flatten)]
    config: &'a LockConfig,
    recurring: Option<RecurringEligibility>,
}

async fn checkout(
    format: Format,
    cfg: &AppConfig,
    services: &Services,
    file: &Path,
    command: CheckoutCommand,
) -> Result<()> {
    let paywall = if file.exists() {
        PaywallConfig::load(file)?
    } else {
        PaywallConfig::default()
    };

    let emitted: Arc<Mutex<Option<Locks>>> = Arc::default();
    let sink = Arc::clone(&emitted);
    let mut form = LocksForm::new(
        paywall.locks.clone(),
        Arc::clone(&services.recurring),
        Arc::clone(&services.indexer),
        Box::new(move |locks: &Locks| {
            if let Ok(mut slot) = sink.lock() {
                *slot = Some(locks.clone());
            }
        }),
    )
    .with_account(cfg.account.clone());

    match command {
        CheckoutCommand::Add {
            lock,
            name,
            recurring,
        } => {
            let fields = LockConfig {
                recurring_payments: recurring,
                ..Default::default()
            };
            form.add_lock(&lock.lock, lock.network, name.as_deref(), Some(fields))
                .await?;
        }
        CheckoutCommand::Remove { lock } => form.remove_lock(&lock),
        CheckoutCommand::Reorder { lock, change } => form.reorder(&lock, change)?,
        CheckoutCommand::Recurring { lock, value } => form.set_recurring(&lock, value).await?,
        CheckoutCommand::MetadataAdd { lock, field } => form.add_metadata(&lock, metadata_input(field))?,
        CheckoutCommand::MetadataRemove { lock, name } => form.remove_metadata(&lock, &name)?,
        CheckoutCommand::MetadataEdit { lock, index, field } => {
            form.edit_metadata(&lock, index, metadata_input(field))?
        }
        CheckoutCommand::Show => {
            let eligibility = form.preload_recurring().await;
            let view: Vec<_> = form
                .store()
                .sorted()
                .into_iter()
                .map(|(address, config)| LockView {
                    address,
                    config,
                    recurring: eligibility.get(address).copied(),
                })
                .collect();
            return emit(format, &view);
        }
    }

    let changed = emitted.lock().ok().and_then(|mut slot| slot.take());
    if let Some(mut locks) = changed {
        locks.sort_by(|_, a, _, b| a.order.cmp(&b.order));
        let updated = PaywallConfig { locks, ..paywall };
        updated.save(file)?;
        tracing::info!(file = %file.display(), locks = updated.locks.len(), "Saved checkout config");
        emit(format, &updated)?;
    }
    Ok(())
}

fn metadata_input(args: MetadataArgs) -> MetadataInput {
    MetadataInput {
        name: args.name,
        label: args.label,
        placeholder: args.placeholder,
        default_value: args.default_value,
        required: args.required,
        public: args.public,
        input_type: args.input_type,
        ..Default::default()
    }
}

/// An unset flag keeps the saved value; an empty one clears it.
fn edited(flag: Option<String>, current: Option<String>) -> Option<String> {
    match flag {
        Some(value) if value.is_empty() => None,
        Some(value) => Some(value),
        None => current,
    }
}

fn apply_purchaser(current: Purchaser, args: PurchaserArgs) -> Purchaser {
    Purchaser {
        fullname: edited(args.fullname, current.fullname),
        business_name: edited(args.business_name, current.business_name),
        email: edited(args.email, current.email),
        address_line1: edited(args.address_line1, current.address_line1),
        address_line2: edited(args.address_line2, current.address_line2),
        city: edited(args.city, current.city),
        state: edited(args.state, current.state),
        zip: edited(args.zip, current.zip),
        country: edited(args.country, current.country),
        extra: current.extra,
    }
}

fn apply_supplier(current: SupplierProfile, args: SupplierArgs) -> SupplierProfile {
    SupplierProfile {
        supplier_name: edited(args.supplier_name, current.supplier_name),
        vat: edited(args.vat, current.vat),
        service_performed: edited(args.service_performed, current.service_performed),
        prefix: edited(args.prefix, current.prefix),
        vat_rate_percentage: match args.vat_rate_percentage {
            Some(rate) if rate == 0.0 => None,
            Some(rate) => Some(rate),
            None => current.vat_rate_percentage,
        },
        address_line1: edited(args.address_line1, current.address_line1),
        address_line2: edited(args.address_line2, current.address_line2),
        city: edited(args.city, current.city),
        state: edited(args.state, current.state),
        zip: edited(args.zip, current.zip),
        country: edited(args.country, current.country),
        ..current
    }
}
