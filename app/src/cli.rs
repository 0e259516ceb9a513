use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use unlock_dash_core::models::{MetadataInputType, RecurringPayments};

pub const CONFIG_ENV: &str = "UNLOCK_DASH_CONFIG";

/// Manage lock checkout configs, receipts and supplier profiles.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Config file to use instead of the per-user one
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read and edit receipts
    #[command(subcommand)]
    Receipt(ReceiptCommand),

    /// Read and edit the supplier profile of a lock
    #[command(subcommand)]
    Supplier(SupplierCommand),

    /// Show the receipts export job of a lock
    Status {
        #[command(flatten)]
        lock: LockArgs,

        /// Keep polling until the job completes or times out
        #[arg(short, long)]
        watch: bool,
    },

    /// Edit the locks of a checkout config file
    Checkout {
        /// Checkout config file, created when missing
        #[arg(long, default_value = unlock_dash_core::paywall::PAYWALL_CONFIG_FILE)]
        file: PathBuf,

        #[command(subcommand)]
        command: CheckoutCommand,
    },

    /// Save a locksmith access token in the OS keychain
    Login {
        #[arg(long, env = config::LOCKSMITH_TOKEN_ENV, hide_env_values = true)]
        token: String,
    },

    /// Remove the saved locksmith access token
    Logout,
}

#[derive(Args, Debug, Clone)]
pub struct LockArgs {
    /// Chain id
    #[arg(short, long)]
    pub network: u64,

    /// Lock contract address
    #[arg(short, long)]
    pub lock: String,
}

#[derive(Subcommand, Debug)]
pub enum ReceiptCommand {
    /// Receipt of one purchase transaction
    Get {
        #[command(flatten)]
        lock: LockArgs,
        #[arg(long)]
        hash: String,
    },

    /// Every receipt of a key
    ForKey {
        #[command(flatten)]
        lock: LockArgs,
        #[arg(long)]
        token_id: String,
    },

    /// Update the purchaser details of a receipt; empty flags clear a field
    Update {
        #[command(flatten)]
        lock: LockArgs,
        #[arg(long)]
        hash: String,
        #[command(flatten)]
        purchaser: PurchaserArgs,
    },

    /// Link to the receipts page for a key
    Url {
        #[command(flatten)]
        lock: LockArgs,
        #[arg(long)]
        token_id: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PurchaserArgs {
    #[arg(long)]
    pub fullname: Option<String>,
    #[arg(long)]
    pub business_name: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address_line1: Option<String>,
    #[arg(long)]
    pub address_line2: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SupplierCommand {
    Get {
        #[command(flatten)]
        lock: LockArgs,
    },

    /// Update the supplier profile; unset flags keep their saved value, empty ones clear it
    Set {
        #[command(flatten)]
        lock: LockArgs,
        #[command(flatten)]
        supplier: SupplierArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SupplierArgs {
    #[arg(long)]
    pub supplier_name: Option<String>,
    #[arg(long)]
    pub vat: Option<String>,
    #[arg(long)]
    pub service_performed: Option<String>,
    #[arg(long)]
    pub prefix: Option<String>,
    /// VAT rate in percent, e.g. 19.5; 0 removes the rate
    #[arg(long)]
    pub vat_rate_percentage: Option<f64>,
    #[arg(long)]
    pub address_line1: Option<String>,
    #[arg(long)]
    pub address_line2: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub state: Option<String>,
    #[arg(long)]
    pub zip: Option<String>,
    #[arg(long)]
    pub country: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CheckoutCommand {
    /// Add a lock, or update it when already present
    Add {
        #[command(flatten)]
        lock: LockArgs,
        #[arg(long)]
        name: Option<String>,
        /// Number of renewals, or "forever"
        #[arg(long)]
        recurring: Option<RecurringPayments>,
    },

    Remove {
        #[arg(short, long)]
        lock: String,
    },

    /// Move a lock one position up (-1) or down (1)
    Reorder {
        #[arg(short, long)]
        lock: String,
        #[arg(long, allow_negative_numbers = true)]
        change: i64,
    },

    /// Set the number of renewals; without a value the one-year default is restored
    Recurring {
        #[arg(short, long)]
        lock: String,
        value: Option<RecurringPayments>,
    },

    MetadataAdd {
        #[arg(short, long)]
        lock: String,
        #[command(flatten)]
        field: MetadataArgs,
    },

    MetadataRemove {
        #[arg(short, long)]
        lock: String,
        #[arg(long)]
        name: String,
    },

    MetadataEdit {
        #[arg(short, long)]
        lock: String,
        #[arg(long)]
        index: usize,
        #[command(flatten)]
        field: MetadataArgs,
    },

    /// Print the locks with their recurring eligibility
    Show,
}

#[derive(Args, Debug, Clone)]
pub struct MetadataArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub label: Option<String>,
    #[arg(long)]
    pub placeholder: Option<String>,
    #[arg(long)]
    pub default_value: Option<String>,
    #[arg(long = "type", value_parser = parse_input_type, default_value = "text")]
    pub input_type: MetadataInputType,
    #[arg(long)]
    pub required: bool,
    #[arg(long)]
    pub public: bool,
}

fn parse_input_type(s: &str) -> Result<MetadataInputType, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| format!("unknown input type `{s}`"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkout_reorder() {
        let cli = Cli::try_parse_from([
            "unlock-dash",
            "checkout",
            "--file",
            "cfg.json",
            "reorder",
            "--lock",
            "0xabc",
            "--change",
            "-1",
        ])
        .unwrap();
        match cli.command {
            Command::Checkout {
                file,
                command: CheckoutCommand::Reorder { change, .. },
            } => {
                assert_eq!(file, PathBuf::from("cfg.json"));
                assert_eq!(change, -1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_metadata_type_and_recurring() {
        let cli = Cli::try_parse_from([
            "unlock-dash",
            "-f",
            "yaml",
            "checkout",
            "metadata-add",
            "-l",
            "0xabc",
            "--name",
            "email",
            "--type",
            "Email",
            "--required",
        ])
        .unwrap();
        assert_eq!(cli.format, Format::Yaml);
        let Command::Checkout {
            command: CheckoutCommand::MetadataAdd { field, .. },
            ..
        } = cli.command
        else {
            panic!("expected metadata-add");
        };
        assert_eq!(field.input_type, MetadataInputType::Email);
        assert!(field.required);

        assert!(Cli::try_parse_from([
            "unlock-dash", "checkout", "recurring", "-l", "0xabc", "forever"
        ])
        .is_ok());
        assert!(Cli::try_parse_from([
            "unlock-dash", "checkout", "metadata-add", "-l", "0xabc", "--name", "x", "--type", "radio"
        ])
        .is_err());
    }
}
