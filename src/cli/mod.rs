use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::LedgerService;
use crate::config::Config;
use crate::domain::{
    CreditPolicy, LedgerEntry, VisitEvent, format_cents, is_discount_eligible, parse_cents,
};

/// Visitledger - visit billing and loyalty credit ledger
#[derive(Parser)]
#[command(name = "visitledger")]
#[command(about = "Bill customer visits with first-visit credit and repeat discounts")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Config file path (defaults to $VISITLEDGER_CONFIG, then ./visitledger.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Bill a visit for a customer
    Visit {
        /// Customer phone number
        phone: String,

        /// Billable category (e.g. "4-wheeler")
        #[arg(short = 'C', long)]
        category: String,

        /// Units ordered or days parked
        #[arg(short, long, default_value = "1")]
        quantity: i64,

        /// Register the customer under this name if the phone is unknown
        #[arg(long)]
        name: Option<String>,

        /// Address used when registering
        #[arg(long)]
        address: Option<String>,
    },

    /// Add credit to a customer's balance
    Deposit {
        /// Customer phone number
        phone: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Remove credit from a customer's balance
    Withdraw {
        /// Customer phone number
        phone: String,

        /// Amount (e.g., "50.00" or "50")
        amount: String,
    },

    /// Record feedback and an optional tip
    Feedback {
        /// Customer phone number
        phone: String,

        /// Rating from 0 (none) to 5
        #[arg(short, long)]
        stars: u8,

        /// Tip amount
        #[arg(short, long)]
        tip: Option<String>,
    },

    /// Show a customer's visits and ledger entries
    History {
        /// Customer phone number
        phone: String,
    },

    /// Show the active pricing table
    Pricing,

    /// Verify stored balances against the ledger
    Check,

    /// Export data to CSV or JSON
    Export {
        /// What to export: customers, visits, entries, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Format: csv, json (default: csv, json for full)
        #[arg(short, long)]
        format: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer
    Register {
        /// Customer name
        name: String,

        /// Phone number (10-12 digits, must be unique)
        #[arg(short, long)]
        phone: String,

        /// Postal address
        #[arg(short, long)]
        address: Option<String>,
    },

    /// List all customers
    List,

    /// Show detailed customer information
    Show {
        /// Customer phone number
        phone: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let database = self.database.unwrap_or(config.database);
        let pricing = config.pricing;

        match self.command {
            Commands::Init => {
                LedgerService::init(&database, pricing).await?;
                println!("Database initialized: {}", database);
            }

            Commands::Customer(customer_cmd) => {
                let service = LedgerService::connect(&database, pricing).await?;
                run_customer_command(&service, customer_cmd).await?;
            }

            Commands::Visit {
                phone,
                category,
                quantity,
                name,
                address,
            } => {
                let service = LedgerService::connect(&database, pricing).await?;
                let customer = match name {
                    Some(name) => {
                        service
                            .find_or_register_customer(&name, &phone, address)
                            .await?
                    }
                    None => service.get_customer_by_phone(&phone).await?,
                };

                let receipt = service
                    .process_visit(customer.id, &category, quantity)
                    .await?;

                if customer.is_returning() {
                    println!("Welcome back, {}!", customer.name);
                }
                println!(
                    "Visit #{} for {} ({}): {} x {}",
                    receipt.visit_count_after,
                    customer.name,
                    customer.phone,
                    receipt.visit.quantity,
                    receipt.visit.category
                );
                println!("  Base fee:        {:>10}", format_cents(receipt.visit.base_fee));
                if receipt.credit_applied > 0 {
                    println!(
                        "  Credit applied:  {:>10}",
                        format!("-{}", format_cents(receipt.credit_applied))
                    );
                }
                if receipt.credit_forfeited > 0 {
                    println!(
                        "  Credit forfeited:{:>10}",
                        format_cents(receipt.credit_forfeited)
                    );
                }
                if receipt.discount_applied {
                    println!(
                        "  Repeat discount: {:>10}",
                        format!("-{}", format_cents(receipt.discount_amount))
                    );
                }
                println!("  Total due:       {:>10}", format_cents(receipt.fee_charged));
                if receipt.credit_earned > 0 {
                    println!(
                        "  Credit earned:   {:>10}",
                        format_cents(receipt.credit_earned)
                    );
                }
                println!("  Credit balance:  {:>10}", format_cents(receipt.balance_after));
            }

            Commands::Deposit { phone, amount } => {
                let service = LedgerService::connect(&database, pricing).await?;
                let customer = service.get_customer_by_phone(&phone).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let result = service.deposit_credit(customer.id, amount_cents).await?;
                println!(
                    "Deposited {} for {}. Credit balance: {}",
                    format_cents(result.entry.amount_cents),
                    customer.name,
                    format_cents(result.balance_after)
                );
            }

            Commands::Withdraw { phone, amount } => {
                let service = LedgerService::connect(&database, pricing).await?;
                let customer = service.get_customer_by_phone(&phone).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;

                let result = service.withdraw_credit(customer.id, amount_cents).await?;
                println!(
                    "Withdrew {} for {}. Credit balance: {}",
                    format_cents(result.entry.amount_cents),
                    customer.name,
                    format_cents(result.balance_after)
                );
            }

            Commands::Feedback { phone, stars, tip } => {
                let service = LedgerService::connect(&database, pricing).await?;
                let customer = service.get_customer_by_phone(&phone).await?;
                let tip_cents = tip
                    .map(|t| parse_cents(&t))
                    .transpose()
                    .context("Invalid tip format")?
                    .unwrap_or(0);

                let feedback = service
                    .record_feedback(customer.id, stars, tip_cents)
                    .await?;
                println!("{}", feedback.message());
                if feedback.tip > 0 {
                    println!("Tip recorded: {}", format_cents(feedback.tip));
                }
            }

            Commands::History { phone } => {
                let service = LedgerService::connect(&database, pricing).await?;
                let customer = service.get_customer_by_phone(&phone).await?;
                let visits = service.customer_visits(customer.id).await?;
                let entries = service.customer_history(customer.id).await?;

                println!("{} ({})", customer.name, customer.phone);
                print_visits(&visits);
                println!();
                print_entries(&entries);
            }

            Commands::Pricing => {
                print_pricing(&pricing);
            }

            Commands::Check => {
                let service = LedgerService::connect(&database, pricing).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                export_type,
                output,
                format,
            } => {
                let service = LedgerService::connect(&database, pricing).await?;
                run_export_command(&service, &export_type, output.as_deref(), format.as_deref())
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_customer_command(service: &LedgerService, cmd: CustomerCommands) -> Result<()> {
    match cmd {
        CustomerCommands::Register {
            name,
            phone,
            address,
        } => {
            let customer = service.register_customer(&name, &phone, address).await?;
            println!(
                "Registered customer: {} ({}) [{}]",
                customer.name, customer.phone, customer.id
            );
        }

        CustomerCommands::List => {
            let customers = service.list_customers().await?;
            if customers.is_empty() {
                println!("No customers found.");
                return Ok(());
            }

            println!(
                "{:<24} {:<14} {:>8} {:>12}",
                "NAME", "PHONE", "VISITS", "CREDIT"
            );
            println!("{}", "-".repeat(61));
            for customer in customers {
                println!(
                    "{:<24} {:<14} {:>8} {:>12}",
                    truncate(&customer.name, 24),
                    customer.phone,
                    customer.visit_count,
                    format_cents(customer.credit_balance)
                );
            }
        }

        CustomerCommands::Show { phone } => {
            let info = service.get_customer_info(&phone).await?;
            let customer = &info.customer;

            println!("Customer: {}", customer.name);
            println!("  ID:       {}", customer.id);
            println!("  Phone:    {}", customer.phone);
            if let Some(address) = &customer.address {
                println!("  Address:  {}", address);
            }
            println!("  Visits:   {}", customer.visit_count);
            println!("  Credit:   {}", format_cents(customer.credit_balance));
            println!(
                "  Since:    {}",
                customer.created_at.format("%Y-%m-%d %H:%M")
            );
            let status = if is_discount_eligible(customer.visit_count) {
                "repeat customer, discount on next visit"
            } else if customer.is_returning() {
                "returning customer"
            } else {
                "new customer, first visit earns credit"
            };
            println!("  Status:   {}", status);

            if !info.feedback.is_empty() {
                let rated: Vec<_> = info.feedback.iter().filter(|f| f.stars > 0).collect();
                if !rated.is_empty() {
                    let average =
                        rated.iter().map(|f| f.stars as f64).sum::<f64>() / rated.len() as f64;
                    println!("  Rating:   {:.1} ({} reviews)", average, rated.len());
                }
            }

            println!();
            print_visits(&info.visits);
            println!();
            print_entries(&info.entries);
        }
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Customers: {}", report.customer_count);
    println!("Visits:    {}", report.visit_count);
    println!("Entries:   {}", report.entry_count);
    println!(
        "Credit outstanding: {}",
        format_cents(report.total_credit_outstanding)
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    output: Option<&str>,
    format: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let format = format.unwrap_or(if export_type == "full" { "json" } else { "csv" });

    let count = match (export_type, format) {
        ("customers", "csv") => exporter.export_customers_csv(writer).await?,
        ("customers", "json") => exporter.export_customers_json(writer).await?,
        ("visits", "csv") => exporter.export_visits_csv(writer).await?,
        ("visits", "json") => exporter.export_visits_json(writer).await?,
        ("entries", "csv") => exporter.export_entries_csv(writer).await?,
        ("entries", "json") => exporter.export_entries_json(writer).await?,
        ("full", "json") => {
            let snapshot = exporter.export_full_json(writer).await?;
            snapshot.customers.len() + snapshot.visits.len() + snapshot.entries.len()
        }
        ("customers" | "visits" | "entries" | "full", _) => {
            anyhow::bail!(
                "Unsupported format '{}' for {}. Use csv or json (full is json only)",
                format,
                export_type
            );
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: customers, visits, entries, full",
                export_type
            );
        }
    };

    if output.is_some() {
        eprintln!("Exported {} {} record(s)", count, export_type);
    }

    Ok(())
}

fn print_visits(visits: &[VisitEvent]) {
    if visits.is_empty() {
        println!("No visits.");
        return;
    }

    println!(
        "{:>3}  {:<16}  {:<20} {:>5} {:>10} {:>10}",
        "#", "DATE", "CATEGORY", "QTY", "BASE FEE", "CHARGED"
    );
    println!("{}", "-".repeat(70));
    for (number, visit) in visits.iter().enumerate() {
        println!(
            "{:>3}  {:<16}  {:<20} {:>5} {:>10} {:>10}",
            number + 1,
            visit.occurred_at.format("%Y-%m-%d %H:%M"),
            truncate(&visit.category, 20),
            visit.quantity,
            format_cents(visit.base_fee),
            format_cents(visit.fee_charged)
        );
    }
}

fn print_entries(entries: &[LedgerEntry]) {
    if entries.is_empty() {
        println!("No ledger entries.");
        return;
    }

    println!(
        "{:>5}  {:<16}  {:<16} {:>10}  {}",
        "SEQ", "DATE", "KIND", "AMOUNT", "DESCRIPTION"
    );
    println!("{}", "-".repeat(72));
    for entry in entries {
        println!(
            "{:>5}  {:<16}  {:<16} {:>10}  {}",
            entry.sequence,
            entry.recorded_at.format("%Y-%m-%d %H:%M"),
            entry.kind.as_str(),
            format_cents(entry.amount_cents),
            entry.description.as_deref().unwrap_or("")
        );
    }
}

fn print_pricing(pricing: &crate::domain::PricingTable) {
    println!(
        "{:<20} {:>12} {:>16}",
        "CATEGORY", "UNIT PRICE", "FIRST-VISIT CR."
    );
    println!("{}", "-".repeat(50));
    for (name, rate) in pricing.categories() {
        let credit = match pricing.credit_policy {
            CreditPolicy::PerCategory => rate.first_visit_credit,
            CreditPolicy::Flat { amount } => amount,
        };
        println!(
            "{:<20} {:>12} {:>16}",
            truncate(name, 20),
            format_cents(rate.unit_price),
            format_cents(credit)
        );
    }
    println!();
    println!(
        "Repeat discount: {}% from the third visit on",
        (pricing.discount_rate * 100.0).round()
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
