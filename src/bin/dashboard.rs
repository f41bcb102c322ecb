use clap::{Parser, Subcommand};
use expense_tracker::category::Category;
use expense_tracker::client::{ApiClient, ClientError};
use expense_tracker::config::DashboardConfig;
use expense_tracker::dashboard::{
    expense_table, render_category_breakdown, render_summary, render_trend, Dashboard,
    ExpenseForm,
};
use expense_tracker::summary::summarize;

#[derive(Parser)]
#[command(name = "dashboard")]
#[command(about = "Track and manage your personal expenses", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: DashboardConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show the full dashboard (default)")]
    Show,

    #[command(about = "List all expenses")]
    List,

    #[command(about = "Show summary, category breakdown and monthly trend")]
    Summary,

    #[command(about = "Add a new expense")]
    Add {
        #[arg(short, long, help = "Expense name (max 50 characters)")]
        name: String,

        #[arg(short, long, help = "Amount, at least 0.01")]
        amount: f64,

        #[arg(
            short,
            long,
            help = "Food, Transport, Entertainment, Bills, Shopping or Other"
        )]
        category: Option<Category>,
    },

    #[command(about = "Delete an expense by ID")]
    Delete {
        #[arg(help = "Expense ID")]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut dashboard = Dashboard::new(ApiClient::new(cli.config.api_url));

    if let Err(e) = run_command(&mut dashboard, cli.command.unwrap_or(Commands::Show)).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(dashboard: &mut Dashboard, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Show => {
            refresh(dashboard).await;
            print!("{}", dashboard.render());
        }
        Commands::List => {
            refresh(dashboard).await;
            let expenses = dashboard.expenses();
            if expenses.is_empty() {
                println!("📭 No expenses found. Add some expenses to get started!");
            } else {
                println!("\n📋 Your Expenses ({})\n", expenses.len());
                expense_table(expenses).printstd();
            }
        }
        Commands::Summary => {
            refresh(dashboard).await;
            let expenses = dashboard.expenses();
            println!("{}", render_summary(&summarize(expenses)));
            if !expenses.is_empty() {
                println!("{}", render_category_breakdown(expenses));
                print!("{}", render_trend(expenses));
            }
        }
        Commands::Add {
            name,
            amount,
            category,
        } => {
            let form = ExpenseForm::new(&name, amount, category).map_err(anyhow::Error::msg)?;
            match dashboard.add(&form).await {
                Ok(added) => {
                    println!("✅ Expense added successfully!");
                    if let Some(id) = added.value {
                        println!("   ID: {}", id);
                    }
                    println!();
                    if let Some(e) = added.refresh_error {
                        show_failure("Failed to fetch expenses", e);
                    }
                    print!("{}", dashboard.render());
                }
                Err(e) => show_failure("Failed to add expense", e),
            }
        }
        Commands::Delete { id } => match dashboard.delete(&id).await {
            Ok(deleted) => {
                println!("✅ Expense deleted successfully!\n");
                if let Some(e) = deleted.refresh_error {
                    show_failure("Failed to fetch expenses", e);
                }
                print!("{}", dashboard.render());
            }
            Err(e) => show_failure("Failed to delete expense", e),
        },
    }

    Ok(())
}

async fn refresh(dashboard: &mut Dashboard) {
    if let Err(e) = dashboard.refresh().await {
        show_failure("Failed to fetch expenses", e);
    }
}

/// Inline error banner. The dashboard keeps going with whatever it has.
fn show_failure(action: &str, err: ClientError) {
    match err {
        ClientError::Connection(_) => println!("⚠️  Could not connect to the server"),
        other => println!("❌ {}: {}", action, other),
    }
}
