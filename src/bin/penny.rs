use std::{
    collections::HashMap,
    error::Error,
    io,
    path::Path,
    process::exit,
    sync::OnceLock,
};

use clap::{Parser, Subcommand};
use numfmt::{Formatter, Precision};
use rusqlite::Connection;
use time::{Duration, Month};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use penny_ledger::{
    Category, CategoryId, CategorySpending, Clock, Frequency, NewRecurringRule, NewTransaction,
    OwnerId, SystemClock, TransactionKind, TransactionQuery, category_breakdown, create_rule,
    create_transaction, get_categories, get_transactions, initialize_db, materialize_due_rules,
    month_bounds, monthly_stats, monthly_trend,
};

/// A command line front end for the penny_ledger personal finance tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// IANA timezone name used to decide which day "today" is.
    #[arg(long, default_value = "UTC")]
    timezone: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create and initialize a new database file.
    Init,
    /// Populate the database with demo data for an owner.
    Seed {
        /// The owner to create the demo data under.
        #[arg(long)]
        owner: String,
    },
    /// Materialize due recurring rules, then list transactions.
    List {
        /// The owner whose transactions to list.
        #[arg(long)]
        owner: String,

        /// Restrict the listing to one month, given as YYYY-MM.
        #[arg(long)]
        month: Option<String>,

        /// Print the transactions as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Materialize due recurring rules, then print a monthly summary.
    Summary {
        /// The owner whose transactions to summarize.
        #[arg(long)]
        owner: String,

        /// The month to summarize, given as YYYY-MM. Defaults to the current
        /// month.
        #[arg(long)]
        month: Option<String>,

        /// Print the summary as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Materialize due recurring rules, then print an income/expense trend.
    Trend {
        /// The owner whose transactions to chart.
        #[arg(long)]
        owner: String,

        /// How many months to include, ending with the current one.
        #[arg(long, default_value_t = 6)]
        months: usize,

        /// Print the trend as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    setup_logging();

    let args = Args::parse();
    let db_path = Path::new(&args.db_path);

    let clock = match SystemClock::with_timezone(&args.timezone) {
        Ok(clock) => clock,
        Err(error) => {
            eprintln!("{error}");
            exit(1);
        }
    };

    match args.command {
        Command::Init => init(db_path),
        Command::Seed { owner } => seed(db_path, &OwnerId::new(&owner), &clock),
        Command::List { owner, month, json } => {
            list(db_path, &OwnerId::new(&owner), month.as_deref(), json, &clock)
        }
        Command::Summary { owner, month, json } => {
            summary(db_path, &OwnerId::new(&owner), month.as_deref(), json, &clock)
        }
        Command::Trend { owner, months, json } => {
            trend(db_path, &OwnerId::new(&owner), months, json, &clock)
        }
    }
}

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so that --json output stays machine readable.
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn init(db_path: &Path) -> Result<(), Box<dyn Error>> {
    match db_path.extension() {
        None => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Database path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if db_path.is_file() {
        eprintln!("File already exists at {db_path:#?}!");
        exit(1);
    }

    println!("Creating database at {db_path:#?}");
    let connection = Connection::open(db_path)?;

    initialize_db(&connection)?;

    println!("Success!");

    Ok(())
}

fn seed(db_path: &Path, owner_id: &OwnerId, clock: &SystemClock) -> Result<(), Box<dyn Error>> {
    let connection = open_existing(db_path)?;
    let today = clock.today();

    println!("Seeding demo data for {owner_id}...");

    let categories = get_categories(owner_id, &connection)?;
    let salary = category_named(&categories, "Salary");
    let food = category_named(&categories, "Food & Dining");
    let transport = category_named(&categories, "Transport");
    let housing = category_named(&categories, "Housing");
    let entertainment = category_named(&categories, "Entertainment");

    let first_of_month = today
        .replace_day(1)
        .expect("day one is valid in every month");

    create_transaction(
        owner_id,
        NewTransaction {
            amount: 3200.0,
            kind: TransactionKind::Income,
            category_id: salary.id,
            date: first_of_month,
            description: "Monthly salary".to_string(),
            receipt_url: None,
        },
        &connection,
    )?;
    create_transaction(
        owner_id,
        NewTransaction {
            amount: 84.50,
            kind: TransactionKind::Expense,
            category_id: food.id,
            date: today - Duration::days(2),
            description: "Groceries".to_string(),
            receipt_url: None,
        },
        &connection,
    )?;
    create_transaction(
        owner_id,
        NewTransaction {
            amount: 42.0,
            kind: TransactionKind::Expense,
            category_id: transport.id,
            date: today - Duration::days(1),
            description: "Fuel".to_string(),
            receipt_url: None,
        },
        &connection,
    )?;

    create_rule(
        owner_id,
        NewRecurringRule {
            amount: 1450.0,
            kind: TransactionKind::Expense,
            category_id: housing.id,
            description: "Rent".to_string(),
            frequency: Frequency::Monthly,
            // Backdated so the first materialization pass has months to
            // catch up on.
            next_due_date: today - Duration::days(90),
            is_active: true,
        },
        &connection,
    )?;
    create_rule(
        owner_id,
        NewRecurringRule {
            amount: 16.99,
            kind: TransactionKind::Expense,
            category_id: entertainment.id,
            description: "Streaming subscription".to_string(),
            frequency: Frequency::Weekly,
            next_due_date: today,
            is_active: true,
        },
        &connection,
    )?;

    println!("Created 3 transactions and 2 recurring rules.");
    println!("Run the 'list' command to materialize the backdated rent rule.");

    Ok(())
}

fn list(
    db_path: &Path,
    owner_id: &OwnerId,
    month: Option<&str>,
    json: bool,
    clock: &SystemClock,
) -> Result<(), Box<dyn Error>> {
    let connection = open_existing(db_path)?;

    materialize_due_rules(owner_id, clock, &connection)?;

    let query = match month {
        Some(month) => {
            let (year, month) = parse_month(month);

            TransactionQuery {
                date_range: Some(month_bounds(year, month)),
                ..Default::default()
            }
        }
        None => TransactionQuery::default(),
    };
    let transactions = get_transactions(owner_id, &query, &connection)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let category_names: HashMap<CategoryId, String> = get_categories(owner_id, &connection)?
        .into_iter()
        .map(|category| (category.id, category.name.to_string()))
        .collect();

    for transaction in &transactions {
        let category_name = category_names
            .get(&transaction.category_id)
            .map(String::as_str)
            .unwrap_or("unknown");
        let signed_amount = match transaction.kind {
            TransactionKind::Income => transaction.amount,
            TransactionKind::Expense => -transaction.amount,
        };
        let provenance = if transaction.rule_id.is_some() {
            " (recurring)"
        } else {
            ""
        };

        println!(
            "{}  {:>12}  {:<16}  {}{provenance}",
            transaction.date,
            format_currency(signed_amount),
            category_name,
            transaction.description,
        );
    }

    Ok(())
}

fn summary(
    db_path: &Path,
    owner_id: &OwnerId,
    month: Option<&str>,
    json: bool,
    clock: &SystemClock,
) -> Result<(), Box<dyn Error>> {
    let connection = open_existing(db_path)?;

    materialize_due_rules(owner_id, clock, &connection)?;

    let (year, month) = match month {
        Some(month) => parse_month(month),
        None => {
            let today = clock.today();
            (today.year(), today.month())
        }
    };

    let stats = monthly_stats(owner_id, year, month, &connection)?;
    let income = category_breakdown(owner_id, year, month, TransactionKind::Income, &connection)?;
    let expenses =
        category_breakdown(owner_id, year, month, TransactionKind::Expense, &connection)?;

    if json {
        let combined = serde_json::json!({
            "stats": stats,
            "income": income,
            "expenses": expenses,
        });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    println!("Summary for {year}-{:02}", month as u8);
    println!(
        "  Income:       {} ({:+.1}% vs last month)",
        format_currency(stats.total_income),
        stats.income_change,
    );
    println!(
        "  Expenses:     {} ({:+.1}% vs last month)",
        format_currency(stats.total_expense),
        stats.expense_change,
    );
    println!("  Balance:      {}", format_currency(stats.balance));
    println!("  Transactions: {}", stats.transaction_count);

    print_breakdown("Income by category", &income);
    print_breakdown("Expenses by category", &expenses);

    Ok(())
}

fn trend(
    db_path: &Path,
    owner_id: &OwnerId,
    months: usize,
    json: bool,
    clock: &SystemClock,
) -> Result<(), Box<dyn Error>> {
    let connection = open_existing(db_path)?;

    materialize_due_rules(owner_id, clock, &connection)?;

    let today = clock.today();
    let points = monthly_trend(owner_id, today.year(), today.month(), months, &connection)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    for point in &points {
        println!(
            "{}  income {:>12}  expenses {:>12}",
            point.month,
            format_currency(point.income),
            format_currency(point.expense),
        );
    }

    Ok(())
}

fn open_existing(db_path: &Path) -> Result<Connection, Box<dyn Error>> {
    if !db_path.is_file() {
        eprintln!("File does not exist at {db_path:#?}! Run 'init' first.");
        exit(1);
    }

    Ok(Connection::open(db_path)?)
}

fn parse_month(input: &str) -> (i32, Month) {
    let parsed = input.split_once('-').and_then(|(year, month)| {
        let year = year.parse::<i32>().ok()?;
        let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;

        Some((year, month))
    });

    match parsed {
        Some(year_and_month) => year_and_month,
        None => {
            eprintln!("Months must be given as YYYY-MM (e.g., '2024-04').");
            exit(1);
        }
    }
}

fn category_named<'a>(categories: &'a [Category], name: &str) -> &'a Category {
    categories
        .iter()
        .find(|category| category.name.as_ref() == name)
        .expect("the default categories include this name")
}

fn print_breakdown(title: &str, breakdown: &[CategorySpending]) {
    if breakdown.is_empty() {
        return;
    }

    println!("\n{title}:");

    for entry in breakdown {
        println!(
            "  {:<16}  {:>12}  {:>5.1}%  ({} transaction(s))",
            entry.category.name,
            format_currency(entry.total_amount),
            entry.percentage,
            entry.transaction_count,
        );
    }
}

fn format_currency(number: f64) -> String {
    static POSITIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let positive_fmt = POSITIVE_FMT.get_or_init(|| {
        Formatter::currency("$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    static NEGATIVE_FMT: OnceLock<Formatter> = OnceLock::new();

    let negative_fmt = NEGATIVE_FMT.get_or_init(|| {
        Formatter::currency("-$")
            .unwrap()
            .precision(Precision::Decimals(2))
    });

    let mut formatted_string = if number < 0.0 {
        negative_fmt.fmt_string(number.abs())
    } else if number > 0.0 {
        positive_fmt.fmt_string(number)
    } else {
        // Zero is hardcoded as "0", so we must specify the formatted string for zero
        "$0.00".to_owned()
    };

    // numfmt omits the last trailing zero, so we must add it ourselves
    // For example, "12.30" is rendered as "12.3" so we append "0".
    if formatted_string.as_bytes()[formatted_string.len() - 3] != b'.' {
        formatted_string = format!("{formatted_string}0");
    }

    formatted_string
}
