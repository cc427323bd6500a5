//! Implements InputPort. Inquire-based interactive dashboard.
//!
//! Anonymous users get the sign-in menu; authenticated users get the dashboard sections.
//! Session changes pushed by the provider are applied before every menu.

use crate::adapters::export::{customers_to_csv, invoices_to_csv, write_export};
use crate::domain::metrics::{InvoiceFilter, StatusFilter};
use crate::domain::{DomainError, InvoiceStatus, Task};
use crate::ports::InputPort;
use crate::usecases::{DashboardService, SessionHandle, SessionManager, TaskService};
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{InquireError, Password, PasswordDisplayMode, Select, Text};
use rust_decimal::Decimal;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// `$1,234.50` style, two decimals, sign in front.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp(2).abs();
    let text = format!("{:.2}", rounded);
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}${}.{}", sign, grouped, frac)
}

async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

/// Esc / Ctrl-C on a prompt means "go back", anything else is an input failure.
fn prompt<T>(result: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Input(e.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuestAction {
    SignIn,
    SignUp,
    Quit,
}

impl fmt::Display for GuestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GuestAction::SignIn => "Sign in",
            GuestAction::SignUp => "Create account",
            GuestAction::Quit => "Quit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Overview,
    Finances,
    Invoices,
    Customers,
    Inventory,
    Tasks,
    Activity,
    Export,
    SignOut,
    Quit,
}

impl Section {
    const MENU: [Section; 10] = [
        Section::Overview,
        Section::Finances,
        Section::Invoices,
        Section::Customers,
        Section::Inventory,
        Section::Tasks,
        Section::Activity,
        Section::Export,
        Section::SignOut,
        Section::Quit,
    ];
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Overview => "Overview",
            Section::Finances => "Finances",
            Section::Invoices => "Invoices",
            Section::Customers => "Customers",
            Section::Inventory => "Inventory",
            Section::Tasks => "Tasks",
            Section::Activity => "Recent activity",
            Section::Export => "Export CSV",
            Section::SignOut => "Sign out",
            Section::Quit => "Quit",
        })
    }
}

struct TaskChoice(Task);

impl fmt::Display for TaskChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let due = self
            .0
            .due_date
            .map(|d| d.format(" (due %Y-%m-%d)").to_string())
            .unwrap_or_default();
        write!(f, "[{}] {}{}", self.0.priority.as_str(), self.0.title, due)
    }
}

/// Terminal dashboard.
pub struct TuiApp {
    session: Mutex<SessionManager>,
    handle: SessionHandle,
    dashboard: Arc<DashboardService>,
    tasks: Arc<TaskService>,
    export_dir: PathBuf,
}

impl TuiApp {
    pub fn new(
        session: SessionManager,
        dashboard: Arc<DashboardService>,
        tasks: Arc<TaskService>,
        export_dir: PathBuf,
    ) -> Self {
        let handle = session.handle();
        Self {
            session: Mutex::new(session),
            handle,
            dashboard,
            tasks,
            export_dir,
        }
    }

    /// Returns false when the user chose to quit.
    async fn guest_menu(&self) -> Result<bool, DomainError> {
        let choice = prompt(
            Select::new(
                "Welcome. What would you like to do?",
                vec![GuestAction::SignIn, GuestAction::SignUp, GuestAction::Quit],
            )
            .prompt(),
        )?;
        let action = match choice {
            Some(GuestAction::Quit) | None => return Ok(false),
            Some(a) => a,
        };

        let Some(email) = prompt(Text::new("Email:").prompt())? else {
            return Ok(true);
        };
        let Some(password) = prompt(
            Password::new("Password:")
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt(),
        )?
        else {
            return Ok(true);
        };

        let mut session = self.session.lock().await;
        let result = match action {
            GuestAction::SignUp => session.sign_up(email.trim(), &password).await,
            _ => session.sign_in(email.trim(), &password).await,
        };
        drop(session);

        match result {
            Ok(()) if self.handle.is_authenticated() => println!("Signed in as {}.", email.trim()),
            Ok(()) => println!("Account created. Confirm your email, then sign in."),
            Err(e) => println!("{}", e.message),
        }
        Ok(true)
    }

    async fn dashboard_menu(&self) -> Result<bool, DomainError> {
        let who = self
            .handle
            .user()
            .and_then(|u| u.email)
            .unwrap_or_else(|| "signed in".to_string());
        let title = format!("Dashboard ({})", who);
        let Some(section) = prompt(Select::new(&title, Section::MENU.to_vec()).prompt())? else {
            return Ok(false);
        };
        debug!(section = %section, "section selected");

        match section {
            Section::Overview => self.show_overview().await,
            Section::Finances => self.show_finances().await,
            Section::Invoices => self.show_invoices().await?,
            Section::Customers => self.show_customers().await?,
            Section::Inventory => self.show_inventory().await?,
            Section::Tasks => self.manage_tasks().await?,
            Section::Activity => self.show_activity().await,
            Section::Export => self.export().await?,
            Section::SignOut => {
                if let Some(warning) = self.session.lock().await.sign_out().await {
                    println!("Signed out locally ({}).", warning);
                } else {
                    println!("Signed out.");
                }
            }
            Section::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn show_overview(&self) {
        let o = with_spinner("Loading overview...", self.dashboard.overview()).await;
        println!("\nThis month");
        println!("  Revenue   {}", format_money(o.month.revenue));
        println!("  Expenses  {}", format_money(o.month.expenses));
        println!("  Profit    {}", format_money(o.month.profit));
        println!("Overdue invoices: {}", o.overdue_invoices);
        println!("Top products:");
        if o.top_products.is_empty() {
            println!("  (none)");
        }
        for p in &o.top_products {
            println!("  {}  {}", p.name, format_money(p.price));
        }
        println!();
    }

    async fn show_finances(&self) {
        let v = with_spinner("Loading transactions...", self.dashboard.finances()).await;
        println!("\n             This month      All time");
        println!(
            "  Revenue   {:>12}  {:>12}",
            format_money(v.month.revenue),
            format_money(v.all_time.revenue)
        );
        println!(
            "  Expenses  {:>12}  {:>12}",
            format_money(v.month.expenses),
            format_money(v.all_time.expenses)
        );
        println!(
            "  Profit    {:>12}  {:>12}",
            format_money(v.month.profit),
            format_money(v.all_time.profit)
        );
        for t in &v.transactions {
            println!(
                "  {}  {:<8} {:>12}  {}",
                t.date.format("%Y-%m-%d"),
                t.kind.as_str(),
                format_money(t.amount),
                t.description
            );
        }
        println!();
    }

    async fn invoice_filter(&self) -> Result<Option<InvoiceFilter>, DomainError> {
        let Some(search) = prompt(Text::new("Customer contains:").with_default("").prompt())?
        else {
            return Ok(None);
        };
        let mut options = vec!["all".to_string()];
        options.extend(InvoiceStatus::ALL.iter().map(|s| s.as_str().to_string()));
        let Some(status) = prompt(Select::new("Status:", options).prompt())? else {
            return Ok(None);
        };
        let status: StatusFilter = status.parse()?;
        Ok(Some(InvoiceFilter::new(search.trim(), status)))
    }

    async fn show_invoices(&self) -> Result<(), DomainError> {
        let Some(filter) = self.invoice_filter().await? else {
            return Ok(());
        };
        let v = with_spinner("Loading invoices...", self.dashboard.invoices(&filter)).await;
        println!();
        for i in &v.invoices {
            println!(
                "  {:<24} {:>12}  {:<8} due {}",
                i.customer_name,
                format_money(i.amount),
                i.status.as_str(),
                i.due_date.format("%Y-%m-%d")
            );
        }
        println!(
            "{} invoices, total {}, overdue {}\n",
            v.invoices.len(),
            format_money(v.total_amount),
            format_money(v.overdue_amount)
        );
        Ok(())
    }

    async fn show_customers(&self) -> Result<(), DomainError> {
        let Some(search) = prompt(Text::new("Search customers:").with_default("").prompt())?
        else {
            return Ok(());
        };
        let v = with_spinner("Loading customers...", self.dashboard.customers(search.trim())).await;
        println!(
            "\n{} customers, revenue {}, average {}",
            v.summary.total_customers,
            format_money(v.summary.total_revenue),
            format_money(v.summary.average_revenue)
        );
        for c in &v.customers {
            println!(
                "  {:<24} {:>12}  {:>3} invoices  last {}",
                c.name,
                format_money(c.total_spent),
                c.invoice_count,
                c.last_purchase_at.format("%Y-%m-%d")
            );
        }
        println!();
        Ok(())
    }

    async fn show_inventory(&self) -> Result<(), DomainError> {
        let Some(search) = prompt(Text::new("Search products:").with_default("").prompt())?
        else {
            return Ok(());
        };
        let v = with_spinner("Loading inventory...", self.dashboard.inventory(search.trim())).await;
        println!(
            "\n{} products, stock value {}, {} low on stock",
            v.summary.product_count,
            format_money(v.summary.total_value),
            v.summary.low_stock_count
        );
        for item in &v.items {
            let flag = if item.is_low_stock() { "  LOW" } else { "" };
            println!(
                "  {:<24} {:>10} x {:>5} = {:>12}{}",
                item.product.name,
                format_money(item.product.price),
                item.quantity(),
                format_money(item.line_value()),
                flag
            );
        }
        println!();
        Ok(())
    }

    async fn manage_tasks(&self) -> Result<(), DomainError> {
        let tasks = with_spinner("Loading tasks...", self.tasks.pending_tasks()).await;
        if tasks.is_empty() {
            println!("No pending tasks.\n");
            return Ok(());
        }
        let choices: Vec<TaskChoice> = tasks.into_iter().map(TaskChoice).collect();
        let Some(choice) = prompt(Select::new("Mark a task complete (Esc to go back):", choices).prompt())?
        else {
            return Ok(());
        };
        match self.tasks.toggle_task(&choice.0).await {
            Ok(status) => println!("\"{}\" is now {}.\n", choice.0.title, status.as_str()),
            Err(e) => println!("Could not update task: {}\n", e),
        }
        Ok(())
    }

    async fn show_activity(&self) {
        let feed = with_spinner("Loading activity...", self.dashboard.recent_activity()).await;
        println!();
        if feed.is_empty() {
            println!("  No recent activity.");
        }
        for a in &feed {
            println!(
                "  {}  {:<10} {:<10} {}",
                a.created_at.format("%Y-%m-%d %H:%M"),
                a.action_type,
                a.entity_type,
                a.description
            );
        }
        println!();
    }

    async fn export(&self) -> Result<(), DomainError> {
        let Some(kind) = prompt(Select::new("Export:", vec!["Invoices", "Customers"]).prompt())?
        else {
            return Ok(());
        };
        let (name, contents) = if kind == "Invoices" {
            let Some(filter) = self.invoice_filter().await? else {
                return Ok(());
            };
            let v = self.dashboard.invoices(&filter).await;
            ("invoices.csv", invoices_to_csv(&v.invoices)?)
        } else {
            let v = self.dashboard.customers("").await;
            ("customers.csv", customers_to_csv(&v.customers)?)
        };
        let path = write_export(&self.export_dir, name, &contents).await?;
        println!("Saved {}\n", path.display());
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiApp {
    async fn run(&self) -> Result<(), DomainError> {
        let state = with_spinner("Restoring session...", async {
            self.session.lock().await.initialize().await
        })
        .await;
        info!(authenticated = state.session().is_some(), "dashboard ready");

        loop {
            self.session.lock().await.pump();
            let keep_going = if self.handle.is_authenticated() {
                self.dashboard_menu().await?
            } else {
                self.guest_menu().await?
            };
            if !keep_going {
                break;
            }
        }
        info!("bye");
        Ok(())
    }
}
