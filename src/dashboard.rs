use crate::category::Category;
use crate::client::{ApiClient, ClientError};
use crate::models::Expense;
use crate::summary::{category_totals, monthly_trend, summarize, Summary};
use prettytable::{format, Cell, Row, Table};
use std::fmt::Write;

pub const MAX_NAME_LEN: usize = 50;
pub const MIN_AMOUNT: f64 = 0.01;
const BAR_WIDTH: usize = 30;

/// A validated add-expense form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseForm {
    pub name: String,
    pub amount: f64,
    pub category: Category,
}

impl ExpenseForm {
    pub fn new(name: &str, amount: f64, category: Option<Category>) -> Result<Self, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Expense name cannot be empty".to_string());
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(format!(
                "Expense name cannot be longer than {} characters",
                MAX_NAME_LEN
            ));
        }
        if !amount.is_finite() || amount < MIN_AMOUNT {
            return Err(format!("Amount must be at least {:.2}", MIN_AMOUNT));
        }

        Ok(Self {
            name: name.to_string(),
            amount,
            category: category.unwrap_or(Category::Other),
        })
    }
}

/// A mutation the server accepted, and how the re-fetch after it went.
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    /// Set when the list could not be re-fetched; the cached list is stale.
    pub refresh_error: Option<ClientError>,
}

/// Dashboard session: the last expense list fetched from the server.
///
/// The list is re-fetched in full before every render and after every
/// mutation; nothing is updated locally.
pub struct Dashboard {
    client: ApiClient,
    expenses: Vec<Expense>,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            expenses: Vec::new(),
        }
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Replaces the cached list. When the server cannot be reached the cached
    /// list is kept and the failure only logged; an error status from the
    /// server is returned for the caller to show.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        match self.client.list_expenses().await {
            Ok(expenses) => {
                self.expenses = expenses;
                Ok(())
            }
            Err(ClientError::Connection(e)) => {
                tracing::warn!("Could not reach {}: {}", self.client.base_url(), e);
                println!("⚠️  Could not connect to the server, showing cached data");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Submits the form, then re-fetches. An error is returned only when the
    /// add itself failed.
    pub async fn add(
        &mut self,
        form: &ExpenseForm,
    ) -> Result<Mutation<Option<String>>, ClientError> {
        let id = self
            .client
            .add_expense(&form.name, form.amount, form.category)
            .await?;
        Ok(Mutation {
            value: id,
            refresh_error: self.refresh().await.err(),
        })
    }

    pub async fn delete(&mut self, id: &str) -> Result<Mutation<()>, ClientError> {
        self.client.delete_expense(id).await?;
        Ok(Mutation {
            value: (),
            refresh_error: self.refresh().await.err(),
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("💰 Personal Finance Manager\n\n");

        if self.expenses.is_empty() {
            out.push_str("📭 No expenses found. Add some expenses to get started!\n");
            return out;
        }

        out.push_str(&render_summary(&summarize(&self.expenses)));
        out.push('\n');
        out.push_str(&format!("📋 Your Expenses ({})\n", self.expenses.len()));
        out.push_str(&expense_table(&self.expenses).to_string());
        out.push('\n');
        out.push_str(&render_category_breakdown(&self.expenses));
        out.push('\n');
        out.push_str(&render_trend(&self.expenses));
        out
    }
}

pub fn expense_table(expenses: &[Expense]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Amount"),
        Cell::new("Category"),
        Cell::new("Date"),
    ]));

    for expense in expenses {
        let date = expense
            .timestamp()
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| expense.date.clone());

        table.add_row(Row::new(vec![
            Cell::new(expense.id.as_deref().unwrap_or("-")),
            Cell::new(&expense.name),
            Cell::new(&format!("{:.2}", expense.amount)).style_spec("r"),
            Cell::new(&expense.category),
            Cell::new(&date),
        ]));
    }

    table
}

pub fn render_summary(summary: &Summary) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.add_row(Row::new(vec![
        Cell::new("Total spent"),
        Cell::new(&format!("{:.2}", summary.total)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Average expense"),
        Cell::new(&format!("{:.2}", summary.average)),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Top category"),
        Cell::new(summary.top_category.as_deref().unwrap_or("-")),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("Most frequent"),
        Cell::new(summary.most_frequent_category.as_deref().unwrap_or("-")),
    ]));

    format!("📊 Summary\n{}", table)
}

/// Category totals as a share-of-total listing and as horizontal bars.
pub fn render_category_breakdown(expenses: &[Expense]) -> String {
    let totals = category_totals(expenses);
    let grand_total: f64 = totals.iter().map(|(_, amount)| amount).sum();
    let max = totals.iter().map(|(_, amount)| *amount).fold(0.0, f64::max);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(vec![
        Cell::new("Category"),
        Cell::new("Amount"),
        Cell::new("Share"),
        Cell::new(""),
    ]));
    for (category, amount) in &totals {
        let share = if grand_total > 0.0 {
            amount / grand_total * 100.0
        } else {
            0.0
        };
        table.add_row(Row::new(vec![
            Cell::new(category),
            Cell::new(&format!("{:.2}", amount)).style_spec("r"),
            Cell::new(&format!("{:.1}%", share)).style_spec("r"),
            Cell::new(&bar(*amount, max, BAR_WIDTH)),
        ]));
    }

    format!("🥧 Expenses by Category\n{}", table)
}

pub fn render_trend(expenses: &[Expense]) -> String {
    let trend = monthly_trend(expenses);
    let mut out = String::from("📈 Spending Trend\n");
    if trend.is_empty() {
        out.push_str("   (no dated expenses)\n");
        return out;
    }

    let max = trend.iter().map(|(_, amount)| *amount).fold(0.0, f64::max);
    for (month, amount) in &trend {
        let _ = writeln!(
            out,
            "   {}  {:>10.2}  {}",
            month,
            amount,
            bar(*amount, max, BAR_WIDTH)
        );
    }
    out
}

/// A bar of `width` cells at `max`, scaled linearly. Any positive value gets
/// at least one cell.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "█".repeat(cells.clamp(1, width))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(id: &str, amount: f64, category: &str, date: &str) -> Expense {
        let mut expense = Expense::new(
            format!("{} item", category),
            amount,
            Some(category.to_string()),
            None,
        );
        expense.id = Some(id.to_string());
        expense.date = date.to_string();
        expense
    }

    #[test]
    fn test_form_validation() {
        assert!(ExpenseForm::new("", 5.0, None).is_err());
        assert!(ExpenseForm::new("   ", 5.0, None).is_err());
        assert!(ExpenseForm::new("Coffee", 0.0, None).is_err());
        assert!(ExpenseForm::new("Coffee", 0.001, None).is_err());
        assert!(ExpenseForm::new("Coffee", f64::NAN, None).is_err());
        assert!(ExpenseForm::new(&"x".repeat(51), 1.0, None).is_err());

        let form = ExpenseForm::new(" Coffee ", 0.01, None).unwrap();
        assert_eq!(form.name, "Coffee");
        assert_eq!(form.category, Category::Other);

        let form = ExpenseForm::new(&"x".repeat(50), 1.0, Some(Category::Food)).unwrap();
        assert_eq!(form.category, Category::Food);
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(10.0, 10.0, 4), "████");
        assert_eq!(bar(5.0, 10.0, 4), "██");
        assert_eq!(bar(0.01, 10.0, 4), "█");
        assert_eq!(bar(0.0, 10.0, 4), "");
        assert_eq!(bar(3.0, 0.0, 4), "");
    }

    #[test]
    fn test_expense_table_rows() {
        let expenses = vec![
            expense("a1", 10.0, "Food", "2025-01-03T10:00:00+00:00"),
            expense("b2", 5.0, "Bills", "whenever"),
        ];
        let table = expense_table(&expenses);
        assert_eq!(table.len(), 2);

        let rendered = table.to_string();
        assert!(rendered.contains("a1"));
        assert!(rendered.contains("10.00"));
        assert!(rendered.contains("2025-01-03 10:00"));
        assert!(rendered.contains("whenever"));
    }

    #[test]
    fn test_category_breakdown_shares() {
        let expenses = vec![
            expense("a", 10.0, "Food", "2025-01-03T10:00:00Z"),
            expense("b", 30.0, "Bills", "2025-01-04T10:00:00Z"),
        ];
        let rendered = render_category_breakdown(&expenses);
        assert!(rendered.contains("25.0%"));
        assert!(rendered.contains("75.0%"));
    }

    #[test]
    fn test_summary_panel() {
        let expenses = vec![
            expense("a", 10.0, "Food", "2025-01-03T10:00:00Z"),
            expense("b", 20.0, "Food", "2025-01-04T10:00:00Z"),
            expense("c", 5.0, "Bills", "2025-02-04T10:00:00Z"),
        ];
        let rendered = render_summary(&summarize(&expenses));
        assert!(rendered.contains("35.00"));
        assert!(rendered.contains("11.67"));
        assert!(rendered.contains("Food"));
    }

    #[test]
    fn test_trend_lists_months_in_order() {
        let expenses = vec![
            expense("a", 10.0, "Food", "2025-03-03T10:00:00Z"),
            expense("b", 20.0, "Food", "2025-01-04T10:00:00Z"),
        ];
        let rendered = render_trend(&expenses);
        let jan = rendered.find("2025-01").unwrap();
        let mar = rendered.find("2025-03").unwrap();
        assert!(jan < mar);
        assert!(render_trend(&[]).contains("no dated expenses"));
    }

    #[test]
    fn test_empty_dashboard_render() {
        let dashboard = Dashboard::new(ApiClient::new("http://localhost:5000/api"));
        assert!(dashboard.render().contains("No expenses found"));
    }
}
