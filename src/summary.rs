use crate::models::Expense;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub total: f64,
    pub average: f64,
    /// Category with the largest summed amount.
    pub top_category: Option<String>,
    /// Category that occurs on the most records.
    pub most_frequent_category: Option<String>,
}

/// Headline figures for the summary panel. Ties between categories go to the
/// alphabetically first label.
pub fn summarize(expenses: &[Expense]) -> Summary {
    let count = expenses.len();
    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    let average = if count == 0 { 0.0 } else { total / count as f64 };

    let mut frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for expense in expenses {
        *frequency.entry(expense.category.as_str()).or_default() += 1;
    }

    Summary {
        count,
        total,
        average,
        top_category: first_max(category_totals(expenses)),
        most_frequent_category: first_max(
            frequency.into_iter().map(|(category, n)| (category.to_string(), n)),
        ),
    }
}

fn first_max<T: PartialOrd>(items: impl IntoIterator<Item = (String, T)>) -> Option<String> {
    let mut best: Option<(String, T)> = None;
    for (key, value) in items {
        let better = match &best {
            Some((_, current)) => value > *current,
            None => true,
        };
        if better {
            best = Some((key, value));
        }
    }
    best.map(|(key, _)| key)
}

/// Summed amount per category, ordered by category label.
pub fn category_totals(expenses: &[Expense]) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_default() += expense.amount;
    }
    totals
        .into_iter()
        .map(|(category, amount)| (category.to_string(), amount))
        .collect()
}

/// Summed amount per `YYYY-MM`, oldest month first. Records with an
/// unparseable date are left out.
pub fn monthly_trend(expenses: &[Expense]) -> Vec<(String, f64)> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for expense in expenses {
        if let Some(ts) = expense.timestamp() {
            *months.entry(ts.format("%Y-%m").to_string()).or_default() += expense.amount;
        }
    }
    months.into_iter().collect()
}
