//! Descriptive sales summaries

use crate::daily::DailySeries;
use crate::data::Transaction;
use crate::error::Result;
use crate::features::{day_of_week, weekday_from_index, weekday_name};
use chrono::{NaiveDate, Timelike};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Headline figures of a slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub total_sales: f64,
    /// Itemized lines
    pub line_count: usize,
    pub distinct_invoices: usize,
    /// Lines carrying a customer id
    pub known_customer_rows: usize,
    pub distinct_products: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl SalesSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let invoices: HashSet<&str> = transactions.iter().map(|t| t.invoice_id.as_str()).collect();
        let products: HashSet<&str> = transactions.iter().map(|t| t.product_id.as_str()).collect();

        Self {
            total_sales: transactions.iter().map(|t| t.subtotal).sum(),
            line_count: transactions.len(),
            distinct_invoices: invoices.len(),
            known_customer_rows: transactions.iter().filter(|t| t.customer_id.is_some()).count(),
            distinct_products: products.len(),
            first_date: transactions.iter().map(|t| t.date).min(),
            last_date: transactions.iter().map(|t| t.date).max(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total_sales: f64,
}

/// Sales per day, ascending by date
pub fn daily_totals(transactions: &[Transaction]) -> Result<Vec<DailyTotal>> {
    let series = DailySeries::from_transactions(transactions)?;
    Ok(series
        .rows()
        .iter()
        .map(|r| DailyTotal {
            date: r.date,
            total_sales: r.total_sales,
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub total_sales: f64,
}

/// Sales per product category, largest first
pub fn sales_by_category(transactions: &[Transaction]) -> Vec<CategorySales> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for t in transactions {
        *totals.entry(t.product_category.as_str()).or_insert(0.0) += t.subtotal;
    }

    let mut categories: Vec<CategorySales> = totals
        .into_iter()
        .map(|(category, total_sales)| CategorySales {
            category: category.to_string(),
            total_sales,
        })
        .collect();
    categories.sort_by(|a, b| descending(a.total_sales, b.total_sales).then_with(|| a.category.cmp(&b.category)));
    categories
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSales {
    pub product_id: String,
    pub product_name: String,
    pub total_sales: f64,
}

/// The `n` best selling products by sales
pub fn top_products(transactions: &[Transaction], n: usize) -> Vec<ProductSales> {
    let mut totals: HashMap<(&str, &str), f64> = HashMap::new();
    for t in transactions {
        *totals
            .entry((t.product_id.as_str(), t.product_name.as_str()))
            .or_insert(0.0) += t.subtotal;
    }

    let mut products: Vec<ProductSales> = totals
        .into_iter()
        .map(|((id, name), total_sales)| ProductSales {
            product_id: id.to_string(),
            product_name: name.to_string(),
            total_sales,
        })
        .collect();
    products.sort_by(|a, b| descending(a.total_sales, b.total_sales).then_with(|| a.product_id.cmp(&b.product_id)));
    products.truncate(n);
    products
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourSales {
    /// 0..=23
    pub hour: u32,
    pub total_sales: f64,
}

/// Sales per hour of day; lines without a time are left out
pub fn sales_by_hour(transactions: &[Transaction]) -> Vec<HourSales> {
    let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
    for t in transactions {
        if let Some(time) = t.time {
            *totals.entry(time.hour()).or_insert(0.0) += t.subtotal;
        }
    }
    totals
        .into_iter()
        .map(|(hour, total_sales)| HourSales { hour, total_sales })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdaySales {
    /// 0 = Monday
    pub day_of_week: u32,
    pub day: &'static str,
    pub total_sales: f64,
}

/// Sales per weekday, Monday first; weekdays without sales are absent
pub fn sales_by_weekday(transactions: &[Transaction]) -> Vec<WeekdaySales> {
    let mut totals: BTreeMap<u32, f64> = BTreeMap::new();
    for t in transactions {
        *totals.entry(day_of_week(t.date)).or_insert(0.0) += t.subtotal;
    }
    totals
        .into_iter()
        .map(|(day_of_week, total_sales)| WeekdaySales {
            day_of_week,
            day: weekday_name(weekday_from_index(day_of_week)),
            total_sales,
        })
        .collect()
}

/// A known customer with repeated purchases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatCustomer {
    pub customer_id: String,
    pub customer_name: String,
    pub invoices: usize,
    pub total_sales: f64,
}

/// Known customers with at least `min_visits` invoices, most invoices first
/// and then highest sales
pub fn repeat_customers(transactions: &[Transaction], min_visits: usize) -> Vec<RepeatCustomer> {
    let mut customers: HashMap<(&str, &str), (BTreeSet<&str>, f64)> = HashMap::new();
    for t in transactions {
        let Some(id) = t.customer_id.as_deref() else {
            continue;
        };
        let name = t.customer_name.as_deref().unwrap_or_default();
        let entry = customers
            .entry((id, name))
            .or_insert_with(|| (BTreeSet::new(), 0.0));
        entry.0.insert(t.invoice_id.as_str());
        entry.1 += t.subtotal;
    }

    let mut repeat: Vec<RepeatCustomer> = customers
        .into_iter()
        .filter(|(_, (invoices, _))| invoices.len() >= min_visits)
        .map(|((id, name), (invoices, total_sales))| RepeatCustomer {
            customer_id: id.to_string(),
            customer_name: name.to_string(),
            invoices: invoices.len(),
            total_sales,
        })
        .collect();
    repeat.sort_by(|a, b| {
        b.invoices
            .cmp(&a.invoices)
            .then_with(|| descending(a.total_sales, b.total_sales))
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    repeat
}

/// Figures over known customers only
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub distinct_customers: usize,
    pub known_customer_sales: f64,
}

impl CustomerSummary {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let known = transactions.iter().filter(|t| t.customer_id.is_some());
        let mut ids: HashSet<&str> = HashSet::new();
        let mut sales = 0.0;
        for t in known {
            if let Some(id) = t.customer_id.as_deref() {
                ids.insert(id);
            }
            sales += t.subtotal;
        }

        Self {
            distinct_customers: ids.len(),
            known_customer_sales: sales,
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn line(invoice: &str, day: u32, hour: u32, subtotal: f64) -> Transaction {
        Transaction::new(
            invoice,
            NaiveDate::from_ymd_opt(2025, 11, day).unwrap(),
            NaiveTime::from_hms_opt(hour, 0, 0),
            subtotal,
        )
    }

    fn sample() -> Vec<Transaction> {
        vec![
            line("A", 3, 9, 10.0).with_product("P1", "Bread", "Bakery").with_customer("C1", "Ana"),
            line("A", 3, 9, 5.0).with_product("P2", "Milk", "Dairy").with_customer("C1", "Ana"),
            line("B", 4, 14, 30.0).with_product("P2", "Milk", "Dairy").with_customer("C1", "Ana"),
            line("C", 4, 14, 8.0).with_product("P3", "Cake", "Bakery").with_customer("C2", "Luis"),
            line("D", 9, 18, 2.0).with_product("P1", "Bread", "Bakery"),
        ]
    }

    #[test]
    fn test_sales_summary() {
        let summary = SalesSummary::from_transactions(&sample());
        assert_eq!(summary.total_sales, 55.0);
        assert_eq!(summary.line_count, 5);
        assert_eq!(summary.distinct_invoices, 4);
        assert_eq!(summary.known_customer_rows, 4);
        assert_eq!(summary.distinct_products, 3);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2025, 11, 3));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2025, 11, 9));
    }

    #[test]
    fn test_empty_summary() {
        let summary = SalesSummary::from_transactions(&[]);
        assert_eq!(summary.line_count, 0);
        assert_eq!(summary.first_date, None);
    }

    #[test]
    fn test_category_and_product_ranking() {
        let categories = sales_by_category(&sample());
        assert_eq!(categories[0].category, "Dairy");
        assert_eq!(categories[0].total_sales, 35.0);
        assert_eq!(categories[1].total_sales, 20.0);

        let top = top_products(&sample(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_name, "Milk");
        assert_eq!(top[1].product_name, "Bread");
    }

    #[test]
    fn test_hour_and_weekday_totals() {
        let hours = sales_by_hour(&sample());
        let pairs: Vec<(u32, f64)> = hours.iter().map(|h| (h.hour, h.total_sales)).collect();
        assert_eq!(pairs, vec![(9, 15.0), (14, 38.0), (18, 2.0)]);

        // 2025-11-03 is a Monday, 2025-11-09 a Sunday
        let days = sales_by_weekday(&sample());
        assert_eq!(days[0].day, "Monday");
        assert_eq!(days[2].day_of_week, 6);
    }

    #[test]
    fn test_repeat_customers() {
        let repeat = repeat_customers(&sample(), 2);
        assert_eq!(repeat.len(), 1);
        assert_eq!(repeat[0].customer_id, "C1");
        assert_eq!(repeat[0].invoices, 2);
        assert_eq!(repeat[0].total_sales, 45.0);

        let all = repeat_customers(&sample(), 1);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].customer_id, "C2");
    }

    #[test]
    fn test_customer_summary() {
        let summary = CustomerSummary::from_transactions(&sample());
        assert_eq!(summary.distinct_customers, 2);
        assert_eq!(summary.known_customer_sales, 53.0);
    }
}
