//! Plain-text rendering of each screen for the terminal.

use std::fmt::Write;

use crate::dashboard::{Dashboard, ViewState};
use crate::home::{Home, TickerRow};
use crate::market::Trend;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// `1234567.891` -> `1,234,567.89`
pub fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

pub fn money(value: f64) -> String {
    format!("${}", group_thousands(value))
}

pub fn percent_cell(change: Option<f64>, color: bool) -> String {
    let text = match change {
        Some(c) => format!("{c:.2}%"),
        None => "n/a".to_string(),
    };
    if !color {
        return text;
    }
    match Trend::of(change) {
        Trend::Positive => format!("{GREEN}{text}{RESET}"),
        Trend::NonPositive => format!("{RED}{text}{RESET}"),
    }
}

pub fn dashboard(view: &Dashboard) -> String {
    let mut out = String::new();
    if let ViewState::Failed(reason) = view.state() {
        let _ = writeln!(out, "Dashboard unavailable: {reason}");
    }
    if let Some(stats) = view.stats() {
        let _ = writeln!(out, "Total Value:    {}", money(stats.total_value));
        let _ = writeln!(out, "Profit / Loss:  {}", money(stats.profit_loss));
        let _ = writeln!(out, "Total Holdings: {}", stats.total_holdings);
        out.push('\n');
    }
    if view.holdings().is_empty() {
        if *view.state() == ViewState::Ready {
            out.push_str("No holdings yet. Add some crypto!\n");
        }
        return out;
    }
    let _ = writeln!(out, "{:<26} {:<14} {:>14} {:>14}", "ID", "Coin", "Amount", "Buy Price");
    for h in view.holdings() {
        let editing = view.editing().filter(|e| e.id == h.id);
        let amount = match editing {
            Some(e) => format!("[{}]", e.quantity),
            None => h.quantity.to_string(),
        };
        let _ = writeln!(out, "{:<26} {:<14} {:>14} {:>14}", h.id, h.coin_name, amount, money(h.buy_price));
    }
    out
}

fn ticker_line(row: &TickerRow, color: bool) -> String {
    format!(
        "{:>3} {:<20} {:>16} {:>9} {:>9} {:>9} {:>22}",
        row.rank,
        format!("{} ({})", row.name, row.symbol),
        money(row.price),
        percent_cell(row.change_1h, color),
        percent_cell(row.change_24h, color),
        percent_cell(row.change_7d, color),
        money(row.market_cap),
    )
}

pub fn home(view: &Home, color: bool) -> String {
    let mut out = String::new();
    if let Some(name) = view.display_name() {
        let _ = writeln!(out, "Hi, {name}");
    }
    let value = view.portfolio_value().map(money).unwrap_or_else(|| "$0.00".to_string());
    let _ = writeln!(out, "Total Portfolio Value: {value}\n");
    let _ = writeln!(out, "Live Market");
    if view.is_loading() {
        out.push_str("Loading market data...\n");
        return out;
    }
    let _ = writeln!(
        out,
        "{:>3} {:<20} {:>16} {:>9} {:>9} {:>9} {:>22}",
        "#", "Coin", "Price", "1h", "24h", "7d", "Market Cap"
    );
    for row in view.rows() {
        let _ = writeln!(out, "{}", ticker_line(&row, color));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(group_thousands(0.0), "0.00");
        assert_eq!(group_thousands(999.999), "1,000.00");
        assert_eq!(group_thousands(1234567.891), "1,234,567.89");
        assert_eq!(group_thousands(-4200.5), "-4,200.50");
        assert_eq!(money(64000.0), "$64,000.00");
    }

    #[test]
    fn zero_percent_is_red() {
        assert_eq!(percent_cell(Some(0.0), true), format!("{RED}0.00%{RESET}"));
        assert_eq!(percent_cell(Some(1.234), true), format!("{GREEN}1.23%{RESET}"));
        assert_eq!(percent_cell(None, false), "n/a");
    }
}
