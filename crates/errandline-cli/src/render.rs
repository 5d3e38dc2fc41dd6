//! Plain-text rendering of core models for the terminal.

use chrono::{DateTime, Local, Utc};

use errandline_core::auth::{NavRoot, SessionState};
use errandline_core::models::{Order, Transaction, VendorDashboard, VendorProfile};
use errandline_core::utils::{
    format_currency, format_detailed_date, format_relative_timestamp, group_by_time, service_label,
    status_group_label, truncate_string,
};

/// Width of the item summary column.
const SUMMARY_WIDTH: usize = 32;

pub fn session(state: &SessionState) -> String {
    let mut out = String::new();
    match state.logged_in_role() {
        Some(role) => {
            let name = state
                .user
                .as_ref()
                .map(|u| u.display_name(role.display_name()))
                .unwrap_or_else(|| role.display_name().to_string());
            out.push_str(&format!("Logged in as {} ({})\n", name, role));
        }
        None => out.push_str("Not logged in\n"),
    }
    out.push_str(&format!("Home: {}\n", NavRoot::for_session(state).path()));
    out
}

fn order_line(order: &Order, now: &DateTime<Utc>) -> String {
    let when = order
        .created_at
        .as_deref()
        .map(|ts| format_relative_timestamp(ts, now))
        .unwrap_or_default();
    format!(
        "  #{:<6} {:<20} {:<10} {:<w$} {:>14}  {}",
        order.id,
        truncate_string(&order.status, 20),
        service_label(order.service()),
        truncate_string(&order.items_summary(), SUMMARY_WIDTH),
        format_currency(order.total_amount.unwrap_or(0.0), false),
        when,
        w = SUMMARY_WIDTH,
    )
}

pub fn orders(orders: &[Order], now: &DateTime<Utc>) -> String {
    if orders.is_empty() {
        return "No orders yet\n".to_string();
    }
    let mut out = String::new();
    for (bucket, section) in group_by_time(orders, now) {
        out.push_str(&format!("{}\n", bucket.title()));
        for order in section {
            out.push_str(&order_line(order, now));
            out.push('\n');
        }
    }
    out
}

pub fn order_detail(order: &Order) -> String {
    let mut out = format!(
        "Order #{}\n  Status:  {} ({})\n  Service: {}\n",
        order.id,
        order.status,
        status_group_label(order.status_group()),
        service_label(order.service()),
    );
    if let Some(created) = order.created_at_utc() {
        out.push_str(&format!("  Placed:  {}\n", format_detailed_date(&created.with_timezone(&Local))));
    }
    if let Some(total) = order.total_amount {
        out.push_str(&format!("  Total:   {}\n", format_currency(total, false)));
    }
    if let Some(phone) = order.receiver_phone() {
        out.push_str(&format!("  Receiver phone: {}\n", phone));
    }
    out
}

pub fn transactions(transactions: &[Transaction], now: &DateTime<Utc>) -> String {
    if transactions.is_empty() {
        return "No transactions yet\n".to_string();
    }
    let mut out = String::new();
    for (bucket, section) in group_by_time(transactions, now) {
        out.push_str(&format!("{}\n", bucket.title()));
        for tx in section {
            let status = if tx.is_successful() { "ok" } else { tx.status.as_deref().unwrap_or("-") };
            out.push_str(&format!(
                "  {:<24} {:>14}  {:<20} {}\n",
                truncate_string(tx.title(), 24),
                format_currency(tx.amount.unwrap_or(0.0), false),
                truncate_string(tx.bank_display().unwrap_or("-"), 20),
                status,
            ));
        }
    }
    out
}

pub fn items(profile: &VendorProfile) -> String {
    let mut out = format!("{}\n", profile.name.as_deref().unwrap_or("Catalogue"));
    if profile.items.is_empty() {
        out.push_str("  No items\n");
        return out;
    }
    for item in &profile.items {
        let prices = match &item.price {
            Some(price) => price
                .lines()
                .iter()
                .map(|(label, amount)| format!("{}: {}", label, format_currency(*amount, false)))
                .collect::<Vec<_>>()
                .join(", "),
            None => "No Price".to_string(),
        };
        out.push_str(&format!(
            "  #{:<6} {:<28} {}\n",
            item.id,
            truncate_string(item.name.as_deref().unwrap_or("Item"), 28),
            prices
        ));
    }
    out
}

pub fn dashboard(dashboard: &VendorDashboard, now: &DateTime<Utc>) -> String {
    let name = dashboard
        .user
        .as_ref()
        .map(|u| u.display_name("Vendor"))
        .unwrap_or_else(|| "Vendor".to_string());
    let mut out = format!("Welcome back, {}\n\nRecent orders\n", name);
    out.push_str(&orders(&dashboard.orders, now));
    out
}
