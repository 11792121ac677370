//! Plain-text rendering of view models for the terminal.

use sim_client::tour::{RenderOutcome, TourStatus};
use sim_client::{Notice, NoticeLevel, ViewModel};
use std::fmt::Write;

/// Thousands-separated number with two decimals
pub fn money(v: f64) -> String {
    let raw = format!("{:.2}", v.abs());
    let (int_part, frac) = raw.split_once('.').unwrap_or((raw.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 && raw != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

fn signed(v: f64) -> String {
    if v >= 0.0 {
        format!("+{}", money(v))
    } else {
        money(v)
    }
}

pub fn products(vm: &ViewModel) -> String {
    let mut out = String::new();
    for row in &vm.products {
        let marker = if row.selected { ">" } else { " " };
        let _ = writeln!(
            out,
            "{} {:<6} {:<22} {:>12} {:>12} {:>8.2}%",
            marker,
            row.code,
            row.name,
            money(row.last),
            signed(row.change),
            row.change_pct * 100.0
        );
    }
    out
}

pub fn header(vm: &ViewModel) -> String {
    let Some(h) = &vm.header else {
        return "no instrument selected\n".to_string();
    };
    let mut out = String::new();
    let _ = writeln!(out, "{}  {}", h.symbol, h.name);
    let _ = writeln!(
        out,
        "last {}  {} ({:+.2}%)  prev settle {}",
        money(h.market.last),
        signed(h.change),
        h.change_pct * 100.0,
        money(h.market.prev_settle)
    );
    let _ = writeln!(
        out,
        "open {}  high {}  low {}  vol {}  oi {}",
        money(h.market.open),
        money(h.market.high),
        money(h.market.low),
        h.market.volume,
        h.market.open_interest
    );
    let _ = writeln!(out, "{}  |  {}  |  band {:.0}%", h.spec_text, h.limit_text, h.band_position * 100.0);
    out
}

pub fn account(vm: &ViewModel) -> String {
    let a = &vm.account.account;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "equity {}  available {}  margin {}  risk {:.1}%",
        money(a.equity),
        money(a.available),
        money(a.margin_used),
        vm.account.risk
    );
    let _ = writeln!(
        out,
        "floating {}  realized {}  fees {}",
        signed(a.unrealized_pnl),
        signed(a.realized_pnl),
        money(a.fees)
    );
    if vm.account.margin_warning {
        let _ = writeln!(out, "WARNING: available funds are negative");
    }
    out
}

pub fn positions(vm: &ViewModel) -> String {
    if vm.positions.is_empty() {
        return "no positions\n".to_string();
    }
    let mut out = String::new();
    for row in &vm.positions {
        let p = &row.position;
        let _ = writeln!(
            out,
            "{:<10} {:<5} {:>4} lots  avg {}  last {}  pnl {}  margin {}",
            p.symbol,
            p.side,
            p.qty,
            money(p.avg_open),
            money(row.last),
            signed(row.pnl),
            money(p.margin)
        );
    }
    out
}

pub fn orders(vm: &ViewModel) -> String {
    let mut out = String::new();
    for o in &vm.orders {
        let _ = writeln!(
            out,
            "#{} {} {:<10} {}/{} {} @ {} {}",
            o.id,
            o.ts,
            o.symbol,
            o.side,
            o.effect,
            o.qty,
            money(o.price),
            o.status
        );
    }
    out
}

pub fn round_log(vm: &ViewModel, limit: usize) -> String {
    let mut out = String::new();
    for entry in vm.round_log.iter().take(limit) {
        let _ = writeln!(out, "{}  {}  {}", entry.ts, entry.title, entry.detail);
    }
    out
}

/// Full status screen
pub fn status(vm: &ViewModel) -> String {
    let mut out = String::new();
    out.push_str(&header(vm));
    out.push('\n');
    out.push_str(&account(vm));
    out.push('\n');
    let _ = writeln!(out, "Positions ({})", vm.position_count());
    out.push_str(&positions(vm));
    if !vm.orders.is_empty() {
        out.push_str("\nOrders\n");
        out.push_str(&orders(vm));
    }
    if !vm.round_log.is_empty() {
        out.push_str("\nRound log\n");
        out.push_str(&round_log(vm, 8));
    }
    out
}

pub fn notice(n: &Notice) -> String {
    let tag = match n.level {
        NoticeLevel::Info => "ok",
        NoticeLevel::Error => "error",
        NoticeLevel::Fatal => "fatal",
    };
    format!("[{}] {}: {}", tag, n.title, n.detail)
}

pub fn tour(status: TourStatus, outcome: &RenderOutcome) -> String {
    match (status, outcome) {
        (TourStatus::Finished, _) => "tour finished (use `tour rearm` to replay)\n".to_string(),
        (TourStatus::Idle, _) | (_, RenderOutcome::Hidden) => "tour idle\n".to_string(),
        (_, RenderOutcome::Pending { .. }) => "tour target not on screen yet\n".to_string(),
        (_, RenderOutcome::Shown(frame)) => {
            let mut out = String::new();
            let _ = writeln!(out, "Step {}/{}: {}", frame.step + 1, frame.total, frame.title);
            let _ = writeln!(out, "{}", frame.body);
            if let Some(hint) = &frame.hint {
                let _ = writeln!(out, "hint: {}", hint);
            }
            let s = frame.overlay.spotlight;
            let _ = writeln!(out, "spotlight at ({:.0}, {:.0}) {:.0}x{:.0}", s.x, s.y, s.width, s.height);
            let button = if frame.can_advance {
                frame.button.clone()
            } else {
                format!("{} (locked)", frame.button)
            };
            let _ = writeln!(out, "[{}]", button);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_grouping() {
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(999.5), "999.50");
        assert_eq!(money(1234.5), "1,234.50");
        assert_eq!(money(200000.0), "200,000.00");
        assert_eq!(money(-1234567.891), "-1,234,567.89");
        assert_eq!(money(-0.001), "0.00");
    }

    #[test]
    fn test_signed() {
        assert_eq!(signed(12.0), "+12.00");
        assert_eq!(signed(-3.5), "-3.50");
    }

    #[test]
    fn test_notice_line() {
        let n = Notice {
            level: NoticeLevel::Error,
            title: "Order failed".to_string(),
            detail: "margin not enough".to_string(),
        };
        assert_eq!(notice(&n), "[error] Order failed: margin not enough");
    }
}
