use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sim_client::tour::{NextOutcome, StaticLayout, Viewport};
use sim_client::{ChartMode, ClientError, OrderAction, ScaleMode, Session, StateStore, SvgSurface};
use sim_core::{Engine, PositionSide};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::display;

/// Viewport the tour overlay is laid out against
const TOUR_VIEWPORT: Viewport = Viewport::new(1440.0, 900.0);
const TOUR_RENDER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionArg {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
}

impl From<ActionArg> for OrderAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::OpenLong => OrderAction::OpenLong,
            ActionArg::OpenShort => OrderAction::OpenShort,
            ActionArg::CloseLong => OrderAction::CloseLong,
            ActionArg::CloseShort => OrderAction::CloseShort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SideArg {
    Long,
    Short,
}

impl From<SideArg> for PositionSide {
    fn from(arg: SideArg) -> Self {
        match arg {
            SideArg::Long => PositionSide::Long,
            SideArg::Short => PositionSide::Short,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChartArg {
    Tick,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum TourCommand {
    /// Show the current step
    Show,
    /// Advance to the next step if its gate is open
    Next,
    /// Close the tour for good
    Skip,
    /// Clear the completion flag and start again
    Rearm,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Instrument, account, positions, orders and round log
    Status,
    /// Product list, optionally filtered by code or name
    Products {
        #[arg(long, default_value = "")]
        filter: String,
    },
    /// Select the main contract of a product
    Select { code: String },
    /// Advance the market
    Tick {
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Submit a limit order for the selected contract
    Order {
        #[arg(long, value_enum, default_value = "open-long")]
        action: ActionArg,
        /// Limit price; defaults to the last price
        #[arg(long)]
        price: Option<String>,
        #[arg(long, default_value = "1")]
        qty: String,
    },
    /// Cancel every resting order
    CancelAll,
    /// Close lots of a position at the last price
    Close {
        symbol: String,
        #[arg(value_enum)]
        side: SideArg,
        #[arg(long, default_value = "1")]
        qty: u32,
    },
    /// Wipe saved progress and start over
    Reset,
    /// Write the chart of the selected contract as SVG
    Chart {
        #[arg(long, value_enum, default_value = "tick")]
        mode: ChartArg,
        /// Scale to the full limit band instead of the visible series
        #[arg(long)]
        fixed: bool,
        #[arg(long, default_value = "chart.svg")]
        out: PathBuf,
    },
    /// Guided tour
    Tour {
        #[command(subcommand)]
        action: TourCommand,
    },
    /// Read commands from stdin, one per line, against one session
    Shell,
}

/// One line typed into the shell
#[derive(Parser, Debug)]
#[command(name = "futures-sim", no_binary_name = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

/// Run a command, or the shell loop
pub async fn execute<E: Engine, S: StateStore>(session: &mut Session<E, S>, command: Command) -> Result<()> {
    match command {
        Command::Shell => shell(session).await,
        other => run_one(session, other).await,
    }
}

/// Rejections and input errors are reported as notices and do not fail the
/// command; only fatal errors propagate.
async fn run_one<E: Engine, S: StateStore>(session: &mut Session<E, S>, command: Command) -> Result<()> {
    let result = dispatch(session, command).await;
    let notices = session.take_notices();
    for notice in &notices {
        println!("{}", display::notice(notice));
    }
    match result {
        Err(e) if !is_fatal(&e) => {
            if notices.is_empty() {
                println!("[error] {}", e);
            }
            Ok(())
        }
        other => other,
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<ClientError>() {
        Some(e) => e.is_fatal(),
        None => true,
    }
}

async fn dispatch<E: Engine, S: StateStore>(session: &mut Session<E, S>, command: Command) -> Result<()> {
    match command {
        Command::Status => {
            let vm = session.view_model()?;
            print!("{}", display::status(&vm));
        }
        Command::Products { filter } => {
            session.set_filter(&filter);
            let vm = session.view_model()?;
            print!("{}", display::products(&vm));
        }
        Command::Select { code } => {
            session.select_product(&code)?;
            let vm = session.view_model()?;
            print!("{}", display::header(&vm));
        }
        Command::Tick { count } => {
            for _ in 0..count.max(1) {
                session.advance_tick().await?;
            }
            let vm = session.view_model()?;
            print!("{}", display::header(&vm));
            print!("{}", display::account(&vm));
        }
        Command::Order { action, price, qty } => {
            session.set_action(action.into());
            let price = match price {
                Some(p) => p,
                None => default_price(session)?,
            };
            session.submit_order(&price, &qty).await?;
            let vm = session.view_model()?;
            print!("{}", display::positions(&vm));
        }
        Command::CancelAll => {
            session.cancel_all().await?;
        }
        Command::Close { symbol, side, qty } => {
            session.close_position(&symbol, side.into(), qty).await?;
            let vm = session.view_model()?;
            print!("{}", display::positions(&vm));
        }
        Command::Reset => {
            session.reset_all().await?;
        }
        Command::Chart { mode, fixed, out } => {
            session.set_chart_mode(match mode {
                ChartArg::Tick => ChartMode::Tick,
                ChartArg::Day => ChartMode::Day,
            });
            if fixed == (session.scale_mode() == ScaleMode::Auto) {
                session.toggle_auto_scale();
            }
            let frame = session.render_chart()?;
            let mut surface = SvgSurface::new();
            frame.paint(&mut surface);
            std::fs::write(&out, surface.to_svg())
                .with_context(|| format!("Failed to write chart to {}", out.display()))?;
            println!("chart written to {}", out.display());
        }
        Command::Tour { action } => tour(session, action).await?,
        Command::Shell => println!("already in the shell"),
    }
    Ok(())
}

fn default_price<E: Engine, S: StateStore>(session: &Session<E, S>) -> Result<String> {
    let symbol = session.selected_symbol().ok_or(ClientError::NotInitialized)?;
    let state = session.snapshot().ok_or(ClientError::NotInitialized)?;
    let market = state
        .market
        .get(symbol)
        .ok_or_else(|| ClientError::UnknownSymbol(symbol.to_string()))?;
    Ok(market.last.to_string())
}

async fn tour<E: Engine, S: StateStore>(session: &mut Session<E, S>, action: TourCommand) -> Result<()> {
    match action {
        TourCommand::Show => {}
        TourCommand::Next => match session.tour_next()? {
            NextOutcome::Blocked => println!("finish this step first"),
            NextOutcome::Inactive => println!("tour is not running"),
            NextOutcome::Advanced { .. } | NextOutcome::Finished => {}
        },
        TourCommand::Skip => session.tour_skip()?,
        TourCommand::Rearm => session.tour_rearm()?,
    }

    let layout = StaticLayout::trading_screen();
    let outcome = session
        .tour_render_when_ready(&layout, TOUR_VIEWPORT, TOUR_RENDER_ATTEMPTS)
        .await;
    print!("{}", display::tour(session.tour().status(), &outcome));
    Ok(())
}

async fn shell<E: Engine, S: StateStore>(session: &mut Session<E, S>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("type a command (status, tick, order --price 2,000 --qty 1, ...); `quit` to leave");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            _ => {}
        }

        let parsed = match ShellLine::try_parse_from(line.split_whitespace()) {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        run_one(session, parsed.command).await?;
    }
    Ok(())
}
