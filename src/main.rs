use botpic::adapters::http::{end_of_run_note, is_restricted_host};
use botpic::core::schedule::{moscow_now, HourWindow};
use botpic::utils::{logger, validation::Validate};
use botpic::{
    BotError, BroadcastEngine, CliConfig, CommonsSearch, ProxyPolicy, ResilientTransport,
    RetryPolicy, TelegramDispatcher,
};
use clap::error::ErrorKind;
use clap::Parser;
use std::sync::Arc;

async fn run(config: CliConfig) -> Result<(), BotError> {
    let table = config.destination_table()?;
    println!(
        "🟢 botpic v{}: starting. Groups in table: {}",
        env!("CARGO_PKG_VERSION"),
        table.len()
    );

    // 缺少 token 時在任何網路操作前結束
    if let Err(e) = config.validate() {
        match e {
            BotError::MissingConfigError { .. } => {
                println!("⛔ BOT_TOKEN is not set (environment variable). Exiting.");
            }
            _ => {
                println!("❌ {}", e.user_friendly_message());
                println!("💡 {}", e.recovery_suggestion());
            }
        }
        return Err(e);
    }

    let now = moscow_now();
    println!("⏰ Moscow time now: {}", now.format("%Y-%m-%d %H:%M:%S"));

    let window = config.hour_window();
    if let HourWindow::Invalid(raw) = &window {
        println!("⚠️ ONLY_SEND_AT_HOUR='{}' is invalid: ignoring it and sending now.", raw);
    } else if let HourWindow::At(hour) = &window {
        if !window.allows(&now) {
            println!("🛑 Outside the ONLY_SEND_AT_HOUR={} window. Nothing to send.", hour);
            return Ok(());
        }
    }

    let proxy_policy = ProxyPolicy::from_env();
    let transport = Arc::new(ResilientTransport::new(proxy_policy, RetryPolicy::default())?);
    let source = CommonsSearch::new(transport.clone(), config.search_settings());
    let sender = TelegramDispatcher::new(transport.clone(), config.dispatch_settings()?);
    let engine = BroadcastEngine::new(source, sender);

    let summary = engine.run(table.as_slice(), &config.run_filter()).await;
    println!("✅ Done. Sent: {}. Errors: {}.", summary.sent, summary.errors);

    if is_restricted_host(|k| std::env::var_os(k).is_some()) {
        println!("ℹ️ Running on a restricted hosting environment.");
        if let Some(note) =
            end_of_run_note(summary.errors, transport.proxy_mode_engaged(), proxy_policy)
        {
            println!("ℹ️ {}", note);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let config = match CliConfig::try_parse() {
        Ok(config) => config,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let silent = config.silent;
    if config.log_json {
        logger::init_json_logger(config.verbose, silent);
    } else {
        logger::init_cli_logger(config.verbose, silent);
    }
    tracing::debug!(
        "Options: max_groups={}, exclude={:?}, hour={:?}",
        config.max_groups,
        config.exclude_groups,
        config.only_send_at_hour
    );

    if let Err(e) = run(config).await {
        if !matches!(e, BotError::MissingConfigError { .. }) {
            println!("💥 Unhandled failure: {}", e);
            if !silent {
                eprintln!("{:?}", e);
            }
        }
        std::process::exit(e.exit_code());
    }
}
