use anyhow::{Context, Result, bail};
use ethers::types::{Address, U256};
use swap_guard::{
    chain::{self, BlockSource},
    config::AppConfig,
    dex::{EvmBackend, QuoteEngine, SwapExecutor},
    farm::Farm,
    settings::SwapSettings,
    tokens::TokenRegistry,
    units::format_units,
    utils::{self, short_hex},
    wallet::WalletSession,
};
use tokio::sync::watch;

const USAGE: &str = "usage:
  swap-guard quote <FROM> <TO> <AMOUNT>
  swap-guard swap <FROM> <TO> <AMOUNT> [RECIPIENT]
  swap-guard balance <SYMBOL> [OWNER]
  swap-guard watch <SYMBOL> [OWNER]
  swap-guard slippage [PERCENT]
  swap-guard deadline <SECONDS>
  swap-guard farm info <PID> [USER]
  swap-guard farm deposit|withdraw <PID> <AMOUNT>
  swap-guard farm harvest <PID>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let config = AppConfig::load()?;
    tracing::info!(
        chain_id = config.chain_id,
        router = %short_hex(&format!("{:?}", config.router)),
        "[INIT] swap-guard starting"
    );
    let registry = TokenRegistry::bsc_mainnet()?;

    match args.as_slice() {
        ["quote", from, to, amount] => quote(&config, registry, from, to, amount).await,
        ["swap", from, to, amount, rest @ ..] => {
            let recipient = rest.first().map(|r| parse_address(r)).transpose()?;
            swap(&config, registry, from, to, amount, recipient).await
        }
        ["balance", symbol, rest @ ..] => balance(&config, &registry, symbol, rest.first().copied()).await,
        ["watch", symbol, rest @ ..] => watch_balance(&config, &registry, symbol, rest.first().copied()).await,
        ["slippage"] => {
            let settings = SwapSettings::load(&config.settings_path)?;
            println!("slippage tolerance: {}%", settings.slippage_percent);
            println!("deadline window: {}s", settings.deadline_secs);
            Ok(())
        }
        ["slippage", percent] => {
            let percent: f64 = percent.parse().context("slippage must be a number")?;
            let mut settings = SwapSettings::load(&config.settings_path)?;
            settings.set_slippage(percent)?;
            settings.save(&config.settings_path)?;
            println!("slippage tolerance set to {percent}%");
            Ok(())
        }
        ["deadline", secs] => {
            let secs: u64 = secs.parse().context("deadline must be whole seconds")?;
            let mut settings = SwapSettings::load(&config.settings_path)?;
            settings.set_deadline_secs(secs)?;
            settings.save(&config.settings_path)?;
            println!("deadline window set to {secs}s");
            Ok(())
        }
        ["farm", action, pid, rest @ ..] => {
            let pid: u64 = pid.parse().context("PID must be an integer")?;
            farm(&config, action, pid, rest).await
        }
        _ => {
            eprintln!("{USAGE}");
            bail!("unrecognised command");
        }
    }
}

async fn quote(config: &AppConfig, registry: TokenRegistry, from: &str, to: &str, amount: &str) -> Result<()> {
    let session = WalletSession::connect(config)?;
    let account = session.address().unwrap_or_default();
    let backend = EvmBackend::new(session.provider(), config.router, account);
    check_bridge(&backend, &registry).await;

    let engine = QuoteEngine::new(backend, registry);
    let quote = engine.get_quote(from, to, amount).await?;
    if quote.is_no_route() {
        println!("no route available from {from} to {to}");
        return Ok(());
    }
    let route: Vec<&str> = quote
        .path
        .iter()
        .map(|a| engine.registry().by_address(*a).map_or("?", |t| t.symbol.as_str()))
        .collect();
    println!("{amount} {from} -> {} {to}", quote.amount_out_display());
    println!("route: {}", route.join(" -> "));
    Ok(())
}

async fn swap(
    config: &AppConfig,
    registry: TokenRegistry,
    from: &str,
    to: &str,
    amount: &str,
    recipient: Option<Address>,
) -> Result<()> {
    let session = WalletSession::connect(config)?;
    session.verify_chain().await?;
    let signer = session.signer()?;
    let account = session.address().unwrap_or_default();
    let settings = SwapSettings::load(&config.settings_path)?;
    let out_decimals = registry.resolve(to)?.decimals;

    let backend = EvmBackend::new(signer, config.router, account);
    check_bridge(&backend, &registry).await;
    let executor = SwapExecutor::new(QuoteEngine::new(backend, registry), settings.deadline_secs);

    let mut stages = executor.stages();
    let progress = tokio::spawn(async move {
        while stages.changed().await.is_ok() {
            let stage = stages.borrow_and_update().clone();
            tracing::info!(?stage, "[SWAP] stage");
            if stage.is_terminal() {
                break;
            }
        }
    });

    let result = executor
        .execute_swap(
            from,
            to,
            amount,
            settings.slippage_percent,
            recipient.unwrap_or(account),
        )
        .await;
    drop(executor);
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "[SWAP] progress reporter failed");
    }

    let receipt = result?;
    println!(
        "swapped {amount} {from} for at least {} {to} (quoted {})",
        format_units(receipt.order.min_out, out_decimals),
        format_units(receipt.quoted_out, out_decimals)
    );
    println!("tx: {:?}", receipt.swap.tx_hash);
    Ok(())
}

async fn balance(config: &AppConfig, registry: &TokenRegistry, symbol: &str, owner: Option<&str>) -> Result<()> {
    let session = WalletSession::connect(config)?;
    let token = registry.resolve(symbol)?;
    let owner = resolve_owner(&session, owner)?;
    let amount = chain::token_balance(session.provider(), token.address, owner).await?;
    println!("{} {}", format_units(amount, token.decimals), token.symbol);
    Ok(())
}

async fn watch_balance(config: &AppConfig, registry: &TokenRegistry, symbol: &str, owner: Option<&str>) -> Result<()> {
    let session = WalletSession::connect(config)?;
    let token = registry.resolve(symbol)?.clone();
    let owner = resolve_owner(&session, owner)?;

    let source = match &config.ws_url {
        Some(ws_url) => BlockSource::Subscribe {
            ws_url: ws_url.clone(),
            fallback: session.provider(),
            interval: config.poll_interval,
        },
        None => BlockSource::Poll {
            provider: session.provider(),
            interval: config.poll_interval,
        },
    };
    let (block_tx, block_rx) = watch::channel(0u64);
    let _blocks = chain::spawn_block_watcher(source, block_tx);

    let (balance_tx, mut balance_rx) = watch::channel(U256::zero());
    let _balances = chain::spawn_balance_watcher(session.provider(), token.address, owner, block_rx.clone(), balance_tx);

    while balance_rx.changed().await.is_ok() {
        let amount = *balance_rx.borrow_and_update();
        tracing::info!(
            block = *block_rx.borrow(),
            balance = %format_units(amount, token.decimals),
            token = %token.symbol,
            "[BALANCE] changed"
        );
    }
    Ok(())
}

async fn farm(config: &AppConfig, action: &str, pid: u64, rest: &[&str]) -> Result<()> {
    let session = WalletSession::connect(config)?;
    match (action, rest) {
        ("info", rest) => {
            let user = resolve_owner(&session, rest.first().copied())?;
            let farm = Farm::new(session.provider(), config.masterchef, user);
            let pool = farm.pool(pid).await?;
            let position = farm.position(pid, user).await?;
            println!(
                "pool {pid}: lp {:?}, alloc {}, {}",
                pool.lp_token,
                pool.alloc_point,
                position.summary(pool.lp_decimals)
            );
        }
        ("deposit", [amount]) | ("withdraw", [amount]) => {
            let account = session.address().unwrap_or_default();
            let farm = Farm::new(session.signer()?, config.masterchef, account);
            let outcome = if action == "deposit" {
                farm.deposit(pid, amount).await?
            } else {
                farm.withdraw(pid, amount).await?
            };
            println!("{action} confirmed: {:?}", outcome.tx_hash);
        }
        ("harvest", []) => {
            let account = session.address().unwrap_or_default();
            let farm = Farm::new(session.signer()?, config.masterchef, account);
            let outcome = farm.harvest(pid).await?;
            println!("harvest confirmed: {:?}", outcome.tx_hash);
        }
        _ => {
            eprintln!("{USAGE}");
            bail!("unrecognised farm command");
        }
    }
    Ok(())
}

/// Warn when the router's wrapped native token differs from the registry bridge.
async fn check_bridge<M: ethers::providers::Middleware + 'static>(backend: &EvmBackend<M>, registry: &TokenRegistry) {
    match backend.wrapped_native().await {
        Ok(native) if native != registry.bridge().address => {
            tracing::warn!(router_native = ?native, bridge = ?registry.bridge().address, "[INIT] bridge token mismatch");
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "[INIT] could not read router WETH()"),
    }
}

fn resolve_owner(session: &WalletSession, owner: Option<&str>) -> Result<Address> {
    match owner {
        Some(raw) => parse_address(raw),
        None => session
            .address()
            .context("pass an owner address or set PRIVATE_KEY"),
    }
}

fn parse_address(raw: &str) -> Result<Address> {
    raw.parse().with_context(|| format!("invalid address: {raw}"))
}
