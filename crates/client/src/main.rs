use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use stockflow_client::history::{MovementFilter, MovementStats, export_csv, export_filename, users};
use stockflow_client::{
    ApiClient, AppState, ClientConfig, ClientError, RefreshTokenProvider, RefresherHandle, TokenRefresher,
    load_history, submit_movement,
};
use stockflow_core::ProductId;
use stockflow_inventory::{MovementRequest, MovementType, StockLevel, calculate};
use stockflow_observability::LogFormat;
use stockflow_products::{CatalogQuery, StockFilter, categories};

#[derive(Parser)]
#[command(name = "stockflow", about = "Inventory stock movements from the command line", version)]
struct Cli {
    #[arg(long, global = true, help = "Backend base URL (overrides STOCKFLOW_API_URL)")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "Bearer token (overrides STOCKFLOW_TOKEN)")]
    token: Option<String>,
    #[arg(long, global = true, help = "Identity-provider client id (overrides STOCKFLOW_CLIENT_ID)")]
    client_id: Option<String>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[arg(long, global = true, help = "Log format on stderr: json | pretty (overrides STOCKFLOW_LOG_FORMAT)")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Products(ProductsCommands),
    #[command(subcommand)]
    Stock(StockCommands),
    #[command(subcommand)]
    History(HistoryCommands),
    /// Show who the configured token belongs to.
    Whoami,
}

#[derive(Subcommand)]
enum ProductsCommands {
    List(ProductsListArgs),
}

#[derive(Args)]
struct ProductsListArgs {
    #[arg(long, default_value = "", help = "Match name, description or category")]
    search: String,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, default_value = "all", help = "all | low | out | normal")]
    stock: StockFilter,
    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Subcommand)]
enum StockCommands {
    /// Compute a movement locally without contacting the backend.
    Preview(PreviewArgs),
    /// Record a movement.
    Move(MoveArgs),
}

#[derive(Args)]
struct PreviewArgs {
    #[arg(long)]
    current: u64,
    #[arg(long = "type")]
    movement_type: MovementType,
    #[arg(long, allow_hyphen_values = true)]
    amount: String,
    #[arg(long, default_value = "")]
    reason: String,
    #[arg(long, help = "Minimum stock of the product (defaults to 5)")]
    minimum: Option<u64>,
}

#[derive(Args)]
struct MoveArgs {
    #[arg(long)]
    product: ProductId,
    #[arg(long = "type")]
    movement_type: MovementType,
    #[arg(long, allow_hyphen_values = true)]
    amount: String,
    #[arg(long, default_value = "")]
    reason: String,
}

#[derive(Subcommand)]
enum HistoryCommands {
    List(HistoryListArgs),
    Export(HistoryExportArgs),
}

#[derive(Args)]
struct HistoryListArgs {
    #[arg(long)]
    product: Option<ProductId>,
    #[arg(long = "type")]
    movement_type: Option<MovementType>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long, default_value = "")]
    search: String,
    #[arg(long, help = "Number of recent movements to fetch (default 500)")]
    limit: Option<u32>,
    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Args)]
struct HistoryExportArgs {
    #[arg(long, help = "Output file (defaults to stock-history-<today>.csv)")]
    out: Option<PathBuf>,
    #[arg(long)]
    limit: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.log_format {
        Some(format) => stockflow_observability::tracing::init(format),
        None => stockflow_observability::init(),
    }

    let mut config = ClientConfig::from_env();
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_string();
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }
    if let Some(client_id) = cli.client_id {
        config.client_id = client_id;
    }

    let json = cli.json;
    let api = ApiClient::from_config(config).context("failed to build HTTP client")?;
    let refresher = start_refresher(&api).await?;

    let result = match cli.command {
        Commands::Products(ProductsCommands::List(args)) => list_products(&api, args, json).await,
        Commands::Stock(StockCommands::Preview(args)) => preview(args, json),
        Commands::Stock(StockCommands::Move(args)) => move_stock(&api, args, json).await,
        Commands::History(HistoryCommands::List(args)) => list_history(&api, args, json).await,
        Commands::History(HistoryCommands::Export(args)) => export_history(&api, args).await,
        Commands::Whoami => whoami(&api, json).await,
    };

    if let Some(handle) = refresher {
        handle.stop().await;
    }
    result
}

/// Refresh the session once up front, then keep it fresh in the background.
async fn start_refresher(api: &ApiClient) -> Result<Option<RefresherHandle>> {
    let config = api.config();
    let Some(provider) = RefreshTokenProvider::from_config(config, api.session().clone())
        .context("failed to build identity-provider client")?
    else {
        return Ok(None);
    };

    let refresher = TokenRefresher::new(
        Arc::new(provider),
        api.session().clone(),
        config.client_id.clone(),
        config.refresh_interval,
    );
    if let Err(e) = refresher.refresh_once().await {
        tracing::warn!("initial token refresh failed: {}", e);
    }
    Ok(Some(refresher.start()))
}

fn preview(args: PreviewArgs, json: bool) -> Result<()> {
    let request = MovementRequest::new(args.current, args.movement_type, args.amount.as_str(), &args.reason);
    let calc = calculate(&request);
    let level = StockLevel::classify(calc.preview_quantity, args.minimum);

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PreviewOutput {
            preview_quantity: u64,
            delta: Option<String>,
            stock_level: &'static str,
            error: Option<String>,
        }
        return print_json(&PreviewOutput {
            preview_quantity: calc.preview_quantity,
            delta: calc.delta.map(|d| d.to_string()),
            stock_level: level.label(),
            error: calc.validation.as_ref().err().map(|e| e.to_string()),
        });
    }

    if let Some(delta) = calc.delta {
        println!("Change:    {delta}");
    }
    println!("New stock: {} ({})", calc.preview_quantity, level.label());
    match &calc.validation {
        Ok(_) => println!("Valid movement"),
        Err(e) => anyhow::bail!("{e}"),
    }
    Ok(())
}

async fn list_products(api: &ApiClient, args: ProductsListArgs, json: bool) -> Result<()> {
    let mut state = AppState::new(api.viewer().await);
    let ticket = state.begin_products_fetch();
    state.apply_products(ticket, api.browse_products().await);
    if let Some(banner) = state.banner.take() {
        anyhow::bail!(banner.message);
    }

    state.set_catalog_query(CatalogQuery {
        search: args.search,
        category: args.category,
        stock: args.stock,
    });
    state.set_catalog_page(args.page);
    let page = state.product_page();

    if json {
        return print_json(&page);
    }

    for p in &page.items {
        println!(
            "{:>6}  {:<30} {:<16} {:>8.2} {:>6}  {}",
            p.id,
            p.name,
            p.category,
            p.price,
            p.current_quantity,
            p.stock_level().label()
        );
    }
    println!("{} (page {} of {})", page.summary(), page.page, page.total_pages.max(1));
    println!("Categories: {}", categories(&state.products).join(", "));

    let out = state.alerts.out_of_stock(&state.products).len();
    let low = state.alerts.low_stock(&state.products).len();
    if out + low > 0 && state.viewer.is_authenticated() {
        println!("Alerts: {out} out of stock, {low} low stock");
    }
    Ok(())
}

async fn move_stock(api: &ApiClient, args: MoveArgs, json: bool) -> Result<()> {
    let product = api
        .get_product(args.product)
        .await
        .map_err(ClientError::from)
        .context("failed to load product")?;

    let recorded = submit_movement(
        api,
        &product,
        args.movement_type,
        args.amount.as_str().into(),
        &args.reason,
    )
    .await?;

    if json {
        return print_json(&recorded);
    }
    println!(
        "{}: {} ({} -> {})",
        product.name,
        recorded.delta(),
        recorded.previous_quantity.unwrap_or(product.current_quantity),
        recorded
            .new_quantity
            .map(|q| q.to_string())
            .unwrap_or_else(|| "?".to_string())
    );
    Ok(())
}

async fn list_history(api: &ApiClient, args: HistoryListArgs, json: bool) -> Result<()> {
    let mut state = AppState::new(api.viewer().await);
    let ticket = state.begin_movements_fetch();
    let result = load_history(api, args.product, args.limit).await;
    match result {
        Ok(movements) => {
            state.apply_movements(ticket, Ok(movements));
        }
        Err(ClientError::Api(err)) => {
            state.apply_movements(ticket, Err(err));
        }
        Err(other) => return Err(other.into()),
    }
    if let Some(banner) = state.banner.take() {
        anyhow::bail!(banner.message);
    }

    state.set_history_filter(MovementFilter {
        product: args.product,
        movement_type: args.movement_type,
        user: args.user,
        search: args.search,
        ..MovementFilter::default()
    });
    state.set_history_page(args.page);
    let page = state.history_page();
    let stats = state.history_stats();

    if json {
        #[derive(Serialize)]
        struct HistoryOutput<'a> {
            stats: MovementStats,
            page: &'a stockflow_products::Page<stockflow_inventory::StockMovement>,
        }
        return print_json(&HistoryOutput { stats, page: &page });
    }

    for m in &page.items {
        println!(
            "{}  {:<20} {:<10} {:>6}  {:<12} {}",
            m.created_at.format("%Y-%m-%d %H:%M:%S"),
            m.product_name,
            m.movement_type.label(),
            m.delta().to_string(),
            m.created_by,
            if m.reason.trim().is_empty() { "N/A" } else { m.reason.trim() }
        );
    }
    println!("{}", page.summary());
    println!(
        "In: {}  Out: {}  Adjusted: {}  Returned: {}  Lost: {}  Total: {}",
        stats.stock_in, stats.stock_out, stats.adjustment, stats.returns, stats.loss, stats.total
    );
    println!("Users: {}", users(&state.movements).join(", "));
    Ok(())
}

async fn export_history(api: &ApiClient, args: HistoryExportArgs) -> Result<()> {
    let movements = load_history(api, None, args.limit).await?;
    let path = args
        .out
        .unwrap_or_else(|| PathBuf::from(export_filename(chrono::Utc::now().date_naive())));

    let file = std::fs::File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    export_csv(&movements, file).context("failed to write CSV")?;
    println!("Exported {} movements to {}", movements.len(), path.display());
    Ok(())
}

async fn whoami(api: &ApiClient, json: bool) -> Result<()> {
    let session = api.session().read().await;
    let viewer = session.viewer();

    let capabilities = viewer.capabilities();

    if json {
        #[derive(Serialize)]
        struct WhoamiOutput<'a> {
            viewer: &'a stockflow_auth::Viewer,
            role: &'static str,
            capabilities: &'a [stockflow_auth::Capability],
        }
        return print_json(&WhoamiOutput {
            viewer,
            role: viewer.role_label(),
            capabilities: &capabilities,
        });
    }

    match viewer {
        stockflow_auth::Viewer::Anonymous => println!("Not logged in (Guest)"),
        stockflow_auth::Viewer::Authenticated { username, .. } => {
            println!("{} ({})", username, viewer.role_label());
            if let Some(exp) = session.claims().and_then(|c| c.expires_at()) {
                println!("Token expires at {}", exp.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
    }
    let names: Vec<&str> = capabilities.iter().map(|c| c.as_str()).collect();
    println!("Can: {}", names.join(", "));
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
