use std::{str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use inventory_scan::{
    auth::{AccessGate, Operator},
    catalog::{CatalogClient, CatalogLookup, HttpCatalogClient},
    config::{self, AppConfig},
    models::{Product, ProductId, Stock},
    scan::{
        Barcode, DraftEdit, PendingNewProduct, ScanController, ScanOutcome, ScanSession,
    },
    services::{
        InventoryService, InventoryStats, ProductQuery, ProductUpdate, SortDirection, SortField,
    },
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const ACCESS_KEY_VAR: &str = "INVENTORY_SCAN_ACCESS_KEY";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize()?;

    if let Commands::Login = cli.command {
        return handle_login(&context, cli.access_key.as_deref(), cli.json);
    }
    let operator = context.authorize(cli.access_key.as_deref())?;
    debug!(operator = %operator.name, "operator authorized");

    match cli.command {
        Commands::Login => Ok(()),
        Commands::Products(command) => handle_products_command(&context, command, cli.json).await,
        Commands::Stock(command) => handle_stock_command(&context, command, cli.json).await,
        Commands::Stats => handle_stats(&context, cli.json).await,
        Commands::Scan(args) => handle_scan(&context, args, cli.json).await,
    }
}

#[derive(Parser)]
#[command(
    name = "inventory-scan",
    about = "Inventory client with barcode scan-to-product resolution",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        global = true,
        help = "Operator access key; falls back to INVENTORY_SCAN_ACCESS_KEY"
    )]
    access_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an access key against the configured operators
    Login,
    #[command(subcommand)]
    Products(ProductsCommands),
    #[command(subcommand)]
    Stock(StockCommands),
    /// Catalog-wide statistics
    Stats,
    /// Resolve scanned barcodes against the catalog
    Scan(ScanArgs),
}

#[derive(Subcommand)]
enum ProductsCommands {
    List(ListProductsArgs),
    Get(ProductIdArgs),
    Create(CreateProductArgs),
    Update(UpdateProductArgs),
    Delete(ProductIdArgs),
}

#[derive(Subcommand)]
enum StockCommands {
    Adjust(AdjustStockArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Price,
    Stock,
}

impl From<SortArg> for SortField {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => SortField::Name,
            SortArg::Price => SortField::Price,
            SortArg::Stock => SortField::Stock,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortDirection {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => SortDirection::Asc,
            OrderArg::Desc => SortDirection::Desc,
        }
    }
}

#[derive(Args)]
struct ListProductsArgs {
    #[arg(long, help = "Case-insensitive match on name, type, supplier or price")]
    search: Option<String>,
    #[arg(long, value_enum, default_value = "name")]
    sort: SortArg,
    #[arg(long, value_enum, default_value = "asc")]
    order: OrderArg,
}

#[derive(Args)]
struct ProductIdArgs {
    #[arg(long, value_parser = parse_product_id)]
    id: ProductId,
}

#[derive(Args)]
struct CreateProductArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "type")]
    product_type: String,
    #[arg(long, help = "8, 12, 13 or 14 digit barcode")]
    barcode: String,
    #[arg(long, value_parser = parse_decimal)]
    price: Decimal,
    #[arg(long)]
    supplier: String,
    #[arg(long)]
    image: Option<String>,
    #[arg(long, help = "Initial quantity for a first stock entry")]
    in_stock: Option<i64>,
    #[arg(long, default_value = "Main", help = "Name of the initial stock entry")]
    warehouse: String,
}

#[derive(Args)]
struct UpdateProductArgs {
    #[arg(long, value_parser = parse_product_id)]
    id: ProductId,
    #[arg(long)]
    name: Option<String>,
    #[arg(long = "type")]
    product_type: Option<String>,
    #[arg(long, value_parser = parse_decimal)]
    price: Option<Decimal>,
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long, help = "Image reference; an empty value clears it")]
    image: Option<String>,
    #[arg(long)]
    city: Option<String>,
}

#[derive(Args)]
struct AdjustStockArgs {
    #[arg(long, value_parser = parse_product_id)]
    product_id: ProductId,
    #[arg(long)]
    stock_id: i64,
    #[arg(long, allow_hyphen_values = true, help = "Signed change, e.g. 5 or -2")]
    delta: i64,
}

#[derive(Args)]
struct ScanArgs {
    #[arg(
        long = "code",
        help = "Scanned code; repeat for several. Reads stdin lines when omitted"
    )]
    codes: Vec<String>,
    #[arg(
        long,
        value_parser = parse_draft,
        help = "Fill for unknown codes: name=..,type=..,price=..,supplier=..[,image=..]"
    )]
    draft: Option<DraftEdit>,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Wait out the scan cooldown between --code values instead of dropping them"
    )]
    wait: bool,
}

struct CliContext {
    config: AppConfig,
    catalog: Arc<dyn CatalogClient>,
}

impl CliContext {
    fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load configuration")?;
        config::init_tracing(config.log_level(), config.log_json);

        let client = HttpCatalogClient::new(&config.catalog_url, config.request_timeout())
            .with_context(|| format!("invalid catalog url '{}'", config.catalog_url))?;
        debug!(catalog = %client.base_url(), "catalog client ready");

        Ok(Self {
            config,
            catalog: Arc::new(client),
        })
    }

    fn inventory_service(&self) -> InventoryService {
        InventoryService::new(self.catalog.clone())
    }

    fn authorize(&self, access_key: Option<&str>) -> Result<Operator> {
        let key = match access_key {
            Some(key) => key.to_string(),
            None => std::env::var(ACCESS_KEY_VAR).map_err(|_| {
                anyhow!("an access key is required (--access-key or {ACCESS_KEY_VAR})")
            })?,
        };
        let gate = AccessGate::new(self.config.operators.clone());
        let operator = gate.verify(&key).context("access denied")?;
        Ok(operator.clone())
    }
}

fn handle_login(context: &CliContext, access_key: Option<&str>, json: bool) -> Result<()> {
    let operator = context.authorize(access_key)?;
    if json {
        print_json(&json!({ "operator": operator.name }))?;
    } else {
        println!("Access granted for {}", operator.name);
    }
    Ok(())
}

async fn handle_products_command(
    context: &CliContext,
    command: ProductsCommands,
    json: bool,
) -> Result<()> {
    let service = context.inventory_service();
    match command {
        ProductsCommands::List(args) => {
            let query = ProductQuery {
                search: args.search,
                sort: args.sort.into(),
                direction: args.order.into(),
            };
            let products = service
                .list_products(&query)
                .await
                .context("failed to list products")?;
            if json {
                print_json(&products)?;
            } else {
                println!("Products: {} result(s)", products.len());
                for product in &products {
                    render_product(product);
                }
            }
            Ok(())
        }
        ProductsCommands::Get(args) => {
            let product = service
                .get_product(&args.id)
                .await
                .with_context(|| format!("failed to fetch product {}", args.id))?;
            if json {
                print_json(&product)?;
            } else {
                render_product_detail(&product);
            }
            Ok(())
        }
        ProductsCommands::Create(args) => handle_create_product(&service, args, json).await,
        ProductsCommands::Update(args) => {
            let id = args.id.clone();
            let update = ProductUpdate {
                name: args.name,
                product_type: args.product_type,
                price: args.price,
                supplier: args.supplier,
                image: args.image,
                city: args.city,
            };
            let product = service
                .update_product(&id, update)
                .await
                .with_context(|| format!("failed to update product {}", id))?;
            if json {
                print_json(&product)?;
            } else {
                println!("Product updated");
                render_product(&product);
            }
            Ok(())
        }
        ProductsCommands::Delete(args) => {
            service
                .delete_product(&args.id)
                .await
                .with_context(|| format!("failed to delete product {}", args.id))?;
            if json {
                print_json(&json!({ "deleted": args.id }))?;
            } else {
                println!("Product {} deleted", args.id);
            }
            Ok(())
        }
    }
}

async fn handle_create_product(
    service: &InventoryService,
    args: CreateProductArgs,
    json: bool,
) -> Result<()> {
    let barcode = Barcode::parse(&args.barcode).context("invalid barcode")?;
    let mut draft = PendingNewProduct::for_barcode(&barcode);
    draft.apply(DraftEdit {
        name: Some(args.name),
        product_type: Some(args.product_type),
        price: Some(args.price.to_string()),
        supplier: Some(args.supplier),
        image: args.image,
    });

    let initial_stock = args
        .in_stock
        .map(|quantity| Stock::new(1, quantity, args.warehouse.clone()));

    let product = service
        .create_product(&draft, initial_stock)
        .await
        .context("failed to create product")?;

    if json {
        print_json(&product)?;
    } else {
        println!("Product created");
        render_product(&product);
    }
    Ok(())
}

async fn handle_stock_command(
    context: &CliContext,
    command: StockCommands,
    json: bool,
) -> Result<()> {
    let service = context.inventory_service();
    match command {
        StockCommands::Adjust(args) => {
            let product = service
                .adjust_stock(&args.product_id, args.stock_id, args.delta)
                .await
                .with_context(|| {
                    format!(
                        "failed to adjust stock {} of product {}",
                        args.stock_id, args.product_id
                    )
                })?;
            if json {
                print_json(&product)?;
            } else {
                render_product_detail(&product);
            }
            Ok(())
        }
    }
}

async fn handle_stats(context: &CliContext, json: bool) -> Result<()> {
    let stats = context
        .inventory_service()
        .statistics()
        .await
        .context("failed to compute statistics")?;
    if json {
        print_json(&stats)?;
    } else {
        render_stats(&stats);
    }
    Ok(())
}

async fn handle_scan(context: &CliContext, args: ScanArgs, json: bool) -> Result<()> {
    let lookup = CatalogLookup::with_timeout(context.catalog.clone(), context.config.request_timeout());
    let session = ScanSession::spawn(ScanController::new(lookup, context.config.scan_cooldown()));
    session.activate().await?;

    let result = if args.codes.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut result = Ok(());
        while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            result = scan_one(&session, &line, args.draft.as_ref(), json).await;
            if result.is_err() {
                break;
            }
        }
        result
    } else {
        let mut result = Ok(());
        for (index, code) in args.codes.iter().enumerate() {
            if args.wait && index > 0 {
                tokio::time::sleep(context.config.scan_cooldown()).await;
            }
            result = scan_one(&session, code, args.draft.as_ref(), json).await;
            if result.is_err() {
                break;
            }
        }
        result
    };

    let final_state = session.teardown().await;
    debug!(state = final_state.name(), "scan session closed");
    result
}

/// Feeds one code through the session and settles the result so the next
/// code can be scanned.
async fn scan_one(
    session: &ScanSession,
    code: &str,
    draft: Option<&DraftEdit>,
    json: bool,
) -> Result<()> {
    let outcome = session.scan(code).await?;

    let created = match (&outcome, draft) {
        (ScanOutcome::NotFound(_), Some(edit)) => {
            session.edit_draft(edit.clone()).await?;
            session.submit().await?
        }
        _ => None,
    };

    if json {
        print_json(&outcome_json(code, &outcome, created.as_ref()))?;
    } else {
        render_outcome(code, &outcome, created.as_ref());
    }

    // a failed create leaves the form open
    if matches!(outcome, ScanOutcome::Found(_) | ScanOutcome::NotFound(_) | ScanOutcome::Failed(_))
        && !matches!(created, Some(Ok(_)))
    {
        session.dismiss().await?;
    }
    Ok(())
}

fn outcome_json(
    code: &str,
    outcome: &ScanOutcome,
    created: Option<&Result<Product, inventory_scan::ScanError>>,
) -> serde_json::Value {
    let mut value = match outcome {
        ScanOutcome::Ignored => json!({ "outcome": "ignored" }),
        ScanOutcome::Debounced => json!({ "outcome": "debounced" }),
        ScanOutcome::Rejected(error) => json!({ "outcome": "rejected", "error": error }),
        ScanOutcome::Found(product) => json!({ "outcome": "found", "product": product }),
        ScanOutcome::NotFound(draft) => json!({ "outcome": "not_found", "draft": draft }),
        ScanOutcome::Failed(error) => json!({ "outcome": "failed", "error": error }),
    };
    value["code"] = json!(code);
    match created {
        Some(Ok(product)) => value["created"] = json!(product),
        Some(Err(error)) => value["create_error"] = json!(error),
        None => {}
    }
    value
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_outcome(
    code: &str,
    outcome: &ScanOutcome,
    created: Option<&Result<Product, inventory_scan::ScanError>>,
) {
    match outcome {
        ScanOutcome::Ignored => println!("{code}: ignored (scanner inactive)"),
        ScanOutcome::Debounced => println!("{code}: dropped (cooldown)"),
        ScanOutcome::Rejected(error) => println!("{code}: rejected • {error}"),
        ScanOutcome::Found(product) => {
            println!("{code}: found");
            render_product(product);
        }
        ScanOutcome::NotFound(draft) => {
            println!("{code}: not in catalog");
            render_draft(draft);
        }
        ScanOutcome::Failed(error) => println!("{code}: lookup failed • {error}"),
    }
    match created {
        Some(Ok(product)) => {
            println!("  created");
            render_product(product);
        }
        Some(Err(error)) => println!("  not created • {error}"),
        None => {}
    }
}

fn render_product(product: &Product) {
    println!(
        "- Product {} • {} • {} • barcode {} • price {} • {} • {} • qty {}",
        product.id,
        product.name,
        product.product_type,
        product.barcode,
        product.price,
        product.supplier,
        product.city,
        product.total_quantity()
    );
}

fn render_product_detail(product: &Product) {
    render_product(product);
    if let Some(image) = product.image.as_deref().filter(|s| !s.is_empty()) {
        println!("  image {image}");
    }
    if let Some(created_at) = product.created_at {
        println!("  created {}", created_at.to_rfc3339());
    }
    if product.stocks.is_empty() {
        println!("  out of stock");
    }
    for stock in &product.stocks {
        println!("  • Stock {} • {} • qty {}", stock.id, stock.name, stock.quantity);
    }
}

fn render_draft(draft: &PendingNewProduct) {
    let missing = draft.missing_fields();
    if missing.is_empty() {
        println!("  draft for {} is complete", draft.barcode());
    } else {
        println!(
            "  draft for {} needs: {}",
            draft.barcode(),
            missing.join(", ")
        );
    }
}

fn render_stats(stats: &InventoryStats) {
    println!("Products: {}", stats.total_products);
    println!("Cities: {}", stats.total_cities);
    println!("Out of stock: {}", stats.out_of_stock);
    println!("Inventory value: {}", stats.total_inventory_value);
    println!("Recently added:");
    for product in &stats.recently_added {
        render_product(product);
    }
}

fn parse_product_id(raw: &str) -> Result<ProductId, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("id cannot be empty".to_string());
    }
    Ok(ProductId::from(raw))
}

fn parse_decimal(raw: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw).map_err(|_| format!("invalid decimal '{raw}'"))
}

fn parse_draft(raw: &str) -> Result<DraftEdit, String> {
    let mut edit = DraftEdit::default();

    for part in raw.split(',') {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("invalid segment '{part}', expected key=value"))?;
        let key = key.trim();
        let value = value.trim().to_string();

        match key {
            "name" => edit.name = Some(value),
            "type" => edit.product_type = Some(value),
            "price" => {
                parse_decimal(&value)?;
                edit.price = Some(value);
            }
            "supplier" => edit.supplier = Some(value),
            "image" => edit.image = Some(value),
            other => return Err(format!("unknown draft field '{other}'")),
        }
    }

    Ok(edit)
}
