use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_fanout::config::Config;
use order_fanout::domain::basket::BasketId;
use order_fanout::domain::order::Address;
use order_fanout::messaging::{QueuePublisher, RedpandaQueue};
use order_fanout::metrics::{self, Metrics};
use order_fanout::notifiers::{
    HttpOrderStoreNotifier, HttpStoreClient, HttpSummaryStore, SecondaryStoreNotifier,
};
use order_fanout::repository::ScyllaOrderRepository;
use order_fanout::service::{CatalogUriComposer, OrderDispatcher, OrderService, OutboxRelay};

#[derive(Debug, Parser)]
#[command(name = "order-fanout", about = "Basket checkout with order store and queue fan-out", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Turn a basket into an order and dispatch it
    CreateOrder(CreateOrderArgs),
    /// Redeliver pending outbox entries until Ctrl-C
    Relay,
    /// Create the keyspace and tables
    InitSchema,
}

#[derive(Debug, Args)]
struct CreateOrderArgs {
    #[arg(long)]
    basket_id: BasketId,

    #[arg(long)]
    street: String,

    #[arg(long)]
    city: String,

    #[arg(long)]
    state: String,

    #[arg(long)]
    country: String,

    #[arg(long)]
    zip: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _env = dotenvy::dotenv();

    // RUST_LOG overrides, e.g. RUST_LOG=order_fanout=trace
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_fanout=debug"))
        )
        .init();

    let cli = Cli::parse();
    cli.config.validate()?;

    match cli.command {
        Commands::InitSchema => init_schema(&cli.config).await,
        Commands::CreateOrder(args) => create_order(&cli.config, args).await,
        Commands::Relay => relay(&cli.config).await,
    }
}

async fn init_schema(config: &Config) -> anyhow::Result<()> {
    ScyllaOrderRepository::connect(&config.scylla_nodes, &config.scylla_keyspace, true).await?;
    tracing::info!(keyspace = %config.scylla_keyspace, "🎉 Schema ready");
    Ok(())
}

async fn create_order(config: &Config, args: CreateOrderArgs) -> anyhow::Result<()> {
    let metrics = Arc::new(Metrics::new()?);
    let repository = Arc::new(ScyllaOrderRepository::connect(&config.scylla_nodes, &config.scylla_keyspace, false).await?);
    let dispatcher = build_dispatcher(config, metrics.clone())?;

    let service = OrderService::new(
        repository.clone(),
        repository,
        Arc::new(CatalogUriComposer::new(&config.catalog_base_url)),
        dispatcher,
        metrics,
        config.dispatch_options(),
    );

    let address = Address::new(args.street, args.city, args.state, args.country, args.zip);
    let placement = service.create_order(args.basket_id, address).await?;

    tracing::info!(
        order_id = %placement.order.id(),
        total = %placement.order.total(),
        delivered = ?placement.delivered,
        warnings = placement.warnings.len(),
        "Order placement"
    );
    for warning in &placement.warnings {
        tracing::warn!(channel = %warning.channel(), "{}", warning);
    }

    println!("order_id: {}", placement.order.id());
    println!("total: {}", placement.order.total());

    Ok(())
}

async fn relay(config: &Config) -> anyhow::Result<()> {
    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // actix-web needs its own system; keep it off the main runtime.
    let served = metrics.clone();
    let port = config.metrics_port;
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new().block_on(metrics::start_metrics_server(served, port));
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    let repository = Arc::new(ScyllaOrderRepository::connect(&config.scylla_nodes, &config.scylla_keyspace, false).await?);
    let dispatcher = build_dispatcher(config, metrics.clone())?;

    let relay = OutboxRelay::new(repository.clone(), repository, dispatcher, metrics, config.relay());

    relay
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    Ok(())
}

fn build_dispatcher(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Arc<OrderDispatcher>> {
    let order_store = HttpOrderStoreNotifier::new(
        HttpStoreClient::new("order-store", config.http_timeout(), config.breaker())?,
        &config.order_store_url,
    );

    let summaries = HttpSummaryStore::new(
        HttpStoreClient::new("secondary-store", config.http_timeout(), config.breaker())?,
        &config.secondary_store_url,
    );

    let queue = QueuePublisher::new(
        Arc::new(RedpandaQueue::new(&config.redpanda())?),
        &config.queue_name,
        config.queue_retry(),
        config.queue_timeout(),
        metrics.clone(),
    );

    Ok(Arc::new(OrderDispatcher::new(
        Arc::new(order_store),
        SecondaryStoreNotifier::new(Arc::new(summaries), metrics.clone()),
        queue,
        config.http_timeout(),
        metrics,
    )))
}
