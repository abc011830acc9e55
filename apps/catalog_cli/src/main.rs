use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    debounce_commits, load_settings, records_backend, CatalogClient, CatalogEvent,
    CatalogSnapshot, DeleteConfirmModal, FetchOutcome, ProductForm, QueryState,
};
use shared::domain::{Category, CategoryFilter, Product, ProductId, SortOrder};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "catalog", about = "Browse and edit the product catalog")]
struct Cli {
    /// Records service base URL (overrides catalog.toml and the environment).
    #[arg(long, global = true)]
    backend_url: Option<String>,
    #[arg(long, global = true)]
    api_key: Option<String>,
    /// Use a seeded local store instead of the records service.
    #[arg(long, global = true)]
    in_memory: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        #[arg(long, default_value = "lowest")]
        sort: SortOrder,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Show {
        id: String,
    },
    Create(ProductFields),
    Update {
        id: String,
        #[command(flatten)]
        fields: ProductFields,
    },
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Type a query per line; each settled line re-runs the search.
    Search,
}

#[derive(Args, Debug, Default)]
struct ProductFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    category: Option<Category>,
    #[arg(long)]
    price: Option<String>,
    #[arg(long)]
    stock: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    image_url: Option<String>,
}

impl ProductFields {
    fn apply(self, form: &mut ProductForm) {
        if let Some(v) = self.name {
            form.name = v;
        }
        if let Some(v) = self.category {
            form.category = v;
        }
        if let Some(v) = self.price {
            form.price = v;
        }
        if let Some(v) = self.stock {
            form.stock = v;
        }
        if let Some(v) = self.description {
            form.description = v;
        }
        if let Some(v) = self.image_url {
            form.image_url = v;
        }
    }
}

fn print_page(snapshot: &CatalogSnapshot) {
    println!("{}", snapshot.query.category.heading());
    println!("Sorted by {}", snapshot.query.sort.label());
    if snapshot.products.is_empty() {
        println!("  (no products)");
    }
    for product in &snapshot.products {
        println!(
            "  {:<16} {:<28} {:<12} {:>10}  {}",
            product.product_id,
            product.name,
            product.category,
            product.price_label(),
            product.stock_label()
        );
    }
    println!("{}", snapshot.pager().label());
}

fn print_product(product: &Product) {
    println!("{} ({})", product.name, product.product_id);
    println!("  category:    {}", product.category);
    println!("  price:       {}", product.price_label());
    println!("  stock:       {} ({})", product.stock, product.stock_label());
    println!("  description: {}", product.short_description());
    println!("  image:       {}", product.image_url_or_placeholder());
}

/// Prints whatever the client published for the last mutation.
fn report_mutations(events: &mut broadcast::Receiver<CatalogEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            CatalogEvent::MutationSucceeded { message, .. } => println!("{message}"),
            CatalogEvent::MutationFailed { message, .. } => eprintln!("error: {message}"),
            CatalogEvent::FetchFailed { message } => {
                eprintln!("Something went wrong while refreshing: {message}")
            }
            CatalogEvent::PageLoaded(_) => {}
        }
    }
}

async fn require_product(client: &CatalogClient, id: &ProductId) -> Result<Product> {
    client
        .fetch_product(id)
        .await?
        .ok_or_else(|| anyhow!("no product with id {id}"))
}

async fn confirm_on_stdin(prompt: &str) -> Result<bool> {
    println!("{prompt} [y/N]");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

async fn interactive_search(client: Arc<CatalogClient>, quiet: std::time::Duration) -> Result<()> {
    client.fetch_products().await;
    print_page(&client.snapshot().await);
    println!("Type to search; an empty line clears the search. Ctrl-D to quit.");

    let (tx, rx) = mpsc::channel::<String>(64);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line.trim().to_string()).await.is_err() {
                break;
            }
        }
    });

    let committed = Arc::clone(&client);
    debounce_commits(rx, String::new(), quiet, move |search| {
        let client = Arc::clone(&committed);
        async move {
            match client.commit_search(&search).await {
                FetchOutcome::Applied => print_page(&client.snapshot().await),
                FetchOutcome::Failed => {
                    eprintln!("Something went wrong. Type the query again to retry.")
                }
                FetchOutcome::Superseded | FetchOutcome::Unchanged => {}
            }
        }
    })
    .await;

    reader.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = load_settings().with_overrides(cli.backend_url, cli.api_key);
    let backend = records_backend(&settings, cli.in_memory)?;
    tracing::debug!(
        collection = %settings.collection,
        in_memory = cli.in_memory,
        "catalog: starting"
    );
    let client = CatalogClient::new(backend, settings.collection.clone());
    let mut events = client.subscribe_events();

    match cli.command {
        Command::List {
            category,
            sort,
            search,
            page,
        } => {
            let mut query = QueryState::default();
            query.set_category(category);
            query.set_sort(sort);
            query.set_search(search);
            query.set_page(page);
            let outcome = match client.set_query(query).await {
                FetchOutcome::Unchanged => client.fetch_products().await,
                outcome => outcome,
            };
            if outcome == FetchOutcome::Failed {
                let message = client.snapshot().await.last_error.unwrap_or_default();
                return Err(anyhow!("Something went wrong: {message}"));
            }
            print_page(&client.snapshot().await);
        }
        Command::Show { id } => {
            let product = require_product(&client, &ProductId(id)).await?;
            print_product(&product);
        }
        Command::Create(fields) => {
            let mut form = ProductForm::default();
            fields.apply(&mut form);
            let result = client.create_product(&form).await;
            report_mutations(&mut events);
            let product_id = result?;
            println!("product_id={product_id}");
        }
        Command::Update { id, fields } => {
            let product_id = ProductId(id);
            let existing = require_product(&client, &product_id).await?;
            let mut form = ProductForm::from_product(&existing);
            fields.apply(&mut form);
            let result = client.update_product(&product_id, &form).await;
            report_mutations(&mut events);
            result?;
        }
        Command::Delete { id, yes } => {
            let product = require_product(&client, &ProductId(id)).await?;
            let mut modal = DeleteConfirmModal::default();
            modal.open(product);
            if let Some(details) = modal.details() {
                println!("Name:     {}", details.name);
                println!("Price:    {}", details.price);
                println!("Category: {}", details.category);
                println!("Stock:    {}", details.stock);
            }
            if !yes && !confirm_on_stdin("Delete this product?").await? {
                modal.cancel();
                println!("Cancelled");
                return Ok(());
            }

            let product_id = modal.confirm()?;
            let result = client.delete_product(&product_id).await;
            modal.finish(
                result
                    .as_ref()
                    .map(|_| ())
                    .map_err(|err| err.to_string()),
            );
            report_mutations(&mut events);
            result?;
        }
        Command::Search => {
            interactive_search(Arc::clone(&client), settings.search_debounce()).await?;
        }
    }

    Ok(())
}
