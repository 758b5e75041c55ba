pub mod catalog;
pub mod cli;
pub mod data;
pub mod ingest;
pub mod normalize;
pub mod sample;
pub mod schema;
pub mod store;
pub mod table;
pub mod view;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("finlens", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Ingest(args) => ingest::execute(&args),
        Commands::Datasets(args) => catalog::execute_list(&args),
        Commands::Update(args) => catalog::execute_update(&args),
        Commands::Delete(args) => catalog::execute_delete(&args),
        Commands::Preview(args) => catalog::execute_preview(&args),
        Commands::Probe(args) => handle_probe(&args),
        Commands::View(args) => view::execute(&args),
        Commands::Seed(args) => sample::execute(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let store = store::JsonStore::open(&args.store)
        .with_context(|| format!("Opening dataset store {:?}", args.store))?;
    let rows = catalog::load_accumulated_rows(&store, args.id)?;
    let inferred = schema::infer_filters(&rows);
    if inferred.is_empty() {
        println!("No filterable columns; the accumulated row set is empty.");
        return Ok(());
    }

    if !inferred.priority.is_empty() {
        println!("Priority columns:");
        for (metric, column) in &inferred.priority {
            println!("  {} -> {}", metric.label(), column);
        }
        println!();
    }

    let headers = vec![
        "column".to_string(),
        "kind".to_string(),
        "domain".to_string(),
        "priority".to_string(),
    ];
    let table_rows: Vec<Vec<String>> = inferred
        .filters
        .iter()
        .map(|filter| {
            vec![
                filter.name.clone(),
                filter.kind.label().to_string(),
                describe_domain(filter),
                if filter.priority { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    table::print_table(&headers, &table_rows);
    info!(
        "Inferred {} filter(s) over {} row(s)",
        inferred.filters.len(),
        rows.len()
    );
    Ok(())
}

fn describe_domain(filter: &schema::ColumnFilter) -> String {
    match &filter.kind {
        schema::FilterKind::Text => String::new(),
        schema::FilterKind::Range { .. } => {
            let (low, high) = filter.display_bounds().expect("range has bounds");
            if filter.percent_display {
                format!("{low:.2}% .. {high:.2}%")
            } else {
                format!(
                    "{} .. {}",
                    data::format_number(low),
                    data::format_number(high)
                )
            }
        }
        schema::FilterKind::Select { options } => options.join(" | "),
    }
}
