use std::collections::BTreeSet;

use avlstore::config::DriverConfig;
use avlstore::script::{self, Command};
use avlstore::storage::{AvlTree, DatabaseFile, Entry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "avlstore=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match DriverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_file={}, script={}, schema={:?}",
        config.data_file.display(),
        config.script.display(),
        config.schema
    );

    if let Err(e) = run(&config) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &DriverConfig) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&config.script)
        .map_err(|e| format!("Failed to read script {}: {e}", config.script.display()))?;
    let commands = script::parse_script(&text, &config.schema)?;

    let mut tree = AvlTree::create(&config.data_file, config.schema.clone())?;
    let mut inserted = BTreeSet::new();

    for command in &commands {
        match command {
            Command::Insert { key, strings, ints } => {
                let strings: Vec<&str> = strings.iter().map(String::as_str).collect();
                tree.insert(*key, &strings, ints)?;
                inserted.insert(*key);
            }
            Command::Remove(key) => tree.remove(*key)?,
        }
    }
    tracing::info!("Replayed {} commands", commands.len());

    println!("Traversal:");
    print_traversal(&mut tree)?;

    println!("Lookups:");
    for &key in &inserted {
        if let Some(entry) = tree.get(key)? {
            println!("{}", format_entry(&entry));
        }
    }

    tree.close()?;

    let mut tree = AvlTree::open(&config.data_file)?;
    println!("Traversal after reopen:");
    print_traversal(&mut tree)?;
    tree.close()?;

    Ok(())
}

fn print_traversal(tree: &mut AvlTree<DatabaseFile>) -> Result<(), Box<dyn std::error::Error>> {
    for entry in tree.traverse() {
        println!("{}", format_entry(&entry?));
    }
    Ok(())
}

fn format_entry(entry: &Entry) -> String {
    let mut line = entry.key.to_string();
    for field in &entry.strings {
        line.push(' ');
        line.push_str(field);
    }
    for field in &entry.ints {
        line.push(' ');
        line.push_str(&field.to_string());
    }
    line
}
