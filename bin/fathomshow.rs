use anyhow::{bail, Result};
use clap::Parser;
use fathom::config::StoreConfig;
use fathom::store::IndexStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fathomshow")]
#[command(about = "Inspect indexed documents by path", long_about = None)]
struct Args {
    /// Store directory (index + catalogue)
    #[arg(long, env = "FATHOM_STORE_DIR")]
    store_dir: PathBuf,

    /// Store type tag used in result ids
    #[arg(long, default_value = "file")]
    store_type: String,

    /// Paths to look up
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let store = IndexStore::open_file_store(StoreConfig::new(&args.store_dir, &args.store_type))?;
    let snapshot = store.reader().reopen()?;

    let mut missing = 0;
    for path in &args.paths {
        let Some(id) = store.id_for_path(path)? else {
            println!("{}: not in catalogue", path.display());
            missing += 1;
            continue;
        };

        println!("{}", path.display());
        println!("  id: {}", id);

        let Some(doc) = snapshot.document(id) else {
            println!("  (no indexed document)");
            continue;
        };

        println!("  terms ({}):", doc.terms.len());
        for (term, data) in &doc.terms {
            if data.positions.is_empty() {
                println!("    {} (wdf {})", term, data.wdf);
            } else {
                println!("    {} (wdf {}, positions {:?})", term, data.wdf, data.positions);
            }
        }

        if !doc.slots.is_empty() {
            println!("  value slots:");
            for (slot, bytes) in &doc.slots {
                match fathom::index::unserialise_f64(bytes) {
                    Some(value) => println!("    {}: {}", slot, value),
                    None => println!("    {}: {} bytes", slot, bytes.len()),
                }
            }
        }
    }

    if missing == args.paths.len() {
        bail!("no given path is indexed");
    }
    Ok(())
}
