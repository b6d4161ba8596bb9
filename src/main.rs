use clap::Parser;
use std::path::PathBuf;
use std::process::exit;
use tgz_backup::backup::archive::source_item::SourceItem;
use tgz_backup::backup::backup_config::BackupConfig;
use tracing::error;

/// Archive files and directories into one timestamped tar.gz
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Location of config file
    #[arg(short, long, conflicts_with_all = ["destination", "sources"])]
    config: Option<PathBuf>,

    /// Backup root, used when no config file is given
    #[arg(short, long, required_unless_present = "config")]
    destination: Option<PathBuf>,

    /// Files and directories to back up
    sources: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match (args.config, args.destination) {
        (Some(path), _) => match BackupConfig::from_yaml_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e}");
                exit(1);
            }
        },
        (None, Some(destination)) => BackupConfig::builder()
            .destination(destination)
            .sources(args.sources.into_iter().map(SourceItem::from).collect::<Vec<_>>())
            .build(),
        (None, None) => unreachable!("clap requires --destination without --config"),
    };

    if let Err(e) = config.run() {
        error!("{e}");
        exit(1);
    }
}
