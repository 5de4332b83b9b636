//! cloudbridge CLI - Command line access to Google Drive and Microsoft Graph.
//!
//! Credentials are read from flags or the matching environment variables,
//! so an existing `.env`-style setup can be sourced before running.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cloudbridge_common::FileRecord;
use cloudbridge_storage::{DriveClient, DriveTarget, GDriveConfig, GraphClient, OneDriveConfig};

#[derive(Parser)]
#[command(name = "cloudbridge")]
#[command(about = "cloudbridge - Upload, search, list and download cloud files")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    backend: Backend,
}

#[derive(Subcommand)]
enum Backend {
    /// Google Drive via a service account.
    Gdrive {
        /// Path to the service-account JSON key.
        #[arg(long, env = "PATHFILECREDENTIALS")]
        credentials: PathBuf,

        #[command(subcommand)]
        command: GdriveCommand,
    },

    /// OneDrive / SharePoint via Microsoft Graph.
    Onedrive {
        #[command(flatten)]
        auth: GraphArgs,

        #[command(subcommand)]
        command: OnedriveCommand,
    },
}

#[derive(Args)]
struct GraphArgs {
    /// Application (client) id.
    #[arg(long, env = "CLIENTEID")]
    client_id: String,

    /// Directory (tenant) id.
    #[arg(long, env = "TENANTID")]
    tenant_id: String,

    /// Client secret.
    #[arg(long, env = "CLIENTESECRET", hide_env_values = true)]
    client_secret: String,

    /// Token cache path (accepted, not used).
    #[arg(long, env = "TOKENCHACHE")]
    token_cache: Option<PathBuf>,

    /// Operate on this user's drive instead of /me.
    #[arg(long, conflicts_with_all = ["site", "drive"])]
    user: Option<String>,

    /// Operate on this site's default drive.
    #[arg(long, conflicts_with = "drive")]
    site: Option<String>,

    /// Operate on this drive id.
    #[arg(long)]
    drive: Option<String>,
}

impl GraphArgs {
    fn into_config(self) -> OneDriveConfig {
        let drive = match (self.user, self.site, self.drive) {
            (Some(user), _, _) => DriveTarget::User(user),
            (_, Some(site), _) => DriveTarget::Site(site),
            (_, _, Some(drive)) => DriveTarget::Drive(drive),
            _ => DriveTarget::Me,
        };

        let mut config = OneDriveConfig::new(self.client_id, self.tenant_id, self.client_secret);
        config.token_cache_path = self.token_cache;
        config.drive = drive;
        config
    }
}

#[derive(Subcommand)]
enum GdriveCommand {
    /// Upload a file and print its link.
    Upload {
        /// Local file to upload.
        file: PathBuf,

        /// Destination folder id.
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Find files by exact name.
    Search {
        /// File name to match.
        name: String,

        /// Restrict to this folder id.
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Download a file by id.
    Download {
        /// Remote file id.
        file_id: String,

        /// Local destination path.
        dest: PathBuf,
    },
}

#[derive(Subcommand)]
enum OnedriveCommand {
    /// Upload a file and print its link.
    Upload {
        /// Local file to upload.
        file: PathBuf,

        /// Destination folder item id.
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Download an item by id.
    Download {
        /// Remote item id.
        item_id: String,

        /// Local destination path.
        dest: PathBuf,
    },

    /// List the children of a folder (default: root).
    List {
        /// Folder item id.
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Print the id of the first folder under a SharePoint path.
    ResolveFolder {
        /// Site id.
        #[arg(short, long)]
        site: String,

        /// Folder path inside the site's default drive.
        path: String,
    },

    /// Print the id of a SharePoint site.
    ResolveSite {
        /// Graph site lookup URL.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.backend {
        Backend::Gdrive {
            credentials,
            command,
        } => run_gdrive(GDriveConfig::new(credentials), command).await,

        Backend::Onedrive { auth, command } => run_onedrive(auth.into_config(), command).await,
    }
}

async fn run_gdrive(config: GDriveConfig, command: GdriveCommand) -> Result<()> {
    let client = DriveClient::connect(config)
        .await
        .context("Failed to set up Google Drive client")?;

    match command {
        GdriveCommand::Upload { file, folder } => {
            let record = client
                .upload(&file, folder.as_deref())
                .await
                .context("Failed to upload file")?;
            println!("{}", record.link());
        }

        GdriveCommand::Search { name, folder } => {
            let records = client
                .search(&name, folder.as_deref())
                .await
                .context("Failed to search files")?;
            print_records(&records);
        }

        GdriveCommand::Download { file_id, dest } => {
            client
                .download(&file_id, &dest)
                .await
                .context("Failed to download file")?;
            info!("File saved to {}", dest.display());
        }
    }

    Ok(())
}

async fn run_onedrive(config: OneDriveConfig, command: OnedriveCommand) -> Result<()> {
    let client = GraphClient::connect(config).context("Failed to set up Graph client")?;

    match command {
        OnedriveCommand::Upload { file, folder } => {
            let record = client
                .upload(&file, folder.as_deref())
                .await
                .context("Failed to upload file")?;
            println!("{}", record.link());
        }

        OnedriveCommand::Download { item_id, dest } => {
            client
                .download(&item_id, &dest)
                .await
                .context("Failed to download file")?;
            info!("File saved to {}", dest.display());
        }

        OnedriveCommand::List { folder } => {
            let records = client
                .list(folder.as_deref())
                .await
                .context("Failed to list folder")?;
            print_records(&records);
        }

        OnedriveCommand::ResolveFolder { site, path } => {
            match client
                .resolve_folder_by_path(&site, &path)
                .await
                .context("Failed to resolve folder")?
            {
                Some(id) => println!("{}", id),
                None => println!("No folder found under {}", path),
            }
        }

        OnedriveCommand::ResolveSite { url } => {
            let id = client
                .resolve_site_id(&url)
                .await
                .context("Failed to resolve site")?;
            println!("{}", id);
        }
    }

    Ok(())
}

/// Print one record per line.
fn print_records(records: &[FileRecord]) {
    if records.is_empty() {
        println!("No files found.");
        return;
    }

    for record in records {
        let kind = if record.is_folder { "folder" } else { "file" };
        println!("{}\t{}\t{}\t{}", record.id, kind, record.name, record.link());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_graph_args_select_drive() {
        let cli = Cli::try_parse_from([
            "cloudbridge",
            "onedrive",
            "--client-id",
            "cid",
            "--tenant-id",
            "tid",
            "--client-secret",
            "secret",
            "--site",
            "site-1",
            "list",
        ])
        .unwrap();

        match cli.backend {
            Backend::Onedrive { auth, command } => {
                let config = auth.into_config();
                assert_eq!(config.drive, DriveTarget::Site("site-1".to_string()));
                assert_eq!(config.tenant_id, "tid");
                assert!(matches!(command, OnedriveCommand::List { folder: None }));
            }
            Backend::Gdrive { .. } => panic!("expected onedrive"),
        }
    }

    #[test]
    fn test_gdrive_search_args() {
        let cli = Cli::try_parse_from([
            "cloudbridge",
            "gdrive",
            "--credentials",
            "/keys/sa.json",
            "search",
            "report.pdf",
            "--folder",
            "F1",
        ])
        .unwrap();

        match cli.backend {
            Backend::Gdrive {
                credentials,
                command: GdriveCommand::Search { name, folder },
            } => {
                assert_eq!(credentials, PathBuf::from("/keys/sa.json"));
                assert_eq!(name, "report.pdf");
                assert_eq!(folder.as_deref(), Some("F1"));
            }
            _ => panic!("expected gdrive search"),
        }
    }
}
