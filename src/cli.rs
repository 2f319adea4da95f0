use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Import, sync and share proxy descriptors", long_about = None)]
pub struct Args {
    #[arg(short, long, global = true, help = "Settings file (TOML)")]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Emit debug log")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import pasted text: descriptors, Base64 lists, JSON configs or subscription URLs
    Import {
        #[arg(help = "Input file, stdin when omitted")]
        file: Option<String>,
    },

    /// Import a descriptor list into a subscription
    ImportBatch {
        #[arg(short, long, help = "Subscription id owning the profiles")]
        sub: String,

        #[arg(short, long, help = "Keep the subscription's existing profiles")]
        append: bool,

        #[arg(help = "Input file, stdin when omitted")]
        file: Option<String>,
    },

    /// Add a subscription
    SubAdd {
        #[arg(short, long, help = "Display name")]
        remarks: String,

        #[arg(short, long, help = "Subscription URL")]
        url: String,

        #[arg(short, long, help = "Regex the remarks of imported profiles must match")]
        filter: Option<String>,
    },

    /// Update one subscription, or all when no id is given
    Sync {
        #[arg(help = "Subscription id")]
        id: Option<String>,
    },

    /// Print share links
    Share {
        #[arg(help = "Profile id", required_unless_present = "all")]
        id: Option<String>,

        #[arg(short, long, help = "Share every stored profile")]
        all: bool,
    },

    /// List profiles and subscriptions
    List,

    /// Select a profile
    Select {
        #[arg(help = "Profile id")]
        id: String,
    },
}
