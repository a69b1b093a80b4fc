use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "captrack", about = "Capability roadmap tracker", version)]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.captrack/captrack.db]
    #[arg(long, env = "CAPTRACK_DB", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage capabilities
    #[command(subcommand)]
    Cap(CapCommand),

    /// Manage milestones
    #[command(subcommand)]
    Milestone(MilestoneCommand),

    /// Manage roadmap plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Print the active plans as a text timeline
    Timeline {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Launch the interactive timeline
    Tui {
        #[command(flatten)]
        window: WindowArgs,
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        poll_interval: u64,
    },

    /// Report plan invariant violations and orphaned plans
    Check,

    /// Write all data as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Replace all data with a JSON export
    Import {
        /// File produced by `export`
        file: String,
    },
}

#[derive(Subcommand)]
pub enum CapCommand {
    /// Add a capability
    Add {
        /// Capability name
        name: String,
        #[command(flatten)]
        fields: CapFields,
    },

    /// Edit a capability
    Edit {
        /// Capability id or name
        capability: String,
        /// Rename the capability
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: CapFields,
        /// Remove the milestone reference
        #[arg(long, conflicts_with = "milestone")]
        clear_milestone: bool,
    },

    /// Remove a capability and all of its plans
    Rm {
        /// Capability id or name
        capability: String,
    },

    /// List capabilities
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a capability with its active plan
    Show {
        /// Capability id or name
        capability: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct CapFields {
    /// Lead
    #[arg(long)]
    pub lead: Option<String>,
    /// Subject matter expert
    #[arg(long)]
    pub sme: Option<String>,
    /// Business analyst
    #[arg(long)]
    pub ba: Option<String>,
    /// Status (not-started, in-progress, completed, on-hold)
    #[arg(short, long)]
    pub status: Option<String>,
    /// RAG status (red, amber, green)
    #[arg(short, long)]
    pub rag: Option<String>,
    /// Free-text notes
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Milestone name
    #[arg(short, long)]
    pub milestone: Option<String>,
}

#[derive(Subcommand)]
pub enum MilestoneCommand {
    /// Add a milestone
    Add {
        /// Milestone name
        name: String,
        /// Milestone date (YYYY-MM-DD or RFC 3339)
        date: String,
    },

    /// Edit a milestone
    Edit {
        /// Milestone id or name
        milestone: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New date
        #[arg(long)]
        date: Option<String>,
    },

    /// Remove a milestone (capabilities keep referring to its name)
    Rm {
        /// Milestone id or name
        milestone: String,
    },

    /// List milestones
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PlanCommand {
    /// Record a new plan version for a capability
    ///
    /// Phases are given as START..END; either side may be left empty to keep
    /// the date from the current plan. Phases not mentioned keep their dates
    /// from the current plan, or are laid out back to back from --start when
    /// the capability has no plan yet.
    Set {
        /// Capability id or name
        capability: String,
        /// First day of the default layout (default: today)
        #[arg(long)]
        start: Option<String>,
        /// Requirements phase
        #[arg(long)]
        requirements: Option<String>,
        /// Design phase
        #[arg(long)]
        design: Option<String>,
        /// Development phase
        #[arg(long)]
        development: Option<String>,
        /// CST phase
        #[arg(long)]
        cst: Option<String>,
        /// UAT phase
        #[arg(long)]
        uat: Option<String>,
    },

    /// Delete one plan version
    Rm {
        /// Capability id or name
        capability: String,
        /// Version number
        version: u32,
    },

    /// List every version of a capability's plan
    History {
        /// Capability id or name
        capability: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one plan version (default: the active one)
    Show {
        /// Capability id or name
        capability: String,
        /// Version number
        #[arg(long)]
        version: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct WindowArgs {
    /// First visible day (default: January 1 of this year)
    #[arg(long, env = "CAPTRACK_FROM")]
    pub from: Option<String>,
    /// Last visible day (default: December 31 of next year)
    #[arg(long, env = "CAPTRACK_TO")]
    pub to: Option<String>,
    /// Columns per month
    #[arg(long, env = "CAPTRACK_MONTH_WIDTH", default_value = "12")]
    pub month_width: u16,
}
