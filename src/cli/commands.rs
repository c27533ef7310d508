use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the database and create the first administrator
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the first administrator
        #[arg(long)]
        admin_email: Option<String>,

        /// Password of the first administrator
        #[arg(long, env = "DEVMARKS_ADMIN_PASSWORD", hide_env_values = true)]
        admin_password: Option<String>,

        /// Skip interactive prompts (requires --admin-email and --admin-password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Give a user the admin role
    Promote {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the user to promote
        #[arg(long)]
        email: String,
    },

    /// Return an administrator to the user role
    Demote {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email of the administrator to demote
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Create an account on a server
    Register {
        /// Server URL
        #[arg(long)]
        server: Option<String>,

        /// Account email
        #[arg(long)]
        email: Option<String>,

        /// Account password
        #[arg(long, env = "DEVMARKS_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Sign in and store the session token
    Login {
        /// Server URL
        #[arg(long)]
        server: Option<String>,

        /// Account email
        #[arg(long)]
        email: Option<String>,

        /// Account password
        #[arg(long, env = "DEVMARKS_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Revoke the session token and clear stored credentials
    Logout,
}

#[derive(Subcommand)]
pub enum PageCommands {
    /// List the pages visible to you, grouped by category
    List {
        /// Category id to filter by ("all" for every category)
        #[arg(long)]
        category: Option<String>,

        /// Server URL (defaults to the one you are logged in to)
        #[arg(long)]
        server: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a page
    Add {
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Category id
        #[arg(long)]
        category: Option<String>,

        /// Make the page common (administrators only)
        #[arg(long)]
        common: bool,

        /// Skip interactive prompts (requires --title and --url)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Edit a page
    Edit {
        /// Page id to edit
        #[arg(long)]
        page_id: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Category id ("" to clear)
        #[arg(long)]
        category: Option<String>,

        /// Set whether the page is common (administrators only)
        #[arg(long)]
        common: Option<bool>,

        /// Skip interactive prompts (requires --page-id)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Delete a page
    Delete {
        /// Page id to delete
        #[arg(long)]
        page_id: Option<String>,

        /// Skip interactive prompts (requires --page-id)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Server URL (defaults to the one you are logged in to)
        #[arg(long)]
        server: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a category (administrators only)
    Add {
        #[arg(long)]
        name: Option<String>,

        /// Skip interactive prompts (requires --name)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Rename a category (administrators only)
    Rename {
        /// Category id to rename
        #[arg(long)]
        category_id: Option<String>,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// Skip interactive prompts (requires --category-id and --name)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Delete an empty category (administrators only)
    Delete {
        /// Category id to delete
        #[arg(long)]
        category_id: Option<String>,

        /// Skip interactive prompts (requires --category-id)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// List registered users (administrators only)
    List {
        /// Role filter: all, admin or user
        #[arg(long, default_value = "all")]
        role: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
