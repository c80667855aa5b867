use clap::{Args, Parser, Subcommand};
use hanuki_core::publish::DEFAULT_API_URL;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectOpts {
    #[arg(
        long,
        help = "Specify the project directory (default: $HANUKI_PROJECT_ROOT or current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct GatewayOpts {
    #[arg(
        long,
        help = "Base URL of the gateway serving the project files.",
        value_name = "URL",
        default_value = "http://localhost:8080",
        help_heading = "Gateway"
    )]
    pub origin: String,

    #[arg(
        long,
        help = "Mount point of the project files on the gateway.",
        value_name = "PATH",
        default_value = "/",
        help_heading = "Gateway"
    )]
    pub mount: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Pretty-print JSON output.",
        help_heading = "Output Formatting"
    )]
    pub pretty: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Browse static project sites and publish them to IPFS.",
    long_about = "hanuki installs a browser viewer into a project directory, renders project files \nfrom any HTTP gateway and publishes the project to an IPFS node, recording the \nresulting CID in hanuki.toml.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  hanuki init\n  hanuki publish --api http://localhost:5001\n  hanuki tree --local\n  hanuki open docs/guide.md --origin https://ipfs.io/ipfs/<cid>",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(about = "Install the viewer into the project directory.")]
    Init(InitArgs),

    #[command(
        visible_alias = "u",
        about = "Replace the installed viewer files, keeping hanuki.toml."
    )]
    Update(UpdateArgs),

    #[command(
        visible_alias = "p",
        about = "Publish the project to an IPFS node and record the CID."
    )]
    Publish(PublishArgs),

    #[command(
        visible_alias = "t",
        about = "Print the folder tree as the viewer shows it."
    )]
    Tree(TreeArgs),

    #[command(
        visible_alias = "o",
        about = "Render a project file the way the viewer would."
    )]
    Open(OpenArgs),

    #[command(
        visible_alias = "c",
        about = "Show the effective configuration and the paths each filter keeps."
    )]
    Check(CheckArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InitArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
}

#[derive(Args, Debug, Clone)]
pub struct PublishArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        help = "Base URL of the IPFS HTTP RPC API.",
        value_name = "URL",
        default_value = DEFAULT_API_URL
    )]
    pub api: String,

    #[arg(
        long,
        help = "Gateway used to print a browsable link to the published site.",
        value_name = "URL",
        default_value = "https://ipfs.io"
    )]
    pub gateway: String,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub gateway: GatewayOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        long,
        help = "Walk the local project directory instead of a gateway."
    )]
    pub local: bool,

    #[arg(long, help = "Limit the tree to this many levels.", value_name = "N")]
    pub depth: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    #[clap(flatten)]
    pub gateway: GatewayOpts,

    #[arg(
        value_name = "FILE",
        help = "File to open, relative to the project root (default: the page URL's file or /ReadMe.md)."
    )]
    pub file: Option<String>,

    #[arg(
        long,
        value_name = "URL",
        help = "Viewer page URL to restore, including its ?file= query."
    )]
    pub page_url: Option<String>,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "html"], default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}
