//! MDM - browse, render, summarise and sync markdown projects

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mdm_core::browse::{self, FileTree};
use mdm_core::project::ProjectSyncConfig;
use mdm_core::session::{self, SessionContext};
use mdm_core::{html, pdf, toc, AppConfig, Document};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Markdown project browser with printable export, AI summaries and cloud sync
#[derive(Parser, Debug)]
#[command(name = "mdm")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use this config file instead of the platform default
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Make a folder the current document folder and record it as a recent project
    Open {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// List markdown files below a folder
    Tree {
        /// Defaults to the current document folder
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Print the heading outline of a document
    Outline {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Follow a link from a document to another markdown file
    Follow {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "HREF")]
        href: String,
    },
    /// Replace a document's content with standard input
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render a document to HTML
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Emit a standalone page that prints itself when opened
        #[arg(long)]
        printable: bool,
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Export a document for print
    Pdf {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Print the element list as JSON instead of writing a PDF
        #[arg(long)]
        elements: bool,
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// List the summary templates
    #[cfg(feature = "ai")]
    Templates,
    /// Check whether a document fits the AI token budget
    #[cfg(feature = "ai")]
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Generate an AI summary of a document
    #[cfg(feature = "ai")]
    Summarize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Template key; defaults to the session's template
        #[arg(short, long)]
        template: Option<String>,
        /// Use the prompt in this file instead of a template
        #[arg(long, value_name = "PROMPT", conflicts_with = "template")]
        prompt_file: Option<PathBuf>,
        /// Also save under the folder's ai-summary directory
        #[arg(long)]
        save: bool,
    },
    /// Upload the project's documents to blob storage
    #[cfg(feature = "sync")]
    Push {
        /// Project root; defaults to the session's project
        #[arg(long, value_name = "DIR")]
        project: Option<PathBuf>,
    },
    /// Download the project's documents from blob storage
    #[cfg(feature = "sync")]
    Pull {
        #[arg(long, value_name = "DIR")]
        project: Option<PathBuf>,
    },
    /// Manage a project's sync configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// List recently opened projects
    Recent,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Save the sync configuration below the project root
    Save {
        #[arg(long, value_name = "DIR")]
        root: PathBuf,
        #[arg(long, value_name = "DIR")]
        docs: PathBuf,
        /// Falls back to the configured storage connection string
        #[arg(long)]
        connection_string: Option<String>,
    },
    /// Show a project's sync configuration
    Show {
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env_with(|key| std::env::var(key).ok());
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

fn load_document(config: &AppConfig, file: &Path) -> Result<Document> {
    Document::load_limited(file, config.browse.max_file_bytes())
        .with_context(|| format!("Failed to load document: {}", file.display()))
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}

fn project_root(session: &SessionContext, arg: Option<PathBuf>) -> Result<PathBuf> {
    arg.or_else(|| session.project_root_folder.clone())
        .context("No project root given and none open; run `mdm open <DIR>` or pass --project")
}

fn open(config: &AppConfig, session: &mut SessionContext, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to canonicalize path: {}", dir.display()))?;

    session.project_root_folder = Some(dir.clone());
    session.last_folder_path = Some(dir.clone());
    session.selected_file = None;

    // A saved sync config points at the real document folder
    if let Some(sync) = ProjectSyncConfig::load(&dir)? {
        if !sync.project_doc_folder.is_empty() {
            session.last_folder_path = Some(PathBuf::from(&sync.project_doc_folder));
        }
    }

    session::record_recent_project(&config.sessions_dir(), &dir)?;
    let files = browse::find_markdown_files(&dir, &config.browse.extensions);
    println!("Opened {} ({} markdown files)", dir.display(), files.len());
    Ok(())
}

fn tree(config: &AppConfig, session: &mut SessionContext, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir
        .or_else(|| session.last_folder_path.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let files = browse::find_markdown_files(&dir, &config.browse.extensions);
    if files.is_empty() {
        println!("No markdown files found in {}", dir.display());
        return Ok(());
    }

    let tree = FileTree::build(&files);
    print!("{}", tree.render(session.selected_file.as_deref()));
    session.last_folder_path = Some(dir);
    Ok(())
}

fn render(
    config: &AppConfig,
    session: &mut SessionContext,
    file: &Path,
    printable: bool,
    output: Option<&Path>,
) -> Result<()> {
    let doc = load_document(config, file)?;
    let fragment = html::render_markdown(&doc.content);
    let page = if printable {
        html::build_printable_html(&fragment, &doc.file_name(), &session.view)
    } else {
        fragment
    };
    session.selected_file = Some(doc.path.clone());
    write_output(output, &page)
}

fn export_pdf(config: &AppConfig, file: &Path, elements_only: bool, output: Option<&Path>) -> Result<()> {
    let doc = load_document(config, file)?;
    let elements = pdf::to_elements(&doc.content);

    if elements_only {
        let json = serde_json::to_string_pretty(&elements)?;
        return write_output(output, &format!("{}\n", json));
    }

    write_pdf(config, &doc, &elements, output)
}

#[cfg(feature = "pdf")]
fn write_pdf(config: &AppConfig, doc: &Document, elements: &[pdf::Element], output: Option<&Path>) -> Result<()> {
    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| doc.path.with_extension("pdf"));
    let fonts = pdf::FontSource {
        dir: config.pdf.font_dir.clone(),
        family: config.pdf.font_family.clone(),
        mono_family: config.pdf.mono_font_family.clone(),
    };
    pdf::PdfWriter::new(fonts, doc.base_name()).render_to_file(elements, &out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn write_pdf(_: &AppConfig, _: &Document, _: &[pdf::Element], _: Option<&Path>) -> Result<()> {
    bail!("PDF output needs the `pdf` feature; use --elements for the element list")
}

#[cfg(feature = "ai")]
fn summarize(
    config: &AppConfig,
    session: &mut SessionContext,
    file: &Path,
    template: Option<String>,
    prompt_file: Option<PathBuf>,
    save: bool,
) -> Result<()> {
    use mdm_core::ai::SummaryService;

    let doc = load_document(config, file)?;
    let service = SummaryService::from_config(&config.ai);

    let check = service.validate_content_size(&doc.content);
    if !check.valid {
        bail!("{}", check.message);
    }
    log::info!("{}", check.message);

    let mut report = |message: &str| eprintln!("{}", message);
    let outcome = match &prompt_file {
        Some(path) => {
            let prompt = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
            service.generate_with_prompt(&doc.content, &prompt, Some(&mut report))
        }
        None => {
            let key = template.unwrap_or_else(|| session.summary_template.clone());
            let outcome = service.generate_summary(&doc.content, &key, Some(&mut report));
            if outcome.success {
                session.summary_template = key;
            }
            outcome
        }
    };

    if !outcome.success {
        bail!("{}", outcome.error.unwrap_or_default());
    }

    println!("{}", outcome.summary);
    if let Some(tokens) = outcome.tokens_used {
        eprintln!("Tokens used: {}", tokens);
    }

    if save {
        let name = outcome.template_name.as_deref().unwrap_or_default();
        let path = mdm_core::project::save_summary(doc.folder(), &doc.file_name(), name, &outcome.summary)?;
        eprintln!("Summary saved to: {}", path.display());
    }
    session.selected_file = Some(doc.path);
    Ok(())
}

#[cfg(feature = "sync")]
fn sync_config(config: &AppConfig, root: &Path) -> Result<ProjectSyncConfig> {
    let mut sync = ProjectSyncConfig::load(root)?.unwrap_or_default();
    if sync.azure_connection_string.trim().is_empty() {
        if let Some(conn) = &config.sync.connection_string {
            sync.azure_connection_string = conn.clone();
        }
    }
    Ok(sync)
}

#[cfg(feature = "sync")]
fn print_report(report: &mdm_core::sync::SyncReport) {
    use mdm_core::sync::Direction;

    for key in &report.keys {
        println!("  {}", key);
    }
    match report.direction {
        Direction::Push => println!(
            "Push complete! {} files uploaded to '{}'.",
            report.files(),
            report.container
        ),
        Direction::Pull => println!(
            "Pull complete! {} files downloaded from '{}'.",
            report.files(),
            report.container
        ),
    }
}

fn config_command(config: &AppConfig, session: &mut SessionContext, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Save {
            root,
            docs,
            connection_string,
        } => {
            let sync = ProjectSyncConfig {
                project_root_folder: root.to_string_lossy().into_owned(),
                project_doc_folder: docs.to_string_lossy().into_owned(),
                azure_connection_string: connection_string
                    .or_else(|| config.sync.connection_string.clone())
                    .unwrap_or_default(),
            };
            let path = sync.save()?;
            println!("Configuration saved to {}", path.display());
            session.project_root_folder = Some(root);
            Ok(())
        }
        ConfigCommand::Show { root } => {
            let root = project_root(session, root)?;
            match ProjectSyncConfig::load(&root)? {
                Some(mut sync) => {
                    if !sync.azure_connection_string.is_empty() {
                        sync.azure_connection_string = "<set>".to_string();
                    }
                    println!("{}", serde_json::to_string_pretty(&sync)?);
                }
                None => println!(
                    "No config file found at {}",
                    ProjectSyncConfig::config_path(&root).display()
                ),
            }
            Ok(())
        }
    }
}

fn recent(config: &AppConfig) -> Result<()> {
    let projects = session::load_recent_projects(&config.sessions_dir())?;
    if projects.is_empty() {
        println!("No recent projects");
    }
    for project in projects {
        println!(
            "{}  {}",
            project.last_accessed.format("%Y-%m-%d %H:%M"),
            project.display_name
        );
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let sessions_dir = config.sessions_dir();
    let mut session = SessionContext::load(&sessions_dir).context("Failed to load session")?;

    match args.command {
        Command::Open { dir } => open(&config, &mut session, &dir)?,
        Command::Tree { dir } => tree(&config, &mut session, dir)?,
        Command::Outline { file } => {
            let doc = load_document(&config, &file)?;
            println!("{}", toc::outline(&doc.headings));
        }
        Command::Follow { file, href } => match browse::resolve_markdown_link(&file, &href) {
            Some(target) => {
                println!("{}", target.display());
                session.selected_file = Some(target);
            }
            None => bail!("'{}' does not point at a markdown file", href),
        },
        Command::Write { file } => {
            let mut doc = load_document(&config, &file)?;
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read standard input")?;
            doc.save(content)?;
            println!("File saved successfully!");
        }
        Command::Render {
            file,
            printable,
            output,
        } => render(&config, &mut session, &file, printable, output.as_deref())?,
        Command::Pdf {
            file,
            elements,
            output,
        } => export_pdf(&config, &file, elements, output.as_deref())?,
        #[cfg(feature = "ai")]
        Command::Templates => {
            for t in mdm_core::ai::templates::all() {
                println!("{:<14} {}\n{:<14} {}", t.key, t.name, "", t.description);
            }
        }
        #[cfg(feature = "ai")]
        Command::Check { file } => {
            let doc = load_document(&config, &file)?;
            let service = mdm_core::ai::SummaryService::from_config(&config.ai);
            let check = service.validate_content_size(&doc.content);
            if !check.valid {
                bail!("{}", check.message);
            }
            println!("{}", check.message);
        }
        #[cfg(feature = "ai")]
        Command::Summarize {
            file,
            template,
            prompt_file,
            save,
        } => summarize(&config, &mut session, &file, template, prompt_file, save)?,
        #[cfg(feature = "sync")]
        Command::Push { project } => {
            let root = project_root(&session, project)?;
            let report = mdm_core::sync::push_project(&sync_config(&config, &root)?)
                .context("An error occurred during push")?;
            print_report(&report);
        }
        #[cfg(feature = "sync")]
        Command::Pull { project } => {
            let root = project_root(&session, project)?;
            let report = mdm_core::sync::pull_project(&sync_config(&config, &root)?)
                .context("An error occurred during pull")?;
            print_report(&report);
        }
        Command::Config(cmd) => config_command(&config, &mut session, cmd)?,
        Command::Recent => recent(&config)?,
    }

    session.save(&sessions_dir).context("Failed to save session")?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    run(args)
}
