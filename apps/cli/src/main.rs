use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use hellforge_project::{
    FileType, PathEntry, Project, TemplateRegistry, ZipArchiveLoader,
};
use hellforge_settings::{Config, ConfigStore, Rgba};

#[derive(Parser)]
#[command(
    name = "hellforge-cli",
    about = "Project and session utilities for HellForge mod projects",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑；預設為系統設定資料夾。 / Configuration file (defaults to the per-user config directory).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 將日誌附加到指定檔案。 / Append log output to this file.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// 背景顏色（0xRRGGBB[AA]），會寫回設定檔。 / Background colour (0xRRGGBB[AA]); stored in the configuration.
    #[arg(long, global = true, value_name = "HEX")]
    bg_color: Option<Rgba>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 建立或檢視專案。 / Create or inspect a project.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// 列出專案內容樹。 / Print the project's content tree.
    Tree(ManifestArgs),
    /// 以範本建立新檔案。 / Create a new file from its type's template.
    NewFile(NewFileArgs),
    /// 建立新資料夾。 / Create a new folder.
    NewFolder(NewFolderArgs),
    /// 列出輔助封存檔的內容。 / Print the contents of the project's auxiliary archives.
    Archives(ManifestArgs),
    /// 顯示儲存的工作階段。 / Print the stored session of a project as JSON.
    Session(ManifestArgs),
    /// 列出最近開啟的專案。 / List recently opened projects.
    Recent,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// 建立新專案。 / Create a new project manifest and content folder.
    New(ManifestArgs),
    /// 顯示專案屬性。 / Show project properties.
    Info(ManifestArgs),
}

#[derive(Args)]
struct ManifestArgs {
    /// 專案檔（.hsp）。 / Project manifest (.hsp).
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,
}

#[derive(Args)]
struct NewFileArgs {
    #[command(flatten)]
    project: ManifestArgs,

    /// 檔案類型，例如 text、font、palette。 / File type, e.g. text, font, palette.
    #[arg(long = "type", value_name = "TYPE", value_parser = parse_file_type)]
    file_type: FileType,

    /// 目標資料夾，相對於 content。 / Target folder, relative to the content folder.
    #[arg(long, value_name = "DIR")]
    parent: Option<PathBuf>,
}

#[derive(Args)]
struct NewFolderArgs {
    #[command(flatten)]
    project: ManifestArgs,

    /// 目標資料夾，相對於 content。 / Target folder, relative to the content folder.
    #[arg(long, value_name = "DIR")]
    parent: Option<PathBuf>,
}

fn parse_file_type(value: &str) -> Result<FileType, String> {
    FileType::from_label(value).ok_or_else(|| {
        let known: Vec<&str> = FileType::ALL.iter().map(|kind| kind.label()).collect();
        format!("unknown file type '{value}' (expected one of: {})", known.join(", "))
    })
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        config,
        log_file,
        bg_color,
        command,
    } = Cli::parse();

    let store = match config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::at_default_location()?,
    };
    let mut config = store.load();
    init_logging(&config, log_file.as_deref())?;

    if let Some(color) = bg_color {
        config.bg_color = color;
        store.save(&config).context("failed to save configuration")?;
    }

    match command {
        Commands::Project(ProjectCommand::New(args)) => {
            create_project(&args.manifest, &store, &mut config)
        }
        Commands::Project(ProjectCommand::Info(args)) => show_project(&args.manifest),
        Commands::Tree(args) => print_tree(&args.manifest),
        Commands::NewFile(args) => new_file(args),
        Commands::NewFolder(args) => new_folder(args),
        Commands::Archives(args) => print_archives(&args.manifest, &config),
        Commands::Session(args) => print_session(&args.manifest, &config),
        Commands::Recent => {
            for path in config.recent_projects.iter() {
                println!("{path}");
            }
            Ok(())
        }
    }
}

/// 初始化日誌；寫入檔案時先加上分隔行。 / Sets up env_logger, appending to a file after a separator line when requested.
fn init_logging(config: &Config, override_path: Option<&Path>) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    let target = override_path.or_else(|| config.logging_to_file.then(|| config.log_file()));
    if let Some(path) = target {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create log directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        writeln!(
            file,
            "----- hellforge started {} -----",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    builder.try_init().context("failed to initialise logging")?;
    Ok(())
}

fn open_project(manifest: &Path) -> Result<Project> {
    Project::load(manifest)
        .with_context(|| format!("failed to open project {}", manifest.display()))
}

fn create_project(manifest: &Path, store: &ConfigStore, config: &mut Config) -> Result<()> {
    let project = Project::create_new(manifest)
        .with_context(|| format!("failed to create project {}", manifest.display()))?;
    config.add_to_recent_projects(project.file_path());
    store.save(config).context("failed to save configuration")?;
    println!(
        "Created project '{}' at {}",
        project.name(),
        project.file_path().display()
    );
    Ok(())
}

fn show_project(manifest: &Path) -> Result<()> {
    let project = open_project(manifest)?;
    println!("Name: {}", project.name());
    println!("Description: {}", project.description());
    println!("Author: {}", project.author());
    println!("Content: {}", project.content_path().display());
    if project.auxiliary_archives().is_empty() {
        println!("Auxiliary archives: (none)");
    } else {
        println!("Auxiliary archives:");
        for archive in project.auxiliary_archives() {
            println!("  {archive}");
        }
    }
    Ok(())
}

fn print_tree(manifest: &Path) -> Result<()> {
    let mut project = open_project(manifest)?;
    let mut root = project.file_structure()?.clone();
    root.sort_tree();
    print_entry(&root, 0);
    Ok(())
}

fn print_entry(entry: &PathEntry, depth: usize) {
    let suffix = if entry.is_directory { "/" } else { "" };
    println!("{}{}{}", "  ".repeat(depth), entry.name, suffix);
    for child in &entry.children {
        print_entry(child, depth + 1);
    }
}

fn resolve_parent(project: &Project, parent: Option<&Path>) -> Result<PathBuf> {
    let content = project.content_path();
    let resolved = match parent {
        None => content.clone(),
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => content.join(path),
    };
    if !resolved.starts_with(&content) {
        bail!(
            "{} is outside the project content folder {}",
            resolved.display(),
            content.display()
        );
    }
    if !resolved.is_dir() {
        bail!("{} is not a directory", resolved.display());
    }
    Ok(resolved)
}

fn new_file(args: NewFileArgs) -> Result<()> {
    let mut project = open_project(&args.project.manifest)?;
    let parent = resolve_parent(&project, args.parent.as_deref())?;
    let templates = TemplateRegistry::with_defaults();
    let created = project.create_new_file(args.file_type, &parent, &templates)?;
    println!("{}", created.display());
    Ok(())
}

fn new_folder(args: NewFolderArgs) -> Result<()> {
    let mut project = open_project(&args.project.manifest)?;
    let parent = resolve_parent(&project, args.parent.as_deref())?;
    let created = project.create_new_folder(&parent)?;
    println!("{}", created.display());
    Ok(())
}

fn print_archives(manifest: &Path, config: &Config) -> Result<()> {
    let project = open_project(manifest)?;
    let archive_dir = config.auxiliary_archive_dir();
    let trees = project.archive_trees(&archive_dir, config.external_list(), &ZipArchiveLoader);
    for (name, tree) in project.auxiliary_archives().iter().zip(&trees) {
        match tree {
            Some(root) => print_entry(root, 0),
            None => println!("{name}: failed to open"),
        }
    }
    Ok(())
}

fn print_session(manifest: &Path, config: &Config) -> Result<()> {
    let project = open_project(manifest)?;
    let state = config
        .project_state(project.file_path())
        .ok_or_else(|| anyhow!("no stored session for {}", project.file_path().display()))?;
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}
