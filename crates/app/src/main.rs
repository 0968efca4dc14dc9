use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context as _;
use directories::ProjectDirs;
use monocle_application::ViewerConfig;
use monocle_core::ViewerSettings;
use monocle_ui::Ui;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const LOG_ENV: &str = "MONOCLE_LOG";

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let Some(mut config) = parse_args(std::env::args_os().skip(1))? else {
        print_help();
        return Ok(());
    };
    config.facsimile_source = config.facsimile_source.map(locate).transpose()?;
    config.listing_source = config.listing_source.map(locate).transpose()?;

    let project_dirs =
        ProjectDirs::from("dev", "monocle", "monocle").context("resolve project dirs")?;
    init_logging(project_dirs.data_dir())?;
    let settings = load_settings(&project_dirs.config_dir().join("settings.json"))?;

    info!(
        facs = ?config.facsimile_source,
        listing = ?config.listing_source,
        targ_surface = ?config.initial_surface,
        "starting viewer"
    );
    let mut ui = Ui::new(settings)?;
    ui.run(config)
}

/// Builds the startup configuration from the command line. A bare argument
/// is read as a query string (`facs=..&listing=..&targSurface=..`); flags
/// win over values from a query. `None` means help was requested.
fn parse_args(args: impl IntoIterator<Item = OsString>) -> anyhow::Result<Option<ViewerConfig>> {
    let mut config = ViewerConfig::default();
    let mut overrides = ViewerConfig::default();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let arg_str = arg.to_string_lossy();
        match arg_str.as_ref() {
            "--facs" => {
                let value = args.next().context("missing value for --facs")?;
                overrides.facsimile_source = non_blank(value);
            }
            "--listing" => {
                let value = args.next().context("missing value for --listing")?;
                overrides.listing_source = non_blank(value);
            }
            "--targ-surface" => {
                let value = args.next().context("missing value for --targ-surface")?;
                overrides.initial_surface = non_blank(value);
            }
            "--query" => {
                let value = args.next().context("missing value for --query")?;
                config = ViewerConfig::from_query(&value.to_string_lossy());
            }
            "-h" | "--help" => return Ok(None),
            other if other.starts_with("--") => {
                anyhow::bail!("unknown arg: {other} (try --help)")
            }
            query => config = ViewerConfig::from_query(query),
        }
    }

    if overrides.facsimile_source.is_some() {
        config.facsimile_source = overrides.facsimile_source;
    }
    if overrides.listing_source.is_some() {
        config.listing_source = overrides.listing_source;
    }
    if overrides.initial_surface.is_some() {
        config.initial_surface = overrides.initial_surface;
    }
    Ok(Some(config))
}

/// Turns a manifest path into an absolute `file://` URL so references
/// inside the manifest resolve against it. URLs pass through.
fn locate(source: String) -> anyhow::Result<String> {
    if Url::parse(&source).is_ok_and(|url| url.scheme().len() > 1) {
        return Ok(source);
    }
    let path = std::path::absolute(&source).with_context(|| format!("resolve {source}"))?;
    let url = Url::from_file_path(&path)
        .map_err(|()| anyhow::anyhow!("not a file path: {}", path.display()))?;
    Ok(url.into())
}

fn non_blank(value: OsString) -> Option<String> {
    let value = value.to_string_lossy().trim().to_string();
    (!value.is_empty()).then_some(value)
}

fn print_help() {
    println!(
        "monocle: terminal facsimile viewer\n\n\
         usage: monocle [QUERY] [--facs <path>] [--listing <path>] [--targ-surface <image>]\n\n\
         QUERY                  query string, e.g. 'facs=letters.json&targSurface=p2.jpg'\n\
         --query <query>        same as QUERY\n\
         --facs <path>          facsimile manifest to open\n\
         --listing <path>       listing of facsimiles to browse\n\
         --targ-surface <image> surface imageUrl to show first\n\n\
         Logs go to the data dir; set {LOG_ENV} to change the filter (default: info)."
    );
}

fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("create log dir {}", log_dir.display()))?;
    let log_path = log_dir.join("monocle.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("open log file {}", log_path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(anyhow::Error::from_boxed)
        .context("install log subscriber")
}

/// Reads settings if the file exists; a missing file means defaults.
fn load_settings(path: &Path) -> anyhow::Result<ViewerSettings> {
    let mut settings = match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str::<ViewerSettings>(&text)
            .with_context(|| format!("parse settings {}", path.display()))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ViewerSettings::default(),
        Err(err) => {
            return Err(err).with_context(|| format!("read settings {}", path.display()));
        }
    };
    settings.normalize();
    Ok(settings)
}
