use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::sync::mpsc::{TryRecvError, channel};
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use rankview::controller::Controller;
use rankview::domain::{ViewerConfig, ViewerError};
use rankview::filter::{FilterState, matching_rows};
use rankview::loader::{load_dataset, read_manifest};
use rankview::model::{Model, Status};
use rankview::ui::TableUI;

#[derive(Parser, Debug)]
#[command(version, about = "Browse competition ranking sheets")]
struct Args {
    /// Directory holding manifest.json and one <sheet>.json per sheet
    #[arg(default_value = "data")]
    data_dir: String,

    /// Sheet to open first
    #[arg(long)]
    sheet: Option<String>,

    /// Print the filtered sheet as tab separated text instead of opening the viewer
    #[arg(long, action)]
    print: bool,

    /// Search text applied in --print mode
    #[arg(long, requires = "print")]
    search: Option<String>,

    /// Event column applied in --print mode
    #[arg(long, requires = "print")]
    event: Option<String>,

    /// Keep only rows with points in the event column (--print mode)
    #[arg(long, action, requires = "print")]
    only_positive: bool,

    /// Milliseconds to wait for terminal input per frame
    #[arg(long = "poll-ms")]
    poll_ms: Option<u64>,

    /// Upper bound for the width of a table column
    #[arg(long = "max-column-width")]
    max_column_width: Option<usize>,

    /// Log file, defaults to rankview.log in the temp directory
    #[arg(long = "log-file")]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, ViewerError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| ViewerError::PathExpansion(format!("{path}: {e}")))
}

fn init_logging(log_file: Option<&str>) -> Result<(), ViewerError> {
    let path = match log_file {
        Some(p) => expand(p)?,
        None => std::env::temp_dir().join("rankview.log"),
    };
    let file = File::create(&path)?;

    // The terminal belongs to the viewer, so all log output goes to the file.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .try_init()
        .map_err(|e| ViewerError::Logging(e.to_string()))
}

fn run(args: Args) -> Result<(), ViewerError> {
    init_logging(args.log_file.as_deref())?;

    let mut cfg = ViewerConfig::default()
        .with_data_dir(expand(&args.data_dir)?)
        .with_initial_sheet(args.sheet.clone());
    if let Some(poll_ms) = args.poll_ms {
        cfg = cfg.with_event_poll_time(poll_ms);
    }
    if let Some(width) = args.max_column_width {
        cfg = cfg.with_max_column_width(width);
    }
    info!("Starting rankview with {cfg:?}");

    if args.print {
        let filter = FilterState {
            search: args.search.unwrap_or_default(),
            event_column: args.event,
            only_positive: args.only_positive,
        };
        print_sheet(&cfg, filter)
    } else {
        run_viewer(&cfg)
    }
}

fn print_sheet(cfg: &ViewerConfig, mut filter: FilterState) -> Result<(), ViewerError> {
    let manifest = read_manifest(&cfg.data_dir)?;
    let sheet = match &cfg.initial_sheet {
        Some(name) if manifest.sheets.contains(name) => name.clone(),
        Some(name) => return Err(ViewerError::UnknownSheet(name.clone())),
        None => manifest
            .sheets
            .first()
            .cloned()
            .ok_or(ViewerError::NoSheets)?,
    };

    let dataset = load_dataset(&cfg.data_dir, &sheet)?;
    if let Some(event) = filter.event_column()
        && !dataset.event_columns().iter().any(|c| c == event)
    {
        warn!("Sheet {sheet} has no event column {event}, ignoring the event filter");
    }
    filter.retain_event_column(&dataset.columns);

    let rows = matching_rows(&dataset.records, &dataset.columns, &filter);
    info!("Printing {} of {} rows of {sheet}", rows.len(), dataset.len());

    let mut out = BufWriter::new(io::stdout().lock());
    dataset.write_table(&mut out, &rows)?;
    out.flush()?;
    Ok(())
}

fn run_viewer(cfg: &ViewerConfig) -> Result<(), ViewerError> {
    let mut terminal = ratatui::init();
    let result = event_loop(cfg, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    cfg: &ViewerConfig,
    terminal: &mut ratatui::DefaultTerminal,
) -> Result<(), ViewerError> {
    let (tx, rx) = channel();
    let size = terminal.size()?;
    let mut model = Model::init(cfg, tx, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(&model)?;
        model.update(message)?;

        // Apply whatever the loaders finished in the meantime
        loop {
            match rx.try_recv() {
                Ok(message) => model.update(Some(message))?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(ViewerError::ChannelClosed),
            }
        }
    }

    Ok(())
}
