// MPL: cellular-automaton scripting with a time-travel timeline viewer

use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mpl::compile::{self, Diagnostic};
use mpl::grid::{EdgePolicy, Grid, Neighborhood, RuleConfig, RuleMasks};
use mpl::interpreter::constants::{DEFAULT_GRID_HEIGHT, DEFAULT_GRID_WIDTH};
use mpl::interpreter::{Interpreter, InterpreterConfig, StepBackend};
use mpl::snapshot::{Compression, OptimizationThresholds, PerformanceMonitor};
use mpl::ui::App;

#[derive(Parser, Debug)]
#[command(name = "mpl", version)]
#[command(about = "Run an MPL cellular-automaton program and scrub through its timeline")]
struct Cli {
    /// MPL source file
    source: PathBuf,

    /// Grid width in cells
    #[arg(long, default_value_t = DEFAULT_GRID_WIDTH)]
    width: usize,

    /// Grid height in cells
    #[arg(long, default_value_t = DEFAULT_GRID_HEIGHT)]
    height: usize,

    /// Preset name (conway, high-life, seeds, maze, ...) or a B#/S# rule string
    #[arg(long, default_value = "conway")]
    rule: RuleMasks,

    /// moore or von-neumann
    #[arg(long, default_value = "moore")]
    neighborhood: Neighborhood,

    /// Treat the grid as a torus instead of clipping at the border
    #[arg(long)]
    wrap: bool,

    /// Step generations on rayon worker threads
    #[arg(long)]
    parallel: bool,

    /// Worker threads for --parallel
    #[arg(long, requires = "parallel")]
    threads: Option<usize>,

    /// Store timeline deltas as raw cell changes
    #[arg(long = "no-rle")]
    no_rle: bool,

    /// Extra generations to step after the program finishes
    #[arg(long, default_value_t = 0)]
    steps: u64,

    /// Seed for math.random
    #[arg(long)]
    seed: Option<u64>,

    /// Print the results instead of opening the viewer
    #[arg(long)]
    headless: bool,

    /// Write the recorded timeline as JSON
    #[arg(long = "export-timeline", value_name = "PATH")]
    export_timeline: Option<PathBuf>,
}

impl Cli {
    fn interpreter_config(&self) -> InterpreterConfig {
        let defaults = InterpreterConfig::default();
        InterpreterConfig {
            width: self.width,
            height: self.height,
            rule: RuleConfig::new(
                self.rule,
                self.neighborhood,
                if self.wrap {
                    EdgePolicy::Wrap
                } else {
                    EdgePolicy::Clip
                },
            ),
            backend: if self.parallel {
                StepBackend::Parallel
            } else {
                StepBackend::Cpu
            },
            threads: self.threads,
            compression: if self.no_rle {
                Compression::None
            } else {
                Compression::Rle
            },
            seed: self.seed.unwrap_or(defaults.seed),
            ..defaults
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        if diagnostic.is_error() {
            error!("{}", diagnostic);
        } else {
            warn!("{}", diagnostic);
        }
    }
}

fn report_performance(monitor: &PerformanceMonitor) {
    if monitor.is_empty() {
        return;
    }
    info!(
        avg_fps = monitor.average_fps(10),
        avg_memory = monitor.average_memory_usage(10),
        density = %monitor.density_trend(10),
        "Performance"
    );
    for activity in monitor.most_active_rules(5) {
        info!(rule = %activity.rule, applications = activity.activity, "Rule activity");
    }
    for hint in monitor.suggestions(&OptimizationThresholds::default()) {
        warn!("{hint}");
    }
}

fn render_ascii(grid: &Grid) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for row in grid.cells().chunks(grid.width().max(1)) {
        out.extend(row.iter().map(|&cell| if cell != 0 { '#' } else { '.' }));
        out.push('\n');
    }
    out
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if !cli.source.exists() {
        error!("File '{}' not found", cli.source.display());
        process::exit(1);
    }
    let source = fs::read_to_string(&cli.source)?;

    info!("Compiling {}...", cli.source.display());
    let compiled = compile::compile(&source);
    report(&compiled.diagnostics);

    let mut interpreter = Interpreter::new(cli.interpreter_config());
    info!(backend = interpreter.backend_name(), "Executing program...");
    let runtime = compile::execute(&compiled, &mut interpreter);
    if !compiled.has_errors() {
        report(&runtime);
    }
    for _ in 0..cli.steps {
        interpreter.step();
    }
    interpreter.capture_frame();
    info!(
        step = interpreter.current_step(),
        population = interpreter.grid().population(),
        frames = interpreter.timeline().len(),
        "Execution finished"
    );
    report_performance(interpreter.monitor());

    let mut diagnostics = compiled.diagnostics.clone();
    if !compiled.has_errors() {
        diagnostics.extend(runtime);
    }
    let log = interpreter.log().to_vec();

    if cli.headless {
        for line in &log {
            println!("{line}");
        }
        print!("{}", render_ascii(interpreter.grid()));
    }

    let timeline = interpreter.take_timeline();
    if let Some(path) = &cli.export_timeline {
        timeline.export_json(path)?;
        info!("Wrote {} frames to {}", timeline.len(), path.display());
    }

    if cli.headless {
        if diagnostics.iter().any(Diagnostic::is_error) {
            process::exit(1);
        }
        return Ok(());
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(timeline, source, diagnostics, log);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("{:?}", err);
    }

    Ok(())
}
