use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::{Key, Style, Term};
use modeldash_core::{
    import::{ImportState, InProcessNormalizer, SubprocessNormalizer},
    normalize::{self, DEFAULT_INPUT, DEFAULT_OUTPUT},
    sync, ColumnStats, DashError, Dashboard, Filter, NormalizedModel, Profile, Settings,
};

// ── Palette ──────────────────────────────────────────────────────────

fn s_header() -> Style { Style::new().color256(252).bold() }  // bright gray, bold
fn s_dim() -> Style    { Style::new().color256(248) }         // light gray
fn s_tree() -> Style   { Style::new().color256(245) }         // mid gray
fn s_hint() -> Style   { Style::new().color256(243) }         // soft gray
fn s_ok() -> Style     { Style::new().color256(114) }         // green
fn s_warn() -> Style   { Style::new().color256(214) }         // amber
fn s_err() -> Style    { Style::new().color256(167) }         // red
fn s_bold() -> Style   { Style::new().bold() }
fn s_label() -> Style  { Style::new().color256(146) }         // muted lavender

fn sep(width: usize) -> String {
    s_tree().apply_to("\u{2500}".repeat(width)).to_string()
}

fn fmt_cost(v: f64) -> String {
    format!("${v:.2}")
}

fn flag(b: bool) -> &'static str {
    if b { "\u{2705}" } else { "\u{274c}" }
}

// ── CLI Args ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "modeldash",
    about = "Normalize LiteLLM model pricing configs, browse them as a table, and sync model lists",
    version,
    after_help = "examples:\n  \
        modeldash normalize                      (litellmconfig.yaml -> processed_models.yaml)\n  \
        modeldash normalize in.yaml out.yaml\n  \
        modeldash dashboard --reasoning --search gpt\n  \
        modeldash dashboard -i                   (interactive filters and import)\n  \
        modeldash import ~/Downloads/new.yaml\n  \
        modeldash sync-models --profile docker\n  \
        modeldash                                (dashboard)"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path profile: local or docker (default: $MODELDASH_PROFILE, else local).
    #[arg(long, global = true, value_parser = parse_profile)]
    profile: Option<Profile>,

    /// Settings file overriding profile paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a router config into the processed model table.
    Normalize {
        #[arg(default_value = DEFAULT_INPUT)]
        input: PathBuf,
        #[arg(default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Copy model names from the router config into a provider's model list.
    SyncModels {
        /// Router config to read model names from.
        yaml: Option<PathBuf>,
        /// JSON config holding the `Providers` list.
        json: Option<PathBuf>,
        #[arg(long)]
        provider: Option<String>,
    },
    /// Show the processed model table.
    Dashboard(DashboardArgs),
    /// Stage a config file, re-run the normalizer on it, and show the result.
    Import {
        file: PathBuf,
        /// Normalize in this process instead of a bounded subprocess.
        #[arg(long)]
        in_process: bool,
    },
}

#[derive(Args, Default)]
struct DashboardArgs {
    /// Processed file to show (default from settings).
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long)]
    min_input: Option<f64>,
    #[arg(long)]
    max_input: Option<f64>,
    #[arg(long)]
    min_output: Option<f64>,
    #[arg(long)]
    max_output: Option<f64>,
    /// Only models that support reasoning.
    #[arg(long)]
    reasoning: bool,
    /// Only models that support vision.
    #[arg(long)]
    vision: bool,
    /// Only models with zero input and output cost.
    #[arg(long)]
    free: bool,
    /// Case-insensitive model name search.
    #[arg(long, short)]
    search: Option<String>,
    #[arg(long, short)]
    json: bool,
    #[arg(long, short)]
    interactive: bool,
}

impl DashboardArgs {
    fn filter(&self) -> Filter {
        Filter {
            min_input: self.min_input,
            max_input: self.max_input,
            min_output: self.min_output,
            max_output: self.max_output,
            reasoning_only: self.reasoning,
            vision_only: self.vision,
            free_only: self.free,
            search: self.search.clone(),
        }
    }
}

fn parse_profile(s: &str) -> Result<Profile, String> {
    s.parse().map_err(|e: DashError| e.to_string())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = std::env::var("MODELDASH_LOG")
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = || Settings::resolve(cli.profile, cli.config.as_deref());

    match cli.command {
        Some(Commands::Normalize { ref input, ref output }) => cmd_normalize(input, output),
        Some(Commands::SyncModels { ref yaml, ref json, ref provider }) => {
            let s = settings()?;
            cmd_sync(
                yaml.as_deref().unwrap_or(&s.litellm_config),
                json.as_deref().unwrap_or(&s.router_config),
                provider.as_deref().unwrap_or(&s.provider_name),
            )
        }
        Some(Commands::Import { ref file, in_process }) => {
            cmd_import(&settings()?, file, in_process).await?;
        }
        Some(Commands::Dashboard(ref args)) => {
            cmd_dashboard(settings()?, args).await?;
        }
        None => {
            cmd_dashboard(settings()?, &DashboardArgs::default()).await?;
        }
    }
    Ok(())
}

// ── Normalize ────────────────────────────────────────────────────────

fn cmd_normalize(input: &Path, output: &Path) {
    let outcome = normalize::process_model_list(input, output);
    if outcome.success {
        println!("{}", outcome.message);
    } else {
        eprintln!("{}", outcome.message);
        std::process::exit(1);
    }
}

// ── Sync ─────────────────────────────────────────────────────────────

fn cmd_sync(yaml: &Path, json: &Path, provider: &str) {
    println!();
    println!("{}", s_header().apply_to("sync model names"));
    println!("{}", sep(64));
    println!("  {} {}", s_label().apply_to("source"), yaml.display());
    println!("  {} {}", s_label().apply_to("target"), json.display());
    println!();

    let report = match sync::run_sync(yaml, json, provider) {
        Ok(r) => r,
        Err(e) => sync_failed(&e),
    };
    let names = &report.names;
    println!("  {}", s_dim().apply_to(format!("{} models found", names.len())));
    for (i, name) in names.iter().take(5).enumerate() {
        println!("  {:>3}. {}", i + 1, name);
    }
    if names.len() > 5 {
        println!("  {}", s_hint().apply_to(format!("... and {} more", names.len() - 5)));
    }
    println!();
    println!(
        "  {}  {}",
        s_ok().apply_to("synced"),
        s_dim().apply_to(format!(
            "'{provider}' models: {} -> {}",
            report.update.old_count, report.update.new_count
        ))
    );
    println!();
}

fn sync_failed(e: &DashError) -> ! {
    eprintln!("  {}", s_err().apply_to(format!("sync failed: {e}")));
    std::process::exit(1);
}

// ── Import ───────────────────────────────────────────────────────────

async fn cmd_import(settings: &Settings, file: &Path, in_process: bool) -> anyhow::Result<()> {
    let term = Term::stderr();
    // The table is loaded after processing; the processed file may not exist yet.
    let mut dash = Dashboard::new(settings);
    dash.open_uploader()?;
    let staged = dash.stage(file)?;
    term.write_line(&format!(
        "{}",
        s_dim().apply_to(format!("processing {}...", staged.display()))
    ))?;

    let result = if in_process {
        dash.process(&InProcessNormalizer).await
    } else {
        let runner = SubprocessNormalizer::current_exe(settings.import_timeout)?;
        dash.process(&runner).await
    };
    term.clear_last_lines(1)?;

    match result {
        Ok(_) => {
            let msg = dash.acknowledge()?;
            println!();
            println!("  {}", s_ok().apply_to(format!("\u{2713} {msg}")));
            print_table(&dash);
            Ok(())
        }
        Err(e) => {
            dash.acknowledge()?;
            dash.clear_staged()?;
            anyhow::bail!("import failed: {e}")
        }
    }
}

// ── Dashboard ────────────────────────────────────────────────────────

async fn cmd_dashboard(mut settings: Settings, args: &DashboardArgs) -> anyhow::Result<()> {
    if let Some(ref f) = args.file {
        settings.processed_path = f.clone();
    }
    tracing::debug!(path = %settings.processed_path.display(), "opening dashboard");
    let mut dash = Dashboard::open(&settings);
    dash.filter = args.filter();

    if args.interactive {
        return interactive_dashboard(&settings, &mut dash).await;
    }
    if args.json {
        if let Some(err) = dash.load_error() {
            anyhow::bail!("{err}");
        }
        let rows: Vec<_> = dash.visible().into_iter().map(row_json).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    print_table(&dash);
    Ok(())
}

fn row_json(m: &NormalizedModel) -> serde_json::Value {
    serde_json::json!({
        "model_name": m.name,
        "input_cost_1M_token": m.input_cost_per_1m,
        "output_cost_1M_token": m.output_cost_per_1m,
        "max_tokens": m.max_tokens_label,
        "max_output_tokens": m.max_output_tokens_label,
        "supports_reasoning": m.supports_reasoning,
        "supports_vision": m.supports_vision,
    })
}

fn build_table(rows: &[&NormalizedModel]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("    #").fg(Color::AnsiValue(243)),
        Cell::new("Model").fg(Color::AnsiValue(243)),
        Cell::new("$/1M in").fg(Color::AnsiValue(243)),
        Cell::new("$/1M out").fg(Color::AnsiValue(243)),
        Cell::new("Context").fg(Color::AnsiValue(243)),
        Cell::new("Max out").fg(Color::AnsiValue(243)),
        Cell::new("Reasoning").fg(Color::AnsiValue(243)),
        Cell::new("Vision").fg(Color::AnsiValue(243)),
    ]);
    for (i, m) in rows.iter().enumerate() {
        let free = m.input_cost_per_1m == 0.0 && m.output_cost_per_1m == 0.0;
        let price_color = if free { Color::AnsiValue(114) } else { Color::AnsiValue(109) };
        table.add_row(vec![
            Cell::new(format!("{:>5}", i + 1)).fg(Color::AnsiValue(243)),
            Cell::new(&m.name),
            Cell::new(fmt_cost(m.input_cost_per_1m)).fg(price_color),
            Cell::new(fmt_cost(m.output_cost_per_1m)).fg(price_color),
            Cell::new(&m.max_tokens_label).fg(Color::AnsiValue(248)),
            Cell::new(&m.max_output_tokens_label).fg(Color::AnsiValue(248)),
            Cell::new(flag(m.supports_reasoning)),
            Cell::new(flag(m.supports_vision)),
        ]);
    }
    table
}

fn filter_summary(f: &Filter, stats: ColumnStats) -> String {
    let mut parts = vec![
        format!(
            "in {}..{}",
            fmt_cost(f.min_input.unwrap_or(0.0)),
            fmt_cost(f.max_input.unwrap_or(stats.max_input))
        ),
        format!(
            "out {}..{}",
            fmt_cost(f.min_output.unwrap_or(0.0)),
            fmt_cost(f.max_output.unwrap_or(stats.max_output))
        ),
    ];
    if f.reasoning_only {
        parts.push("reasoning".into());
    }
    if f.vision_only {
        parts.push("vision".into());
    }
    if f.free_only {
        parts.push("free".into());
    }
    if let Some(q) = f.search.as_deref().filter(|q| !q.trim().is_empty()) {
        parts.push(format!("search \"{q}\""));
    }
    parts.join("   ")
}

fn modified_label(dash: &Dashboard) -> Option<String> {
    let t: chrono::DateTime<chrono::Local> = dash.modified()?.into();
    Some(t.format("%Y-%m-%d %H:%M").to_string())
}

/// Everything the table view prints, as lines, so the interactive mode can redraw it.
fn render_dashboard(dash: &Dashboard) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(String::new());
    lines.push(format!(
        "{}  {}",
        s_header().apply_to("models"),
        s_hint().apply_to(dash.processed_path().display())
    ));
    lines.push(sep(64));

    if let Some(err) = dash.load_error() {
        lines.push(format!("  {}", s_err().apply_to(format!("cannot read data file: {err}"))));
        lines.push(sep(64));
        return lines;
    }

    lines.push(format!("  {}", s_dim().apply_to(filter_summary(&dash.filter, dash.stats()))));
    let visible = dash.visible();
    if visible.is_empty() {
        lines.push(format!("  {}", s_dim().apply_to("no models match")));
    } else {
        lines.extend(build_table(&visible).to_string().lines().map(str::to_string));
    }
    lines.push(sep(64));

    let mut footer = format!("  {} of {} models", visible.len(), dash.rows().len());
    if let Some(ts) = modified_label(dash) {
        footer.push_str(&format!("   updated {ts}"));
    }
    lines.push(s_hint().apply_to(footer).to_string());
    lines
}

fn print_table(dash: &Dashboard) {
    for line in render_dashboard(dash) {
        println!("{line}");
    }
    println!();
}

// ── Interactive dashboard ────────────────────────────────────────────

fn import_line(state: &ImportState) -> Option<String> {
    let line = match state {
        ImportState::Idle => return None,
        ImportState::AwaitingUpload => {
            s_label().apply_to("  import: waiting for a .yaml/.yml file").to_string()
        }
        ImportState::FileStaged(p) | ImportState::Processing(p) => format!(
            "  {} {}   {}",
            s_label().apply_to("import: staged"),
            s_bold().apply_to(p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()),
            s_hint().apply_to("p process   x clear")
        ),
        ImportState::Done(msg) => s_ok().apply_to(format!("  \u{2713} {msg}, data updated")).to_string(),
        ImportState::Error { message, .. } => {
            s_err().apply_to(format!("  \u{2717} {message}")).to_string()
        }
    };
    Some(line)
}

const KEYS_HELP: &str =
    "  r reasoning   v vision   f free   / search   c clear filters   i import   R refresh   q quit";

async fn read_key() -> anyhow::Result<Key> {
    let t = Term::stderr();
    Ok(tokio::task::spawn_blocking(move || t.read_key()).await??)
}

async fn prompt(term: &Term, label: &str) -> anyhow::Result<String> {
    term.write_str(&format!("{} ", s_label().apply_to(label)))?;
    let t = term.clone();
    let line = tokio::task::spawn_blocking(move || t.read_line()).await??;
    term.clear_last_lines(1)?;
    Ok(line.trim().to_string())
}

async fn interactive_dashboard(settings: &Settings, dash: &mut Dashboard) -> anyhow::Result<()> {
    let term = Term::stderr();
    let mut drawn: usize = 0;

    loop {
        let mut lines = render_dashboard(dash);
        let finished = matches!(
            dash.import_state(),
            ImportState::Done(_) | ImportState::Error { .. }
        );
        if let Some(l) = import_line(dash.import_state()) {
            lines.push(l);
        }
        lines.push(s_hint().apply_to(KEYS_HELP).to_string());

        if drawn > 0 {
            term.clear_last_lines(drawn)?;
        }
        for line in &lines {
            term.write_line(line)?;
        }
        drawn = lines.len();

        // Results of an import are shown once.
        if finished {
            dash.acknowledge()?;
        }

        match read_key().await? {
            Key::Char('r') => dash.filter.reasoning_only = !dash.filter.reasoning_only,
            Key::Char('v') => dash.filter.vision_only = !dash.filter.vision_only,
            Key::Char('f') => dash.filter.free_only = !dash.filter.free_only,
            Key::Char('c') => dash.filter = Filter::default(),
            Key::Char('/') => {
                let q = prompt(&term, "search:").await?;
                dash.filter.search = if q.is_empty() { None } else { Some(q) };
            }
            Key::Char('R') => dash.refresh(),
            Key::Char('i') => {
                if dash.open_uploader().is_ok() {
                    let path = prompt(&term, "config file (.yaml/.yml):").await?;
                    if path.is_empty() {
                        dash.clear_staged()?;
                    } else {
                        // Failure is recorded in the import state and shown on redraw.
                        let _ = dash.stage(Path::new(&path));
                    }
                }
            }
            Key::Char('p') => {
                if matches!(dash.import_state(), ImportState::FileStaged(_)) {
                    term.write_line(&format!("{}", s_warn().apply_to("  processing...")))?;
                    drawn += 1;
                    let runner = SubprocessNormalizer::current_exe(settings.import_timeout)?;
                    let _ = dash.process(&runner).await;
                }
            }
            Key::Char('x') => {
                let _ = dash.clear_staged();
            }
            Key::Escape | Key::Char('q') | Key::Char('\u{3}') => {
                term.clear_last_lines(drawn)?;
                break;
            }
            _ => {}
        }
    }

    print_table(dash);
    Ok(())
}
