use std::{
    fmt::Write as _,
    io::{self, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use daynotes::parser::{FileNotesParser, NotesParser, parse_reader};
use daynotes::projectors::dump::{DumpOptions, dump_tree};
use daynotes::projectors::outline::{OutlineRow, RowKind, collect_issues, outline_rows, search};
use daynotes::projectors::stats::project_document;
use daynotes::projectors::view::collect_highlights;
use daynotes::tree::Document;
use log::{debug, info};

#[derive(Debug, Parser)]
#[command(
    name = "daynotes",
    about = "Inspect day-notes journals: structure, issues and highlighting",
    version
)]
struct Cli {
    /// Enable verbose logging for debugging.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the element tree, one summary per line.
    Dump(DumpArgs),

    /// Print the tree-view rows as a table.
    Outline(InputArgs),

    /// List every parse issue with its location.
    Issues(JsonArgs),

    /// List highlight ranges for syntax and issues.
    Highlights(JsonArgs),

    /// Print outline rows whose summary contains QUERY (case-insensitive).
    Search(SearchArgs),

    /// Summarise days, entries, categories and issues.
    Stats(JsonArgs),
}

#[derive(Debug, Args)]
struct InputArgs {
    /// Notes files to read. Reads stdin when omitted.
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct JsonArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Emit JSON instead of human-readable text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct DumpArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Print each element's own issues beneath it.
    #[arg(long)]
    issues: bool,
    /// Emit the parsed tree as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Text to look for in element and issue summaries.
    query: String,
    #[command(flatten)]
    input: InputArgs,
}

/// A parsed input and the label it is reported under.
struct Loaded {
    label: String,
    doc: Document,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = match cli.command {
        Commands::Dump(args) => handle_dump(args)?,
        Commands::Outline(args) => handle_outline(args)?,
        Commands::Issues(args) => handle_issues(args)?,
        Commands::Highlights(args) => handle_highlights(args)?,
        Commands::Search(args) => handle_search(args)?,
        Commands::Stats(args) => handle_stats(args)?,
    };
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .context("writing output")?;
    stdout.flush().context("flushing output")?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // A logger may already be installed when running under a test harness.
    let _ = builder.try_init();
}

fn load_inputs(args: &InputArgs) -> Result<Vec<Loaded>> {
    if args.inputs.is_empty() {
        info!("reading notes from stdin");
        let doc = parse_reader(io::stdin().lock()).context("reading notes from stdin")?;
        return Ok(vec![Loaded {
            label: "<stdin>".to_string(),
            doc,
        }]);
    }

    let parser = FileNotesParser;
    let mut loaded = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        let doc = parser
            .parse_file(path)
            .with_context(|| format!("parsing {:?}", path))?;
        loaded.push(Loaded {
            label: path.display().to_string(),
            doc,
        });
    }
    Ok(loaded)
}

/// Renders every input, prefixing each with `<label>:` when there is more than one.
fn render_each(loaded: &[Loaded], mut render: impl FnMut(&Document) -> Result<String>) -> Result<String> {
    let mut out = String::new();
    let labelled = loaded.len() > 1;
    for input in loaded {
        debug!("rendering {}", input.label);
        if labelled {
            writeln!(out, "{}:", input.label)?;
        }
        out.push_str(&render(&input.doc)?);
    }
    Ok(out)
}

fn handle_dump(args: DumpArgs) -> Result<String> {
    let loaded = load_inputs(&args.input)?;
    let opts = DumpOptions {
        include_issues: args.issues,
    };
    render_each(&loaded, |doc| {
        if args.json {
            Ok(serde_json::to_string_pretty(doc)? + "\n")
        } else {
            Ok(dump_tree(doc.element(), opts))
        }
    })
}

fn handle_outline(args: InputArgs) -> Result<String> {
    let loaded = load_inputs(&args)?;
    render_each(&loaded, |doc| render_rows(&outline_rows(doc.element())))
}

fn handle_search(args: SearchArgs) -> Result<String> {
    let loaded = load_inputs(&args.input)?;
    render_each(&loaded, |doc| render_rows(&search(doc.element(), &args.query)))
}

fn handle_issues(args: JsonArgs) -> Result<String> {
    let loaded = load_inputs(&args.input)?;
    render_each(&loaded, |doc| {
        let records = collect_issues(doc.element());
        if args.json {
            return Ok(serde_json::to_string_pretty(&records)? + "\n");
        }
        let mut out = String::new();
        for record in &records {
            let location = record
                .issue
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "?".to_string());
            writeln!(
                out,
                "{}\t{} at line {}\t{}",
                location, record.element, record.element_start_line, record.issue
            )?;
        }
        Ok(out)
    })
}

fn handle_highlights(args: JsonArgs) -> Result<String> {
    let loaded = load_inputs(&args.input)?;
    render_each(&loaded, |doc| {
        let highlights = collect_highlights(doc.element());
        if args.json {
            return Ok(serde_json::to_string_pretty(&highlights)? + "\n");
        }
        let mut out = String::new();
        for h in &highlights {
            let mode = if h.line_wise { "lines" } else { "chars" };
            writeln!(out, "{}\t{}\t{}", h.location, mode, h.kind)?;
        }
        Ok(out)
    })
}

fn handle_stats(args: JsonArgs) -> Result<String> {
    let loaded = load_inputs(&args.input)?;
    render_each(&loaded, |doc| {
        let stats = project_document(doc);
        if args.json {
            return Ok(serde_json::to_string_pretty(&stats)? + "\n");
        }
        let mut out = String::new();
        writeln!(out, "lines: {}", stats.lines)?;
        writeln!(out, "days: {} ({} skipped)", stats.days, stats.skipped_days)?;
        if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
            writeln!(out, "dates: {first} .. {last}")?;
        }
        writeln!(
            out,
            "entries: {} ({} body lines)",
            stats.entries, stats.body_lines
        )?;
        writeln!(
            out,
            "issues: {} errors, {} warnings",
            stats.errors, stats.warnings
        )?;
        for (category, count) in &stats.categories {
            writeln!(out, "  {category}: {count}")?;
        }
        Ok(out)
    })
}

fn render_rows(rows: &[OutlineRow]) -> Result<String> {
    let mut out = String::new();
    for row in rows {
        let marker = match row.kind {
            RowKind::Element(_) if row.flagged => "!",
            RowKind::Element(_) => " ",
            RowKind::Issue(_) => "*",
        };
        writeln!(
            out,
            "{marker} {:>7} {:>3} {:>3}  {}{}",
            row.start,
            row.line_count,
            row.issues,
            "  ".repeat(row.depth),
            row.summary
        )?;
    }
    Ok(out)
}
