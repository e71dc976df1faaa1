use std::io::{self, BufRead, Cursor, Write};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gene_model_export::app::{App, ExportOptions, ProgressSink};
use gene_model_export::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use gene_model_export::domain::{Biotype, ColumnPolicy, Karyotype, OrganismId};
use gene_model_export::ensembl::EnsemblHttpClient;
use gene_model_export::error::GeneModelError;
use gene_model_export::output::{ConsoleOutput, JsonOutput, OutputMode};
use gene_model_export::prompt::{self, Menu, QUIT_TOKEN};
use gene_model_export::session::RegionMenu;
use gene_model_export::store::FsArtifactStore;

type HttpApp = App<EnsemblHttpClient, FsArtifactStore>;

#[derive(Parser)]
#[command(name = "gmexport")]
#[command(about = "Download Ensembl Genomes gene models and export them per chromosome")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, help = "Path to a JSON config file (default: ./gmexport.json when present)")]
    config: Option<String>,

    #[arg(long, global = true, help = "Ensembl REST server root")]
    server: Option<String>,

    #[arg(long, global = true, help = "Directory holding the cached JSON payloads")]
    cache_dir: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List species of the configured division")]
    Species,
    #[command(about = "Show the assembly and karyotype of a species")]
    Assembly(OrganismArgs),
    #[command(about = "List gene biotypes annotated for a species")]
    Biotypes(OrganismArgs),
    #[command(about = "Filter gene models by biotype and export them per region")]
    Export(ExportArgs),
}

#[derive(Args)]
struct OrganismArgs {
    organism: String,
}

#[derive(Args)]
struct ExportArgs {
    organism: String,

    #[arg(long)]
    biotype: String,

    #[arg(long, help = "Comma-separated chromosome list; fetched from the assembly when omitted")]
    karyotype: Option<String>,

    #[arg(long = "region", help = "Region to export, by menu number or name; repeat for several")]
    regions: Vec<String>,

    #[arg(long)]
    column_policy: Option<ColumnPolicy>,

    #[arg(long)]
    delimiter: Option<char>,

    #[arg(long)]
    export_dir: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<GeneModelError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GeneModelError) -> u8 {
    match error {
        err if err.is_retrieval_failure() => 3,
        GeneModelError::MalformedData { .. } => 4,
        GeneModelError::EmptyFilterResult { .. }
        | GeneModelError::MissingRegionColumn
        | GeneModelError::InvalidOrganism(_)
        | GeneModelError::InvalidCategory(_)
        | GeneModelError::InvalidRegion(_)
        | GeneModelError::ConfigRead(_)
        | GeneModelError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let mut overrides = ConfigOverrides {
        server: cli.server,
        cache_dir: cli.cache_dir,
        ..ConfigOverrides::default()
    };
    if let Some(Commands::Export(args)) = &cli.command {
        overrides.export_dir = args.export_dir.clone();
        overrides.delimiter = args.delimiter;
        overrides.column_policy = args.column_policy;
    }
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;
    let app = build_app(&config)?;

    match cli.command {
        Some(Commands::Species) => run_species(&app, output_mode),
        Some(Commands::Assembly(args)) => run_assembly(&app, args, output_mode),
        Some(Commands::Biotypes(args)) => run_biotypes(&app, args, output_mode),
        Some(Commands::Export(args)) => run_export(&app, &config, args, output_mode),
        None => match output_mode {
            OutputMode::Interactive => run_guided(&app, &config),
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `gmexport --help`)",
            )),
        },
    }
}

fn build_app(config: &ResolvedConfig) -> miette::Result<HttpApp> {
    let client = EnsemblHttpClient::new(&config.server, &config.division, config.timeout)?;
    let store = FsArtifactStore::new(config.cache_dir.clone());
    store.ensure_cache_root()?;
    Ok(App::new(client, store))
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Interactive => &ConsoleOutput,
        OutputMode::NonInteractive => &JsonOutput,
    }
}

fn run_species(app: &HttpApp, output_mode: OutputMode) -> miette::Result<()> {
    let species = app.species(sink_for(output_mode))?;
    match output_mode {
        OutputMode::Interactive => ConsoleOutput::print_species(&species),
        OutputMode::NonInteractive => JsonOutput::print_species(&species).into_diagnostic()?,
    }
    Ok(())
}

fn run_assembly(app: &HttpApp, args: OrganismArgs, output_mode: OutputMode) -> miette::Result<()> {
    let organism: OrganismId = args.organism.parse()?;
    let assembly = app.assembly(&organism, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Interactive => ConsoleOutput::print_assembly(&assembly),
        OutputMode::NonInteractive => JsonOutput::print_assembly(&assembly).into_diagnostic()?,
    }
    Ok(())
}

fn run_biotypes(app: &HttpApp, args: OrganismArgs, output_mode: OutputMode) -> miette::Result<()> {
    let organism: OrganismId = args.organism.parse()?;
    let biotypes = app.biotypes(&organism, sink_for(output_mode))?;
    match output_mode {
        OutputMode::Interactive => ConsoleOutput::print_biotypes(&biotypes),
        OutputMode::NonInteractive => JsonOutput::print_biotypes(&biotypes).into_diagnostic()?,
    }
    Ok(())
}

fn run_export(
    app: &HttpApp,
    config: &ResolvedConfig,
    args: ExportArgs,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let sink = sink_for(output_mode);
    let organism: OrganismId = args.organism.parse()?;
    let biotype: Biotype = args.biotype.parse()?;
    let explicit = args
        .karyotype
        .as_deref()
        .map(str::parse::<Karyotype>)
        .transpose()?;
    let karyotype = app.karyotype(&organism, explicit, sink)?;
    RegionMenu::new(karyotype.clone()).check_tokens(&args.regions)?;
    let options = export_options(config);

    // Scripted runs answer the region prompt from the command line and then quit.
    let scripted = match (args.regions.is_empty(), output_mode) {
        (false, _) => Some(script(args.regions)),
        (true, OutputMode::NonInteractive) => {
            let every_region = (1..=karyotype.len() + 1).map(|index| index.to_string()).collect();
            Some(script(every_region))
        }
        (true, OutputMode::Interactive) => None,
    };

    let result = match scripted {
        Some(mut input) => {
            let mut output: Box<dyn Write> = match output_mode {
                OutputMode::Interactive => Box::new(io::stdout()),
                OutputMode::NonInteractive => Box::new(io::sink()),
            };
            app.export(
                &organism,
                &biotype,
                karyotype,
                &options,
                &mut input,
                &mut output,
                sink,
            )
        }
        None => {
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut output = io::stdout();
            app.export(
                &organism,
                &biotype,
                karyotype,
                &options,
                &mut input,
                &mut output,
                sink,
            )
        }
    }?;

    match output_mode {
        OutputMode::Interactive => ConsoleOutput::print_export(&result),
        OutputMode::NonInteractive => JsonOutput::print_export(&result).into_diagnostic()?,
    }
    Ok(())
}

fn run_guided(app: &HttpApp, config: &ResolvedConfig) -> miette::Result<()> {
    let sink = &ConsoleOutput;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    writeln!(output, "This program lets you pull gene models from Ensembl Genomes.")
        .into_diagnostic()?;
    writeln!(output, "Data is downloaded for a single species at a time.").into_diagnostic()?;
    writeln!(output).into_diagnostic()?;

    let species = app.species(sink)?;
    let menu = Menu::new(
        species
            .into_iter()
            .map(|info| (info.display_name.clone(), info))
            .collect(),
    );
    let chosen = prompt::choose(
        &menu,
        "Here is a list of currently available species with genomes:",
        "Enter the number for the species you are interested in: ",
        &mut input,
        &mut output,
    )?;
    let organism: OrganismId = chosen.name.parse()?;

    let assembly = app.assembly(&organism, sink)?;
    writeln!(
        output,
        "We will use the following assembly: {}",
        assembly.assembly_name
    )
    .into_diagnostic()?;
    writeln!(output).into_diagnostic()?;
    let karyotype = Karyotype::new(assembly.karyotype.clone())?;

    let biotypes = app.biotypes(&organism, sink)?;
    let menu = Menu::new(
        biotypes
            .into_iter()
            .map(|name| (name.clone(), name))
            .collect(),
    );
    let biotype = prompt::choose(
        &menu,
        "Gene biotypes annotated for this species:",
        "What type of annotations are you interested in? Select one: ",
        &mut input,
        &mut output,
    )?;
    let biotype: Biotype = biotype.parse()?;

    writeln!(
        output,
        "Okay, so we're using the assembly <{}> of {} for {} genes.",
        assembly.assembly_name, chosen.display_name, biotype
    )
    .into_diagnostic()?;
    writeln!(output).into_diagnostic()?;

    let result = app
        .export(
            &organism,
            &biotype,
            karyotype,
            &export_options(config),
            &mut input,
            &mut output,
            sink,
        )?;
    ConsoleOutput::print_export(&result);
    writeln!(output, "Exiting program.").into_diagnostic()?;
    Ok(())
}

fn export_options(config: &ResolvedConfig) -> ExportOptions {
    ExportOptions {
        column_policy: config.column_policy,
        export_dir: config.export_dir.clone(),
        delimiter: config.delimiter,
    }
}

fn script(tokens: Vec<String>) -> impl BufRead {
    let mut lines = tokens.join("\n");
    lines.push('\n');
    lines.push_str(QUIT_TOKEN);
    lines.push('\n');
    Cursor::new(lines.into_bytes())
}
