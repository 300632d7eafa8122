use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use datapro_cli::label::{run_fit, run_infer, run_summary, FitCommandConfig};
use datapro_labelmodel::store::{JsonFileStore, ParameterStore};

fn store_arg() -> Arg {
    Arg::new("store")
        .short('s')
        .long("store")
        .help("Directory holding fitted runs (one JSON file per run)")
        .default_value("datapro_models")
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::DirPath)
}

fn run_name_arg() -> Arg {
    Arg::new("run_name")
        .short('r')
        .long("run-name")
        .help("Name the fitted parameters are stored under")
        .value_parser(clap::builder::NonEmptyStringValueParser::new())
}

fn matrix_arg() -> Arg {
    Arg::new("matrix")
        .help("Labeling matrix as (example_id, source, vote) triples (*.tsv or *.csv)")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("DATAPRO_LOG", "error,datapro=info"))
        .init();

    let matches = Command::new("datapro")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("datapro CLI - generative label models for weak supervision")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("fit")
                .about("Learn labeling-source reliabilities from a labeling matrix")
                .arg(matrix_arg())
                .arg(
                    Arg::new("config")
                        .help("Path to fit JSON configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(run_name_arg())
                .arg(
                    Arg::new("store")
                        .short('s')
                        .long("store")
                        .help("Directory to save the fitted run into. Overrides the config file.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::DirPath),
                )
                .arg(
                    Arg::new("iterations")
                        .short('n')
                        .long("iterations")
                        .help("Number of gradient steps. Overrides the config file.")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("learning_rate")
                        .short('l')
                        .long("learning-rate")
                        .help("Gradient step size. Overrides the config file.")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("prior")
                        .short('p')
                        .long("prior")
                        .help("Class prior P(y = +1). Overrides the config file.")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("batch_size")
                        .long("batch-size")
                        .help("Minibatch size. Full batch when omitted.")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Seed for minibatch sampling.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("divergence_policy")
                        .long("divergence-policy")
                        .help("Clamp thetas at the stability bound or fail the fit.")
                        .value_parser(["clip", "fail"])
                        .value_hint(ValueHint::Other),
                ),
        )
        .subcommand(
            Command::new("infer")
                .about("Compute posterior marginals with a fitted run")
                .arg(matrix_arg())
                .arg(run_name_arg().default_value("default"))
                .arg(store_arg())
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("Path to write marginals (*.tsv or *.csv). Defaults to stdout.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("summary")
                .about("Report coverage, overlaps, conflicts and accuracies per source")
                .arg(matrix_arg())
                .arg(run_name_arg())
                .arg(store_arg())
                .arg(
                    Arg::new("gold")
                        .short('g')
                        .long("gold")
                        .help("Gold labels as (example_id, label) rows (*.tsv or *.csv)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("runs")
                .about("List the runs saved in a store")
                .arg(store_arg()),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("fit", sub_m)) => handle_fit(sub_m),
        Some(("infer", sub_m)) => handle_infer(sub_m),
        Some(("summary", sub_m)) => handle_summary(sub_m),
        Some(("runs", sub_m)) => handle_runs(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_fit(matches: &ArgMatches) -> Result<()> {
    let matrix_path: &PathBuf = matches.get_one("matrix").unwrap();
    let config_path: Option<&PathBuf> = matches.get_one("config");
    log::info!("[datapro::fit] Fitting label model on {:?}", matrix_path);

    let config = FitCommandConfig::from_arguments(config_path, matches)?;
    if config_path.is_none() {
        let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
        eprintln!("[datapro::fit] No config provided; using:\n{}", default_json);
    }

    match run_fit(matrix_path, &config) {
        Ok(model) => {
            eprintln!(
                "[datapro::fit] Saved run '{}' ({} sources) to {:?}",
                config.run_name,
                model.n_sources(),
                config.store_dir
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Fit failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_infer(matches: &ArgMatches) -> Result<()> {
    let matrix_path: &PathBuf = matches.get_one("matrix").unwrap();
    let run_name: &String = matches.get_one("run_name").unwrap();
    let store_dir: &PathBuf = matches.get_one("store").unwrap();
    let output_path: Option<&PathBuf> = matches.get_one("output_file");
    log::info!(
        "[datapro::infer] Applying run '{}' to {:?}",
        run_name,
        matrix_path
    );

    match run_infer(matrix_path, store_dir, run_name, output_path.map(|p| p.as_path())) {
        Ok(estimates) => {
            log::info!(
                "[datapro::infer] Completed {} marginals ({} without votes)",
                estimates.len(),
                estimates.uncovered()
            );
            Ok(())
        }
        Err(e) => {
            log::error!("Inference failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_summary(matches: &ArgMatches) -> Result<()> {
    let matrix_path: &PathBuf = matches.get_one("matrix").unwrap();
    let store_dir: &PathBuf = matches.get_one("store").unwrap();
    let run = matches
        .get_one::<String>("run_name")
        .map(|name| (store_dir.as_path(), name.as_str()));
    let gold_path: Option<&PathBuf> = matches.get_one("gold");

    match run_summary(matrix_path, run, gold_path.map(|p| p.as_path())) {
        Ok(summaries) => {
            println!("{}", serde_json::to_string_pretty(&summaries)?);
            Ok(())
        }
        Err(e) => {
            log::error!("Summary failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_runs(matches: &ArgMatches) -> Result<()> {
    let store_dir: &PathBuf = matches.get_one("store").unwrap();
    match JsonFileStore::new(store_dir).list() {
        Ok(runs) => {
            for run in runs {
                println!("{}", run);
            }
            Ok(())
        }
        Err(e) => {
            log::error!("Listing runs failed: {}", e);
            std::process::exit(1)
        }
    }
}
