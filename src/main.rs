use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use quittungen::config::{self, Config, raw};
use quittungen::generate;
use std::convert::TryInto;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let matches = Command::new("Quittungen")
        .version("0.1.0")
        .about("Generates school fee receipts from a roster, a price table and a Word template")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("YAML configuration file, read if present [default: quittungen.yaml]")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::new("roster")
                .short('r')
                .long("roster")
                .help("Roster workbook, one child per row")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::new("prices")
                .short('p')
                .long("prices")
                .help("Price workbook with the Gebuehren and Beitraege sheets")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::new("template")
                .short('t')
                .long("template")
                .help("Word template containing {{PLACEHOLDERS}}")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Directory the receipts are written to")
                .value_name("DIR")
                .takes_value(true),
        )
        .arg(
            Arg::new("layout")
                .short('l')
                .long("layout")
                .help("Roster layout")
                .value_name("LAYOUT")
                .possible_values(["family", "member"])
                .takes_value(true),
        )
        .arg(
            Arg::new("date")
                .short('d')
                .long("date")
                .help("Issue date printed on the receipts [default: today]")
                .value_name("YYYY-MM-DD")
                .takes_value(true),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Prints the report as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Logs every household"),
        )
        .get_matches();

    let default_filter = if matches.is_present("verbose") {
        "quittungen=debug"
    } else {
        "quittungen=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&matches)?;
    let report = generate(&config)?;
    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

/// The configuration file, if any, with command line options applied on top.
fn load_config(matches: &ArgMatches) -> Result<Config> {
    let file = match matches.value_of("config") {
        Some(path) => raw::Config::from_file(Path::new(path))?,
        None if Path::new(config::DEFAULT_CONFIG).exists() => {
            raw::Config::from_file(Path::new(config::DEFAULT_CONFIG))?
        }
        None => raw::Config::default(),
    };
    let overrides = raw::Config {
        roster: matches.value_of("roster").map(PathBuf::from),
        prices: matches.value_of("prices").map(PathBuf::from),
        template: matches.value_of("template").map(PathBuf::from),
        output: matches.value_of("output").map(PathBuf::from),
        layout: matches.value_of("layout").map(String::from),
        date: matches.value_of("date").map(String::from),
        ..Default::default()
    };
    file.merge(overrides).try_into()
}
