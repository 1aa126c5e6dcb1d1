mod verbose;

use std::{path::PathBuf, time::Duration};

use clap::{FromArgMatches as _, IntoApp as _, Parser};
use tracing_error::ErrorLayer;
use tracing_subscriber::{prelude::*, EnvFilter, Registry};
use twelf::Layer;

use koohii_command_scrape::{Job, Lookups};
use koohii_common::Conf;

const JSON_CONFIG: &str = "koohii.json";
const TOML_CONFIG: &str = "koohii.toml";

/// Scrapes Kanji Koohii study pages and their shared stories into a JSON file
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(flatten)]
    verbose: verbose::Verbosity,

    /// First frame of the range to scrape
    #[clap(long = "firstFrame", default_value_t = 1)]
    first_frame: u32,

    /// Last frame of the range to scrape
    #[clap(long = "lastFrame", default_value_t = 3030)]
    last_frame: u32,

    /// Seconds to wait between two study pages
    #[clap(long, default_value_t = 2)]
    delay: u64,

    /// Skip lookups that fail to fetch instead of aborting the run
    #[clap(long)]
    keep_going: bool,

    /// File the scraped entries are written to
    output: PathBuf,

    /// File with one lookup per line, used instead of the frame range
    input: Option<PathBuf>,
}

/// Turns the command line and config into a job, or the reason it is not runnable.
fn job(cli: &Cli, conf: &Conf) -> Result<Job, String> {
    let (username, password) = match (conf.username.as_deref(), conf.password.as_deref()) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            (username.to_string(), password.to_string())
        }
        _ => return Err("a username and password are required".to_string()),
    };

    if cli.first_frame >= cli.last_frame {
        return Err(format!(
            "firstFrame ({}) must be lower than lastFrame ({})",
            cli.first_frame, cli.last_frame
        ));
    }

    let site = conf.site_url().map_err(|err| err.to_string())?;

    let lookups = match &cli.input {
        Some(path) => Lookups::File(path.clone()),
        None => Lookups::Frames {
            first: cli.first_frame,
            last: cli.last_frame,
        },
    };

    Ok(Job {
        site,
        username,
        password,
        lookups,
        output: cli.output.clone(),
        delay: Duration::from_secs(cli.delay),
        keep_going: cli.keep_going,
    })
}

#[tokio::main]
async fn main() -> Result<(), koohii_common::Report> {
    koohii_common::install()?;

    let mut command = Cli::command().args(&Conf::clap_args());
    let matches = command.clone().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;

    let mut layers = Vec::new();
    if std::path::Path::new(JSON_CONFIG).exists() {
        layers.push(Layer::Json(JSON_CONFIG.into()));
    }
    if std::path::Path::new(TOML_CONFIG).exists() {
        layers.push(Layer::Toml(TOML_CONFIG.into()));
    }
    layers.push(Layer::Env(Some("KOOHII_".to_string())));
    layers.push(Layer::Clap(matches));

    let conf = Conf::with_layers(&layers)?;

    let subscriber = Registry::default()
        .with(ErrorLayer::default())
        .with(tracing_subscriber::fmt::Layer::default())
        .with(EnvFilter::from_default_env().add_directive(cli.verbose.log_level_filter().into()));

    tracing::subscriber::set_global_default(subscriber)?;

    let job = match job(&cli, &conf) {
        Ok(job) => job,
        Err(problem) => {
            eprintln!("error: {}\n\n{}", problem, command.render_usage());
            std::process::exit(2);
        }
    };

    koohii_command_scrape::run(&job).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("koohii").chain(args.iter().copied())).unwrap()
    }

    fn conf(username: Option<&str>, password: Option<&str>) -> Conf {
        Conf {
            username: username.map(String::from),
            password: password.map(String::from),
            site: None,
        }
    }

    #[test]
    fn defaults_cover_the_whole_book() {
        let job = job(&cli(&["kanji.json"]), &conf(Some("kanji"), Some("hunter2"))).unwrap();

        assert_eq!(job.lookups, Lookups::Frames { first: 1, last: 3030 });
        assert_eq!(job.delay, Duration::from_secs(2));
        assert_eq!(job.site.as_str(), "http://kanji.koohii.com/");
        assert!(!job.keep_going);
    }

    #[test]
    fn input_file_replaces_range() {
        let job = job(
            &cli(&["--firstFrame", "5", "kanji.json", "lookups.txt"]),
            &conf(Some("kanji"), Some("hunter2")),
        )
        .unwrap();

        assert_eq!(job.lookups, Lookups::File(PathBuf::from("lookups.txt")));
        assert_eq!(job.output, PathBuf::from("kanji.json"));
    }

    #[test]
    fn credentials_are_required() {
        let cli = cli(&["kanji.json"]);

        assert!(job(&cli, &conf(None, Some("hunter2"))).is_err());
        assert!(job(&cli, &conf(Some("kanji"), None)).is_err());
        assert!(job(&cli, &conf(Some(""), Some("hunter2"))).is_err());
    }

    #[test]
    fn empty_or_inverted_range_is_rejected() {
        let conf = conf(Some("kanji"), Some("hunter2"));

        assert!(job(&cli(&["--firstFrame", "3", "--lastFrame", "3", "out.json"]), &conf).is_err());
        assert!(job(&cli(&["--firstFrame", "9", "--lastFrame", "3", "out.json"]), &conf).is_err());
        assert!(job(&cli(&["--firstFrame", "1", "--lastFrame", "3", "out.json"]), &conf).is_ok());
    }

    #[test]
    fn output_path_is_required() {
        assert!(Cli::try_parse_from(["koohii", "--firstFrame", "1"]).is_err());
    }
}
