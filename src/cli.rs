use bhav_index::config::{self, Config};

/// What the user asked the binary to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Ingest { date: Option<String> },
    Index { count: Option<usize> },
    Page { offset: usize, limit: usize },
    Search { query: String },
    Export { output: std::path::PathBuf },
}

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    pub config: Config,
    pub threads: Option<usize>,
    pub quiet: bool,
    pub command: Command,
}

fn command() -> clap::Command {
    clap::Command::new("bhav-index")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Ingest the daily equity bhavcopy and look records up by name")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("store")
                .short('s')
                .long("store")
                .env("BHAV_STORE")
                .help("Directory holding the persisted index")
                .default_value(config::DEFAULT_STORE_DIR)
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("field")
                .short('f')
                .long("field")
                .help("Identifying field used as the index key")
                .default_value(config::DEFAULT_ID_FIELD)
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("display")
                .long("display")
                .help("Comma-separated fields to display")
                .value_delimiter(',')
                .global(true)
                .num_args(1),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("Number of threads to use (default: all available)")
                .global(true)
                .num_args(1)
                .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
        )
        .arg(
            clap::Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Hide the progress bar")
                .global(true)
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(
            clap::Command::new("ingest")
                .about("Locate, download and index the archive for the current period")
                .arg(
                    clap::Arg::new("listing-url")
                        .long("listing-url")
                        .env("BHAV_LISTING_URL")
                        .help("Page whose links are searched for the archive")
                        .default_value(config::DEFAULT_LISTING_URL)
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("url")
                        .long("url")
                        .help("Download this archive directly instead of searching the listing page")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("date")
                        .short('d')
                        .long("date")
                        .help("Day (YYYY-MM-DD) whose month selects the archive (default: today)")
                        .num_args(1),
                )
                .arg(
                    clap::Arg::new("timeout")
                        .long("timeout")
                        .help("HTTP timeout in seconds")
                        .default_value("30")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
                ),
        )
        .subcommand(
            clap::Command::new("index")
                .about("Show the first records of the index")
                .arg(
                    clap::Arg::new("count")
                        .short('n')
                        .long("count")
                        .help("Number of records (default: page size)")
                        .num_args(1)
                        .value_parser(clap::builder::ValueParser::new(parse_usize_positive)),
                ),
        )
        .subcommand(
            clap::Command::new("page")
                .about("Show records by position")
                .arg(
                    clap::Arg::new("offset")
                        .long("offset")
                        .default_value("0")
                        .num_args(1)
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    clap::Arg::new("limit")
                        .long("limit")
                        .help("Number of records (default: page size)")
                        .num_args(1)
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            clap::Command::new("search")
                .about("Find records whose name starts with QUERY (case-insensitive)")
                .arg(clap::Arg::new("query").num_args(1)),
        )
        .subcommand(
            clap::Command::new("export")
                .about("Write the indexed records back out as CSV")
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .required(true)
                        .num_args(1),
                ),
        )
}

impl Args {
    /// Parses the process arguments; exits with usage on error.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &clap::ArgMatches) -> Self {
        let mut config = Config::default();
        if let Some(store) = matches.get_one::<String>("store") {
            config.store_dir = std::path::PathBuf::from(store);
        }
        if let Some(field) = matches.get_one::<String>("field") {
            config.id_field = field.clone();
        }
        if let Some(display) = matches.get_many::<String>("display") {
            config.display_fields = display.map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect();
        }

        let command = match matches.subcommand() {
            Some(("ingest", sub)) => {
                if let Some(url) = sub.get_one::<String>("listing-url") {
                    config.listing_url = url.clone();
                }
                config.artifact_url = sub.get_one::<String>("url").cloned();
                if let Some(secs) = sub.get_one::<usize>("timeout") {
                    config.timeout = std::time::Duration::from_secs(*secs as u64);
                }
                Command::Ingest {
                    date: sub.get_one::<String>("date").cloned(),
                }
            }
            Some(("index", sub)) => Command::Index {
                count: sub.get_one::<usize>("count").cloned(),
            },
            Some(("page", sub)) => Command::Page {
                offset: sub.get_one::<usize>("offset").cloned().unwrap_or(0),
                limit: sub.get_one::<usize>("limit").cloned().unwrap_or(config.page_size),
            },
            Some(("search", sub)) => Command::Search {
                query: sub.get_one::<String>("query").cloned().unwrap_or_default(),
            },
            Some(("export", sub)) => Command::Export {
                output: sub
                    .get_one::<String>("output")
                    .map(std::path::PathBuf::from)
                    .unwrap_or_default(),
            },
            _ => Command::Index { count: None },
        };

        Args {
            config,
            threads: matches.get_one::<usize>("threads").cloned(),
            quiet: matches.get_flag("quiet"),
            command,
        }
    }
}

/// Validates that the number of threads is a positive integer.
///
/// # Arguments
/// * `s` - String representation of the number of threads.
///
/// # Returns
/// * `Result<usize>` - Validated number of threads.
fn parse_usize_positive(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Must be a positive integer".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("Not a valid number: {}", e)),
    }
}
