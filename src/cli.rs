use clap::{Arg, ArgMatches, Command};
use hostconverge::PassOptions;
use hostconverge::ServiceDiscovery;
use hostconverge::launcher::{DEFAULT_DISCOVERY_NAME, DEFAULT_SEARCH_DOMAIN};
use std::env;
use std::path::PathBuf;

pub struct Config {
    pub config_path: PathBuf,
    pub interval: Option<u64>,
    pub options: PassOptions,
}

impl From<ArgMatches> for Config {
    fn from(matches: ArgMatches) -> Self {
        let discovery = if matches.get_flag("no_dns") {
            None
        } else {
            Some(ServiceDiscovery {
                name: matches
                    .get_one::<String>("dns_name")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_DISCOVERY_NAME.to_string()),
                search_domain: matches
                    .get_one::<String>("dns_search")
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_SEARCH_DOMAIN.to_string()),
            })
        };
        Config {
            config_path: matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_default(),
            interval: matches.get_one::<u64>("watch").copied(),
            options: PassOptions {
                discovery,
                stop_grace_seconds: matches
                    .get_one::<i32>("stop_timeout")
                    .copied()
                    .unwrap_or(hostconverge::planner::DEFAULT_STOP_GRACE_SECONDS),
            },
        }
    }
}

fn command() -> Command {
    let default_watch_interval = env::var("WATCH_INTERVAL").unwrap_or_else(|_| "60".to_string());
    Command::new("hostconverge")
        .version(env!("CARGO_PKG_VERSION"))
        .about("converge the containers of this host to a declared configuration")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .env("HOSTCONVERGE_CONFIG")
                .help("JSON document describing the desired containers")
                .value_name("FILE")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("watch")
                .short('w')
                .long("watch")
                .help(format!(
                    "Watch mode: re-run every N seconds (default: {default_watch_interval})"
                ))
                .value_name("SECONDS")
                .num_args(0..=1)
                .default_missing_value(default_watch_interval)
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("dns_name")
                .long("dns-name")
                .help("service discovery name injected as dns server into launched containers")
                .value_name("HOST")
                .default_value(DEFAULT_DISCOVERY_NAME),
        )
        .arg(
            Arg::new("dns_search")
                .long("dns-search")
                .help("dns search domain set together with the discovered dns server")
                .value_name("DOMAIN")
                .default_value(DEFAULT_SEARCH_DOMAIN),
        )
        .arg(
            Arg::new("no_dns")
                .long("no-dns")
                .help("do not inject a dns server into launched containers")
                .num_args(0)
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stop_timeout")
                .long("stop-timeout")
                .help("seconds a removed container gets to stop before it is killed")
                .value_name("SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(i32)),
        )
}

pub(crate) fn configure_cli() -> Config {
    command().get_matches().into()
}
