use chatnet_server::config::ServerConfig;
use chatnet_server::Server;
use chatnet_support::logging;
use clap::{App, Arg};

fn main() {
    let matches = App::new("Chat Server")
        .version("1.0")
        .about("Runs the chat roster/dispatcher server.")
        .arg(
            Arg::with_name("CONFIG_FILE")
                .long("config")
                .help("Path to a TOML config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("PORT")
                .long("port")
                .help("Port to listen on, overrides the config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("MAX_CLIENTS")
                .long("max-clients")
                .help("Maximum concurrent client sessions, overrides the config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .long("verbose")
                .short("v")
                .help("Enables debug-level logging"),
        )
        .get_matches();

    let log = logging::init(matches.is_present("verbose"));

    let mut config = match matches.value_of("CONFIG_FILE") {
        Some(path) => ServerConfig::load(path).expect("failed to load configuration file"),
        None => ServerConfig::default(),
    };

    if let Some(port) = matches.value_of("PORT") {
        config.port = port.parse().expect("PORT must be a valid u16");
    }

    if let Some(max_clients) = matches.value_of("MAX_CLIENTS") {
        config.max_clients = max_clients.parse().expect("MAX_CLIENTS must be a valid u16");
    }

    logging::info!(log, "starting chat server"; "port" => config.port, "max_clients" => config.max_clients);

    let mut server =
        Server::bind(config.port, config.max_clients as usize, log).expect("failed to bind server listeners");

    loop {
        server.step(None).expect("event loop I/O failure");
    }
}
