use std::env;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw_args: Vec<String> = env::args().collect();
    match raw_args.get(1).map(|s| s.as_str()) {
        Some("serve") => {
            let port = raw_args
                .get(2)
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080);
            if let Err(e) = fire_projection::api::run_http_server(port).await {
                log::error!("server error: {e}");
                std::process::exit(1);
            }
        }
        Some("project") => {
            // "project" stands in for the program name when clap parses the rest.
            if let Err(e) = fire_projection::api::run_cli(raw_args.iter().skip(1)) {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
        _ => {
            eprintln!("Usage: fire-projection serve [port]");
            eprintln!("       fire-projection project [--initial-amount N ...] [--format table|json]");
            std::process::exit(1);
        }
    }
}
