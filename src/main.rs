use dwhq::config;
use dwhq::core::db::connection::redact;
use dwhq::odbc::OdbcBackend;
use dwhq::Dwh;
use tracing::info;

fn main() {
    // Initialize the logging system using tracing subscriber
    tracing_subscriber::fmt::init();

    info!("Starting dwhq...");

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: dwhq <config.toml> <sql>");
        std::process::exit(2);
    }
    let config_path = &args[1];
    let sql = &args[2];

    let config = match config::load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    let mut dwh = match Dwh::new(Box::new(OdbcBackend::new()), config.settings()) {
        Ok(dwh) => dwh,
        Err(e) => {
            eprintln!("Failed to set up the warehouse accessor: {}", e);
            std::process::exit(1);
        }
    };

    println!("Using driver: {}", dwh.driver());
    println!("Connecting with: {}", redact(&dwh.connection_string()));

    match dwh.fetch_tables(sql) {
        Ok(tables) => {
            for (index, table) in tables.iter().enumerate() {
                if tables.len() > 1 {
                    println!("-- result set {} --", index + 1);
                }
                print!("{}", table.render());
                println!("({} rows)", table.row_count());
            }
        }
        Err(e) => {
            eprintln!("Query failed: {}", e);
            std::process::exit(1);
        }
    }
}
