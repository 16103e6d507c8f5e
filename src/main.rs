#[macro_use]
extern crate tracing;

use std::env;

use dotenvy::dotenv;

mod config;
mod db;
mod error;
mod provider;
mod trace;

pub use config::CONFIG;
pub use error::Error;

pub type DbPool = deadpool_diesel::sqlite::Pool;
pub type DbConn = deadpool_diesel::sqlite::Object;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    launch_info();
    dotenv().ok();
    trace::init();

    let ips: Vec<String> = env::args().skip(1).collect();
    if ips.is_empty() {
        eprintln!("usage: ipgeo <ip> [<ip>...]");
        std::process::exit(2);
    }

    if let Err(err) = run(ips).await {
        error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(ips: Vec<String>) -> Result<(), Error> {
    db::run_migrations(&CONFIG.cache)?;
    let pool = init_dbpool();

    let provider = provider::new(&CONFIG.provider, pool)?;
    info!("resolving with provider {}", provider.name());

    for ip in ips {
        let payload = provider.lookup(&ip).await?;
        println!("{}", serde_json::to_string(&payload)?);
    }
    Ok(())
}

fn init_dbpool() -> DbPool {
    let manager = deadpool_diesel::sqlite::Manager::new(
        CONFIG.cache.as_str(),
        deadpool_diesel::Runtime::Tokio1,
    );
    deadpool_diesel::sqlite::Pool::builder(manager)
        .build()
        .unwrap()
}

fn launch_info() {
    println!();
    println!(
        "=================== Starting ipgeo {} ===================",
        env!("CARGO_PKG_VERSION")
    );
    println!();
}
