use clap::Parser;
use eyre::{Result, WrapErr};
use fleetop::app::{App, AppContext};
use fleetop::config::{Cli, Config};
use fleetop::counts::{Aggregator, CountsStore, Poller, RefreshInterval};
use fleetop::fleet::ApiClient;
use fleetop::io::handler::IoAsyncHandler;
use fleetop::io::IoEvent;
use fleetop::listing::{FileStore, StateStore};
use fleetop::start_ui;
use log::info;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    let log_path = config.log_file_path();
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d} {l} - {m}\n")))
        .build(&log_path)
        .wrap_err_with(|| format!("cannot open log file {}", log_path.display()))?;
    let log_config = LogConfig::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .build(
            Root::builder()
                .appender("logfile")
                .build(config.log_level_filter()?),
        )?;
    log4rs::init_config(log_config)?;
    info!("fleetop {} starting", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn StateStore> = Arc::new(FileStore::open(config.state_file_path()));
    // An explicit --refresh beats the interval picked in a previous session
    let refresh_interval = match cli.refresh {
        Some(_) => config.refresh_interval,
        None => RefreshInterval::load(store.as_ref(), config.refresh_interval),
    };

    let client = ApiClient::new(&config.server_url, config.request_timeout())?;
    let (counts, _counts_writer) = CountsStore::spawn();
    let (node_refs_tx, node_refs_rx) = watch::channel(Vec::new());
    let aggregator = Arc::new(Aggregator::new(client.clone(), counts.dispatcher()));
    let poller = Poller::new(Arc::clone(&aggregator), node_refs_rx);

    let (sync_io_tx, mut sync_io_rx) = mpsc::channel::<IoEvent>(100);
    let app = Arc::new(Mutex::new(App::new(AppContext {
        io_tx: sync_io_tx,
        counts,
        node_refs: node_refs_tx,
        last_refresh: poller.last_refresh(),
        store,
        page_size: config.page_size,
        refresh_interval,
    })));
    let app_ui = Arc::clone(&app);

    tokio::spawn(async move {
        let mut handler = IoAsyncHandler::new(app, client, aggregator, poller);
        while let Some(io_event) = sync_io_rx.recv().await {
            handler.handle_io_event(io_event).await;
        }
    });

    start_ui(&app_ui).await?;
    info!("fleetop stopped");
    Ok(())
}
