use std::{error::Error, net::Ipv4Addr, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use log::{error, info};
use openshock_clock::{
    shell,
    web::{self, AppState, DEFAULT_PORT},
    ConfigDir, Credentials, OpenShockGateway, Scheduler, SchedulerHandle,
};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// port the web ui listens on
    #[clap(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// where alarms and credentials are kept (defaults to the user config dir)
    #[clap(long)]
    config_dir: Option<PathBuf>,
    /// only serve the web ui, don't open a window
    #[clap(long)]
    headless: bool,
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// create an empty alarm file
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// save the OpenShock api key and shocker id
    Setup { api_key: String, shock_id: String },
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("openshock_clock")
        .map_err(|e| format!("couldn't initialize logger: {e:?}"))?;

    let args = Args::parse();
    let config_dir = match args.config_dir {
        Some(dir) => ConfigDir::new(dir),
        None => ConfigDir::default_location()?,
    };

    match args.command {
        Some(Command::Init { force }) => {
            let store = config_dir.alarm_store();
            if force || !store.is_present() {
                store.reset()?;
                println!("created {}", store.path().display());
            } else {
                println!(
                    "{} already exists, use --force to overwrite it",
                    store.path().display()
                );
            }
            return Ok(());
        }
        Some(Command::Setup { api_key, shock_id }) => {
            config_dir
                .credential_source()
                .save(&Credentials::new(api_key, shock_id))?;
            println!("saved credentials to {}", config_dir.credentials_path().display());
            return Ok(());
        }
        None => {}
    }

    info!("starting OpenShockClock in {}", config_dir.root().display());
    config_dir.create()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let store = config_dir.alarm_store();
    let credentials = config_dir.credential_source();
    let scheduler = SchedulerHandle::new(
        Scheduler::new(
            store.clone(),
            credentials.clone(),
            Arc::new(OpenShockGateway::new()?),
        ),
        runtime.handle().clone(),
    );
    scheduler.ensure_started();

    let listener = runtime.block_on(TcpListener::bind((Ipv4Addr::LOCALHOST, args.port)))?;
    let url = format!("http://localhost:{}", args.port);
    let state = AppState {
        store: store.clone(),
        credentials,
        scheduler: scheduler.clone(),
    };
    info!("initialization complete, serving {url}");

    if args.headless {
        runtime.block_on(web::serve(listener, state))?;
        return Ok(());
    }

    runtime.spawn(async move {
        if let Err(e) = web::serve(listener, state).await {
            error!("web ui stopped: {e}");
        }
    });
    // run the gui
    shell::run(url, store, scheduler).map_err(Into::into)
}
