use std::{process, sync::Arc};

use clap::Parser;
use dealsift::{
    application::{error::AppError, store::PreferenceStore, sync::PreferenceSync},
    config::{self, CliArgs, Command},
    domain::preferences::{PriceRange, UserPreference},
    infra::{db::SqliteStore, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let cli = CliArgs::parse();
    let settings = config::load(&cli)?;
    telemetry::init(&settings.logging)?;

    let command = cli.command.unwrap_or(Command::List);
    let store = Arc::new(
        SqliteStore::open(
            &settings.database.path,
            settings.database.max_connections.get(),
        )
        .await?,
    );

    let result = execute(&command, store.clone()).await;
    store.close().await;
    result
}

async fn execute(command: &Command, store: Arc<SqliteStore>) -> Result<(), AppError> {
    match command {
        Command::Init => {
            let created = store.create_schema().await?;
            if created {
                info!("preference schema created");
            } else {
                info!("preference schema already present");
            }
            Ok(())
        }
        Command::Destroy => {
            let dropped = store.drop_schema().await?;
            if dropped {
                info!("preference schema dropped");
            } else {
                info!("no preference schema to drop");
            }
            Ok(())
        }
        command => {
            store.create_schema().await?;
            let sync = PreferenceSync::new(store.clone() as Arc<dyn PreferenceStore>);
            sync.warm().await?;
            dispatch(command, &sync, store.as_ref()).await
        }
    }
}

async fn dispatch(
    command: &Command,
    sync: &PreferenceSync,
    store: &SqliteStore,
) -> Result<(), AppError> {
    match command {
        Command::Add { category } => {
            sync.add_category(category).await?;
            println!("category `{category}` is live");
        }
        Command::Remove { category } => {
            if sync.remove_category(category).await? {
                println!("removed `{category}`");
            } else {
                println!("no preference for `{category}`");
            }
        }
        Command::SetRange { category, min, max } => {
            sync.set_price_range(category, PriceRange::new(*min, *max))
                .await?;
            println!("price range [{min}, {max}] set on `{category}`");
        }
        Command::ClearRange { category } => {
            if sync.clear_price_range(category).await? {
                println!("cleared price range on `{category}`");
            } else {
                println!("no preference for `{category}`");
            }
        }
        Command::Show { category } => match sync.find_in_cache(category) {
            Some(preference) => print_preference(&preference),
            None => println!("no preference for `{category}`"),
        },
        Command::List => {
            let all = store.list_all().await?;
            if all.is_empty() {
                println!("no preferences stored");
            }
            for preference in &all {
                print_preference(preference);
            }
        }
        Command::Init | Command::Destroy => unreachable!("handled before dispatch"),
    }

    Ok(())
}

fn print_preference(preference: &UserPreference) {
    if preference.has_price_range() {
        println!(
            "{}: [{}, {}]",
            preference.category, preference.min_price, preference.max_price
        );
    } else {
        println!("{}: any price", preference.category);
    }
}
