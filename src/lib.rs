use std::io::Read;
use std::sync::Arc;

use opentelemetry_tide::TideExt;
use structopt::StructOpt;

pub mod db;
pub mod models;
pub mod telemetry;
pub mod web;

use db::PhotoStore;
use web::html::utils::{Renderer, TeraRenderer};

#[derive(Clone, Debug)]
pub struct State {
    pub args: Arc<Args>,
    pub store: Arc<dyn PhotoStore>,
    pub renderer: Arc<dyn Renderer>,
    pub cache_busting_string: Option<String>,
}

#[derive(Debug)]
pub enum Error {
    TemplateParseError(tera::Error),
    TelemetryInitError(anyhow::Error),
    DatabaseError(sqlx::Error),
    MigrationError(sqlx::migrate::MigrateError),
    ListenError(std::io::Error),
    TemplatePathError(std::io::Error),
    StaticPathError(std::io::Error),
}

impl From<Error> for i32 {
    fn from(error: Error) -> i32 {
        match error {
            Error::TemplateParseError(_) => 3,
            Error::TelemetryInitError(_) => 4,
            Error::DatabaseError(_) => 5,
            Error::MigrationError(_) => 6,
            Error::ListenError(_) => 7,
            Error::TemplatePathError(_) => 8,
            Error::StaticPathError(_) => 9,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TemplateParseError(err) => {
                write!(f, "Template parsing error: {}", err)
            },
            Error::TelemetryInitError(err) => {
                write!(f, "Failed to init telemetry: {}", err)
            },
            Error::DatabaseError(err) => {
                write!(f, "Failed to connect to database: {}", err)
            },
            Error::MigrationError(err) => {
                write!(f, "Failed to run database migrations: {}", err)
            },
            Error::ListenError(err) => {
                write!(f, "Failed to start listening: {}", err)
            },
            Error::TemplatePathError(err) => {
                write!(f, "Could not resolve template path: {}", err)
            },
            Error::StaticPathError(err) => {
                write!(f, "Could not serve static directory: {}", err)
            },
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct Args {
    /// Host address to bind to.
    #[structopt(long, default_value = "localhost", env = "PHOTOGRAM_BIND_ADDRESS")]
    address: String,
    /// Port to bind to.
    #[structopt(long, default_value = "8166", env = "PHOTOGRAM_BIND_PORT")]
    port: u16,

    /// PostgreSQL database url. Photos are kept in memory when unset.
    #[structopt(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Gallery base URL.
    #[structopt(long, env = "PHOTOGRAM_BASE_URL")]
    base_url: String,

    /// Path to Tera templates directory
    #[structopt(
        long,
        parse(from_os_str),
        default_value = "./templates",
        env = "PHOTOGRAM_TEMPLATE_PATH"
    )]
    template_path: std::path::PathBuf,

    /// Path to the directory served under `/static`
    #[structopt(
        long,
        parse(from_os_str),
        default_value = "./static",
        env = "PHOTOGRAM_STATIC_PATH"
    )]
    static_path: std::path::PathBuf,
}

/// Builds the tide application around an already assembled state.
pub fn app(state: State) -> std::io::Result<tide::Server<State>> {
    let static_path = state.args.static_path.clone();
    let mut app = tide::with_state(state);

    app.with_default_tracing_middleware();

    web::mount(&mut app, &static_path)?;

    Ok(app)
}

pub async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    let args = Arc::new(Args::from_args());

    telemetry::init().map_err(Error::TelemetryInitError)?;

    let store: Arc<dyn PhotoStore> = match &args.database_url {
        Some(database_url) => {
            let pool = db::get_pool(database_url)
                .await
                .map_err(Error::DatabaseError)?;
            db::migrate(&pool).await.map_err(Error::MigrationError)?;
            Arc::new(pool)
        },
        None => {
            tracing::warn!("no database configured, photos will only be kept in memory");
            Arc::new(db::MemoryStore::new())
        },
    };

    let template_path = args
        .template_path
        .canonicalize()
        .map_err(Error::TemplatePathError)?;
    let tera = match tera::Tera::new(&template_path.join("**/*.html").to_string_lossy()) {
        Ok(t) => t,
        Err(e) => {
            return Err(Error::TemplateParseError(e));
        },
    };

    let cache_busting_string = match std::fs::File::open(template_path.join("cache-buster")) {
        Ok(mut file) => {
            let mut data = String::new();
            match file.read_to_string(&mut data) {
                Ok(_) => data.split_whitespace().next().map(|s| s.to_string()),
                Err(err) => {
                    tracing::warn!("couldn't read cache busting string from file: {}", err);
                    None
                },
            }
        },
        Err(_) => None,
    };

    let state = State {
        args: args.clone(),
        store,
        renderer: Arc::new(TeraRenderer::new(tera)),
        cache_busting_string,
    };
    let server = app(state).map_err(Error::StaticPathError)?;

    let address: &str = args.address.as_ref();
    server
        .listen((address, args.port))
        .await
        .map_err(Error::ListenError)?;

    Ok(())
}
