pub mod cli;
pub mod config;
pub mod connect;
pub mod encoder;
pub mod error;
pub mod plan;
pub mod schema;
pub mod sink;
pub mod source;
pub mod transfer;
pub mod value;

pub use encoder::{EncodeError, QuoteStyle, RecordEncoder};
pub use error::{Phase, Store, TransferError, TransferResult};
pub use plan::{TableSpec, TransferPlan};
pub use transfer::{TableStats, TransferOptions, TransferReport, TransferSession, pump_rows};
pub use value::{ColumnKind, FieldValue, Row};

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
            .init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use sqlx::sqlite::SqliteConnectOptions;
    use sqlx::{ConnectOptions, Connection, Executor};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    pub use database::{TestPostgres, TestPostgresError};

    /// SQLite database file in a temporary directory, removed on drop.
    pub struct SqliteFixture {
        _dir: TempDir,
        path: PathBuf,
    }

    impl SqliteFixture {
        /// Create the database and run `statements` against it.
        pub async fn new(statements: &[&str]) -> Result<Self, sqlx::Error> {
            let dir = tempfile::tempdir()?;
            let path = dir.path().join("source.db");

            let mut conn = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .connect()
                .await?;
            for statement in statements {
                (&mut conn).execute(*statement).await?;
            }
            conn.close().await?;

            Ok(Self { _dir: dir, path })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        /// Open a read-write connection for adding rows with bound values.
        pub async fn connect(&self) -> Result<sqlx::sqlite::SqliteConnection, sqlx::Error> {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .connect()
                .await
        }
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgConnection};
        use sqlx::{ConnectOptions, Connection, Executor};
        use testcontainers::ImageExt;
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        #[derive(Debug, Error)]
        pub enum TestPostgresError {
            #[error("container runtime unavailable: {0}")]
            Unavailable(#[from] TestcontainersError),
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
        }

        /// Ephemeral PostgreSQL database for integration tests.
        ///
        /// Uses `TEST_DATABASE_URL` when set, creating a uniquely named database
        /// on that server; otherwise launches a disposable container.
        pub struct TestPostgres {
            url: String,
            options: PgConnectOptions,
            admin_options: PgConnectOptions,
            database_name: Option<String>,
            _container: Option<ContainerAsync<Postgres>>,
        }

        impl TestPostgres {
            pub async fn start() -> Result<Self, TestPostgresError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) => Self::on_server(&url).await,
                    Err(_) => Self::in_container().await,
                }
            }

            async fn in_container() -> Result<Self, TestPostgresError> {
                let container = Postgres::default().with_tag("16-alpine").start().await?;
                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;

                let options = PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .username("postgres")
                    .password("postgres")
                    .database("postgres")
                    .log_statements(LevelFilter::Off);

                Ok(Self {
                    url: format!("postgres://postgres:postgres@{}:{}/postgres", host, port),
                    admin_options: options.clone(),
                    options,
                    database_name: None,
                    _container: Some(container),
                })
            }

            async fn on_server(url: &str) -> Result<Self, TestPostgresError> {
                let admin_options: PgConnectOptions = url.parse()?;
                let admin_options = admin_options.log_statements(LevelFilter::Off);

                let database_name = format!("pgcopy_{}", Uuid::new_v4().simple());
                let mut admin = admin_options.connect().await?;
                (&mut admin)
                    .execute(
                        format!("CREATE DATABASE \"{}\" TEMPLATE template0", database_name)
                            .as_str(),
                    )
                    .await?;
                admin.close().await?;

                Ok(Self {
                    url: url_with_database(url, &database_name),
                    options: admin_options.clone().database(&database_name),
                    admin_options,
                    database_name: Some(database_name),
                    _container: None,
                })
            }

            /// Connection URL of the test database, for driving the binary.
            pub fn url(&self) -> &str {
                &self.url
            }

            pub fn connect_options(&self) -> PgConnectOptions {
                self.options.clone()
            }

            pub async fn connect(&self) -> Result<PgConnection, sqlx::Error> {
                self.options.connect().await
            }

            /// Run setup statements outside any transfer transaction.
            pub async fn execute_all(&self, statements: &[&str]) -> Result<(), sqlx::Error> {
                let mut conn = self.connect().await?;
                for statement in statements {
                    (&mut conn).execute(*statement).await?;
                }
                conn.close().await
            }

            /// Drop the database created on a shared server. Containers are
            /// removed when dropped.
            pub async fn close(self) -> Result<(), sqlx::Error> {
                if let Some(name) = &self.database_name {
                    let mut admin = self.admin_options.connect().await?;
                    (&mut admin)
                        .execute(format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", name).as_str())
                        .await?;
                    admin.close().await?;
                }
                Ok(())
            }
        }

        // Swap the database path of a postgres URL, keeping any query string.
        fn url_with_database(url: &str, database: &str) -> String {
            let (base, query) = match url.split_once('?') {
                Some((base, query)) => (base, Some(query)),
                None => (url, None),
            };
            let (scheme, rest) = base.split_once("://").unwrap_or(("postgres", base));
            let authority = rest.split('/').next().unwrap_or(rest);

            let mut swapped = format!("{}://{}/{}", scheme, authority, database);
            if let Some(query) = query {
                swapped.push('?');
                swapped.push_str(query);
            }
            swapped
        }

    }
}
