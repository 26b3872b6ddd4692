use sqlx::Executor;
use std::{sync::LazyLock, time::Duration};

use inkpress::{
    auth::{ActionToken, TokenPurpose},
    configuration::Settings,
    repository::AuthRepo,
    seeder::{self, AdminAccount},
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use sqlx::{Connection, PgConnection, PgPool};
use tokio::task::JoinHandle;
use url::Url;
use uuid::Uuid;

static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info";
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(default_filter_level, false, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(default_filter_level, false, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub struct TestUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub struct UserCredentials {
    pub access_token: String,
    pub body: Value,
}

pub struct TestApp {
    _db_guard: DbGuard,
    pub base_url: String,
    pub http_client: reqwest::Client,
    pub db: PgPool,
    pub test_user: TestUser,
    pub jwt_secret: String,
    _handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestApp {
    pub async fn new() -> Self {
        // only init logger once
        LazyLock::force(&TRACING);

        // build the configuration
        let cfg = {
            let mut orig = Settings::try_load(&[
                "configuration/application.toml",
                "configuration/test.toml",
            ])
            .expect("Failed to load test config");

            // apply random port cfg
            orig.server.port = 0;

            // apply random db name
            let new_db_name = Uuid::new_v4().to_string().replace("-", "");
            let orig_url = &orig.database.url;
            orig.database.url = replace_db_name(orig_url, &new_db_name);

            orig
        };

        let db_url = &cfg.database.url;

        // init the random database
        let db = setup_database(db_url).await;
        // also init the db guard
        let db_guard = DbGuard {
            db_url: db_url.clone(),
        };

        // init test user
        let test_user = setup_test_user(&db).await;

        // build the server
        let app = Application::build(&cfg)
            .await
            .expect("Failed to create test app");

        let port = app.port();

        // run the server in another thread
        let handle = tokio::spawn(app.run_until_stopped());

        let base_url = format!("http://127.0.0.1:{port}");

        // create the http client
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            _handle: handle,
            base_url,
            http_client,
            test_user,
            jwt_secret: cfg.auth.jwt_secret.clone(),
            db,
            _db_guard: db_guard,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach a bearer token to `request`.
    pub fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request.header("Authorization", format!("Bearer {access_token}"))
    }

    pub async fn login(&self, username: &str, password: &str) -> Response {
        self.http_client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to send login request")
    }

    /// Log in as a given user and return the access token.
    pub async fn auth_user(&self, username: &str, password: &str) -> UserCredentials {
        let res = self.login(username, password).await;
        assert_eq!(
            res.status(),
            StatusCode::OK,
            "Failed to login as {username}"
        );

        let body: Value = res.json().await.expect("Failed to receive login json");
        let access_token = body["access_token"]
            .as_str()
            .expect("No access_token in login response")
            .to_string();

        UserCredentials { access_token, body }
    }

    pub async fn auth_test_user(&self) -> UserCredentials {
        self.auth_user(&self.test_user.username, &self.test_user.password)
            .await
    }

    /// POST `body` to a dashboard endpoint as `access_token` and return the response.
    pub async fn dashboard_post(&self, path: &str, access_token: &str, body: &Value) -> Response {
        self.authorized(self.http_client.post(self.url(path)), access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to send dashboard request")
    }

    pub async fn dashboard_put(&self, path: &str, access_token: &str, body: &Value) -> Response {
        self.authorized(self.http_client.put(self.url(path)), access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to send dashboard request")
    }

    pub async fn dashboard_get(&self, path: &str, access_token: &str) -> Response {
        self.authorized(self.http_client.get(self.url(path)), access_token)
            .send()
            .await
            .expect("Failed to send dashboard request")
    }

    /// Issue the token a verification or password reset mail would carry.
    pub async fn action_token(&self, username: &str, purpose: TokenPurpose) -> String {
        let user = AuthRepo::new(self.db.clone())
            .find_by_username(username)
            .await
            .expect("Failed to query user")
            .expect("No such user");

        ActionToken::new(&user, purpose, Duration::from_secs(300))
            .issue(&self.jwt_secret)
            .expect("Failed to issue action token")
    }

    /// Look up the id of a seeded permission.
    pub async fn permission_id(&self, name: &str) -> Uuid {
        sqlx::query_scalar("SELECT id FROM permissions WHERE name = $1 AND deleted_at IS NULL")
            .bind(name)
            .fetch_one(&self.db)
            .await
            .expect("Failed to query permission id")
    }
}

async fn setup_test_user(db: &PgPool) -> TestUser {
    let username = "test_user";
    let email = "test_user@example.com";
    let password = "test_password";

    // seed the catalogue and make the test user a super admin
    seeder::run(
        db,
        Some(AdminAccount {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }),
    )
    .await
    .expect("Failed to seed test database");

    TestUser {
        username: username.to_string(),
        email: email.to_string(),
        password: password.to_string(),
    }
}

async fn setup_database(db_url: &str) -> PgPool {
    // get db name from url
    let database_name = get_db_name_from_url(db_url);
    // replace url with db name "postgres"
    let maintaince_db_url = replace_db_name(db_url, "postgres");
    let mut connection = PgConnection::connect(&maintaince_db_url)
        .await
        .expect("Failed to connect to database \"postgres\"");

    // create database
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, database_name).as_str())
        .await
        .expect("Failed to create database");

    // Run migrations
    let pool = PgPool::connect(db_url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate the database");

    pool
}

fn replace_db_name(db_url: &str, new_db_name: &str) -> String {
    let mut url = Url::parse(db_url).expect("Failed to parse database url");
    // replace the path part
    url.set_path(new_db_name);

    url.to_string()
}

fn get_db_name_from_url(db_url: &str) -> String {
    let url = Url::parse(db_url).expect("Failed to parse database url");

    url.path().strip_prefix("/").unwrap().to_string()
}

struct DbGuard {
    db_url: String,
}

impl DbGuard {
    async fn cleanup(&self) {
        // connect to the maintaince db (postgres)
        // get db name from url
        let database_name = get_db_name_from_url(&self.db_url);
        // replace url with db name "postgres"
        let maintaince_db_url = replace_db_name(&self.db_url, "postgres");
        let mut connection = PgConnection::connect(&maintaince_db_url)
            .await
            .expect("Failed to connect to database \"postgres\"");

        // disconnect other clients
        let disconnect_query = format!(
            r#"
        SELECT pg_terminate_backend(pg_stat_activity.pid)
        FROM pg_stat_activity
        WHERE pg_stat_activity.datname = '{}'
          AND pid <> pg_backend_pid();
        "#,
            database_name,
        );

        let _ = sqlx::query(&disconnect_query)
            .execute(&mut connection)
            .await;

        // delete database
        connection
            .execute(format!(r#"DROP DATABASE "{}";"#, database_name).as_str())
            .await
            .expect("Failed to drop database");
    }
}

impl Drop for DbGuard {
    fn drop(&mut self) {
        if let Ok(handle) = tokio::runtime::Handle::try_current()
            && handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread
        {
            tokio::task::block_in_place(|| {
                handle.block_on(async {
                    self.cleanup().await;
                });
            });
            return;
        }

        // no usable runtime here, drive the cleanup on a scratch one
        std::thread::scope(|s| {
            s.spawn(|| {
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap()
                    .block_on(async {
                        self.cleanup().await;
                    });
            });
        });
    }
}
