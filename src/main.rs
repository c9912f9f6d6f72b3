use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_registration::config::{init_db, Config};
use event_registration::modules::auth::crud::{
    MySqlOtpChallengeRepository, MySqlTokenRepository, MySqlUserRepository, LOGIN_OTP_TABLE,
    RECOVER_PASSWORD_OTP_TABLE,
};
use event_registration::modules::auth::service::AuthService;
use event_registration::modules::auth::session::SessionTracker;
use event_registration::services::journal::{Journal, MySqlJournal};
use event_registration::services::notify::{HttpMailer, NoopMailer, NotificationSender};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "event_registration=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env().expect("Failed to load environment configuration"));

    let db = init_db(&config.database_url).await;
    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Connected to MySQL");

    let users = Arc::new(MySqlUserRepository::new(db.clone()));
    let login_otps = Arc::new(MySqlOtpChallengeRepository::new(db.clone(), LOGIN_OTP_TABLE));
    let recovery_otps = Arc::new(MySqlOtpChallengeRepository::new(
        db.clone(),
        RECOVER_PASSWORD_OTP_TABLE,
    ));
    let sessions = SessionTracker::new(
        config.token_tracking_enabled,
        Arc::new(MySqlTokenRepository::new(db.clone())),
    );
    let journal: Arc<dyn Journal> =
        Arc::new(MySqlJournal::new(db.clone(), config.journal_enabled));

    let notifier: Arc<dyn NotificationSender> =
        match (&config.mailer_api_url, &config.mailer_api_key, &config.mailer_sender) {
            (Some(url), Some(key), Some(sender)) => Arc::new(HttpMailer::new(
                reqwest::Client::new(),
                url.clone(),
                key.clone(),
                sender.clone(),
            )),
            _ => {
                tracing::warn!("email delivery is not configured, using the noop mailer");
                Arc::new(NoopMailer)
            }
        };

    let auth = Arc::new(AuthService::new(
        &config,
        users,
        login_otps,
        recovery_otps,
        sessions,
        notifier,
        journal,
    ));

    let port = config.port;
    let app = event_registration::create_app(auth).await;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("Failed to bind the API port");
    tracing::info!("Server running on http://localhost:{port}");
    axum::serve(listener, app).await.unwrap();
}
