/// Application context and dependency injection
use crate::{
    account::AccountManager,
    config::ServerConfig,
    crypto::FieldCipher,
    db,
    error::ApiResult,
    identity::IdentityResolver,
    records::{PatientManager, SessionManager},
    token::TokenService,
    upstream::{AgentClient, VideoAnalyzer},
};
use std::sync::Arc;

/// Application context holding all shared services.
///
/// Both secrets are consumed here, once, at startup: the signing secret
/// into the token service and the field key into the cipher. Nothing
/// else in the crate touches raw secret material.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub accounts: Arc<AccountManager>,
    pub patients: Arc<PatientManager>,
    pub sessions: Arc<SessionManager>,
    pub identity: Arc<IdentityResolver>,
    pub analyzer: Arc<VideoAnalyzer>,
    pub agent: Arc<AgentClient>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        // Validate configuration
        config.validate()?;

        // Initialize database
        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        // Construct the two secret holders
        let cipher = Arc::new(FieldCipher::from_base64(&config.encryption.field_key)?);
        let tokens = Arc::new(TokenService::new(
            &config.authentication.jwt_secret,
            config.authentication.access_token_ttl_minutes,
        ));

        // Initialize managers
        let accounts = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&tokens)));
        let patients = Arc::new(PatientManager::new(pool.clone(), Arc::clone(&cipher)));
        let sessions = Arc::new(SessionManager::new(pool.clone(), Arc::clone(&cipher)));
        let identity = Arc::new(IdentityResolver::new(tokens, Arc::clone(&accounts)));

        // Initialize upstream clients
        let analyzer = Arc::new(VideoAnalyzer::new(&config.upstream.model_url)?);
        let agent = Arc::new(AgentClient::new(&config.upstream.agent_url)?);

        Ok(Self {
            config: Arc::new(config),
            accounts,
            patients,
            sessions,
            identity,
            analyzer,
            agent,
        })
    }

    /// Directory for transient video uploads
    pub fn temp_dir(&self) -> std::path::PathBuf {
        self.config.storage.data_directory.join("temp")
    }
}
