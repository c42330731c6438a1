use std::{
    cell::{Cell, RefCell},
    path::PathBuf,
};

use crate::{
    config::Config,
    environment::{ACCOUNT_KEY_VAR, Environment},
    error::BootstrapError,
    log::{AppenderGuard, ConsoleAppenderConfig, FileAppenderConfig, LoggingConfig},
    module::Module,
    monitoring::{MonitoringAgent, MonitoringConfig, MonitoringError, MonitoringFailurePolicy},
    server::ServerModule,
};
use di::{Ref, ServiceCollection, ServiceProvider, singleton_as_self};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_rolling_file::RollingFileAppenderBase;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Targets, fmt::writer::MakeWriterExt,
    layer::SubscriberExt, util::SubscriberInitExt,
};
use typed_builder::TypedBuilder;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Bootstrap is the entry point of the application.
///
/// It loads the configuration, initializes logging, activates the monitoring agent when
/// `NODETIME_ACCOUNT_KEY` holds a non-empty value, and finally boots the server exactly
/// once.
///
/// # Example
/// ```
/// use kindle_bootstrap::{Bootstrap, Environment, NoopAgent};
///
/// let bootstrap = Bootstrap::builder().initialize_logging(false).build();
/// let env: Environment = [("NODETIME_ACCOUNT_KEY", "abc123")].into_iter().collect();
/// let server = || -> anyhow::Result<()> { Ok(()) };
/// bootstrap.run(&env, &NoopAgent, &server).unwrap();
/// ```
#[derive(TypedBuilder)]
pub struct Bootstrap {
    /// Whether need to initialize logging.
    #[builder(default = true)]
    initialize_logging: bool,
    /// Whether need to print config.
    #[builder(default = false)]
    show_config: bool,

    /// Prefix of environment variables to override config values.
    #[builder(default = Some("KINDLE".to_string()))]
    env_config_prefix: Option<String>,
    /// Separator of environment variables to override config values.
    #[builder(default = "__".to_string())]
    env_config_split: String,
    /// Folder holding `config.toml`, the default folder when unset.
    #[builder(default, setter(strip_option))]
    config_folder: Option<PathBuf>,

    /// Overrides `monitoring.failure_policy`.
    #[builder(default, setter(strip_option))]
    failure_policy: Option<MonitoringFailurePolicy>,

    /// a collection of modules
    #[builder(default = vec![])]
    modules: Vec<Box<dyn Module>>,

    #[builder(default = RefCell::new(BootstrapBaseModule::default()), setter(skip))]
    base_modules: RefCell<BootstrapBaseModule>,
    #[builder(default, setter(skip))]
    initialized: Cell<bool>,
    #[builder(default, setter(skip))]
    monitoring_attempted: Cell<bool>,
}

impl Bootstrap {
    pub fn initialize(&self) -> Result<(), BootstrapError> {
        // first we try to initialize config
        self.initialize_config()?;
        // then we try to initialize logging by logger config
        self.initialize_logging()?;
        if self.show_config {
            // after logging initialized, we show config if needed
            self.show_config()?;
        }
        self.initialized.set(true);
        Ok(())
    }

    pub fn initialize_config(&self) -> Result<(), BootstrapError> {
        let env_config_prefix: Option<&str> = self.env_config_prefix.as_deref();
        let env_config_split: &str = self.env_config_split.as_str();
        let config = match &self.config_folder {
            Some(folder) => Config::from_folder(folder, env_config_prefix, env_config_split),
            None => Config::load(env_config_prefix, env_config_split),
        }
        .map_err(BootstrapError::ConfigLoadError)?;

        let _ = self.base_modules.borrow_mut().config.insert(Ref::new(config));
        Ok(())
    }

    pub fn initialize_logging(&self) -> Result<(), BootstrapError> {
        if self.initialize_logging {
            self.initialize_logging_config()?;
            self.initialize_logging_loggers()?;
        }
        Ok(())
    }

    fn initialize_logging_config(&self) -> Result<(), BootstrapError> {
        let config: Option<Ref<Config>> = self.base_modules.borrow().config.clone();
        let Some(config) = config else {
            return Err(BootstrapError::InvalidConfigValueError(
                "config must be loaded before logging".to_string(),
            ));
        };
        let logging_config = Ref::new(LoggingConfig::new(&config)?);
        {
            // limit the scope of borrow_mut
            let mut base_modules = self.base_modules.borrow_mut();
            let _ = base_modules.logging_config.insert(logging_config);
        }
        Ok(())
    }

    fn initialize_logging_loggers(&self) -> Result<(), BootstrapError> {
        let logging_config: Option<Ref<LoggingConfig>> =
            self.base_modules.borrow().logging_config.clone();
        let Some(logging_config) = logging_config else {
            return Err(BootstrapError::InvalidConfigValueError(
                "logging config is not loaded".to_string(),
            ));
        };
        let targets = Self::logging_targets(&logging_config);
        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut writer_guards = Vec::new();

        let file_config = logging_config.file_appender_config();
        if file_config.enable() {
            let (writer, level, guard) = self.initialize_logging_file_tracing(file_config)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer.with_max_level(level))
                .with_filter(targets.clone())
                .boxed();
            layers.push(layer);
            writer_guards.push(guard);
        }
        let console_config = logging_config.console_appender_config();
        if console_config.enable() {
            let (writer, level, guard) =
                self.initialize_logging_console_tracing(console_config)?;
            let layer = tracing_subscriber::fmt::layer().with_writer(writer.with_max_level(level));
            // RUST_LOG wins over the configured levels on the console
            let layer = match EnvFilter::try_from_default_env() {
                Ok(env_filter) => layer.with_filter(env_filter).boxed(),
                Err(_) => layer.with_filter(targets.clone()).boxed(),
            };
            layers.push(layer);
            writer_guards.push(guard);
        }
        // save guards to keep the writers active
        {
            // limit the scope of borrow_mut
            let mut base_modules = self.base_modules.borrow_mut();
            let logger = AppenderGuard::new(writer_guards);
            let _ = base_modules.logger.insert(Ref::new(logger));
        }
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| BootstrapError::TracingSubscriberInitError(Box::new(e)))?;

        Ok(())
    }

    fn logging_targets(logging_config: &LoggingConfig) -> Targets {
        let default = Targets::new().with_default(logging_config.level().as_tracing_level_filter());
        logging_config
            .loggers()
            .iter()
            .fold(default, |acc, logger| {
                acc.with_target(logger.target(), logger.level().as_tracing_level_filter())
            })
    }

    fn initialize_logging_console_tracing(
        &self,
        appender_config: &ConsoleAppenderConfig,
    ) -> Result<(NonBlocking, Level, WorkerGuard), BootstrapError> {
        // get write level from appender config
        let Some(level) = appender_config.write_level().as_tracing_level() else {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "logging.console.write_level={:?}",
                appender_config.write_level()
            )));
        };
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        Ok((writer, level, guard))
    }

    fn initialize_logging_file_tracing(
        &self,
        appender_config: &FileAppenderConfig,
    ) -> Result<(NonBlocking, Level, WorkerGuard), BootstrapError> {
        // get write level from appender config
        let Some(level) = appender_config.write_level().as_tracing_level() else {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "logging.file.write_level={:?}",
                appender_config.write_level()
            )));
        };
        let path = appender_config.file_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| BootstrapError::LogFileCreationError(Box::new(e)))?;
        }
        let file_appender = RollingFileAppenderBase::builder()
            .filename(path.to_string_lossy().into_owned())
            .max_filecount(appender_config.file_max_count())
            .condition_max_file_size(appender_config.file_max_size())
            .condition_daily()
            .build()
            .map_err(|e| BootstrapError::LogFileCreationError(e.into()))?;
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        Ok((writer, level, guard))
    }

    pub fn show_config(&self) -> Result<(), BootstrapError> {
        if let Some(config) = &self.base_modules.borrow().config {
            let properties = config
                .to_properties()
                .map_err(BootstrapError::ConfigShowError)?;
            for line in properties.to_lines() {
                tracing::info!("load config {}", line);
            }
        }
        Ok(())
    }

    /// Initializes `agent` when the environment carries a non-empty account key.
    ///
    /// Returns whether the agent is now initialized. The agent is attempted at most once
    /// per `Bootstrap`; later calls return `false` without touching it. The `monitoring`
    /// section is only read once a key is present. An invalid section and a failing agent
    /// are both handled according to the configured [`MonitoringFailurePolicy`].
    pub fn activate_monitoring(
        &self,
        env: &Environment,
        agent: &dyn MonitoringAgent,
    ) -> Result<bool, BootstrapError> {
        let Some(account_key) = env.account_key() else {
            tracing::debug!("{} is not set, monitoring disabled", ACCOUNT_KEY_VAR);
            return Ok(false);
        };
        if self.monitoring_attempted.replace(true) {
            tracing::warn!("monitoring agent was already activated, skipping");
            return Ok(false);
        }
        let (policy, monitoring) = self.monitoring_settings();
        let initialized = monitoring
            .and_then(|monitoring| agent.initialize(&monitoring.agent_config(account_key)));

        match initialized {
            Ok(()) => {
                tracing::info!("monitoring agent initialized");
                Ok(true)
            }
            Err(e) => match policy {
                MonitoringFailurePolicy::Continue => {
                    tracing::warn!(error = %e, "monitoring agent failed, continuing without it");
                    Ok(false)
                }
                MonitoringFailurePolicy::Abort => {
                    tracing::error!(error = %e, "monitoring agent failed, aborting startup");
                    Err(BootstrapError::MonitoringError(e))
                }
            },
        }
    }

    /// Runs the startup sequence: initialize, activate monitoring, boot the server.
    ///
    /// `server` is booted exactly once unless initialization fails or the monitoring
    /// policy is [`MonitoringFailurePolicy::Abort`] and the agent fails. An agent that was
    /// initialized here is shut down after the server returns, whether it succeeded or not.
    pub fn run(
        &self,
        env: &Environment,
        agent: &dyn MonitoringAgent,
        server: &dyn ServerModule,
    ) -> Result<(), BootstrapError> {
        if !self.initialized.get() {
            self.initialize()?;
        }
        let monitored = self.activate_monitoring(env, agent)?;

        tracing::info!(monitored, "booting server");
        let booted = server.boot_server();
        if monitored {
            agent.shutdown();
        }
        match booted {
            Ok(()) => {
                tracing::info!("server stopped");
                Ok(())
            }
            Err(e) => Err(BootstrapError::ServerBootError(e)),
        }
    }

    /// Builds the service provider from the base services and every registered module.
    pub fn service_provider(&self) -> Result<ServiceProvider, BootstrapError> {
        let base_modules = self.base_modules.borrow();
        let Some(config) = base_modules.config.clone() else {
            return Err(BootstrapError::ServiceProviderError(
                "config must be loaded before building services".to_string(),
            ));
        };
        let mut services = ServiceCollection::new();
        base_modules.configure(&config, &mut services)?;
        for module in &self.modules {
            module.configure(&config, &mut services)?;
        }
        services
            .build_provider()
            .map_err(|e| BootstrapError::ServiceProviderError(e.to_string()))
    }

    /// Resolves the `monitoring` section and the failure policy that applies to it.
    ///
    /// When the section is invalid the policy comes from the builder override, then from
    /// `monitoring.failure_policy` alone, then the default.
    fn monitoring_settings(
        &self,
    ) -> (MonitoringFailurePolicy, Result<MonitoringConfig, MonitoringError>) {
        let config: Option<Ref<Config>> = self.base_modules.borrow().config.clone();
        let Some(config) = config else {
            let monitoring = MonitoringConfig::default();
            let policy = self.failure_policy.unwrap_or(monitoring.failure_policy());
            return (policy, Ok(monitoring));
        };
        match config.get::<MonitoringConfig>() {
            Ok(monitoring) => {
                let policy = self.failure_policy.unwrap_or(monitoring.failure_policy());
                (policy, Ok(monitoring))
            }
            Err(e) => {
                let policy = self
                    .failure_policy
                    .or_else(|| config.get_value("monitoring.failure_policy").ok())
                    .unwrap_or_default();
                (policy, Err(MonitoringError::InvalidConfig(e)))
            }
        }
    }
}

#[derive(Default)]
struct BootstrapBaseModule {
    config: Option<Ref<Config>>,
    logger: Option<Ref<AppenderGuard>>,
    logging_config: Option<Ref<LoggingConfig>>,
}

impl Module for BootstrapBaseModule {
    fn configure(
        &self,
        _config: &Config,
        binder: &mut ServiceCollection,
    ) -> Result<(), BootstrapError> {
        // register base services
        register_service::<Config>(&self.config, binder);
        register_service::<LoggingConfig>(&self.logging_config, binder);
        register_service::<AppenderGuard>(&self.logger, binder);
        Ok(())
    }
}

/// register a service to the service collection if it was initialized.
fn register_service<T: Send + Sync + 'static>(
    service: &Option<Ref<T>>,
    binder: &mut ServiceCollection,
) {
    if let Some(svc) = service.clone() {
        binder.add(singleton_as_self::<T>().from(move |_| svc.clone()));
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        sync::{Arc, Mutex},
    };

    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;
    use crate::monitoring::AgentConfig;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Initialize(String),
        Shutdown,
        Boot,
    }

    type Calls = Arc<Mutex<Vec<Call>>>;

    struct RecordingAgent {
        calls: Calls,
        fail: bool,
    }

    impl MonitoringAgent for RecordingAgent {
        fn initialize(&self, config: &AgentConfig) -> Result<(), MonitoringError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Initialize(config.account_key().to_string()));
            if self.fail {
                Err(MonitoringError::InvalidListenAddress("nowhere".to_string()))
            } else {
                Ok(())
            }
        }

        fn shutdown(&self) {
            self.calls.lock().unwrap().push(Call::Shutdown);
        }
    }

    struct RecordingServer {
        calls: Calls,
        fail: bool,
    }

    impl ServerModule for RecordingServer {
        fn boot_server(&self) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(Call::Boot);
            if self.fail {
                anyhow::bail!("address in use");
            }
            Ok(())
        }
    }

    struct Harness {
        folder: TempDir,
        calls: Calls,
    }

    impl Harness {
        fn with_config(self, body: &str) -> Self {
            fs::write(self.folder.path().join("config.toml"), body).unwrap();
            self
        }

        fn bootstrap(&self) -> Bootstrap {
            Bootstrap::builder()
                .initialize_logging(false)
                .env_config_prefix(Some("KINDLE_TEST_BOOTSTRAP".to_string()))
                .config_folder(self.folder.path().to_path_buf())
                .build()
        }

        fn agent(&self, fail: bool) -> RecordingAgent {
            RecordingAgent {
                calls: self.calls.clone(),
                fail,
            }
        }

        fn server(&self, fail: bool) -> RecordingServer {
            RecordingServer {
                calls: self.calls.clone(),
                fail,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[fixture]
    fn harness() -> Harness {
        Harness {
            folder: tempfile::tempdir().unwrap(),
            calls: Arc::default(),
        }
    }

    fn env_with_key(key: Option<&str>) -> Environment {
        key.map(|k| (ACCOUNT_KEY_VAR, k)).into_iter().collect()
    }

    #[rstest]
    #[case::absent(None)]
    #[case::empty(Some(""))]
    fn boots_without_monitoring_when_key_missing(harness: Harness, #[case] key: Option<&str>) {
        let bootstrap = harness.bootstrap();
        bootstrap
            .run(&env_with_key(key), &harness.agent(false), &harness.server(false))
            .unwrap();
        assert_eq!(harness.calls(), vec![Call::Boot]);
    }

    #[rstest]
    fn initializes_monitoring_before_boot(harness: Harness) {
        let bootstrap = harness.bootstrap();
        bootstrap
            .run(
                &env_with_key(Some("abc123")),
                &harness.agent(false),
                &harness.server(false),
            )
            .unwrap();
        assert_eq!(
            harness.calls(),
            vec![
                Call::Initialize("abc123".to_string()),
                Call::Boot,
                Call::Shutdown
            ]
        );
    }

    #[rstest]
    fn agent_receives_monitoring_section(harness: Harness) {
        struct Capture(Mutex<Option<AgentConfig>>);
        impl MonitoringAgent for Capture {
            fn initialize(&self, config: &AgentConfig) -> Result<(), MonitoringError> {
                *self.0.lock().unwrap() = Some(config.clone());
                Ok(())
            }
            fn shutdown(&self) {}
        }

        let harness = harness.with_config("[monitoring]\napp_name = \"shop\"\n");
        let agent = Capture(Mutex::new(None));
        harness
            .bootstrap()
            .run(&env_with_key(Some("abc123")), &agent, &harness.server(false))
            .unwrap();
        let config = agent.0.lock().unwrap().clone().unwrap();
        assert_eq!(config.account_key(), "abc123");
        assert_eq!(config.app_name(), "shop");
    }

    #[rstest]
    fn failing_agent_is_tolerated_by_default(harness: Harness) {
        let env = env_with_key(Some("abc123"));
        for _ in 0..2 {
            let bootstrap = harness.bootstrap();
            bootstrap
                .run(&env, &harness.agent(true), &harness.server(false))
                .unwrap();
        }
        let expected = vec![Call::Initialize("abc123".to_string()), Call::Boot];
        assert_eq!(harness.calls(), [expected.clone(), expected].concat());
    }

    #[rstest]
    #[case::from_config_file(true, None)]
    #[case::from_builder(false, Some(MonitoringFailurePolicy::Abort))]
    fn failing_agent_aborts_startup_under_abort_policy(
        harness: Harness,
        #[case] configure_file: bool,
        #[case] override_policy: Option<MonitoringFailurePolicy>,
    ) {
        let harness = if configure_file {
            harness.with_config("[monitoring]\nfailure_policy = \"abort\"\n")
        } else {
            harness
        };
        let bootstrap = match override_policy {
            Some(policy) => Bootstrap::builder()
                .initialize_logging(false)
                .env_config_prefix(Some("KINDLE_TEST_BOOTSTRAP".to_string()))
                .config_folder(harness.folder.path().to_path_buf())
                .failure_policy(policy)
                .build(),
            None => harness.bootstrap(),
        };
        let result = bootstrap.run(
            &env_with_key(Some("abc123")),
            &harness.agent(true),
            &harness.server(false),
        );
        assert!(matches!(result, Err(BootstrapError::MonitoringError(_))));
        assert_eq!(
            harness.calls(),
            vec![Call::Initialize("abc123".to_string())]
        );
    }

    #[rstest]
    fn builder_policy_overrides_config_file(harness: Harness) {
        let harness = harness.with_config("[monitoring]\nfailure_policy = \"abort\"\n");
        let bootstrap = Bootstrap::builder()
            .initialize_logging(false)
            .env_config_prefix(Some("KINDLE_TEST_BOOTSTRAP".to_string()))
            .config_folder(harness.folder.path().to_path_buf())
            .failure_policy(MonitoringFailurePolicy::Continue)
            .build();
        bootstrap
            .run(
                &env_with_key(Some("abc123")),
                &harness.agent(true),
                &harness.server(false),
            )
            .unwrap();
        assert_eq!(
            harness.calls(),
            vec![Call::Initialize("abc123".to_string()), Call::Boot]
        );
    }

    #[rstest]
    fn server_failure_propagates_after_agent_shutdown(harness: Harness) {
        let result = harness.bootstrap().run(
            &env_with_key(Some("abc123")),
            &harness.agent(false),
            &harness.server(true),
        );
        let Err(BootstrapError::ServerBootError(e)) = result else {
            panic!("expected a server boot error");
        };
        assert_eq!(e.to_string(), "address in use");
        assert_eq!(
            harness.calls(),
            vec![
                Call::Initialize("abc123".to_string()),
                Call::Boot,
                Call::Shutdown
            ]
        );
    }

    #[rstest]
    fn agent_is_activated_at_most_once(harness: Harness) {
        let bootstrap = harness.bootstrap();
        let env = env_with_key(Some("abc123"));
        let agent = harness.agent(false);
        assert!(bootstrap.activate_monitoring(&env, &agent).unwrap());
        assert!(!bootstrap.activate_monitoring(&env, &agent).unwrap());
        assert_eq!(
            harness.calls(),
            vec![Call::Initialize("abc123".to_string())]
        );
    }

    #[rstest]
    #[case::zero_interval("[monitoring]\nsample_interval_secs = 0\n")]
    #[case::unknown_policy("[monitoring]\nfailure_policy = \"sometimes\"\n")]
    fn invalid_monitoring_section_is_ignored_without_key(harness: Harness, #[case] body: &str) {
        let harness = harness.with_config(body);
        harness
            .bootstrap()
            .run(&env_with_key(None), &harness.agent(false), &harness.server(false))
            .unwrap();
        assert_eq!(harness.calls(), vec![Call::Boot]);
    }

    #[rstest]
    fn invalid_monitoring_section_is_tolerated_by_default(harness: Harness) {
        let harness = harness.with_config("[monitoring]\nsample_interval_secs = 0\n");
        let bootstrap = harness.bootstrap();
        bootstrap
            .run(
                &env_with_key(Some("abc123")),
                &harness.agent(false),
                &harness.server(false),
            )
            .unwrap();
        assert_eq!(harness.calls(), vec![Call::Boot]);
    }

    #[rstest]
    #[case::from_config_file(
        "[monitoring]\nfailure_policy = \"abort\"\nsample_interval_secs = 0\n",
        None
    )]
    #[case::from_builder(
        "[monitoring]\nsample_interval_secs = 0\n",
        Some(MonitoringFailurePolicy::Abort)
    )]
    fn invalid_monitoring_section_aborts_under_abort_policy(
        harness: Harness,
        #[case] body: &str,
        #[case] override_policy: Option<MonitoringFailurePolicy>,
    ) {
        let harness = harness.with_config(body);
        let bootstrap = match override_policy {
            Some(policy) => Bootstrap::builder()
                .initialize_logging(false)
                .env_config_prefix(Some("KINDLE_TEST_BOOTSTRAP".to_string()))
                .config_folder(harness.folder.path().to_path_buf())
                .failure_policy(policy)
                .build(),
            None => harness.bootstrap(),
        };
        let result = bootstrap.run(
            &env_with_key(Some("abc123")),
            &harness.agent(false),
            &harness.server(false),
        );
        assert!(matches!(
            result,
            Err(BootstrapError::MonitoringError(MonitoringError::InvalidConfig(_)))
        ));
        assert!(harness.calls().is_empty());
    }

    #[rstest]
    fn file_appender_is_built_under_missing_folder(harness: Harness) {
        let log_path = harness.folder.path().join("logs").join("kindle.log");
        let harness = harness.with_config(&format!(
            "[logging.file]\nenable = true\npath = {:?}\n",
            log_path.to_string_lossy()
        ));
        let bootstrap = harness.bootstrap();
        bootstrap.initialize_config().unwrap();
        let config = bootstrap.base_modules.borrow().config.clone().unwrap();
        let logging_config = LoggingConfig::new(&config).unwrap();

        let (_writer, level, _guard) = bootstrap
            .initialize_logging_file_tracing(logging_config.file_appender_config())
            .unwrap();
        assert_eq!(level, Level::TRACE);
        assert!(log_path.parent().unwrap().is_dir());
    }

    #[rstest]
    fn service_provider_requires_config(harness: Harness) {
        assert!(matches!(
            harness.bootstrap().service_provider(),
            Err(BootstrapError::ServiceProviderError(_))
        ));
    }

    #[rstest]
    fn service_provider_exposes_base_and_module_services(harness: Harness) {
        struct Banner(&'static str);
        struct BannerModule;
        impl Module for BannerModule {
            fn configure(
                &self,
                _config: &Config,
                binder: &mut ServiceCollection,
            ) -> Result<(), BootstrapError> {
                let banner = Ref::new(Banner("kindle"));
                binder.add(singleton_as_self::<Banner>().from(move |_| banner.clone()));
                Ok(())
            }
        }

        let bootstrap = Bootstrap::builder()
            .initialize_logging(false)
            .env_config_prefix(Some("KINDLE_TEST_BOOTSTRAP".to_string()))
            .config_folder(harness.folder.path().to_path_buf())
            .modules(vec![Box::new(BannerModule)])
            .build();
        bootstrap.initialize().unwrap();
        let provider = bootstrap.service_provider().unwrap();
        assert_eq!(provider.get_required::<Banner>().0, "kindle");
        assert!(provider.get::<Config>().is_some());
        // logging was not initialized
        assert!(provider.get::<LoggingConfig>().is_none());
    }

    #[rstest]
    fn show_config_runs_after_config_load(harness: Harness) {
        let harness = harness.with_config("[server]\nbind_address = \"127.0.0.1:3000\"\n");
        let bootstrap = harness.bootstrap();
        bootstrap.initialize_config().unwrap();
        bootstrap.show_config().unwrap();
    }
}
