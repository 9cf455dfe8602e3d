//! Application state: one instance built at startup, shared behind an
//! `Arc` across every handler (spec §9's "no global mutable state").

use std::path::PathBuf;
use std::sync::Arc;

use carbonledger_access::AccessControl;
use carbonledger_access::AuthContext;
use carbonledger_benchmarking::BenchmarkingService;
use carbonledger_calculation::CalculationProvider;
use carbonledger_core::config::Config;
use carbonledger_core::error::AppResult;
use carbonledger_eventbus::{EventBus, IdempotencyStore, InMemoryIdempotencyStore};
use carbonledger_notifications::email::SmtpEmailSender;
use carbonledger_notifications::NotificationService;
use carbonledger_storage::repositories::activity::{
    ActivityDataRepository, CompanyFinancialsRepository, IndustryTemplateRepository,
    SuggestionParameterRepository,
};
use carbonledger_storage::repositories::core::{
    CompanyRepository, FacilityRepository, MemberRepository, UserRepository,
};
use carbonledger_storage::repositories::invoices::InvoiceRepository;
use carbonledger_storage::repositories::notifications::{LeaderboardRepository, NotificationRepository};
use carbonledger_storage::repositories::quality::{DataQualityIssueRepository, EventLogRepository};
use carbonledger_storage::repositories::reports::ReportRepository;
use carbonledger_storage::repositories::supply_chain::{
    ProductFootprintRepository, SupplierInvitationRepository, SupplierRepository,
};
use carbonledger_storage::Storage;
use carbonledger_suggestions::{InsulationSuggestionStrategy, SolarSuggestionStrategy, SuggestionEngine};
use carbonledger_workers::analytics::SupplierCategoryBenchmarkWorker;

pub struct AppState {
    pub config: Config,
    pub users: UserRepository,
    pub companies: CompanyRepository,
    pub facilities: FacilityRepository,
    pub members: MemberRepository,
    pub activity: ActivityDataRepository,
    pub financials: CompanyFinancialsRepository,
    pub industry_templates: IndustryTemplateRepository,
    pub invoices: InvoiceRepository,
    pub reports: ReportRepository,
    pub suppliers: SupplierRepository,
    pub invitations: SupplierInvitationRepository,
    pub footprints: ProductFootprintRepository,
    pub leaderboard: LeaderboardRepository,
    pub quality_issues: DataQualityIssueRepository,
    pub event_log: EventLogRepository,
    pub access: AccessControl,
    pub auth: AuthContext,
    pub notifications: NotificationService,
    pub bus: Arc<dyn EventBus>,
    pub idempotency: Arc<dyn IdempotencyStore>,
    pub calculation: Arc<dyn CalculationProvider>,
    pub benchmarking: BenchmarkingService,
    pub suggestions: SuggestionEngine,
    pub supplier_benchmarks: Arc<SupplierCategoryBenchmarkWorker>,
    pub artifact_dir: PathBuf,
    pub vision_base_url: String,
}

impl AppState {
    pub async fn build(
        config: Config,
        storage: Storage,
        bus: Arc<dyn EventBus>,
    ) -> AppResult<Arc<Self>> {
        let pool = storage.pool.clone();

        let users = UserRepository::new(pool.clone());
        let companies = CompanyRepository::new(pool.clone());
        let facilities = FacilityRepository::new(pool.clone());
        let members = MemberRepository::new(pool.clone());
        let activity = ActivityDataRepository::new(pool.clone());
        let financials = CompanyFinancialsRepository::new(pool.clone());
        let industry_templates = IndustryTemplateRepository::new(pool.clone());
        let suggestion_parameters = SuggestionParameterRepository::new(pool.clone());
        let invoices = InvoiceRepository::new(pool.clone());
        let reports = ReportRepository::new(pool.clone());
        let suppliers = SupplierRepository::new(pool.clone());
        let invitations = SupplierInvitationRepository::new(pool.clone());
        let footprints = ProductFootprintRepository::new(pool.clone());
        let notification_rows = NotificationRepository::new(pool.clone());
        let leaderboard = LeaderboardRepository::new(pool.clone());
        let quality_issues = DataQualityIssueRepository::new(pool.clone());
        let event_log = EventLogRepository::new(pool.clone());

        let idempotency: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());

        let access = AccessControl::new(members.clone(), facilities.clone());
        let auth = AuthContext::new(&config.jwt);

        let email: Arc<dyn carbonledger_notifications::email::EmailSender> =
            Arc::new(SmtpEmailSender::new(&config.email));
        let notifications = NotificationService::new(notification_rows, users.clone(), email);

        let calculation = carbonledger_calculation::ProviderFactory::build(&config).await;

        let benchmarking = BenchmarkingService::new(companies.clone(), facilities.clone(), activity.clone());

        let mut suggestions = SuggestionEngine::new(suggestion_parameters);
        suggestions.register(Box::new(SolarSuggestionStrategy::new(
            activity.clone(),
            financials.clone(),
        )));
        suggestions.register(Box::new(InsulationSuggestionStrategy::new(
            activity.clone(),
            financials.clone(),
        )));

        let supplier_benchmarks = Arc::new(SupplierCategoryBenchmarkWorker::new(footprints.clone()));

        let artifact_dir = PathBuf::from(
            std::env::var("REPORT_ARTIFACT_DIR").unwrap_or_else(|_| "/tmp/carbonledger-reports".into()),
        );
        let vision_base_url = std::env::var("VISION_SERVICE_BASE_URL")
            .unwrap_or_else(|_| "https://vision.carbonledger.example".into());

        Ok(Arc::new(Self {
            config,
            users,
            companies,
            facilities,
            members,
            activity,
            financials,
            industry_templates,
            invoices,
            reports,
            suppliers,
            invitations,
            footprints,
            leaderboard,
            quality_issues,
            event_log,
            access,
            auth,
            notifications,
            bus,
            idempotency,
            calculation,
            benchmarking,
            suggestions,
            supplier_benchmarks,
            artifact_dir,
            vision_base_url,
        }))
    }
}
