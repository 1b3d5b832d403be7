//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthService;
use crate::bonus::BonusService;
use crate::borrower::BorrowerService;
use crate::config::Config;
use crate::cut::CutService;
use crate::group::GroupService;
use crate::loan::LoanService;
use crate::miss::{MissService, MissSweeper};
use crate::payment::PaymentService;
use crate::report::ReportService;
use crate::route::RouteService;
use crate::user::UserService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    /// Mark auth cookies `Secure`
    pub secure_cookies: bool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub borrower_service: Arc<BorrowerService>,
    pub loan_service: Arc<LoanService>,
    pub payment_service: Arc<PaymentService>,
    pub miss_service: Arc<MissService>,
    pub miss_sweeper: Arc<MissSweeper>,
    pub bonus_service: Arc<BonusService>,
    pub group_service: Arc<GroupService>,
    pub route_service: Arc<RouteService>,
    pub cut_service: Arc<CutService>,
    pub report_service: Arc<ReportService>,
}

impl AppState {
    /// Wire every service onto one pool
    pub fn new(db_pool: PgPool, config: &Config) -> Self {
        let timezone = config.timezone;

        let auth_service = Arc::new(AuthService::new(
            db_pool.clone(),
            config.jwt_secret.clone(),
            config.jwt_access_token_ttl_seconds,
            config.jwt_refresh_token_ttl_days,
        ));
        let bonus_service = Arc::new(BonusService::new(db_pool.clone(), timezone));
        let report_service = Arc::new(ReportService::new(
            db_pool.clone(),
            bonus_service.clone(),
            timezone,
        ));
        let cut_service = Arc::new(CutService::new(
            db_pool.clone(),
            report_service.clone(),
            bonus_service.clone(),
            timezone,
        ));

        Self {
            secure_cookies: config.environment.is_production(),
            auth_service,
            user_service: Arc::new(UserService::new(db_pool.clone())),
            borrower_service: Arc::new(BorrowerService::new(db_pool.clone())),
            loan_service: Arc::new(LoanService::new(
                db_pool.clone(),
                config.lending.clone(),
                timezone,
            )),
            payment_service: Arc::new(PaymentService::new(db_pool.clone())),
            miss_service: Arc::new(MissService::new(db_pool.clone(), timezone)),
            miss_sweeper: Arc::new(MissSweeper::new(db_pool.clone(), timezone)),
            bonus_service,
            group_service: Arc::new(GroupService::new(db_pool.clone())),
            route_service: Arc::new(RouteService::new(db_pool.clone())),
            cut_service,
            report_service,
            db_pool,
        }
    }
}

macro_rules! state_from_ref {
    ($($field:ident: $ty:ty),* $(,)?) => {
        $(
            impl FromRef<AppState> for $ty {
                fn from_ref(app_state: &AppState) -> Self {
                    app_state.$field.clone()
                }
            }
        )*
    };
}

state_from_ref! {
    db_pool: PgPool,
    auth_service: Arc<AuthService>,
    user_service: Arc<UserService>,
    borrower_service: Arc<BorrowerService>,
    loan_service: Arc<LoanService>,
    payment_service: Arc<PaymentService>,
    miss_service: Arc<MissService>,
    miss_sweeper: Arc<MissSweeper>,
    bonus_service: Arc<BonusService>,
    group_service: Arc<GroupService>,
    route_service: Arc<RouteService>,
    cut_service: Arc<CutService>,
    report_service: Arc<ReportService>,
}
