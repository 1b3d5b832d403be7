//! Loan lifecycle tests against a real database
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch Postgres database and
//! `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use sqlx::PgPool;
    use std::sync::Arc;
    use uuid::Uuid;

    use cobranza_server::bonus::BonusService;
    use cobranza_server::borrower::{BorrowerService, CreateBorrowerRequest};
    use cobranza_server::config::LendingPolicy;
    use cobranza_server::db;
    use cobranza_server::error::ApiError;
    use cobranza_server::group::{CreateGroupRequest, GroupService};
    use cobranza_server::loan::{
        CreateLoanRequest, CreateLoanTypeRequest, Loan, LoanService, LoanStatus, LoanType,
    };
    use cobranza_server::middleware::AuthenticatedUser;
    use cobranza_server::miss::MissSweeper;
    use cobranza_server::report::{ReportQuery, ReportService};
    use cobranza_server::models::{CreateUserRequest, UserRole};
    use cobranza_server::route::{CreateRouteRequest, RouteService};
    use cobranza_server::user::UserService;
    use cobranza_server::week::Week;

    /// Helper to create a migrated test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/cobranza_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        db::run_migrations(&pool).await.expect("Failed to migrate");
        pool
    }

    fn timezone() -> FixedOffset {
        FixedOffset::west_opt(6 * 3600).unwrap()
    }

    struct Fixture {
        admin: AuthenticatedUser,
        group_id: Uuid,
        loan_type: LoanType,
        loans: LoanService,
        borrowers: BorrowerService,
    }

    async fn fixture(pool: &PgPool) -> Fixture {
        let admin = UserService::new(pool.clone())
            .create_user(CreateUserRequest {
                first_name: "Ana".to_string(),
                last_name: "Pruebas".to_string(),
                second_last_name: None,
                email: format!("admin-{}@example.com", Uuid::new_v4()),
                password: "correct horse battery".to_string(),
                role: UserRole::Admin,
                superior_id: None,
            })
            .await
            .unwrap();
        let admin = AuthenticatedUser::new(admin.id, UserRole::Admin);

        let route = RouteService::new(pool.clone())
            .create_route(CreateRouteRequest {
                name: "Ruta Pruebas".to_string(),
                manager_id: None,
                supervisor_id: None,
            })
            .await
            .unwrap();
        let group = GroupService::new(pool.clone())
            .create_group(
                &admin,
                CreateGroupRequest {
                    name: "Grupo Pruebas".to_string(),
                    route_id: route.id,
                    lead_user_id: None,
                },
            )
            .await
            .unwrap();

        let loans = LoanService::new(pool.clone(), LendingPolicy::default(), timezone());
        let loan_type = loans
            .create_loan_type(CreateLoanTypeRequest {
                name: "Diez semanas".to_string(),
                term_weeks: 10,
                weekly_rate: dec!(0.1),
                tolerated_misses: 0,
                miss_penalty: dec!(0),
                penalty_limit: 0,
            })
            .await
            .unwrap();

        Fixture {
            admin,
            group_id: group.id,
            loan_type,
            loans,
            borrowers: BorrowerService::new(pool.clone()),
        }
    }

    async fn borrower(fixture: &Fixture, is_guarantor: bool) -> Uuid {
        fixture
            .borrowers
            .create_borrower(CreateBorrowerRequest {
                first_name: "María".to_string(),
                last_name: "López".to_string(),
                second_last_name: None,
                neighborhood: Some("Centro".to_string()),
                postal_code: Some("06000".to_string()),
                voter_id_code: None,
                marital_status: None,
                children: 2,
                housing: None,
                is_guarantor,
                group_id: fixture.group_id,
            })
            .await
            .unwrap()
            .id
    }

    fn loan_request(fixture: &Fixture, borrower_id: Uuid) -> CreateLoanRequest {
        CreateLoanRequest {
            borrower_id,
            loan_type_id: fixture.loan_type.id,
            principal: dec!(3000),
            guarantor_id: None,
            started_at: None,
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_short_then_full_payment() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let borrower_id = borrower(&fixture, false).await;

        let started_at = Utc.with_ymd_and_hms(2021, 3, 1, 16, 0, 0).unwrap();
        let loan = fixture
            .loans
            .create_loan(
                &fixture.admin,
                CreateLoanRequest {
                    started_at: Some(started_at),
                    ..loan_request(&fixture, borrower_id)
                },
            )
            .await
            .unwrap();
        assert_eq!(loan.expected_total, dec!(6000));
        assert_eq!(loan.disbursed, dec!(3000));

        let first_week = started_at + Duration::weeks(1);
        let short = fixture
            .loans
            .record_payment(&fixture.admin, loan.id, dec!(250), Some(first_week))
            .await
            .unwrap();
        assert!(!short.covers_week);
        assert!(short.miss_recorded);
        assert_eq!(short.loan.serviced_weeks, 0);

        let full = fixture
            .loans
            .record_payment(&fixture.admin, loan.id, dec!(300), Some(first_week + Duration::weeks(1)))
            .await
            .unwrap();
        assert!(full.covers_week);
        assert!(!full.miss_recorded);
        assert_eq!(full.loan.serviced_weeks, 1);

        let summary = fixture.loans.loan_summary(loan.id).await.unwrap();
        assert_eq!(summary.paid_total, dec!(550));
        assert_eq!(summary.misses, 1);
    }

    /// A loan started `weeks + 1` weeks ago with `weeks` covering payments,
    /// one per week
    async fn serviced_loan(fixture: &Fixture, borrower_id: Uuid, weeks: i64) -> Loan {
        let started_at: DateTime<Utc> = Utc::now() - Duration::weeks(weeks + 1);
        let loan = fixture
            .loans
            .create_loan(
                &fixture.admin,
                CreateLoanRequest {
                    started_at: Some(started_at),
                    ..loan_request(fixture, borrower_id)
                },
            )
            .await
            .unwrap();

        let mut latest = loan;
        for week in 1..=weeks {
            latest = fixture
                .loans
                .record_payment(
                    &fixture.admin,
                    latest.id,
                    dec!(300),
                    Some(started_at + Duration::weeks(week)),
                )
                .await
                .unwrap()
                .loan;
        }
        latest
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_renewal_completes_prior_loan_and_withholds_shortfall() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let borrower_id = borrower(&fixture, false).await;

        let prior = serviced_loan(&fixture, borrower_id, 9).await;
        assert_eq!(prior.serviced_weeks, 9);
        assert_eq!(prior.status, LoanStatus::Active);

        let renewal = fixture
            .loans
            .create_loan(
                &fixture.admin,
                CreateLoanRequest {
                    principal: dec!(5000),
                    ..loan_request(&fixture, borrower_id)
                },
            )
            .await
            .unwrap();

        // 6000 expected, 9 × 300 paid
        assert_eq!(renewal.principal, dec!(5000));
        assert_eq!(renewal.disbursed, dec!(1700));
        assert_eq!(renewal.expected_total, dec!(10000));
        assert!(renewal.is_renewal);
        assert_eq!(renewal.renewed_from, Some(prior.id));
        assert_eq!(renewal.status, LoanStatus::Active);

        let prior = fixture.loans.get_loan(prior.id).await.unwrap();
        assert_eq!(prior.status, LoanStatus::Completed);
        assert!(prior.completed);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_renewal_not_covering_shortfall_is_rejected() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let borrower_id = borrower(&fixture, false).await;

        let prior = serviced_loan(&fixture, borrower_id, 9).await;

        let renewal = fixture
            .loans
            .create_loan(
                &fixture.admin,
                CreateLoanRequest {
                    principal: dec!(3300),
                    ..loan_request(&fixture, borrower_id)
                },
            )
            .await;
        assert!(matches!(renewal, Err(ApiError::ValidationError(_))));

        // the rejected renewal leaves the prior loan untouched
        let prior = fixture.loans.get_loan(prior.id).await.unwrap();
        assert_eq!(prior.status, LoanStatus::Active);
        assert!(!prior.completed);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_second_loan_before_renewal_is_a_conflict() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let borrower_id = borrower(&fixture, false).await;

        fixture
            .loans
            .create_loan(&fixture.admin, loan_request(&fixture, borrower_id))
            .await
            .unwrap();

        let second = fixture
            .loans
            .create_loan(&fixture.admin, loan_request(&fixture, borrower_id))
            .await;
        assert!(matches!(second, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_guarantor_backs_one_borrower_per_group() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let guarantor_id = borrower(&fixture, true).await;
        let first = borrower(&fixture, false).await;
        let second = borrower(&fixture, false).await;

        let backed = CreateLoanRequest {
            guarantor_id: Some(guarantor_id),
            ..loan_request(&fixture, first)
        };
        fixture.loans.create_loan(&fixture.admin, backed).await.unwrap();

        let rejected = CreateLoanRequest {
            guarantor_id: Some(guarantor_id),
            ..loan_request(&fixture, second)
        };
        let result = fixture.loans.create_loan(&fixture.admin, rejected).await;
        assert!(matches!(result, Err(ApiError::ValidationError(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_sweep_is_idempotent() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;
        let borrower_id = borrower(&fixture, false).await;

        let started_at = Utc.with_ymd_and_hms(2020, 1, 1, 18, 0, 0).unwrap();
        let loan = fixture
            .loans
            .create_loan(
                &fixture.admin,
                CreateLoanRequest {
                    started_at: Some(started_at),
                    ..loan_request(&fixture, borrower_id)
                },
            )
            .await
            .unwrap();

        let week = Week::containing(NaiveDate::from_ymd_opt(2020, 1, 8).unwrap());
        let sweeper = MissSweeper::new(pool.clone(), timezone());

        let first = sweeper.run_for_week(week).await.unwrap();
        let second = sweeper.run_for_week(week).await.unwrap();
        assert_eq!(first.week_start, week.start());
        assert_eq!(second.misses_recorded, 0);

        let misses: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM misses WHERE loan_id = $1 AND week_start = $2",
        )
        .bind(loan.id)
        .bind(week.start())
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(misses, 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_group_lead_report_lists_led_groups_only() {
        let pool = setup_test_db().await;
        let fixture = fixture(&pool).await;

        let lead = UserService::new(pool.clone())
            .create_user(CreateUserRequest {
                first_name: "Rosa".to_string(),
                last_name: "Titular".to_string(),
                second_last_name: None,
                email: format!("lead-{}@example.com", Uuid::new_v4()),
                password: "correct horse battery".to_string(),
                role: UserRole::GroupLead,
                superior_id: None,
            })
            .await
            .unwrap();

        let groups = GroupService::new(pool.clone());
        let fixture_group = groups.get_group(fixture.group_id).await.unwrap();
        let led = groups
            .create_group(
                &fixture.admin,
                CreateGroupRequest {
                    name: "Grupo Rosa".to_string(),
                    route_id: fixture_group.route_id,
                    lead_user_id: Some(lead.id),
                },
            )
            .await
            .unwrap();

        let bonus = Arc::new(BonusService::new(pool.clone(), timezone()));
        let reports = ReportService::new(pool.clone(), bonus, timezone());

        let as_lead = AuthenticatedUser::new(lead.id, UserRole::GroupLead);
        let report = reports
            .general_report(&as_lead, ReportQuery::default())
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].group.group_id, led.id);
        assert_eq!(report.totals.groups, 1);

        let as_collector = AuthenticatedUser::new(lead.id, UserRole::Collector);
        let report = reports
            .general_report(&as_collector, ReportQuery::default())
            .await
            .unwrap();
        assert!(report.rows.is_empty());
    }
}
