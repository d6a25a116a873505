use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::{HealthDependencyStatus, HealthResponse};
use crate::state::AppState;

const POSTGRES_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let postgres = check_postgres(&state.postgres_pool).await;
    let scheduler = check_scheduler(&state).await;

    let ready = is_healthy(postgres.status) && scheduler.status != "error";
    let status = if ready { "ok" } else { "degraded" };
    let http_status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthResponse {
            status,
            ready,
            postgres,
            scheduler,
        }),
    )
}

async fn check_postgres(pool: &sqlx::PgPool) -> HealthDependencyStatus {
    let check = tokio::time::timeout(
        POSTGRES_CHECK_TIMEOUT,
        sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool),
    )
    .await;

    match check {
        Ok(Ok(_)) => HealthDependencyStatus {
            status: "ok",
            detail: None,
        },
        Ok(Err(error)) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!("postgres check failed: {error}")),
        },
        Err(_) => HealthDependencyStatus {
            status: "error",
            detail: Some(format!(
                "postgres check exceeded {}s",
                POSTGRES_CHECK_TIMEOUT.as_secs()
            )),
        },
    }
}

async fn check_scheduler(state: &AppState) -> HealthDependencyStatus {
    if !state.scheduler_enabled {
        return HealthDependencyStatus {
            status: "disabled",
            detail: None,
        };
    }

    if state.scheduler_status.snapshot().await.running {
        HealthDependencyStatus {
            status: "ok",
            detail: None,
        }
    } else {
        HealthDependencyStatus {
            status: "error",
            detail: Some("backup scheduler is not running".to_owned()),
        }
    }
}

fn is_healthy(status: &str) -> bool {
    status == "ok"
}
