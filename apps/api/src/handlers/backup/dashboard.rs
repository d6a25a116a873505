use super::*;

pub async fn backup_dashboard_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<BackupDashboardResponse>> {
    let usage = state.backup_service.summarize().await?;
    let scheduler = state.scheduler_status.snapshot().await;
    let policies = state.retention_service.policies();

    let tiers: Vec<BackupTierDashboardResponse> = usage
        .into_iter()
        .map(|tier_usage| {
            let schedule = scheduler.tier(tier_usage.tier);
            BackupTierDashboardResponse {
                tier: tier_usage.tier.as_str().to_owned(),
                artifact_count: tier_usage.artifact_count,
                total_size_bytes: tier_usage.total_size_bytes,
                latest_created_at: tier_usage.latest_created_at.map(format_timestamp),
                retention: policies
                    .window_for(tier_usage.tier)
                    .map(|window| window.to_string()),
                schedule: schedule
                    .and_then(|entry| entry.rule)
                    .map(|rule| rule.to_string()),
                next_run_at: schedule
                    .filter(|_| scheduler.running)
                    .and_then(|entry| entry.next_fire_at)
                    .map(format_timestamp),
                running: tier_usage.running,
                last_run: schedule
                    .and_then(|entry| entry.last_run.clone())
                    .map(Into::into),
            }
        })
        .collect();

    Ok(Json(BackupDashboardResponse {
        scheduler_running: scheduler.running,
        total_artifacts: tiers.iter().map(|tier| tier.artifact_count).sum(),
        total_size_bytes: tiers.iter().map(|tier| tier.total_size_bytes).sum(),
        tiers,
    }))
}
