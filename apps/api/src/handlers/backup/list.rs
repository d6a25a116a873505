use super::*;

pub async fn list_backups_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<BackupListResponse>> {
    let groups = state.backup_service.list_artifacts().await?;

    Ok(Json(BackupListResponse {
        tiers: groups
            .into_iter()
            .map(BackupTierArtifactsResponse::from)
            .collect(),
    }))
}
