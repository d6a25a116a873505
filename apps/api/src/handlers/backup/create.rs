use super::*;

/// Starts a backup of the requested tier, defaulting to manual.
///
/// The body is read as raw bytes so that an empty body means "no tier" and
/// malformed input is reported in the API error format.
pub async fn create_backup_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<CreateBackupResponse>)> {
    let body = body.map_err(|rejection| {
        AppError::Validation(format!("failed to read request body: {}", rejection.body_text()))
    })?;
    let tier = match parse_create_request(&body)?.tier {
        Some(value) => value.parse::<BackupTier>()?,
        None => BackupTier::Manual,
    };

    info!(tier = %tier, "manual backup requested");
    let artifact = state.backup_service.run_backup(tier).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBackupResponse {
            message: format!("{tier} backup created"),
            artifact: BackupArtifactResponse::from(&artifact),
        }),
    ))
}

fn parse_create_request(body: &[u8]) -> Result<CreateBackupRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateBackupRequest::default());
    }

    serde_json::from_slice(body)
        .map_err(|error| AppError::Validation(format!("invalid request body: {error}")))
}
